use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use tandem_types::PeerId;
use tokio::sync::mpsc;

use crate::error::{NodeError, NodeResult};
use crate::service::Envelope;

/// Address of a node on a [`MemoryNetwork`]: `/memory/<port>/p2p/<peer>`.
///
/// The `/p2p/<peer>` suffix is optional when dialing; a listen address
/// reported by a node always carries it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PeerAddress {
    port: u64,
    peer: Option<PeerId>,
}

impl PeerAddress {
    pub fn new(port: u64, peer: Option<PeerId>) -> Self {
        Self { port, peer }
    }

    pub fn port(&self) -> u64 {
        self.port
    }

    pub fn peer(&self) -> Option<&PeerId> {
        self.peer.as_ref()
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/memory/{}", self.port)?;
        if let Some(peer) = &self.peer {
            write!(f, "/p2p/{}", peer.to_hex())?;
        }
        Ok(())
    }
}

impl FromStr for PeerAddress {
    type Err = NodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || NodeError::InvalidAddress(s.to_string());
        let mut parts = s.trim().split('/');
        if parts.next() != Some("") || parts.next() != Some("memory") {
            return Err(invalid());
        }
        let port = parts
            .next()
            .and_then(|p| p.parse::<u64>().ok())
            .ok_or_else(invalid)?;
        let peer = match (parts.next(), parts.next()) {
            (None, _) => None,
            (Some("p2p"), Some(hex)) => Some(PeerId::from_hex(hex).map_err(|_| invalid())?),
            _ => return Err(invalid()),
        };
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self { port, peer })
    }
}

/// A running node's entry on the network.
#[derive(Clone, Debug)]
pub(crate) struct Listener {
    pub peer: PeerId,
    pub inbox: mpsc::Sender<Envelope>,
}

/// In-process network connecting nodes of one process.
///
/// Plays the part of transport and discovery: a started node registers its
/// inbox under a port, and dialers look the port up to reach it. Stopping a
/// node removes its entry, so later dials fail.
pub struct MemoryNetwork {
    next_port: AtomicU64,
    listeners: RwLock<HashMap<u64, Listener>>,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self {
            next_port: AtomicU64::new(1),
            listeners: RwLock::new(HashMap::new()),
        }
    }

    /// Register a listener. Port `0` allocates a free port.
    pub(crate) fn listen(
        &self,
        requested: &PeerAddress,
        peer: &PeerId,
        inbox: mpsc::Sender<Envelope>,
    ) -> NodeResult<PeerAddress> {
        let mut listeners = self.listeners.write().expect("lock poisoned");
        let port = if requested.port == 0 {
            loop {
                let candidate = self.next_port.fetch_add(1, Ordering::Relaxed);
                if !listeners.contains_key(&candidate) {
                    break candidate;
                }
            }
        } else if listeners.contains_key(&requested.port) {
            return Err(NodeError::ConnectionError(format!(
                "address /memory/{} already in use",
                requested.port
            )));
        } else {
            requested.port
        };
        listeners.insert(
            port,
            Listener {
                peer: peer.clone(),
                inbox,
            },
        );
        Ok(PeerAddress::new(port, Some(peer.clone())))
    }

    pub(crate) fn unlisten(&self, address: &PeerAddress) {
        self.listeners
            .write()
            .expect("lock poisoned")
            .remove(&address.port);
    }

    /// Find the node listening at `address`. When the address names a peer,
    /// the listener must be that peer.
    pub(crate) fn lookup(&self, address: &PeerAddress) -> Option<Listener> {
        let listeners = self.listeners.read().expect("lock poisoned");
        let listener = listeners.get(&address.port)?;
        match &address.peer {
            Some(peer) if *peer != listener.peer => None,
            _ => Some(listener.clone()),
        }
    }

    /// Addresses of every node currently listening, ordered by port.
    pub fn addresses(&self) -> Vec<PeerAddress> {
        let listeners = self.listeners.read().expect("lock poisoned");
        let mut addrs: Vec<PeerAddress> = listeners
            .iter()
            .map(|(port, l)| PeerAddress::new(*port, Some(l.peer.clone())))
            .collect();
        addrs.sort_by_key(|a| a.port);
        addrs
    }
}

impl Default for MemoryNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryNetwork")
            .field(
                "listeners",
                &self.listeners.read().expect("lock poisoned").len(),
            )
            .finish()
    }
}
