use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tandem_protocol::{LinkCodec, LinkMessage, PROTOCOL_VERSION};
use tandem_store::Block;
use tandem_types::{ContentId, PeerId};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::error::{NodeError, NodeResult};
use crate::network::PeerAddress;
use crate::node::PeerNode;
use crate::service::Envelope;
use crate::transport::BlockTransport;

/// An open link from a local node to one remote peer.
///
/// Requests travel as framed [`LinkMessage`]s over the remote node's inbox.
/// Every request is bounded by the link's timeout; a remote that has
/// stopped or does not answer in time yields `LinkError`.
#[derive(Clone, Debug)]
pub struct PeerLink {
    local: PeerId,
    remote: PeerId,
    remote_addr: PeerAddress,
    outbox: mpsc::Sender<Envelope>,
    timeout: Duration,
}

impl PeerLink {
    /// Connect two running nodes: discover `b`'s listen address and dial it
    /// from `a`. The link is usable in both directions afterwards. Connecting
    /// an already connected pair is a no-op.
    pub async fn connect(a: &PeerNode, b: &PeerNode) -> NodeResult<()> {
        for node in [a, b] {
            if !node.is_running() {
                return Err(NodeError::ConnectionError(format!(
                    "node {} is {}",
                    node.label(),
                    node.state()
                )));
            }
        }
        let address = b.listen_addrs().into_iter().next().ok_or_else(|| {
            NodeError::ConnectionError(format!("node {} has no listen address", b.label()))
        })?;
        a.dial(&address).await?;
        Ok(())
    }

    pub(crate) fn new(
        local: PeerId,
        remote: PeerId,
        remote_addr: PeerAddress,
        outbox: mpsc::Sender<Envelope>,
        timeout: Duration,
    ) -> Self {
        Self {
            local,
            remote,
            remote_addr,
            outbox,
            timeout,
        }
    }

    pub fn remote_addr(&self) -> &PeerAddress {
        &self.remote_addr
    }

    /// Whether the remote node's inbox has gone away.
    pub fn is_closed(&self) -> bool {
        self.outbox.is_closed()
    }

    /// Fetch a block's bytes from the remote peer's store.
    pub async fn fetch(&self, cid: &ContentId) -> NodeResult<Bytes> {
        self.fetch_block(cid).await.map(Block::into_data)
    }

    /// Exchange `Hello`/`HelloAck`; returns the peer that answered.
    pub(crate) async fn handshake(&self, listen_addr: &PeerAddress) -> NodeResult<PeerId> {
        let hello = LinkMessage::hello(self.local.clone(), listen_addr.to_string());
        match self.request(&hello).await {
            Ok(LinkMessage::HelloAck { version, .. }) if version != PROTOCOL_VERSION => {
                Err(NodeError::ConnectionError(format!(
                    "{} speaks protocol version {version}, expected {PROTOCOL_VERSION}",
                    self.remote
                )))
            }
            Ok(LinkMessage::HelloAck { peer, .. }) if peer == self.remote => Ok(peer),
            Ok(LinkMessage::HelloAck { peer, .. }) => Err(NodeError::ConnectionError(format!(
                "dialed {} but {peer} answered",
                self.remote
            ))),
            Ok(LinkMessage::Error { code, message }) => Err(NodeError::ConnectionError(format!(
                "{} refused handshake ({code}): {message}",
                self.remote
            ))),
            Ok(other) => Err(NodeError::ConnectionError(format!(
                "unexpected {} during handshake",
                other.type_name()
            ))),
            Err(e) => Err(NodeError::ConnectionError(e.to_string())),
        }
    }

    /// Tell the remote this link is going away. Best effort.
    pub(crate) async fn goodbye(&self) {
        let msg = LinkMessage::Goodbye {
            peer: self.local.clone(),
        };
        if let Err(e) = self.request(&msg).await {
            debug!(peer = %self.remote, error = %e, "goodbye not delivered");
        }
    }

    async fn request(&self, msg: &LinkMessage) -> NodeResult<LinkMessage> {
        let frame = LinkCodec::encode(msg)?;
        let (reply_tx, reply_rx) = oneshot::channel();
        let exchange = async {
            self.outbox
                .send(Envelope {
                    frame,
                    reply: reply_tx,
                })
                .await
                .map_err(|_| NodeError::LinkError(format!("link to {} is closed", self.remote)))?;
            reply_rx.await.map_err(|_| {
                NodeError::LinkError(format!("{} dropped the request", self.remote))
            })
        };
        let reply = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| {
                NodeError::LinkError(format!(
                    "{} to {} timed out after {}ms",
                    msg.type_name(),
                    self.remote,
                    self.timeout.as_millis()
                ))
            })??;
        Ok(LinkCodec::decode_exact(&reply)?)
    }
}

#[async_trait]
impl BlockTransport for PeerLink {
    fn remote_peer(&self) -> &PeerId {
        &self.remote
    }

    async fn fetch_block(&self, cid: &ContentId) -> NodeResult<Block> {
        match self.request(&LinkMessage::WantBlock { cid: *cid }).await? {
            LinkMessage::Block { cid: got, data } if got == *cid => {
                Ok(Block::from_parts(got, data)?)
            }
            LinkMessage::Block { cid: got, .. } => Err(NodeError::LinkError(format!(
                "{} answered {cid} with {got}",
                self.remote
            ))),
            LinkMessage::DontHave { .. } => Err(NodeError::NotFound(*cid)),
            LinkMessage::Error { code, message } => Err(NodeError::LinkError(format!(
                "{} failed ({code}): {message}",
                self.remote
            ))),
            other => Err(NodeError::LinkError(format!(
                "unexpected {} from {}",
                other.type_name(),
                self.remote
            ))),
        }
    }
}

/// A node's open links, in the order they were opened. At most one open link
/// per remote peer.
#[derive(Debug, Default)]
pub(crate) struct LinkTable {
    links: RwLock<Vec<PeerLink>>,
}

impl LinkTable {
    /// Add a link unless an open one to the same peer exists. A closed link
    /// to that peer is replaced in place.
    pub fn insert(&self, link: PeerLink) -> bool {
        let mut links = self.links.write().expect("lock poisoned");
        match links.iter_mut().find(|l| l.remote == link.remote) {
            Some(existing) if !existing.is_closed() => false,
            Some(existing) => {
                *existing = link;
                true
            }
            None => {
                links.push(link);
                true
            }
        }
    }

    pub fn remove(&self, peer: &PeerId) -> Option<PeerLink> {
        let mut links = self.links.write().expect("lock poisoned");
        let pos = links.iter().position(|l| &l.remote == peer)?;
        Some(links.remove(pos))
    }

    pub fn contains_open(&self, peer: &PeerId) -> bool {
        self.links
            .read()
            .expect("lock poisoned")
            .iter()
            .any(|l| &l.remote == peer && !l.is_closed())
    }

    pub fn snapshot(&self) -> Vec<PeerLink> {
        self.links.read().expect("lock poisoned").clone()
    }

    pub fn drain(&self) -> Vec<PeerLink> {
        std::mem::take(&mut *self.links.write().expect("lock poisoned"))
    }

    pub fn peers(&self) -> Vec<PeerId> {
        self.links
            .read()
            .expect("lock poisoned")
            .iter()
            .map(|l| l.remote.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tandem_types::IdentityMaterial;

    fn peer(name: &str) -> PeerId {
        PeerId::derive(&IdentityMaterial::Named(name.into()))
    }

    fn link_to(remote: &str, outbox: mpsc::Sender<Envelope>, timeout: Duration) -> PeerLink {
        PeerLink::new(
            peer("local"),
            peer(remote),
            PeerAddress::new(9, Some(peer(remote))),
            outbox,
            timeout,
        )
    }

    fn cid() -> ContentId {
        *Block::raw(Bytes::from_static(b"wanted")).id()
    }

    #[tokio::test]
    async fn stalled_peer_times_out_with_link_error() {
        let (tx, _rx) = mpsc::channel(4);
        let link = link_to("stalled", tx, Duration::from_millis(50));
        let err = link.fetch(&cid()).await.unwrap_err();
        match err {
            NodeError::LinkError(msg) => assert!(msg.contains("timed out"), "{msg}"),
            other => panic!("expected LinkError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn closed_inbox_is_link_error() {
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        let link = link_to("gone", tx, Duration::from_secs(1));
        assert!(link.is_closed());
        let err = link.fetch(&cid()).await.unwrap_err();
        assert!(matches!(err, NodeError::LinkError(_)));
    }

    #[tokio::test]
    async fn tampered_block_is_rejected() {
        let (tx, mut rx) = mpsc::channel::<Envelope>(4);
        tokio::spawn(async move {
            while let Some(env) = rx.recv().await {
                let reply = LinkMessage::Block {
                    cid: cid(),
                    data: b"not what was asked for".to_vec(),
                };
                let _ = env.reply.send(LinkCodec::encode(&reply).unwrap());
            }
        });
        let link = link_to("liar", tx, Duration::from_secs(1));
        let err = link.fetch(&cid()).await.unwrap_err();
        assert!(matches!(err, NodeError::Store(_)));
    }

    #[test]
    fn table_keeps_one_open_link_per_peer() {
        let table = LinkTable::default();
        let (tx, _rx) = mpsc::channel(1);
        assert!(table.insert(link_to("a", tx.clone(), Duration::from_secs(1))));
        assert!(!table.insert(link_to("a", tx.clone(), Duration::from_secs(1))));
        assert!(table.insert(link_to("b", tx, Duration::from_secs(1))));
        assert_eq!(table.peers(), vec![peer("a"), peer("b")]);
        assert!(table.contains_open(&peer("a")));
    }

    #[test]
    fn table_replaces_closed_link() {
        let table = LinkTable::default();
        let (dead_tx, dead_rx) = mpsc::channel(1);
        drop(dead_rx);
        table.insert(link_to("a", dead_tx, Duration::from_secs(1)));
        assert!(!table.contains_open(&peer("a")));

        let (tx, _rx) = mpsc::channel(1);
        assert!(table.insert(link_to("a", tx, Duration::from_secs(1))));
        assert!(table.contains_open(&peer("a")));
        assert_eq!(table.snapshot().len(), 1);
    }

    #[test]
    fn table_remove_and_drain() {
        let table = LinkTable::default();
        let (tx, _rx) = mpsc::channel(1);
        table.insert(link_to("a", tx.clone(), Duration::from_secs(1)));
        table.insert(link_to("b", tx, Duration::from_secs(1)));
        assert!(table.remove(&peer("a")).is_some());
        assert!(table.remove(&peer("a")).is_none());
        assert_eq!(table.drain().len(), 1);
        assert!(table.peers().is_empty());
    }
}
