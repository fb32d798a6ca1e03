use std::sync::Arc;
use std::time::Duration;

use tandem_protocol::{LinkCodec, LinkMessage, PeerHello};
use tandem_store::{BlockStore, InMemoryBlockStore};
use tandem_types::PeerId;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace, warn};

use crate::link::{LinkTable, PeerLink};
use crate::network::{MemoryNetwork, PeerAddress};

/// One framed request and the channel its framed reply goes back on.
#[derive(Debug)]
pub(crate) struct Envelope {
    pub frame: Vec<u8>,
    pub reply: oneshot::Sender<Vec<u8>>,
}

const BAD_REQUEST: u32 = 400;
const INTERNAL: u32 = 500;

/// Answers requests arriving at a running node's inbox.
pub(crate) struct BlockService {
    pub local: PeerId,
    pub label: String,
    pub store: Arc<InMemoryBlockStore>,
    pub links: Arc<LinkTable>,
    pub network: Arc<MemoryNetwork>,
    pub timeout: Duration,
}

impl BlockService {
    /// Serve until shutdown is signalled or every sender is gone.
    pub async fn run(
        self,
        mut inbox: mpsc::Receiver<Envelope>,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        debug!(node = %self.label, peer = %self.local, "block service running");
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                envelope = inbox.recv() => match envelope {
                    Some(Envelope { frame, reply }) => {
                        // The requester may have timed out already.
                        let _ = reply.send(self.handle(&frame));
                    }
                    None => break,
                },
            }
        }
        debug!(node = %self.label, "block service stopped");
    }

    fn handle(&self, frame: &[u8]) -> Vec<u8> {
        let response = match LinkCodec::decode_exact(frame) {
            Ok(msg) => self.respond(msg),
            Err(e) => LinkMessage::Error {
                code: BAD_REQUEST,
                message: e.to_string(),
            },
        };
        LinkCodec::encode(&response)
            .or_else(|e| {
                LinkCodec::encode(&LinkMessage::Error {
                    code: INTERNAL,
                    message: e.to_string(),
                })
            })
            .unwrap_or_default()
    }

    fn respond(&self, msg: LinkMessage) -> LinkMessage {
        match msg {
            LinkMessage::WantBlock { cid } => match self.store.get(&cid) {
                Ok(data) => {
                    trace!(node = %self.label, cid = %cid, "serving block");
                    LinkMessage::Block {
                        cid,
                        data: data.to_vec(),
                    }
                }
                Err(_) => {
                    trace!(node = %self.label, cid = %cid, "block not held");
                    LinkMessage::DontHave { cid }
                }
            },
            hello @ LinkMessage::Hello { .. } => match hello.accept_hello(self.local.clone()) {
                Ok((remote, ack)) => {
                    self.open_reverse_link(&remote);
                    ack
                }
                Err(e) => LinkMessage::Error {
                    code: BAD_REQUEST,
                    message: e.to_string(),
                },
            },
            LinkMessage::Goodbye { peer } => {
                if self.links.remove(&peer).is_some() {
                    debug!(node = %self.label, peer = %peer, "peer said goodbye");
                }
                LinkMessage::Goodbye {
                    peer: self.local.clone(),
                }
            }
            other => LinkMessage::Error {
                code: BAD_REQUEST,
                message: format!("unexpected {}", other.type_name()),
            },
        }
    }

    /// Links are bidirectional: a peer that dialed us gets a link back.
    fn open_reverse_link(&self, remote: &PeerHello) {
        let address = match remote.listen_addr.parse::<PeerAddress>() {
            Ok(address) => address,
            Err(e) => {
                warn!(node = %self.label, peer = %remote.peer, error = %e, "unusable listen address in hello");
                return;
            }
        };
        let Some(listener) = self.network.lookup(&address) else {
            warn!(node = %self.label, peer = %remote.peer, address = %address, "dialer is not listening");
            return;
        };
        if listener.peer != remote.peer {
            warn!(node = %self.label, peer = %remote.peer, address = %address, "listen address belongs to another peer");
            return;
        }
        let link = PeerLink::new(
            self.local.clone(),
            remote.peer.clone(),
            address,
            listener.inbox,
            self.timeout,
        );
        if self.links.insert(link) {
            debug!(node = %self.label, peer = %remote.peer, "inbound link opened");
        }
    }
}
