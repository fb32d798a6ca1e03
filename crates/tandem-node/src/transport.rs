use async_trait::async_trait;
use tandem_store::Block;
use tandem_types::{ContentId, PeerId};
use tracing::{debug, warn};

use crate::error::{NodeError, NodeResult};

/// A way of fetching blocks from one remote peer.
#[async_trait]
pub trait BlockTransport: Send + Sync {
    /// The peer on the other end.
    fn remote_peer(&self) -> &PeerId;

    /// Fetch and verify a single block. `NotFound` means the peer answered
    /// and does not hold the block; any other error means the peer could not
    /// be asked.
    async fn fetch_block(&self, cid: &ContentId) -> NodeResult<Block>;
}

/// Ask each transport in order and return the first block found.
///
/// Fails with `NotFound` if no transports were given or at least one peer
/// answered without the block. Fails with the last transport error only if
/// every peer failed to answer.
pub async fn fetch_from_any<T: BlockTransport>(
    transports: &[T],
    cid: &ContentId,
) -> NodeResult<Block> {
    let mut answered = false;
    let mut last_failure = None;

    for transport in transports {
        match transport.fetch_block(cid).await {
            Ok(block) => {
                debug!(cid = %cid, peer = %transport.remote_peer(), "block fetched from peer");
                return Ok(block);
            }
            Err(NodeError::NotFound(_)) => answered = true,
            Err(e) => {
                warn!(cid = %cid, peer = %transport.remote_peer(), error = %e, "peer fetch failed");
                last_failure = Some(e);
            }
        }
    }

    match last_failure {
        Some(e) if !answered => Err(e),
        _ => Err(NodeError::NotFound(*cid)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tandem_types::IdentityMaterial;

    enum Behaviour {
        Has(Bytes),
        Missing,
        Broken,
    }

    struct StubTransport {
        peer: PeerId,
        behaviour: Behaviour,
        calls: AtomicUsize,
    }

    impl StubTransport {
        fn new(name: &str, behaviour: Behaviour) -> Self {
            Self {
                peer: PeerId::derive(&IdentityMaterial::Named(name.into())),
                behaviour,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl BlockTransport for StubTransport {
        fn remote_peer(&self) -> &PeerId {
            &self.peer
        }

        async fn fetch_block(&self, cid: &ContentId) -> NodeResult<Block> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behaviour {
                Behaviour::Has(data) => Ok(Block::from_parts(*cid, data.clone())?),
                Behaviour::Missing => Err(NodeError::NotFound(*cid)),
                Behaviour::Broken => Err(NodeError::LinkError(format!("{} is gone", self.peer))),
            }
        }
    }

    fn content() -> (ContentId, Bytes) {
        let data = Bytes::from_static(b"shared block");
        (*Block::raw(data.clone()).id(), data)
    }

    #[tokio::test]
    async fn no_transports_is_not_found() {
        let (cid, _) = content();
        let err = fetch_from_any::<StubTransport>(&[], &cid).await.unwrap_err();
        assert!(matches!(err, NodeError::NotFound(_)));
    }

    #[tokio::test]
    async fn first_holder_wins_and_later_peers_are_not_asked() {
        let (cid, data) = content();
        let transports = [
            StubTransport::new("a", Behaviour::Missing),
            StubTransport::new("b", Behaviour::Has(data.clone())),
            StubTransport::new("c", Behaviour::Has(data.clone())),
        ];
        let block = fetch_from_any(&transports, &cid).await.unwrap();
        assert_eq!(block.data(), &data);
        assert_eq!(transports[0].calls.load(Ordering::SeqCst), 1);
        assert_eq!(transports[2].calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn broken_peer_is_skipped() {
        let (cid, data) = content();
        let transports = [
            StubTransport::new("a", Behaviour::Broken),
            StubTransport::new("b", Behaviour::Has(data)),
        ];
        assert!(fetch_from_any(&transports, &cid).await.is_ok());
    }

    #[tokio::test]
    async fn any_answer_makes_it_not_found() {
        let (cid, _) = content();
        let transports = [
            StubTransport::new("a", Behaviour::Broken),
            StubTransport::new("b", Behaviour::Missing),
        ];
        let err = fetch_from_any(&transports, &cid).await.unwrap_err();
        assert!(matches!(err, NodeError::NotFound(id) if id == cid));
    }

    #[tokio::test]
    async fn all_broken_is_link_error() {
        let (cid, _) = content();
        let transports = [
            StubTransport::new("a", Behaviour::Broken),
            StubTransport::new("b", Behaviour::Broken),
        ];
        let err = fetch_from_any(&transports, &cid).await.unwrap_err();
        assert!(matches!(err, NodeError::LinkError(_)));
    }
}
