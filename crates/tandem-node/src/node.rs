use std::fmt;
use std::sync::{Arc, RwLock};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tandem_store::{Block, BlockStore, InMemoryBlockStore, StoreError};
use tandem_types::{ContentId, IdentityMaterial, PeerId};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::config::NodeConfig;
use crate::error::{NodeError, NodeResult};
use crate::link::{LinkTable, PeerLink};
use crate::network::{MemoryNetwork, PeerAddress};
use crate::service::BlockService;
use crate::transport::fetch_from_any;

/// Lifecycle state of a [`PeerNode`].
///
/// `Uninitialized -> Running -> Stopped`. `Stopped` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    Uninitialized,
    Running,
    Stopped,
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uninitialized => "uninitialized",
            Self::Running => "running",
            Self::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Snapshot of a node for reporting.
#[derive(Clone, Debug, Serialize)]
pub struct NodeInfo {
    pub label: String,
    pub id: Option<PeerId>,
    pub status: NodeState,
    pub addresses: Vec<String>,
    pub peers: Vec<PeerId>,
    pub blocks: usize,
    pub bytes: u64,
    pub started_at: Option<DateTime<Utc>>,
}

struct Running {
    id: PeerId,
    address: PeerAddress,
    started_at: DateTime<Utc>,
    shutdown: oneshot::Sender<()>,
}

struct NodeInner {
    state: NodeState,
    running: Option<Running>,
}

/// A peer node: a block store plus links to other nodes.
///
/// Nodes are created `Uninitialized` and hold no identity until
/// [`start`](Self::start). Publishing and resolving require a running node.
/// Stopping discards the node's links and blocks.
pub struct PeerNode {
    label: String,
    config: NodeConfig,
    network: Arc<MemoryNetwork>,
    store: Arc<InMemoryBlockStore>,
    links: Arc<LinkTable>,
    inner: RwLock<NodeInner>,
}

impl PeerNode {
    pub fn new(label: impl Into<String>, config: NodeConfig, network: Arc<MemoryNetwork>) -> Self {
        Self {
            label: label.into(),
            config,
            network,
            store: Arc::new(InMemoryBlockStore::new()),
            links: Arc::new(LinkTable::default()),
            inner: RwLock::new(NodeInner {
                state: NodeState::Uninitialized,
                running: None,
            }),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn state(&self) -> NodeState {
        self.inner.read().expect("lock poisoned").state
    }

    pub fn is_running(&self) -> bool {
        self.state() == NodeState::Running
    }

    /// The node's identity; `None` unless running.
    pub fn id(&self) -> Option<PeerId> {
        let inner = self.inner.read().expect("lock poisoned");
        inner.running.as_ref().map(|r| r.id.clone())
    }

    /// Start the node: allocate an identity, register on the network and
    /// begin answering peers. Starting a running node returns its identity.
    ///
    /// The node's service task runs on the current Tokio runtime; starting
    /// outside one fails with [`NodeError::NoRuntime`].
    pub fn start(&self) -> NodeResult<PeerId> {
        let mut inner = self.inner.write().expect("lock poisoned");
        match inner.state {
            NodeState::Running => {
                if let Some(running) = &inner.running {
                    return Ok(running.id.clone());
                }
            }
            NodeState::Stopped => {
                return Err(self.invalid_state(NodeState::Stopped, "start"));
            }
            NodeState::Uninitialized => {}
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| NodeError::NoRuntime(self.label.clone()))?;
        let id = match &self.config.identity {
            Some(name) => PeerId::derive(&IdentityMaterial::Named(format!("{name}/{}", self.label))),
            None => PeerId::random(),
        };
        let requested: PeerAddress = self.config.listen.parse()?;
        let (inbox_tx, inbox_rx) = mpsc::channel(self.config.inbox_capacity.max(1));
        let address = self.network.listen(&requested, &id, inbox_tx)?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let service = BlockService {
            local: id.clone(),
            label: self.label.clone(),
            store: Arc::clone(&self.store),
            links: Arc::clone(&self.links),
            network: Arc::clone(&self.network),
            timeout: self.config.fetch_timeout(),
        };
        runtime.spawn(service.run(inbox_rx, shutdown_rx));

        info!(
            node = %self.label,
            peer = %id,
            address = %address,
            bootstrap = self.config.bootstrap.len(),
            "node started"
        );
        inner.state = NodeState::Running;
        inner.running = Some(Running {
            id: id.clone(),
            address,
            started_at: Utc::now(),
            shutdown: shutdown_tx,
        });
        Ok(id)
    }

    /// Stop the node. Links are closed, the network entry removed and every
    /// block discarded. Stopping a stopped node is a no-op.
    pub async fn stop(&self) -> NodeResult<()> {
        let running = {
            let mut inner = self.inner.write().expect("lock poisoned");
            match inner.state {
                NodeState::Uninitialized => {
                    return Err(self.invalid_state(NodeState::Uninitialized, "stop"));
                }
                NodeState::Stopped => return Ok(()),
                NodeState::Running => {}
            }
            inner.state = NodeState::Stopped;
            inner.running.take()
        };

        if let Some(running) = &running {
            self.network.unlisten(&running.address);
        }
        for link in self.links.drain() {
            link.goodbye().await;
        }
        if let Some(running) = running {
            let _ = running.shutdown.send(());
        }
        self.store.clear();
        info!(node = %self.label, "node stopped");
        Ok(())
    }

    /// Store bytes as a raw block and return their identifier.
    pub fn publish(&self, data: impl Into<Bytes>) -> NodeResult<ContentId> {
        self.publish_block(Block::raw(data))
    }

    /// Store an already-built block.
    pub fn publish_block(&self, block: Block) -> NodeResult<ContentId> {
        self.require_running("publish")?;
        let size = block.len();
        let cid = self.store.put_block(block)?;
        debug!(node = %self.label, cid = %cid, size, "published");
        Ok(cid)
    }

    /// Bytes for `cid`, from the local store or else from linked peers.
    pub async fn resolve(&self, cid: &ContentId) -> NodeResult<Bytes> {
        self.resolve_block(cid).await.map(Block::into_data)
    }

    /// Like [`resolve`](Self::resolve) but keeps the block's codec.
    ///
    /// Peers are asked in the order their links were opened. A block fetched
    /// from a peer is verified against `cid` and, if `cache_fetched` is set,
    /// kept locally.
    pub async fn resolve_block(&self, cid: &ContentId) -> NodeResult<Block> {
        self.require_running("resolve")?;
        match self.store.get_block(cid) {
            Ok(block) => return Ok(block),
            Err(StoreError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        let links = self.links.snapshot();
        debug!(node = %self.label, cid = %cid, peers = links.len(), "asking peers");
        let block = fetch_from_any(&links, cid).await?;
        if self.config.cache_fetched && self.is_running() {
            self.store.put_block(block.clone())?;
        }
        Ok(block)
    }

    /// Whether the block is in this node's own store.
    pub fn has_local(&self, cid: &ContentId) -> bool {
        self.store.has(cid)
    }

    /// Addresses peers can dial; empty unless running.
    pub fn listen_addrs(&self) -> Vec<PeerAddress> {
        let inner = self.inner.read().expect("lock poisoned");
        inner
            .running
            .iter()
            .map(|r| r.address.clone())
            .collect()
    }

    /// Open a link to the node listening at `address`. Dialing a peer that
    /// is already linked returns its identity without a new handshake.
    pub async fn dial(&self, address: &PeerAddress) -> NodeResult<PeerId> {
        let (local, listen_addr) = {
            let inner = self.inner.read().expect("lock poisoned");
            match &inner.running {
                Some(r) => (r.id.clone(), r.address.clone()),
                None => {
                    return Err(NodeError::ConnectionError(format!(
                        "node {} is {}",
                        self.label, inner.state
                    )))
                }
            }
        };

        let listener = self.network.lookup(address).ok_or_else(|| {
            NodeError::ConnectionError(format!("no node listening at {address}"))
        })?;
        if listener.peer == local {
            return Err(NodeError::ConnectionError(format!(
                "node {} cannot dial itself",
                self.label
            )));
        }
        if self.links.contains_open(&listener.peer) {
            return Ok(listener.peer);
        }

        let link = PeerLink::new(
            local,
            listener.peer.clone(),
            PeerAddress::new(address.port(), Some(listener.peer.clone())),
            listener.inbox,
            self.config.fetch_timeout(),
        );
        let remote = link.handshake(&listen_addr).await?;
        let remote_addr = link.remote_addr().clone();
        if self.links.insert(link) {
            info!(node = %self.label, peer = %remote, address = %remote_addr, "connected");
        }
        Ok(remote)
    }

    /// Peers this node holds links to, in connection order.
    pub fn peers(&self) -> Vec<PeerId> {
        self.links.peers()
    }

    pub fn info(&self) -> NodeInfo {
        let inner = self.inner.read().expect("lock poisoned");
        let running = inner.running.as_ref();
        NodeInfo {
            label: self.label.clone(),
            id: running.map(|r| r.id.clone()),
            status: inner.state,
            addresses: running.iter().map(|r| r.address.to_string()).collect(),
            peers: self.links.peers(),
            blocks: self.store.len(),
            bytes: self.store.total_bytes(),
            started_at: running.map(|r| r.started_at),
        }
    }

    fn require_running(&self, op: &'static str) -> NodeResult<()> {
        match self.state() {
            NodeState::Running => Ok(()),
            state => Err(self.invalid_state(state, op)),
        }
    }

    fn invalid_state(&self, state: NodeState, op: &'static str) -> NodeError {
        NodeError::InvalidState {
            node: self.label.clone(),
            state,
            op,
        }
    }
}

impl fmt::Debug for PeerNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerNode")
            .field("label", &self.label)
            .field("state", &self.state())
            .field("blocks", &self.store.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn network() -> Arc<MemoryNetwork> {
        Arc::new(MemoryNetwork::new())
    }

    fn node(label: &str, net: &Arc<MemoryNetwork>) -> PeerNode {
        PeerNode::new(label, NodeConfig::default(), Arc::clone(net))
    }

    async fn connected_pair() -> (PeerNode, PeerNode) {
        let net = network();
        let a = node("node1", &net);
        let b = node("node2", &net);
        a.start().unwrap();
        b.start().unwrap();
        PeerLink::connect(&a, &b).await.unwrap();
        (a, b)
    }

    /// Reverse links are opened by the remote's service task.
    async fn wait_for_peers(node: &PeerNode, n: usize) {
        for _ in 0..100 {
            if node.peers().len() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("{} never saw {n} peers", node.label());
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn new_node_is_uninitialized() {
        let net = network();
        let n = node("node1", &net);
        assert_eq!(n.state(), NodeState::Uninitialized);
        assert!(n.id().is_none());
        assert!(n.listen_addrs().is_empty());
    }

    #[tokio::test]
    async fn start_is_idempotent() {
        let net = network();
        let n = node("node1", &net);
        let first = n.start().unwrap();
        let second = n.start().unwrap();
        assert_eq!(first, second);
        assert_eq!(n.state(), NodeState::Running);
        assert_eq!(net.addresses().len(), 1);
    }

    #[tokio::test]
    async fn stopped_is_terminal() {
        let net = network();
        let n = node("node1", &net);
        n.start().unwrap();
        let cid = n.publish(Bytes::from_static(b"gone soon")).unwrap();
        n.stop().await.unwrap();
        n.stop().await.unwrap();

        assert_eq!(n.state(), NodeState::Stopped);
        assert!(!n.has_local(&cid));
        assert!(net.addresses().is_empty());
        assert!(matches!(
            n.start(),
            Err(NodeError::InvalidState { state: NodeState::Stopped, op: "start", .. })
        ));
    }

    #[tokio::test]
    async fn operations_after_stop_are_invalid() {
        let net = network();
        let n = node("node1", &net);
        n.start().unwrap();
        let cid = n.publish(Bytes::from_static(b"before stop")).unwrap();
        n.stop().await.unwrap();

        let err = n.publish(Bytes::from_static(b"after stop")).unwrap_err();
        assert!(matches!(
            err,
            NodeError::InvalidState { state: NodeState::Stopped, op: "publish", .. }
        ));
        let err = n.resolve(&cid).await.unwrap_err();
        assert!(matches!(
            err,
            NodeError::InvalidState { state: NodeState::Stopped, op: "resolve", .. }
        ));
    }

    #[test]
    fn start_outside_runtime_fails() {
        let net = network();
        let n = node("node1", &net);
        assert!(matches!(n.start(), Err(NodeError::NoRuntime(label)) if label == "node1"));
        assert_eq!(n.state(), NodeState::Uninitialized);
        assert!(net.addresses().is_empty());
    }

    #[tokio::test]
    async fn stop_before_start_is_invalid() {
        let net = network();
        let n = node("node1", &net);
        assert!(matches!(n.stop().await, Err(NodeError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn operations_require_running_node() {
        let net = network();
        let n = node("node1", &net);
        let err = n.publish(Bytes::from_static(b"x")).unwrap_err();
        assert!(matches!(err, NodeError::InvalidState { op: "publish", .. }));
        let cid = *Block::raw(Bytes::from_static(b"x")).id();
        let err = n.resolve(&cid).await.unwrap_err();
        assert!(matches!(err, NodeError::InvalidState { op: "resolve", .. }));
    }

    #[tokio::test]
    async fn named_identity_is_stable_per_label() {
        let config = NodeConfig {
            identity: Some("gateway".into()),
            ..NodeConfig::default()
        };
        let id_of = |label: &str| {
            let n = PeerNode::new(label, config.clone(), network());
            n.start().unwrap()
        };
        assert_eq!(id_of("node1"), id_of("node1"));
        assert_ne!(id_of("node1"), id_of("node2"));
    }

    #[tokio::test]
    async fn invalid_listen_address_fails_start() {
        let config = NodeConfig {
            listen: "/ip4/0.0.0.0/tcp/0".into(),
            ..NodeConfig::default()
        };
        let n = PeerNode::new("node1", config, network());
        assert!(matches!(n.start(), Err(NodeError::InvalidAddress(_))));
        assert_eq!(n.state(), NodeState::Uninitialized);
    }

    // -----------------------------------------------------------------------
    // Publish / resolve
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn publish_then_resolve_locally() {
        let net = network();
        let n = node("node1", &net);
        n.start().unwrap();
        let cid = n.publish(Bytes::from_static(b"Hello World 201")).unwrap();
        assert_eq!(n.resolve(&cid).await.unwrap().as_ref(), b"Hello World 201");
    }

    #[tokio::test]
    async fn unknown_cid_without_peers_is_not_found() {
        let net = network();
        let n = node("node1", &net);
        n.start().unwrap();
        let cid = *Block::raw(Bytes::from_static(b"never published")).id();
        assert!(matches!(n.resolve(&cid).await, Err(NodeError::NotFound(id)) if id == cid));
    }

    #[tokio::test]
    async fn resolve_across_link_in_both_directions() {
        let (a, b) = connected_pair().await;
        wait_for_peers(&b, 1).await;

        let from_a = a.publish(Bytes::from_static(b"published on a")).unwrap();
        let from_b = b.publish(Bytes::from_static(b"published on b")).unwrap();

        assert_eq!(b.resolve(&from_a).await.unwrap().as_ref(), b"published on a");
        assert_eq!(a.resolve(&from_b).await.unwrap().as_ref(), b"published on b");
    }

    #[tokio::test]
    async fn fetched_blocks_are_cached() {
        let (a, b) = connected_pair().await;
        let cid = b.publish(Bytes::from_static(b"cache me")).unwrap();
        assert!(!a.has_local(&cid));
        a.resolve(&cid).await.unwrap();
        assert!(a.has_local(&cid));
    }

    #[tokio::test]
    async fn caching_can_be_disabled() {
        let net = network();
        let config = NodeConfig {
            cache_fetched: false,
            ..NodeConfig::default()
        };
        let a = PeerNode::new("node1", config, Arc::clone(&net));
        let b = node("node2", &net);
        a.start().unwrap();
        b.start().unwrap();
        PeerLink::connect(&a, &b).await.unwrap();

        let cid = b.publish(Bytes::from_static(b"do not keep")).unwrap();
        a.resolve(&cid).await.unwrap();
        assert!(!a.has_local(&cid));
    }

    #[tokio::test]
    async fn concurrent_resolves_of_same_cid_both_succeed() {
        let net = network();
        let a = node("node1", &net);
        let config = NodeConfig {
            cache_fetched: false,
            ..NodeConfig::default()
        };
        let b = PeerNode::new("node2", config, Arc::clone(&net));
        a.start().unwrap();
        b.start().unwrap();
        PeerLink::connect(&b, &a).await.unwrap();

        let cid = a.publish(Bytes::from_static(b"hello world")).unwrap();
        let (first, second) = tokio::join!(b.resolve(&cid), b.resolve(&cid));
        assert_eq!(first.unwrap().as_ref(), b"hello world");
        assert_eq!(second.unwrap().as_ref(), b"hello world");
        assert!(!b.has_local(&cid));
    }

    #[tokio::test]
    async fn missing_everywhere_is_not_found() {
        let (a, _b) = connected_pair().await;
        let cid = *Block::raw(Bytes::from_static(b"nobody has this")).id();
        assert!(matches!(a.resolve(&cid).await, Err(NodeError::NotFound(_))));
    }

    #[tokio::test]
    async fn stopped_peer_is_forgotten() {
        let (a, b) = connected_pair().await;
        wait_for_peers(&b, 1).await;
        let cid = a.publish(Bytes::from_static(b"only on a")).unwrap();

        a.stop().await.unwrap();
        assert!(b.peers().is_empty());
        assert!(matches!(b.resolve(&cid).await, Err(NodeError::NotFound(_))));
    }

    #[tokio::test]
    async fn fetch_from_stopped_peer_is_link_error() {
        let (a, b) = connected_pair().await;
        let cid = b.publish(Bytes::from_static(b"on b")).unwrap();
        let link = a.links.snapshot().remove(0);

        b.stop().await.unwrap();
        let err = link.fetch(&cid).await.unwrap_err();
        assert!(matches!(err, NodeError::LinkError(_)), "{err:?}");
    }

    // -----------------------------------------------------------------------
    // Connect / dial
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn connect_is_bidirectional_and_idempotent() {
        let (a, b) = connected_pair().await;
        wait_for_peers(&b, 1).await;

        PeerLink::connect(&a, &b).await.unwrap();
        PeerLink::connect(&b, &a).await.unwrap();

        assert_eq!(a.peers(), vec![b.id().unwrap()]);
        assert_eq!(b.peers(), vec![a.id().unwrap()]);

        let link = a.links.snapshot().remove(0);
        assert_eq!(link.remote_addr().port(), b.listen_addrs()[0].port());
        assert_eq!(link.remote_addr().peer(), b.id().as_ref());
    }

    #[tokio::test]
    async fn connect_requires_running_nodes() {
        let net = network();
        let a = node("node1", &net);
        let b = node("node2", &net);
        a.start().unwrap();
        let err = PeerLink::connect(&a, &b).await.unwrap_err();
        assert!(matches!(err, NodeError::ConnectionError(_)));
    }

    #[tokio::test]
    async fn dial_self_is_rejected() {
        let net = network();
        let a = node("node1", &net);
        a.start().unwrap();
        let own = a.listen_addrs().remove(0);
        assert!(matches!(a.dial(&own).await, Err(NodeError::ConnectionError(_))));
    }

    #[tokio::test]
    async fn dial_unknown_address_fails() {
        let net = network();
        let a = node("node1", &net);
        a.start().unwrap();
        let nowhere: PeerAddress = "/memory/999".parse().unwrap();
        assert!(matches!(a.dial(&nowhere).await, Err(NodeError::ConnectionError(_))));
    }

    #[tokio::test]
    async fn dial_stopped_node_fails() {
        let net = network();
        let a = node("node1", &net);
        let b = node("node2", &net);
        a.start().unwrap();
        b.start().unwrap();
        let addr = b.listen_addrs().remove(0);
        b.stop().await.unwrap();
        assert!(matches!(a.dial(&addr).await, Err(NodeError::ConnectionError(_))));
    }

    #[tokio::test]
    async fn info_reports_running_node() {
        let (a, b) = connected_pair().await;
        a.publish(Bytes::from_static(b"12345")).unwrap();
        let info = a.info();
        assert_eq!(info.label, "node1");
        assert_eq!(info.status, NodeState::Running);
        assert_eq!(info.id, a.id());
        assert_eq!(info.peers, vec![b.id().unwrap()]);
        assert_eq!(info.blocks, 1);
        assert_eq!(info.bytes, 5);
        assert!(info.started_at.is_some());
        assert!(info.addresses[0].starts_with("/memory/"));

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["status"], "running");
    }
}
