use std::sync::Arc;

use tandem_fs::{FileSystem, FsResult};
use tandem_node::{MemoryNetwork, NodeError, NodeResult, NodeState, PeerLink, PeerNode};
use tandem_types::{ContentId, PeerId};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::ServerConfig;

/// Everything the gateway's handlers share: the two nodes, a filesystem on
/// each, and the current version of the upload directory.
///
/// Node 1 takes writes. Node 2 serves reads, fetching through its link to
/// node 1.
pub struct GatewayContext {
    writer: Arc<PeerNode>,
    reader: Arc<PeerNode>,
    writer_fs: FileSystem,
    reader_fs: FileSystem,
    upload_dir: String,
    upload_root: Mutex<Option<ContentId>>,
    max_upload_bytes: usize,
}

impl GatewayContext {
    /// Build both nodes on a fresh network. Nodes are not started.
    pub fn new(config: &ServerConfig) -> Self {
        let network = Arc::new(MemoryNetwork::new());
        let node = |label: &str| {
            Arc::new(PeerNode::new(
                label,
                config.node.clone(),
                Arc::clone(&network),
            ))
        };
        let writer = node("node1");
        let reader = node("node2");
        Self {
            writer_fs: FileSystem::with_config(Arc::clone(&writer), config.fs.clone()),
            reader_fs: FileSystem::with_config(Arc::clone(&reader), config.fs.clone()),
            writer,
            reader,
            upload_dir: config.upload_dir.clone(),
            upload_root: Mutex::new(None),
            max_upload_bytes: config.max_upload_bytes,
        }
    }

    pub fn writer(&self) -> &Arc<PeerNode> {
        &self.writer
    }

    pub fn reader(&self) -> &Arc<PeerNode> {
        &self.reader
    }

    pub fn writer_fs(&self) -> &FileSystem {
        &self.writer_fs
    }

    pub fn reader_fs(&self) -> &FileSystem {
        &self.reader_fs
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Start both nodes. Already running nodes keep their identity.
    pub fn start_nodes(&self) -> NodeResult<[(PeerId, NodeState); 2]> {
        let first = self.writer.start()?;
        let second = self.reader.start()?;
        Ok([
            (first, self.writer.state()),
            (second, self.reader.state()),
        ])
    }

    /// Connect node 1 to node 2 and return node 2's identity. Fails with
    /// `ConnectionError` unless both nodes are running.
    pub async fn link_nodes(&self) -> NodeResult<PeerId> {
        PeerLink::connect(&self.writer, &self.reader).await?;
        let remote = self.reader.id().ok_or_else(|| {
            NodeError::ConnectionError(format!("{} stopped while linking", self.reader.label()))
        })?;
        info!(from = %self.writer.label(), to = %remote, "nodes linked");
        Ok(remote)
    }

    /// Link `file` into the upload directory under `name` and return the new
    /// directory identifier. The directory is created on first use.
    pub async fn add_upload(&self, name: &str, file: &ContentId) -> FsResult<ContentId> {
        let mut root = self.upload_root.lock().await;
        let current = match *root {
            Some(cid) => cid,
            None => self.writer_fs.add_directory(&self.upload_dir)?,
        };
        let updated = self.writer_fs.link(&current, name, file).await?;
        *root = Some(updated);
        Ok(updated)
    }

    /// The upload directory's current identifier, if anything was uploaded.
    pub async fn upload_root(&self) -> Option<ContentId> {
        *self.upload_root.lock().await
    }

    /// Stop whichever nodes are running.
    pub async fn shutdown(&self) {
        for node in [&self.writer, &self.reader] {
            if node.state() != NodeState::Running {
                continue;
            }
            if let Err(e) = node.stop().await {
                warn!(node = %node.label(), error = %e, "node did not stop cleanly");
            }
        }
    }
}
