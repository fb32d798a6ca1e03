use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tandem_node::PeerNode;
use tandem_store::{Block, ChunkRef, FsKind, FsNode};
use tandem_types::{Codec, ContentId};
use tracing::debug;

use crate::cat::Cat;
use crate::error::{FsError, FsResult};
use crate::path::{split_path, validate_name};

/// Content up to this many bytes is stored as one raw block.
pub const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsConfig {
    pub chunk_size: usize,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// One entry of a directory listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub cid: ContentId,
}

/// Shape and size of a file or directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsStat {
    pub cid: ContentId,
    pub kind: FsKind,
    /// File length in bytes, or the number of entries of a directory.
    pub size: u64,
    /// Blocks making up the node, including the node's own block.
    pub blocks: usize,
}

/// Files and directories on top of one [`PeerNode`].
///
/// Writes go to the node's local store. Reads go through
/// [`PeerNode::resolve_block`], so anything a linked peer holds is readable
/// too. Directories are immutable: every change yields a new identifier and
/// leaves the old directory intact.
#[derive(Clone, Debug)]
pub struct FileSystem {
    node: Arc<PeerNode>,
    config: FsConfig,
}

impl FileSystem {
    pub fn new(node: Arc<PeerNode>) -> Self {
        Self::with_config(node, FsConfig::default())
    }

    pub fn with_config(node: Arc<PeerNode>, config: FsConfig) -> Self {
        Self { node, config }
    }

    pub fn node(&self) -> &Arc<PeerNode> {
        &self.node
    }

    // ---------------------------------------------------------------
    // Writing
    // ---------------------------------------------------------------

    /// Create an empty directory. The name only has to be valid; all empty
    /// directories share one identifier.
    pub fn add_directory(&self, name: &str) -> FsResult<ContentId> {
        validate_name(name)?;
        let cid = self.store_directory(BTreeMap::new())?;
        debug!(node = %self.node.label(), name, cid = %cid, "directory created");
        Ok(cid)
    }

    /// Store file content under a validated path and return its identifier.
    /// The path is not recorded; link the result into a directory for that.
    pub fn add_file(&self, path: &str, data: impl Into<Bytes>) -> FsResult<ContentId> {
        split_path(path)?;
        let cid = self.add_bytes(data)?;
        debug!(node = %self.node.label(), path, cid = %cid, "file added");
        Ok(cid)
    }

    /// Store file content. Content larger than the chunk size is split into
    /// raw chunks described by a `File` node.
    pub fn add_bytes(&self, data: impl Into<Bytes>) -> FsResult<ContentId> {
        let data = data.into();
        let chunk_size = self.config.chunk_size.max(1);
        if data.len() <= chunk_size {
            return Ok(self.node.publish(data)?);
        }

        let mut chunks = Vec::with_capacity(data.len().div_ceil(chunk_size));
        let mut offset = 0;
        while offset < data.len() {
            let end = (offset + chunk_size).min(data.len());
            let cid = self.node.publish(data.slice(offset..end))?;
            chunks.push(ChunkRef {
                cid,
                size: (end - offset) as u64,
            });
            offset = end;
        }
        let manifest = FsNode::File {
            size: data.len() as u64,
            chunks,
        };
        Ok(self.node.publish_block(manifest.to_block()?)?)
    }

    /// A new directory equal to `dir` with `name` pointing at `child`.
    /// An existing entry of that name is replaced.
    pub async fn link(&self, dir: &ContentId, name: &str, child: &ContentId) -> FsResult<ContentId> {
        validate_name(name)?;
        let mut entries = self.load_directory(dir).await?;
        entries.insert(name.to_string(), *child);
        self.store_directory(entries)
    }

    /// A new directory equal to `dir` without `name`.
    pub async fn unlink(&self, dir: &ContentId, name: &str) -> FsResult<ContentId> {
        let mut entries = self.load_directory(dir).await?;
        if entries.remove(name).is_none() {
            return Err(FsError::NoSuchEntry {
                dir: *dir,
                name: name.to_string(),
            });
        }
        self.store_directory(entries)
    }

    /// Link `child` at a slash-separated path below `root`, creating missing
    /// intermediate directories. Returns the new root.
    pub async fn put_path(&self, root: &ContentId, path: &str, child: &ContentId) -> FsResult<ContentId> {
        let segments = split_path(path)?;
        let Some((last, parents)) = segments.split_last() else {
            return Err(FsError::InvalidName(path.to_string()));
        };

        let mut walked = Vec::with_capacity(parents.len());
        let mut current = *root;
        for name in parents {
            let entries = self.load_directory(&current).await?;
            let next = match entries.get(*name) {
                Some(cid) => *cid,
                None => self.store_directory(BTreeMap::new())?,
            };
            walked.push((entries, *name));
            current = next;
        }

        let mut cid = self.link(&current, last, child).await?;
        while let Some((mut entries, name)) = walked.pop() {
            entries.insert(name.to_string(), cid);
            cid = self.store_directory(entries)?;
        }
        Ok(cid)
    }

    // ---------------------------------------------------------------
    // Reading
    // ---------------------------------------------------------------

    /// Entries of a directory, sorted by name.
    pub async fn ls(&self, dir: &ContentId) -> FsResult<Vec<DirEntry>> {
        let entries = self.load_directory(dir).await?;
        Ok(entries
            .into_iter()
            .map(|(name, cid)| DirEntry { name, cid })
            .collect())
    }

    pub async fn stat(&self, cid: &ContentId) -> FsResult<FsStat> {
        let block = self.node.resolve_block(cid).await?;
        let stat = match node_of(&block)? {
            None => FsStat {
                cid: *cid,
                kind: FsKind::File,
                size: block.len() as u64,
                blocks: 1,
            },
            Some(FsNode::File { size, chunks }) => FsStat {
                cid: *cid,
                kind: FsKind::File,
                size,
                blocks: chunks.len() + 1,
            },
            Some(FsNode::Directory { entries }) => FsStat {
                cid: *cid,
                kind: FsKind::Directory,
                size: entries.len() as u64,
                blocks: 1,
            },
        };
        Ok(stat)
    }

    /// A lazy reader for the file at `cid`. Fails with `NotAFile` when the
    /// stream reaches a directory.
    pub fn cat(&self, cid: &ContentId) -> Cat {
        Cat::new(Arc::clone(&self.node), *cid)
    }

    async fn load_directory(&self, dir: &ContentId) -> FsResult<BTreeMap<String, ContentId>> {
        let block = self.node.resolve_block(dir).await?;
        match node_of(&block)? {
            Some(FsNode::Directory { entries }) => Ok(entries),
            _ => Err(FsError::NotADirectory(*dir)),
        }
    }

    fn store_directory(&self, entries: BTreeMap<String, ContentId>) -> FsResult<ContentId> {
        let block = FsNode::Directory { entries }.to_block()?;
        Ok(self.node.publish_block(block)?)
    }
}

/// The decoded node of a dag-json block; `None` for raw file content.
fn node_of(block: &Block) -> FsResult<Option<FsNode>> {
    match block.codec() {
        Codec::Raw => Ok(None),
        Codec::DagJson => Ok(Some(FsNode::from_block(block)?)),
    }
}
