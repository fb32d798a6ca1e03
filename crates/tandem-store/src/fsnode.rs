use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tandem_crypto::ContentHasher;
use tandem_types::{Codec, ContentId};

use crate::block::Block;
use crate::error::{StoreError, StoreResult};

/// Reference to one chunk of a file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRef {
    pub cid: ContentId,
    pub size: u64,
}

/// Whether a node is a file or a directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FsKind {
    File,
    Directory,
}

impl std::fmt::Display for FsKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Directory => write!(f, "directory"),
        }
    }
}

/// A filesystem node stored as a `dag-json` block.
///
/// Nodes reference their children by identifier only, so a new version of a
/// directory shares every unchanged child with the old one. Files that fit
/// in one chunk are stored as a single `raw` block and have no `FsNode`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FsNode {
    /// A file split into ordered chunks.
    File { size: u64, chunks: Vec<ChunkRef> },
    /// A directory mapping entry names to child identifiers.
    ///
    /// `BTreeMap` keeps entries sorted so equal entry sets encode (and hash)
    /// identically.
    Directory { entries: BTreeMap<String, ContentId> },
}

impl FsNode {
    /// A directory with no entries.
    pub fn empty_directory() -> Self {
        Self::Directory {
            entries: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> FsKind {
        match self {
            Self::File { .. } => FsKind::File,
            Self::Directory { .. } => FsKind::Directory,
        }
    }

    /// Encode as a `dag-json` block.
    pub fn to_block(&self) -> StoreResult<Block> {
        let (id, data) = ContentHasher::DAG_JSON
            .hash_json(self)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Block::from_parts(id, data)
    }

    /// Decode from a `dag-json` block.
    pub fn from_block(block: &Block) -> StoreResult<Self> {
        if block.codec() != Codec::DagJson {
            return Err(StoreError::CorruptBlock {
                id: *block.id(),
                reason: format!("expected dag-json, got {}", block.codec()),
            });
        }
        serde_json::from_slice(block.data()).map_err(|e| StoreError::CorruptBlock {
            id: *block.id(),
            reason: e.to_string(),
        })
    }
}
