use std::collections::HashMap;
use std::sync::RwLock;

use bytes::Bytes;
use tandem_types::ContentId;

use crate::block::Block;
use crate::error::{StoreError, StoreResult};
use crate::traits::BlockStore;

/// In-memory, HashMap-based block store.
///
/// Blocks are held behind a `RwLock`; `Bytes` makes reads a refcount bump
/// rather than a copy.
pub struct InMemoryBlockStore {
    blocks: RwLock<HashMap<ContentId, Bytes>>,
}

impl InMemoryBlockStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            blocks: RwLock::new(HashMap::new()),
        }
    }

    /// Number of blocks currently stored.
    pub fn len(&self) -> usize {
        self.blocks.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.blocks.read().expect("lock poisoned").is_empty()
    }

    /// Total bytes across all stored blocks.
    pub fn total_bytes(&self) -> u64 {
        self.blocks
            .read()
            .expect("lock poisoned")
            .values()
            .map(|data| data.len() as u64)
            .sum()
    }

    /// Remove all blocks from the store.
    pub fn clear(&self) {
        self.blocks.write().expect("lock poisoned").clear();
    }

    /// Sorted list of all identifiers in the store.
    pub fn all_ids(&self) -> Vec<ContentId> {
        let map = self.blocks.read().expect("lock poisoned");
        let mut ids: Vec<ContentId> = map.keys().copied().collect();
        ids.sort();
        ids
    }
}

impl Default for InMemoryBlockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockStore for InMemoryBlockStore {
    fn put_block(&self, block: Block) -> StoreResult<ContentId> {
        let id = *block.id();
        let mut map = self.blocks.write().expect("lock poisoned");
        map.entry(id).or_insert_with(|| block.into_data());
        tracing::trace!(cid = %id, "block stored");
        Ok(id)
    }

    fn get(&self, id: &ContentId) -> StoreResult<Bytes> {
        let map = self.blocks.read().expect("lock poisoned");
        map.get(id).cloned().ok_or(StoreError::NotFound(*id))
    }

    fn has(&self, id: &ContentId) -> bool {
        self.blocks.read().expect("lock poisoned").contains_key(id)
    }
}

impl std::fmt::Debug for InMemoryBlockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlockStore")
            .field("block_count", &self.len())
            .finish()
    }
}
