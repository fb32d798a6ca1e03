use bytes::Bytes;
use tandem_types::ContentId;

use crate::block::Block;
use crate::error::StoreResult;

/// Content-addressed block store.
///
/// All implementations must satisfy these invariants:
/// - Blocks are immutable once written: the same bytes always produce the
///   same identifier, so a second write of a block is a no-op.
/// - Zero-length data is a valid, addressable block.
/// - Concurrent reads are always safe.
/// - The store never interprets block contents.
pub trait BlockStore: Send + Sync {
    /// Store a block. Idempotent.
    fn put_block(&self, block: Block) -> StoreResult<ContentId>;

    /// Read a block's bytes. Fails with `NotFound` when absent.
    fn get(&self, id: &ContentId) -> StoreResult<Bytes>;

    /// Whether a block is present. No side effects.
    fn has(&self, id: &ContentId) -> bool;

    /// Hash `data` as a `raw` block, store it if absent, return its id.
    fn put(&self, data: Bytes) -> StoreResult<ContentId> {
        self.put_block(Block::raw(data))
    }

    /// Read a block back as a verified [`Block`].
    fn get_block(&self, id: &ContentId) -> StoreResult<Block> {
        let data = self.get(id)?;
        Block::from_parts(*id, data)
    }
}
