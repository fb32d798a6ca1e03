use bytes::Bytes;
use tandem_crypto::ContentHasher;
use tandem_types::{Codec, ContentId};

use crate::error::{StoreError, StoreResult};

/// An immutable unit of stored bytes, addressed by its content identifier.
///
/// The identifier always matches the data: blocks are either hashed on
/// construction ([`Block::new`]) or verified ([`Block::from_parts`]).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    id: ContentId,
    data: Bytes,
}

impl Block {
    /// Hash `data` under `codec` and wrap it as a block.
    pub fn new(codec: Codec, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let id = ContentHasher::for_codec(codec).hash(&data);
        Self { id, data }
    }

    /// A `raw` block.
    pub fn raw(data: impl Into<Bytes>) -> Self {
        Self::new(Codec::Raw, data)
    }

    /// Pair bytes received from elsewhere with the identifier they were
    /// requested under, rejecting bytes that do not hash to it.
    pub fn from_parts(id: ContentId, data: impl Into<Bytes>) -> StoreResult<Self> {
        let data = data.into();
        let computed = ContentHasher::for_codec(id.codec()).hash(&data);
        if computed != id {
            return Err(StoreError::HashMismatch { id, computed });
        }
        Ok(Self { id, data })
    }

    pub fn id(&self) -> &ContentId {
        &self.id
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn codec(&self) -> Codec {
        self.id.codec()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_data(self) -> Bytes {
        self.data
    }
}
