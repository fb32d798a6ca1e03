use tandem_types::{Codec, ContentId};

/// Codec-tagged BLAKE3 content hasher.
///
/// Each hasher carries the [`Codec`] that is recorded in the identifiers it
/// produces. The digest covers the block bytes only, so a raw block and a
/// dag-json block with identical bytes share a digest but never an
/// identifier.
pub struct ContentHasher {
    codec: Codec,
}

impl ContentHasher {
    /// Hasher for opaque bytes (file content and chunks).
    pub const RAW: Self = Self { codec: Codec::Raw };
    /// Hasher for JSON-encoded filesystem nodes.
    pub const DAG_JSON: Self = Self {
        codec: Codec::DagJson,
    };

    /// Hasher for an arbitrary codec.
    pub const fn for_codec(codec: Codec) -> Self {
        Self { codec }
    }

    /// Derive the identifier of `data`.
    pub fn hash(&self, data: &[u8]) -> ContentId {
        ContentId::from_digest(self.codec, Self::raw_hash(data))
    }

    /// Serialize a value as JSON and derive its identifier.
    ///
    /// Returns the identifier together with the encoded bytes so callers can
    /// store exactly what was hashed.
    pub fn hash_json<T: serde::Serialize>(
        &self,
        value: &T,
    ) -> Result<(ContentId, Vec<u8>), HasherError> {
        let data =
            serde_json::to_vec(value).map_err(|e| HasherError::Serialization(e.to_string()))?;
        Ok((self.hash(&data), data))
    }

    /// Verify that data produces the expected identifier under this codec.
    pub fn verify(&self, data: &[u8], expected: &ContentId) -> bool {
        self.hash(data) == *expected
    }

    /// Verify data against an identifier using the identifier's own codec.
    pub fn verify_block(id: &ContentId, data: &[u8]) -> bool {
        Self::for_codec(id.codec()).verify(data, id)
    }

    /// Plain BLAKE3 digest.
    pub fn raw_hash(data: &[u8]) -> [u8; 32] {
        *blake3::hash(data).as_bytes()
    }

    /// The codec recorded by this hasher.
    pub fn codec(&self) -> Codec {
        self.codec
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("serialization error: {0}")]
    Serialization(String),
}
