use std::fmt;
use std::str::FromStr;

use cid::multihash::Multihash;
use cid::Cid;
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Multihash code for BLAKE3-256.
pub const BLAKE3_MULTIHASH_CODE: u64 = 0x1e;

/// Encoding of a block's bytes, recorded in its identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Codec {
    /// Opaque bytes: file content and file chunks.
    Raw,
    /// JSON-encoded filesystem node (file manifest or directory).
    DagJson,
}

impl Codec {
    /// Multicodec table code.
    pub const fn code(&self) -> u64 {
        match self {
            Self::Raw => 0x55,
            Self::DagJson => 0x0129,
        }
    }

    /// Look up a codec by its multicodec code.
    pub fn from_code(code: u64) -> Result<Self, TypeError> {
        match code {
            0x55 => Ok(Self::Raw),
            0x0129 => Ok(Self::DagJson),
            other => Err(TypeError::UnsupportedCodec(other)),
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw => write!(f, "raw"),
            Self::DagJson => write!(f, "dag-json"),
        }
    }
}

/// Content-addressed identifier for a stored block.
///
/// A `ContentId` is a CIDv1 carrying the BLAKE3 digest of the block's bytes
/// and the [`Codec`] the bytes are encoded with. Identical bytes under the
/// same codec always produce the same `ContentId`. The textual form is the
/// CID's base32 multibase string (`bafk...` / `bagu...`).
///
/// Derivation from bytes lives in `tandem-crypto`; this type only carries,
/// parses and prints identifiers.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ContentId(Cid);

impl ContentId {
    /// Build an identifier from a codec and a BLAKE3 digest.
    pub fn from_digest(codec: Codec, digest: [u8; 32]) -> Self {
        let hash = Multihash::<64>::wrap(BLAKE3_MULTIHASH_CODE, &digest)
            .expect("a 32-byte digest always fits a 64-byte multihash");
        Self(Cid::new_v1(codec.code(), hash))
    }

    /// The codec the block is encoded with.
    pub fn codec(&self) -> Codec {
        // Construction and parsing both reject unknown codecs.
        Codec::from_code(self.0.codec()).unwrap_or(Codec::Raw)
    }

    /// The 32-byte BLAKE3 digest.
    pub fn digest(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(self.0.hash().digest());
        out
    }

    /// Binary CID encoding.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes()
    }

    /// Parse the binary CID encoding.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypeError> {
        let cid = Cid::try_from(bytes).map_err(|e| TypeError::InvalidCid(e.to_string()))?;
        Self::from_cid(cid)
    }

    /// The last 8 characters of the textual form, for logs.
    pub fn short(&self) -> String {
        let s = self.0.to_string();
        s[s.len().saturating_sub(8)..].to_string()
    }

    fn from_cid(cid: Cid) -> Result<Self, TypeError> {
        let hash = cid.hash();
        if hash.code() != BLAKE3_MULTIHASH_CODE {
            return Err(TypeError::UnsupportedHash(hash.code()));
        }
        if hash.digest().len() != 32 {
            return Err(TypeError::InvalidLength {
                expected: 32,
                actual: hash.digest().len(),
            });
        }
        Codec::from_code(cid.codec())?;
        Ok(Self(cid))
    }
}

impl FromStr for ContentId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cid = Cid::try_from(s.trim()).map_err(|e| TypeError::InvalidCid(e.to_string()))?;
        Self::from_cid(cid)
    }
}

impl TryFrom<String> for ContentId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ContentId> for String {
    fn from(id: ContentId) -> Self {
        id.to_string()
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({}..{})", self.codec(), self.short())
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn digest_of(data: &[u8]) -> [u8; 32] {
        *blake3::hash(data).as_bytes()
    }

    #[test]
    fn same_digest_same_id() {
        let a = ContentId::from_digest(Codec::Raw, digest_of(b"hello world"));
        let b = ContentId::from_digest(Codec::Raw, digest_of(b"hello world"));
        assert_eq!(a, b);
    }

    #[test]
    fn codec_is_part_of_identity() {
        let d = digest_of(b"same bytes");
        let raw = ContentId::from_digest(Codec::Raw, d);
        let json = ContentId::from_digest(Codec::DagJson, d);
        assert_ne!(raw, json);
        assert_eq!(raw.digest(), json.digest());
        assert_eq!(raw.codec(), Codec::Raw);
        assert_eq!(json.codec(), Codec::DagJson);
    }

    #[test]
    fn text_form_is_base32_multibase() {
        let id = ContentId::from_digest(Codec::Raw, digest_of(b"x"));
        let text = id.to_string();
        assert!(text.starts_with('b'));
        assert!(text.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = "not-a-cid".parse::<ContentId>().unwrap_err();
        assert!(matches!(err, TypeError::InvalidCid(_)));
    }

    #[test]
    fn parse_rejects_sha256_cids() {
        // CIDv0 for the empty unixfs directory, sha2-256 multihash.
        let err = "QmUNLLsPACCz1vLxQVkXqqLX5R1X345qqfHbsf67hvA3Nn"
            .parse::<ContentId>()
            .unwrap_err();
        assert_eq!(err, TypeError::UnsupportedHash(0x12));
    }

    #[test]
    fn binary_roundtrip() {
        let id = ContentId::from_digest(Codec::DagJson, digest_of(b"node"));
        let parsed = ContentId::from_bytes(&id.to_bytes()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn serde_uses_text_form() {
        let id = ContentId::from_digest(Codec::Raw, digest_of(b"serde"));
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
        let parsed: ContentId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn short_is_suffix() {
        let id = ContentId::from_digest(Codec::Raw, digest_of(b"short"));
        assert_eq!(id.short().len(), 8);
        assert!(id.to_string().ends_with(&id.short()));
    }

    #[test]
    fn codec_codes_roundtrip() {
        for codec in [Codec::Raw, Codec::DagJson] {
            assert_eq!(Codec::from_code(codec.code()).unwrap(), codec);
        }
        assert_eq!(Codec::from_code(0x70), Err(TypeError::UnsupportedCodec(0x70)));
    }

    proptest! {
        #[test]
        fn text_form_parses_back(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
            let id = ContentId::from_digest(Codec::Raw, digest_of(&bytes));
            let parsed: ContentId = id.to_string().parse().unwrap();
            prop_assert_eq!(id, parsed);
        }
    }
}
