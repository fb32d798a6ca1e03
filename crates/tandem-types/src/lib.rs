//! Foundation types for Tandem.
//!
//! Every other Tandem crate depends on `tandem-types`.
//!
//! # Key Types
//!
//! - [`ContentId`] — CIDv1 naming a block by the BLAKE3 digest of its bytes
//! - [`Codec`] — how a block's bytes are encoded (`raw` or `dag-json`)
//! - [`PeerId`] — stable identity of a running peer node

pub mod content;
pub mod error;
pub mod identity;

pub use content::{Codec, ContentId, BLAKE3_MULTIHASH_CODE};
pub use error::TypeError;
pub use identity::{IdentityMaterial, PeerId};
