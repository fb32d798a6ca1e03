//! Content-addressed block storage for Tandem.
//!
//! Every piece of data a node holds (file content, file chunks, file
//! manifests, directories) is an immutable [`Block`] keyed by its
//! [`ContentId`](tandem_types::ContentId).
//!
//! # Block Shapes
//!
//! - `raw` blocks -- opaque bytes (whole small files, chunks of large ones)
//! - `dag-json` blocks -- an encoded [`FsNode`] (file manifest or directory)
//!
//! # Storage Backends
//!
//! All backends implement the [`BlockStore`] trait:
//!
//! - [`InMemoryBlockStore`] -- `HashMap`-based store; the only backend, since
//!   nodes keep no state across restarts
//!
//! # Design Rules
//!
//! 1. Blocks are immutable once written (content-addressing guarantees this).
//! 2. A [`Block`] always carries an identifier that matches its bytes.
//! 3. Writes are idempotent; concurrent writes of identical bytes are safe.
//! 4. The store never interprets block contents.
//! 5. Nothing is ever deleted except by clearing a stopped node's store.

pub mod block;
pub mod error;
pub mod fsnode;
pub mod memory;
pub mod traits;

pub use block::Block;
pub use error::{StoreError, StoreResult};
pub use fsnode::{ChunkRef, FsKind, FsNode};
pub use memory::InMemoryBlockStore;
pub use traits::BlockStore;
