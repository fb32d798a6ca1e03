//! Filesystem facade for Tandem.
//!
//! [`FileSystem`] layers files and directories over a
//! [`PeerNode`](tandem_node::PeerNode):
//!
//! - files up to the chunk size are a single `raw` block; larger files are
//!   `raw` chunks plus a `dag-json` `File` node listing them
//! - directories are `dag-json` `Directory` nodes mapping names to
//!   identifiers; changing one yields a new identifier
//! - [`Cat`] streams a file chunk by chunk, fetching each chunk on demand

pub mod cat;
pub mod error;
pub mod filesystem;
pub mod path;

pub use cat::Cat;
pub use error::{FsError, FsResult};
pub use filesystem::{DirEntry, FileSystem, FsConfig, FsStat, DEFAULT_CHUNK_SIZE};
pub use path::{split_path, validate_name};
