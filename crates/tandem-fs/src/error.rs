use tandem_node::NodeError;
use tandem_store::StoreError;
use tandem_types::ContentId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("invalid name: {0:?}")]
    InvalidName(String),

    #[error("not a directory: {0}")]
    NotADirectory(ContentId),

    #[error("not a file: {0}")]
    NotAFile(ContentId),

    #[error("no entry {name:?} in {dir}")]
    NoSuchEntry { dir: ContentId, name: String },

    #[error("corrupt file {cid}: {reason}")]
    CorruptFile { cid: ContentId, reason: String },

    #[error(transparent)]
    Node(#[from] NodeError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type FsResult<T> = Result<T, FsError>;
