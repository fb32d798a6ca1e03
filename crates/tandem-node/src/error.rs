use tandem_protocol::ProtocolError;
use tandem_store::StoreError;
use tandem_types::ContentId;
use thiserror::Error;

use crate::node::NodeState;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("block not found: {0}")]
    NotFound(ContentId),

    #[error("node {node} is {state}, cannot {op}")]
    InvalidState {
        node: String,
        state: NodeState,
        op: &'static str,
    },

    #[error("connection error: {0}")]
    ConnectionError(String),

    #[error("link error: {0}")]
    LinkError(String),

    #[error("node {0} must be started inside a Tokio runtime")]
    NoRuntime(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("store error: {0}")]
    Store(StoreError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl From<StoreError> for NodeError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(id),
            other => Self::Store(other),
        }
    }
}

pub type NodeResult<T> = Result<T, NodeError>;
