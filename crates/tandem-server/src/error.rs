use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tandem_fs::FsError;
use tandem_node::NodeError;
use tandem_types::TypeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("invalid content identifier: {0}")]
    InvalidCid(#[from] TypeError),

    #[error(transparent)]
    Node(#[from] NodeError),

    #[error(transparent)]
    Fs(#[from] FsError),

    #[error("multipart error: {0}")]
    Multipart(#[from] MultipartError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidCid(_) => StatusCode::BAD_REQUEST,
            Self::Node(e) => node_status(e),
            Self::Fs(e) => match e {
                FsError::InvalidName(_) => StatusCode::BAD_REQUEST,
                FsError::NoSuchEntry { .. } => StatusCode::NOT_FOUND,
                FsError::NotADirectory(_) | FsError::NotAFile(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                FsError::Node(e) => node_status(e),
                FsError::CorruptFile { .. } | FsError::Store(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Multipart(e) => e.status(),
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

fn node_status(err: &NodeError) -> StatusCode {
    match err {
        NodeError::NotFound(_) => StatusCode::NOT_FOUND,
        NodeError::InvalidState { .. } => StatusCode::CONFLICT,
        NodeError::InvalidAddress(_) => StatusCode::BAD_REQUEST,
        NodeError::ConnectionError(_) | NodeError::LinkError(_) | NodeError::Protocol(_) => {
            StatusCode::BAD_GATEWAY
        }
        NodeError::Store(_) | NodeError::NoRuntime(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use tandem_node::NodeState;
    use tandem_types::{Codec, ContentId};

    fn cid() -> ContentId {
        ContentId::from_digest(Codec::Raw, [1u8; 32])
    }

    #[test]
    fn status_mapping() {
        let cases = [
            (ServerError::Validation("x".into()), 400),
            (ServerError::InvalidCid(TypeError::InvalidCid("x".into())), 400),
            (ServerError::Node(NodeError::NotFound(cid())), 404),
            (
                ServerError::Node(NodeError::InvalidState {
                    node: "node1".into(),
                    state: NodeState::Stopped,
                    op: "resolve",
                }),
                409,
            ),
            (ServerError::Node(NodeError::ConnectionError("x".into())), 502),
            (ServerError::Node(NodeError::LinkError("x".into())), 502),
            (ServerError::Fs(FsError::InvalidName("..".into())), 400),
            (
                ServerError::Fs(FsError::NoSuchEntry {
                    dir: cid(),
                    name: "x".into(),
                }),
                404,
            ),
            (ServerError::Fs(FsError::NotADirectory(cid())), 422),
            (ServerError::Fs(FsError::NotAFile(cid())), 422),
            (ServerError::Fs(FsError::Node(NodeError::NotFound(cid()))), 404),
            (ServerError::Node(NodeError::NoRuntime("node1".into())), 500),
            (ServerError::Internal("x".into()), 500),
        ];
        for (err, expected) in cases {
            assert_eq!(err.status().as_u16(), expected, "{err}");
        }
    }

    #[test]
    fn response_carries_error_body() {
        let response = ServerError::Validation("content must be a string".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
