use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, State};
use axum::response::Json;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tandem_fs::{validate_name, DirEntry};
use tandem_node::{NodeError, NodeInfo, NodeState};
use tandem_protocol::HealthResponse;
use tandem_types::{ContentId, PeerId};
use tracing::{error, info};

use crate::context::GatewayContext;
use crate::error::{ServerError, ServerResult};

pub type AppState = Arc<GatewayContext>;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeStatus {
    pub id: PeerId,
    pub status: NodeState,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkStatus {
    pub remote_peer: PeerId,
    pub status: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContentResponse {
    /// The node that served the read.
    pub node: PeerId,
    pub content: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadedFile {
    pub filename: String,
    pub size: u64,
    pub data: ContentId,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub file: UploadedFile,
    pub directory: ContentId,
}

pub async fn root() -> &'static str {
    "Hello IPFS!"
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

pub async fn create_nodes(State(ctx): State<AppState>) -> ServerResult<Json<Vec<NodeStatus>>> {
    let statuses = ctx
        .start_nodes()?
        .into_iter()
        .map(|(id, status)| NodeStatus { id, status })
        .collect();
    Ok(Json(statuses))
}

pub async fn map_nodes(State(ctx): State<AppState>) -> ServerResult<Json<LinkStatus>> {
    let remote_peer = ctx.link_nodes().await?;
    Ok(Json(LinkStatus {
        remote_peer,
        status: "open".into(),
    }))
}

/// Publish `{"content": "<text>"}` through node 1; responds with the CID.
pub async fn add_content(
    State(ctx): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ServerResult<String> {
    let Json(body) = body.map_err(|e| ServerError::Validation(e.body_text()))?;
    let content = match body.get("content") {
        Some(Value::String(s)) => s.clone(),
        Some(_) => return Err(ServerError::Validation("content must be a string".into())),
        None => return Err(ServerError::Validation("missing field: content".into())),
    };
    let cid = ctx.writer_fs().add_bytes(content)?;
    info!(cid = %cid, "content added");
    Ok(cid.to_string())
}

/// Read a file or text through node 2, which fetches whatever it lacks
/// from node 1. Serves both `/api/content/:cid` and `/api/file/:cid`.
pub async fn get_content(
    State(ctx): State<AppState>,
    Path(cid): Path<String>,
) -> ServerResult<Json<ContentResponse>> {
    let cid: ContentId = cid.parse()?;
    let reader = ctx.reader();
    let node = reader.id().ok_or_else(|| NodeError::InvalidState {
        node: reader.label().to_string(),
        state: reader.state(),
        op: "resolve",
    })?;
    let data = ctx.reader_fs().cat(&cid).read_to_end().await?;
    Ok(Json(ContentResponse {
        node,
        content: String::from_utf8_lossy(&data).into_owned(),
    }))
}

/// Store the multipart field `file` through node 1 and link it into the
/// upload directory.
pub async fn upload(
    State(ctx): State<AppState>,
    mut multipart: Multipart,
) -> ServerResult<Json<UploadResponse>> {
    let (filename, data) = read_file_field(&mut multipart).await?;
    validate_name(&filename)?;
    let size = data.len() as u64;
    let file = ctx.writer_fs().add_file(&filename, data)?;

    let directory = ctx.add_upload(&filename, &file).await.map_err(|e| {
        error!(filename = %filename, cid = %file, error = %e, "linking upload into directory failed");
        e
    })?;
    info!(filename = %filename, size, cid = %file, directory = %directory, "file uploaded");

    Ok(Json(UploadResponse {
        message: "File uploaded successfully".into(),
        file: UploadedFile {
            filename,
            size,
            data: file,
        },
        directory,
    }))
}

async fn read_file_field(multipart: &mut Multipart) -> ServerResult<(String, Bytes)> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .filter(|name| !name.is_empty())
            .unwrap_or("upload")
            .to_string();
        let data = field.bytes().await?;
        return Ok((filename, data));
    }
    Err(ServerError::Validation("missing multipart field: file".into()))
}

pub async fn nodes(State(ctx): State<AppState>) -> Json<Vec<NodeInfo>> {
    Json(vec![ctx.writer().info(), ctx.reader().info()])
}

/// List a directory through node 2.
pub async fn ls(
    State(ctx): State<AppState>,
    Path(cid): Path<String>,
) -> ServerResult<Json<Vec<DirEntry>>> {
    let cid: ContentId = cid.parse()?;
    Ok(Json(ctx.reader_fs().ls(&cid).await?))
}
