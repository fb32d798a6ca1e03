/// HTTP endpoint paths served by the gateway.
pub mod endpoints {
    pub const ROOT: &str = "/";
    pub const CREATE_NODES: &str = "/api/createnodes";
    pub const MAP_NODES: &str = "/api/mapnodes";
    pub const CONTENT: &str = "/api/content";
    pub const CONTENT_BY_CID: &str = "/api/content/:cid";
    pub const UPLOAD: &str = "/api/upload";
    pub const FILE_BY_CID: &str = "/api/file/:cid";
    pub const NODES: &str = "/api/nodes";
    pub const LS_BY_CID: &str = "/api/ls/:cid";
    pub const HEALTH: &str = "/api/health";
}

/// Health check response.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub protocol_version: u32,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            protocol_version: super::message::PROTOCOL_VERSION,
        }
    }
}
