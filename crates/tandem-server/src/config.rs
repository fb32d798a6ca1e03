use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tandem_fs::FsConfig;
use tandem_node::NodeConfig;

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Largest accepted upload request body.
    pub max_upload_bytes: usize,
    /// Name of the directory uploads are linked into.
    pub upload_dir: String,
    pub node: NodeConfig,
    pub fs: FsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 9632)),
            max_upload_bytes: 16 * 1024 * 1024,
            upload_dir: "uploads".into(),
            node: NodeConfig::default(),
            fs: FsConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(s: &str) -> ServerResult<Self> {
        toml::from_str(s).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Replace the bind port with `port`, when given.
    pub fn with_port(mut self, port: Option<&str>) -> ServerResult<Self> {
        if let Some(port) = port {
            let port: u16 = port
                .trim()
                .parse()
                .map_err(|_| ServerError::Config(format!("invalid port {port:?}")))?;
            self.bind_addr.set_port(port);
        }
        Ok(self)
    }

    /// Apply the `PORT` environment variable.
    pub fn with_env(self) -> ServerResult<Self> {
        let port = std::env::var("PORT").ok();
        self.with_port(port.as_deref())
    }
}
