//! HTTP gateway for Tandem.
//!
//! Runs two peer nodes in one process and exposes them over a small REST
//! API: content is written through node 1 and read back through node 2,
//! which fetches it over its link to node 1.

pub mod config;
pub mod context;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use context::GatewayContext;
pub use error::{ServerError, ServerResult};
pub use router::build_router;
pub use server::{shutdown_signal, Gateway};
