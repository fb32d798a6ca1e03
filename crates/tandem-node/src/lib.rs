//! Peer nodes for Tandem.
//!
//! A [`PeerNode`] owns a block store and a set of [`PeerLink`]s to other
//! nodes. Nodes of one process find each other on a [`MemoryNetwork`]: a
//! started node listens at a `/memory/<port>/p2p/<peer>` address and answers
//! framed [`LinkMessage`](tandem_protocol::LinkMessage) requests from a
//! background task.
//!
//! # Lifecycle
//!
//! `Uninitialized -> Running -> Stopped`. Publishing, resolving and
//! connecting need a running node; a stopped node cannot be restarted.
//!
//! # Resolution
//!
//! `resolve` checks the local store first, then asks linked peers in the
//! order the links were opened. Blocks coming off a link are verified
//! against the requested identifier before they are returned.

pub mod config;
pub mod error;
pub mod link;
pub mod network;
pub mod node;
mod service;
pub mod transport;

pub use config::NodeConfig;
pub use error::{NodeError, NodeResult};
pub use link::PeerLink;
pub use network::{MemoryNetwork, PeerAddress};
pub use node::{NodeInfo, NodeState, PeerNode};
pub use transport::{fetch_from_any, BlockTransport};
