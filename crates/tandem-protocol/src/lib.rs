//! Wire protocol for Tandem.
//!
//! Defines the framing and message types exchanged over a peer link while
//! handshaking and fetching blocks, plus the HTTP paths served by the
//! gateway.

pub mod codec;
pub mod endpoint;
pub mod error;
pub mod message;

pub use codec::LinkCodec;
pub use endpoint::{endpoints, HealthResponse};
pub use error::{ProtocolError, ProtocolResult};
pub use message::{capabilities, LinkMessage, PeerHello, MAX_MESSAGE_SIZE, PROTOCOL_VERSION};
