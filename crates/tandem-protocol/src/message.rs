use serde::{Deserialize, Serialize};
use tandem_types::{ContentId, PeerId};

use crate::error::{ProtocolError, ProtocolResult};

pub const PROTOCOL_VERSION: u32 = 1;
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

/// All message types exchanged over a peer link.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkMessage {
    Hello {
        version: u32,
        peer: PeerId,
        listen_addr: String,
        capabilities: Vec<String>,
    },
    HelloAck { version: u32, peer: PeerId, capabilities: Vec<String> },
    WantBlock { cid: ContentId },
    Block { cid: ContentId, data: Vec<u8> },
    DontHave { cid: ContentId },
    Goodbye { peer: PeerId },
    Error { code: u32, message: String },
}

/// What a dialing peer announced in its `Hello`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeerHello {
    pub peer: PeerId,
    /// Where the dialer listens, so the remote can open the reverse link.
    pub listen_addr: String,
    pub capabilities: Vec<String>,
}

impl LinkMessage {
    /// A `Hello` for this protocol version.
    pub fn hello(peer: PeerId, listen_addr: impl Into<String>) -> Self {
        Self::Hello {
            version: PROTOCOL_VERSION,
            peer,
            listen_addr: listen_addr.into(),
            capabilities: capabilities::all(),
        }
    }

    /// The `HelloAck` answering a `Hello`, or an error if versions differ.
    pub fn accept_hello(&self, local: PeerId) -> ProtocolResult<(PeerHello, Self)> {
        match self {
            Self::Hello {
                version,
                peer,
                listen_addr,
                capabilities,
            } => {
                if *version != PROTOCOL_VERSION {
                    return Err(ProtocolError::VersionMismatch {
                        local: PROTOCOL_VERSION,
                        remote: *version,
                    });
                }
                let ack = Self::HelloAck {
                    version: PROTOCOL_VERSION,
                    peer: local,
                    capabilities: capabilities::all(),
                };
                let hello = PeerHello {
                    peer: peer.clone(),
                    listen_addr: listen_addr.clone(),
                    capabilities: capabilities.clone(),
                };
                Ok((hello, ack))
            }
            other => Err(ProtocolError::Unexpected(other.type_name())),
        }
    }

    pub fn type_tag(&self) -> u8 {
        match self {
            Self::Hello { .. } => 1,
            Self::HelloAck { .. } => 2,
            Self::WantBlock { .. } => 3,
            Self::Block { .. } => 4,
            Self::DontHave { .. } => 5,
            Self::Goodbye { .. } => 6,
            Self::Error { .. } => 255,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Hello { .. } => "Hello",
            Self::HelloAck { .. } => "HelloAck",
            Self::WantBlock { .. } => "WantBlock",
            Self::Block { .. } => "Block",
            Self::DontHave { .. } => "DontHave",
            Self::Goodbye { .. } => "Goodbye",
            Self::Error { .. } => "Error",
        }
    }
}

pub mod capabilities {
    pub const BLOCK_V1: &str = "block-v1";
    pub const RAW_CODEC: &str = "codec-raw";
    pub const DAG_JSON_CODEC: &str = "codec-dag-json";

    pub fn all() -> Vec<String> {
        vec![BLOCK_V1.into(), RAW_CODEC.into(), DAG_JSON_CODEC.into()]
    }
}
