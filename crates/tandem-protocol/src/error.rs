use thiserror::Error;

/// Failures encoding, decoding or negotiating link frames.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unknown link message tag: {0}")]
    InvalidMessageType(u8),

    #[error("link frame of {size} bytes exceeds limit of {max}")]
    MessageTooLarge { size: usize, max: usize },

    #[error("malformed link frame: {0}")]
    FramingError(String),

    #[error("peer speaks link protocol v{remote}, this node speaks v{local}")]
    VersionMismatch { local: u32, remote: u32 },

    #[error("encoding link message: {0}")]
    Serialization(String),

    #[error("decoding link message: {0}")]
    Deserialization(String),

    /// A well-formed message arrived where the exchange does not allow it.
    #[error("unexpected {0} message")]
    Unexpected(&'static str),
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_problem() {
        let err = ProtocolError::VersionMismatch { local: 1, remote: 2 };
        assert_eq!(err.to_string(), "peer speaks link protocol v2, this node speaks v1");
        assert_eq!(ProtocolError::Unexpected("Goodbye").to_string(), "unexpected Goodbye message");
    }
}
