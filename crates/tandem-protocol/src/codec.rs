use crate::error::{ProtocolError, ProtocolResult};
use crate::message::{LinkMessage, MAX_MESSAGE_SIZE};

/// Length prefix plus message tag.
const HEADER_LEN: usize = 5;

/// Frames link messages as `[u32 BE length][tag][bincode payload]`, where
/// the length counts the tag and payload.
pub struct LinkCodec;

impl LinkCodec {
    pub fn encode(msg: &LinkMessage) -> ProtocolResult<Vec<u8>> {
        let payload =
            bincode::serialize(msg).map_err(|e| ProtocolError::Serialization(e.to_string()))?;
        check_size(payload.len())?;
        let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
        frame.extend_from_slice(&(payload.len() as u32 + 1).to_be_bytes());
        frame.push(msg.type_tag());
        frame.extend_from_slice(&payload);
        Ok(frame)
    }

    /// Decode the first frame in `data`, returning the message and the
    /// number of bytes it occupied.
    pub fn decode(data: &[u8]) -> ProtocolResult<(LinkMessage, usize)> {
        let (tag, payload) = split_frame(data)?;
        let msg: LinkMessage = bincode::deserialize(payload)
            .map_err(|e| ProtocolError::Deserialization(e.to_string()))?;
        if msg.type_tag() != tag {
            return Err(ProtocolError::InvalidMessageType(tag));
        }
        Ok((msg, HEADER_LEN + payload.len()))
    }

    /// Decode a buffer that must hold exactly one frame.
    pub fn decode_exact(data: &[u8]) -> ProtocolResult<LinkMessage> {
        let (msg, consumed) = Self::decode(data)?;
        let trailing = data.len() - consumed;
        if trailing > 0 {
            tracing::debug!(consumed, trailing, "trailing bytes after link frame");
            return Err(ProtocolError::FramingError(format!("{trailing} trailing bytes")));
        }
        Ok(msg)
    }
}

fn check_size(payload: usize) -> ProtocolResult<()> {
    if payload > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: payload,
            max: MAX_MESSAGE_SIZE,
        });
    }
    Ok(())
}

/// The tag byte and payload slice of the frame at the start of `data`.
fn split_frame(data: &[u8]) -> ProtocolResult<(u8, &[u8])> {
    let Some((prefix, rest)) = data.split_first_chunk::<4>() else {
        return Err(ProtocolError::FramingError("too short".into()));
    };
    let body_len = u32::from_be_bytes(*prefix) as usize;
    let Some(payload_len) = body_len.checked_sub(1) else {
        return Err(ProtocolError::FramingError("zero-length frame".into()));
    };
    check_size(payload_len)?;
    if rest.len() < body_len {
        return Err(ProtocolError::FramingError(format!(
            "incomplete: have {}, need {}",
            data.len(),
            HEADER_LEN - 1 + body_len
        )));
    }
    Ok((rest[0], &rest[1..body_len]))
}
