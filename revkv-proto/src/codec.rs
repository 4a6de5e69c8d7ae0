//! Length-prefixed frame codec.
//!
//! Every frame on the wire is a 4-byte big-endian length followed by one
//! prost-encoded message. [`decode_frame`] is incremental: it returns
//! `Ok(None)` until a full frame has been buffered, so callers can feed it
//! from a streaming read loop.

use bytes::{Buf, BufMut, BytesMut};
use prost::Message;

/// Upper bound on a single frame body. Frames above this are rejected
/// rather than buffered.
pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

const LEN_PREFIX_BYTES: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("frame of {0} bytes exceeds the {MAX_FRAME_BYTES} byte limit")]
    FrameTooLarge(usize),

    #[error("malformed frame body: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("frame encoding failed: {0}")]
    Encode(#[from] prost::EncodeError),
}

/// Append one framed message to `dst`.
pub fn encode_frame<M: Message>(msg: &M, dst: &mut BytesMut) -> Result<(), CodecError> {
    let body_len = msg.encoded_len();
    if body_len > MAX_FRAME_BYTES {
        return Err(CodecError::FrameTooLarge(body_len));
    }
    dst.reserve(LEN_PREFIX_BYTES + body_len);
    dst.put_u32(body_len as u32);
    msg.encode(dst)?;
    Ok(())
}

/// Try to take one complete frame off the front of `src`.
///
/// Returns `Ok(None)` when `src` does not yet hold a full frame; the
/// buffered bytes are left in place for the next call.
pub fn decode_frame<M: Message + Default>(src: &mut BytesMut) -> Result<Option<M>, CodecError> {
    if src.len() < LEN_PREFIX_BYTES {
        return Ok(None);
    }

    let mut prefix = [0u8; LEN_PREFIX_BYTES];
    prefix.copy_from_slice(&src[..LEN_PREFIX_BYTES]);
    let body_len = u32::from_be_bytes(prefix) as usize;
    if body_len > MAX_FRAME_BYTES {
        return Err(CodecError::FrameTooLarge(body_len));
    }

    if src.len() < LEN_PREFIX_BYTES + body_len {
        return Ok(None);
    }

    src.advance(LEN_PREFIX_BYTES);
    let body = src.split_to(body_len).freeze();
    Ok(Some(M::decode(body)?))
}
