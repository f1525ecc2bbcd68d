use serde::{Deserialize, Serialize};
use std::fmt;

use crate::codec::{CborCodec, Codec};
use crate::value::Value;

/// Channel 0 is reserved as the control channel (spec §4.1).
pub const CONTROL_CHANNEL: u32 = 0;

/// A single ChanPro frame body: either carries a payload, or signals
/// end-of-channel. Exactly one of the two is present per frame, which
/// this enum enforces at the type level (unlike the wire encoding,
/// which needs an `Option`-shaped struct to stay self-describing).
#[derive(Clone, Debug, PartialEq)]
pub enum FrameBody {
    Data(Value),
    Close { reason: Option<String> },
}

/// A decoded ChanPro frame: a channel id plus a body.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub channel: u32,
    pub body: FrameBody,
}

impl Frame {
    pub fn data(channel: u32, payload: Value) -> Self {
        Frame { channel, body: FrameBody::Data(payload) }
    }

    pub fn close(channel: u32, reason: Option<String>) -> Self {
        Frame { channel, body: FrameBody::Close { reason } }
    }

    pub fn is_close(&self) -> bool {
        matches!(self.body, FrameBody::Close { .. })
    }
}

/// The on-wire shape of a frame: a CBOR map with 2 or 3 keys, matching
/// spec §4.1 and §6 exactly. `Option` fields that are `None` are
/// omitted from the encoded map rather than encoded as null, so a
/// frame missing `c` on the wire round-trips to a decode error here
/// rather than silently defaulting `c` to 0.
#[derive(Serialize, Deserialize)]
struct WireFrame {
    c: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    p: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    close: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

/// Errors from encoding/decoding the framing layer itself (length prefix
/// + CBOR envelope). Distinct from [`crate::TransportError`], which is a
/// `scone-core` concept layered on top of this.
#[derive(Debug)]
pub enum FrameCodecError {
    Cbor(crate::codec::CborError),
    /// The decoded envelope had neither `c` nor a usable body, or had
    /// both `p` and `close` set. Spec §4.1: "frames missing `c` are
    /// logged and ignored" (handled by the caller, this variant is
    /// still reported so the caller can decide how to log it) and
    /// "exactly one of `p` or `close` is present per frame".
    MissingChannel,
    BothPayloadAndClose,
    NeitherPayloadNorClose,
}

impl fmt::Display for FrameCodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameCodecError::Cbor(e) => write!(f, "{e}"),
            FrameCodecError::MissingChannel => write!(f, "frame missing channel id (c)"),
            FrameCodecError::BothPayloadAndClose => {
                write!(f, "frame has both a payload and a close marker")
            }
            FrameCodecError::NeitherPayloadNorClose => {
                write!(f, "frame has neither a payload nor a close marker")
            }
        }
    }
}

impl std::error::Error for FrameCodecError {}

impl From<crate::codec::CborError> for FrameCodecError {
    fn from(e: crate::codec::CborError) -> Self {
        FrameCodecError::Cbor(e)
    }
}

/// Encode a frame's CBOR body (without the length prefix).
pub fn encode_frame_body(frame: &Frame) -> Result<Vec<u8>, FrameCodecError> {
    let wire = match &frame.body {
        FrameBody::Data(payload) => WireFrame {
            c: Some(frame.channel),
            p: Some(payload.clone()),
            close: None,
            reason: None,
        },
        FrameBody::Close { reason } => WireFrame {
            c: Some(frame.channel),
            p: None,
            close: Some(true),
            reason: reason.clone(),
        },
    };
    Ok(CborCodec::encode(&wire)?)
}

/// Decode a frame's CBOR body (without the length prefix). Returns
/// `Ok(None)` for a structurally valid envelope missing `c`, per spec
/// §4.1 ("logged and ignored"); the caller is expected to log it.
pub fn decode_frame_body(buf: &[u8]) -> Result<Option<Frame>, FrameCodecError> {
    let wire: WireFrame = CborCodec::decode(buf)?;
    let Some(channel) = wire.c else {
        return Ok(None);
    };
    let body = match (wire.p, wire.close) {
        (Some(_), Some(_)) => return Err(FrameCodecError::BothPayloadAndClose),
        (Some(p), None) => FrameBody::Data(p),
        (None, Some(true)) | (None, Some(false)) => FrameBody::Close { reason: wire.reason },
        (None, None) => return Err(FrameCodecError::NeitherPayloadNorClose),
    };
    Ok(Some(Frame { channel, body }))
}

/// Prefix a frame body with its big-endian u32 length, per spec §4.1/§6:
/// `uint32 BE length | payload bytes`.
pub fn encode_length_prefixed(frame: &Frame) -> Result<Vec<u8>, FrameCodecError> {
    let body = encode_frame_body(frame)?;
    let mut out = Vec::with_capacity(4 + body.len());
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_frame_roundtrip() {
        let f = Frame::data(3, Value::map([("a", Value::from(1i64))]));
        let body = encode_frame_body(&f).unwrap();
        let decoded = decode_frame_body(&body).unwrap().unwrap();
        assert_eq!(decoded, f);
    }

    #[test]
    fn close_frame_roundtrip_with_reason() {
        let f = Frame::close(7, Some("peer shutdown".into()));
        let body = encode_frame_body(&f).unwrap();
        let decoded = decode_frame_body(&body).unwrap().unwrap();
        assert_eq!(decoded, f);
    }

    #[test]
    fn close_frame_roundtrip_without_reason() {
        let f = Frame::close(7, None);
        let body = encode_frame_body(&f).unwrap();
        let decoded = decode_frame_body(&body).unwrap().unwrap();
        assert_eq!(decoded, f);
    }

    #[test]
    fn missing_channel_is_reported_as_none() {
        #[derive(Serialize)]
        struct NoChannel {
            p: Value,
        }
        let mut buf = Vec::new();
        ciborium::ser::into_writer(&NoChannel { p: Value::Null }, &mut buf).unwrap();
        assert!(decode_frame_body(&buf).unwrap().is_none());
    }

    #[test]
    fn both_payload_and_close_is_an_error() {
        #[derive(Serialize)]
        struct Bad {
            c: u32,
            p: Value,
            close: bool,
        }
        let mut buf = Vec::new();
        ciborium::ser::into_writer(&Bad { c: 1, p: Value::Null, close: true }, &mut buf).unwrap();
        assert!(matches!(
            decode_frame_body(&buf),
            Err(FrameCodecError::BothPayloadAndClose)
        ));
    }

    #[test]
    fn length_prefix_matches_body_len() {
        let f = Frame::data(1, Value::Str("hi".into()));
        let framed = encode_length_prefixed(&f).unwrap();
        let len = u32::from_be_bytes(framed[..4].try_into().unwrap()) as usize;
        assert_eq!(len, framed.len() - 4);
    }
}
