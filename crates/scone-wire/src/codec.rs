use serde::{de::DeserializeOwned, Serialize};
use std::fmt;

/// Encoding format identifier for message serialization.
///
/// Wire-compatible, `u16` representation. Frames on channel 0 always use
/// CBOR (see [`crate::frame`]) because the protocol requires the frame
/// envelope itself to be self-describing; this enum instead identifies
/// how a *payload value* inside a frame, or a dependency-cache blob, was
/// encoded.
#[repr(u16)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoding {
    /// Postcard: compact binary format, deterministic output (used for
    /// paramhash canonicalization and as the default cache blob format).
    Postcard = 1,
    /// JSON: human-readable format (debugging/tooling, alternate cache format).
    Json = 2,
    /// CBOR: self-describing binary format (the wire frame envelope).
    Cbor = 3,
    /// Raw: no serialization, passes bytes through as-is.
    Raw = 4,
}

impl TryFrom<u16> for Encoding {
    type Error = UnknownEncoding;

    fn try_from(v: u16) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(Encoding::Postcard),
            2 => Ok(Encoding::Json),
            3 => Ok(Encoding::Cbor),
            4 => Ok(Encoding::Raw),
            _ => Err(UnknownEncoding(v)),
        }
    }
}

impl From<Encoding> for u16 {
    fn from(encoding: Encoding) -> u16 {
        encoding as u16
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Postcard => write!(f, "postcard"),
            Encoding::Json => write!(f, "json"),
            Encoding::Cbor => write!(f, "cbor"),
            Encoding::Raw => write!(f, "raw"),
        }
    }
}

/// Error when converting from an unknown u16 encoding value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownEncoding(pub u16);

impl fmt::Display for UnknownEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown encoding: {}", self.0)
    }
}

impl std::error::Error for UnknownEncoding {}

/// Codec trait for message serialization.
pub trait Codec {
    const ENCODING: Encoding;

    type EncodeError: std::error::Error;
    type DecodeError: std::error::Error;

    fn encode<T: Serialize>(val: &T) -> Result<Vec<u8>, Self::EncodeError>;
    fn decode<T: DeserializeOwned>(buf: &[u8]) -> Result<T, Self::DecodeError>;
}

/// Postcard codec: compact, deterministic binary format.
///
/// Deterministic output makes this the codec used for paramhash
/// canonicalization (see `scone-cache`): the same logical value always
/// encodes to the same bytes regardless of process or platform.
pub struct PostcardCodec;

impl Codec for PostcardCodec {
    const ENCODING: Encoding = Encoding::Postcard;
    type EncodeError = postcard::Error;
    type DecodeError = postcard::Error;

    fn encode<T: Serialize>(val: &T) -> Result<Vec<u8>, Self::EncodeError> {
        postcard::to_allocvec(val)
    }

    fn decode<T: DeserializeOwned>(buf: &[u8]) -> Result<T, Self::DecodeError> {
        postcard::from_bytes(buf)
    }
}

/// JSON codec: human-readable format using serde_json.
pub struct JsonCodec;

impl Codec for JsonCodec {
    const ENCODING: Encoding = Encoding::Json;
    type EncodeError = serde_json::Error;
    type DecodeError = serde_json::Error;

    fn encode<T: Serialize>(val: &T) -> Result<Vec<u8>, Self::EncodeError> {
        serde_json::to_vec(val)
    }

    fn decode<T: DeserializeOwned>(buf: &[u8]) -> Result<T, Self::DecodeError> {
        serde_json::from_slice(buf)
    }
}

/// CBOR codec: self-describing binary format used for the ChanPro frame
/// envelope, so a peer can decode `c`/`p`/`close`/`reason` without first
/// agreeing on a schema version.
pub struct CborCodec;

#[derive(Debug)]
pub enum CborError {
    Encode(ciborium::ser::Error<std::io::Error>),
    Decode(ciborium::de::Error<std::io::Error>),
}

impl fmt::Display for CborError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CborError::Encode(e) => write!(f, "cbor encode error: {e}"),
            CborError::Decode(e) => write!(f, "cbor decode error: {e}"),
        }
    }
}

impl std::error::Error for CborError {}

impl Codec for CborCodec {
    const ENCODING: Encoding = Encoding::Cbor;
    type EncodeError = CborError;
    type DecodeError = CborError;

    fn encode<T: Serialize>(val: &T) -> Result<Vec<u8>, Self::EncodeError> {
        let mut buf = Vec::new();
        ciborium::ser::into_writer(val, &mut buf).map_err(CborError::Encode)?;
        Ok(buf)
    }

    fn decode<T: DeserializeOwned>(buf: &[u8]) -> Result<T, Self::DecodeError> {
        ciborium::de::from_reader(buf).map_err(CborError::Decode)
    }
}

/// Raw codec: no serialization, passes bytes through as-is.
///
/// Used for pre-serialized data or binary payloads; only works with
/// `Vec<u8>`/`&[u8]`, attempting anything else is an error.
pub struct RawCodec;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCodecError {
    message: &'static str,
}

impl RawCodecError {
    fn new(message: &'static str) -> Self {
        RawCodecError { message }
    }
}

impl fmt::Display for RawCodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "raw codec error: {}", self.message)
    }
}

impl std::error::Error for RawCodecError {}

impl Codec for RawCodec {
    const ENCODING: Encoding = Encoding::Raw;
    type EncodeError = RawCodecError;
    type DecodeError = RawCodecError;

    fn encode<T: Serialize>(_val: &T) -> Result<Vec<u8>, Self::EncodeError> {
        Err(RawCodecError::new(
            "raw codec only supports Vec<u8>, use to_bytes() instead",
        ))
    }

    fn decode<T: DeserializeOwned>(_buf: &[u8]) -> Result<T, Self::DecodeError> {
        Err(RawCodecError::new(
            "raw codec only supports Vec<u8>, use from_bytes() instead",
        ))
    }
}

impl RawCodec {
    pub fn to_bytes(data: &[u8]) -> Vec<u8> {
        data.to_vec()
    }

    pub fn from_bytes(data: Vec<u8>) -> Vec<u8> {
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    struct TestMessage {
        id: u32,
        name: String,
    }

    #[test]
    fn encoding_roundtrip() {
        for &encoding in &[Encoding::Postcard, Encoding::Json, Encoding::Cbor, Encoding::Raw] {
            let val = u16::from(encoding);
            assert_eq!(Encoding::try_from(val).unwrap(), encoding);
        }
        assert_eq!(Encoding::try_from(99), Err(UnknownEncoding(99)));
    }

    #[test]
    fn postcard_codec_roundtrip() {
        let msg = TestMessage { id: 42, name: "test".into() };
        let encoded = PostcardCodec::encode(&msg).unwrap();
        let decoded: TestMessage = PostcardCodec::decode(&encoded).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn json_codec_roundtrip() {
        let msg = TestMessage { id: 42, name: "test".into() };
        let encoded = JsonCodec::encode(&msg).unwrap();
        let decoded: TestMessage = JsonCodec::decode(&encoded).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn cbor_codec_roundtrip() {
        let msg = TestMessage { id: 42, name: "test".into() };
        let encoded = CborCodec::encode(&msg).unwrap();
        let decoded: TestMessage = CborCodec::decode(&encoded).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn postcard_is_deterministic() {
        let msg = TestMessage { id: 7, name: "x".into() };
        assert_eq!(PostcardCodec::encode(&msg).unwrap(), PostcardCodec::encode(&msg).unwrap());
    }

    #[test]
    fn raw_codec_encode_decode_fail_for_typed_values() {
        let msg = TestMessage { id: 1, name: "x".into() };
        assert!(RawCodec::encode(&msg).is_err());
        let buf = vec![1u8, 2, 3];
        let res: Result<TestMessage, _> = RawCodec::decode(&buf);
        assert!(res.is_err());
    }

    #[test]
    fn raw_codec_bytes_roundtrip() {
        let data = vec![1u8, 2, 3, 4];
        assert_eq!(RawCodec::from_bytes(RawCodec::to_bytes(&data)), data);
    }
}
