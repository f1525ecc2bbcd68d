//! Wire-level building blocks shared by the Scone head/sous protocol:
//! a self-describing [`Value`], pluggable [`Codec`]s, and the ChanPro
//! frame envelope (length-prefixed CBOR map, spec §4.1/§6).

mod codec;
mod frame;
mod value;

pub use codec::{CborCodec, CborError, Codec, Encoding, JsonCodec, PostcardCodec, RawCodec, RawCodecError, UnknownEncoding};
pub use frame::{decode_frame_body, encode_frame_body, encode_length_prefixed, Frame, FrameBody, FrameCodecError, CONTROL_CHANNEL};
pub use value::Value;

/// Stable binary encoding of a canonicalized value, used to compute a
/// paramhash (spec §4.5: "stable binary encoding of the result before
/// hashing"). Postcard is deterministic (see [`PostcardCodec`]), so the
/// same logical value always yields the same bytes.
pub fn canonical_encode(value: &Value) -> Vec<u8> {
    let canonical = value.canonicalize();
    PostcardCodec::encode(&canonical).expect("Value always encodes with postcard")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_encode_is_stable_under_key_permutation() {
        let a = Value::map([("a", Value::from(1i64)), ("b", Value::from(2i64))]);
        let b = Value::map([("b", Value::from(2i64)), ("a", Value::from(1i64))]);
        assert_eq!(canonical_encode(&a), canonical_encode(&b));
    }

    #[test]
    fn canonical_encode_changes_with_value() {
        let a = Value::map([("a", Value::from(1i64))]);
        let b = Value::map([("a", Value::from(2i64))]);
        assert_ne!(canonical_encode(&a), canonical_encode(&b));
    }
}
