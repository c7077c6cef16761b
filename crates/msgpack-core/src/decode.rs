//! The decoder: MessagePack bytes → `Payload`.
//!
//! This is the crate's security-critical surface: it runs directly against
//! untrusted input. Two rules hold everywhere in this file:
//!
//! - **Length before allocation.** Every declared length (a string's byte
//!   count, an array's element count, ...) is compared against its
//!   configured [`ParseLimits`] cap before any buffer sized by that length
//!   is allocated.
//! - **Iteration, not recursion.** Container values are built via an
//!   explicit heap-allocated `Vec<Frame>` work-stack rather than a
//!   recursive descent, so a maliciously deep nesting bomb is rejected by
//!   the depth check rather than by exhausting the native call stack.

use bytes::Bytes;

use crate::{
    error::{Error, LengthKind, Result},
    io::Source,
    limits::ParseLimits,
    map::PayloadMap,
    marker::{marker_kind, MarkerKind},
    payload::Payload,
    timestamp,
};

const TIMESTAMP_TYPE_ID: i8 = -1;

/// An open container awaiting more children.
enum Frame {
    Array { items: Vec<Payload>, remaining: usize },
    MapKey { map: PayloadMap, remaining: usize },
    MapValue { map: PayloadMap, remaining: usize, key: Box<Payload> },
}

/// What reading one value's header told us to do next.
enum Next {
    /// A complete leaf value.
    Value(Payload),
    /// An array header; `usize` is the already-cap-checked element count.
    Array(usize),
    /// A map header; `usize` is the already-cap-checked entry count.
    Map(usize),
}

fn read_u8(source: &mut impl Source) -> Result<u8> {
    let mut buf = [0u8; 1];
    source.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_len_u8(source: &mut impl Source) -> Result<usize> {
    Ok(usize::from(read_u8(source)?))
}

fn read_len_u16(source: &mut impl Source) -> Result<usize> {
    let mut buf = [0u8; 2];
    source.read_exact(&mut buf)?;
    Ok(usize::from(u16::from_be_bytes(buf)))
}

fn read_len_u32(source: &mut impl Source) -> Result<usize> {
    let mut buf = [0u8; 4];
    source.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf) as usize)
}

fn check_length(kind: LengthKind, declared: usize, max: usize) -> Result<()> {
    if declared > max {
        tracing::warn!(?kind, declared, max, "declared length exceeds configured maximum");
        return Err(Error::LengthTooLong { kind, declared, max });
    }
    Ok(())
}

fn read_body(source: &mut impl Source, len: usize) -> Result<Bytes> {
    let mut buf = vec![0u8; len];
    source.read_exact(&mut buf)?;
    Ok(Bytes::from(buf))
}

fn read_str(source: &mut impl Source, limits: &ParseLimits, len: usize) -> Result<Next> {
    check_length(LengthKind::Str, len, limits.max_string_length())?;
    Ok(Next::Value(Payload::Str(read_body(source, len)?)))
}

fn read_bin(source: &mut impl Source, limits: &ParseLimits, len: usize) -> Result<Next> {
    check_length(LengthKind::Bin, len, limits.max_bin_length())?;
    Ok(Next::Value(Payload::Bin(read_body(source, len)?)))
}

fn read_ext(source: &mut impl Source, limits: &ParseLimits, len: usize) -> Result<Next> {
    check_length(LengthKind::Ext, len, limits.max_ext_length())?;
    #[allow(clippy::cast_possible_wrap)]
    let type_id = read_u8(source)? as i8;
    let body = read_body(source, len)?;
    if type_id == TIMESTAMP_TYPE_ID {
        let (seconds, nanoseconds) = timestamp::decode_timestamp(&body)?;
        Ok(Next::Value(Payload::Timestamp(seconds, nanoseconds)))
    } else {
        Ok(Next::Value(Payload::Ext(type_id, body)))
    }
}

fn read_array_header(limits: &ParseLimits, len: usize) -> Result<Next> {
    check_length(LengthKind::Array, len, limits.max_array_length())?;
    Ok(Next::Array(len))
}

fn read_map_header(limits: &ParseLimits, len: usize) -> Result<Next> {
    check_length(LengthKind::Map, len, limits.max_map_size())?;
    Ok(Next::Map(len))
}

#[allow(clippy::too_many_lines)]
fn read_next(source: &mut impl Source, limits: &ParseLimits) -> Result<Next> {
    let marker = read_u8(source)?;
    match marker_kind(marker) {
        MarkerKind::PositiveFixInt => Ok(Next::Value(Payload::Uint(u64::from(marker)))),
        #[allow(clippy::cast_possible_wrap)]
        MarkerKind::NegativeFixInt => Ok(Next::Value(Payload::Int(i64::from(marker as i8)))),
        MarkerKind::FixMap => read_map_header(limits, usize::from(marker & 0x0f)),
        MarkerKind::FixArray => read_array_header(limits, usize::from(marker & 0x0f)),
        MarkerKind::FixStr => {
            let len = usize::from(marker & 0x1f);
            read_str(source, limits, len)
        },
        MarkerKind::Nil => Ok(Next::Value(Payload::Nil)),
        MarkerKind::Invalid => {
            tracing::warn!(marker, "reserved marker byte 0xc1 encountered");
            Err(Error::TypeMarkerReading(marker))
        },
        MarkerKind::False => Ok(Next::Value(Payload::Bool(false))),
        MarkerKind::True => Ok(Next::Value(Payload::Bool(true))),
        MarkerKind::Bin8 => {
            let len = read_len_u8(source)?;
            read_bin(source, limits, len)
        },
        MarkerKind::Bin16 => {
            let len = read_len_u16(source)?;
            read_bin(source, limits, len)
        },
        MarkerKind::Bin32 => {
            let len = read_len_u32(source)?;
            read_bin(source, limits, len)
        },
        MarkerKind::Ext8 => {
            let len = read_len_u8(source)?;
            read_ext(source, limits, len)
        },
        MarkerKind::Ext16 => {
            let len = read_len_u16(source)?;
            read_ext(source, limits, len)
        },
        MarkerKind::Ext32 => {
            let len = read_len_u32(source)?;
            read_ext(source, limits, len)
        },
        MarkerKind::Float32 => {
            let mut buf = [0u8; 4];
            source.read_exact(&mut buf)?;
            Ok(Next::Value(Payload::Float(f64::from(f32::from_be_bytes(buf)))))
        },
        MarkerKind::Float64 => {
            let mut buf = [0u8; 8];
            source.read_exact(&mut buf)?;
            Ok(Next::Value(Payload::Float(f64::from_be_bytes(buf))))
        },
        MarkerKind::Uint8 => Ok(Next::Value(Payload::Uint(u64::from(read_u8(source)?)))),
        MarkerKind::Uint16 => {
            let mut buf = [0u8; 2];
            source.read_exact(&mut buf)?;
            Ok(Next::Value(Payload::Uint(u64::from(u16::from_be_bytes(buf)))))
        },
        MarkerKind::Uint32 => {
            let mut buf = [0u8; 4];
            source.read_exact(&mut buf)?;
            Ok(Next::Value(Payload::Uint(u64::from(u32::from_be_bytes(buf)))))
        },
        MarkerKind::Uint64 => {
            let mut buf = [0u8; 8];
            source.read_exact(&mut buf)?;
            Ok(Next::Value(Payload::Uint(u64::from_be_bytes(buf))))
        },
        #[allow(clippy::cast_possible_wrap)]
        MarkerKind::Int8 => Ok(Next::Value(Payload::Int(i64::from(read_u8(source)? as i8)))),
        MarkerKind::Int16 => {
            let mut buf = [0u8; 2];
            source.read_exact(&mut buf)?;
            Ok(Next::Value(Payload::Int(i64::from(i16::from_be_bytes(buf)))))
        },
        MarkerKind::Int32 => {
            let mut buf = [0u8; 4];
            source.read_exact(&mut buf)?;
            Ok(Next::Value(Payload::Int(i64::from(i32::from_be_bytes(buf)))))
        },
        MarkerKind::Int64 => {
            let mut buf = [0u8; 8];
            source.read_exact(&mut buf)?;
            Ok(Next::Value(Payload::Int(i64::from_be_bytes(buf))))
        },
        MarkerKind::FixExt1 => read_ext(source, limits, 1),
        MarkerKind::FixExt2 => read_ext(source, limits, 2),
        MarkerKind::FixExt4 => read_ext(source, limits, 4),
        MarkerKind::FixExt8 => read_ext(source, limits, 8),
        MarkerKind::FixExt16 => read_ext(source, limits, 16),
        MarkerKind::Str8 => {
            let len = read_len_u8(source)?;
            read_str(source, limits, len)
        },
        MarkerKind::Str16 => {
            let len = read_len_u16(source)?;
            read_str(source, limits, len)
        },
        MarkerKind::Str32 => {
            let len = read_len_u32(source)?;
            read_str(source, limits, len)
        },
        MarkerKind::Array16 => {
            let len = read_len_u16(source)?;
            read_array_header(limits, len)
        },
        MarkerKind::Array32 => {
            let len = read_len_u32(source)?;
            read_array_header(limits, len)
        },
        MarkerKind::Map16 => {
            let len = read_len_u16(source)?;
            read_map_header(limits, len)
        },
        MarkerKind::Map32 => {
            let len = read_len_u32(source)?;
            read_map_header(limits, len)
        },
    }
}

fn check_depth(depth_after_push: usize, limits: &ParseLimits) -> Result<()> {
    if depth_after_push > limits.max_depth() {
        tracing::warn!(depth = depth_after_push, max_depth = limits.max_depth(), "nesting depth exceeds configured maximum");
        return Err(Error::MaxDepthExceeded { depth: depth_after_push, max_depth: limits.max_depth() });
    }
    Ok(())
}

/// Decode a single value from `source`, enforcing `limits`.
///
/// # Errors
///
/// Returns any [`Error`] reported by `source`, or an `Error` variant
/// describing why the input was rejected (invalid marker, a declared
/// length or nesting depth beyond `limits`, a malformed Timestamp body).
#[tracing::instrument(level = "trace", skip(source, limits))]
pub fn decode(source: &mut impl Source, limits: &ParseLimits) -> Result<Payload> {
    let mut stack: Vec<Frame> = Vec::new();

    'read: loop {
        let mut ready = match read_next(source, limits)? {
            Next::Value(value) => value,
            Next::Array(len) => {
                check_depth(stack.len() + 1, limits)?;
                if len == 0 {
                    Payload::array(Vec::new())
                } else {
                    stack.push(Frame::Array { items: Vec::with_capacity(len), remaining: len });
                    continue 'read;
                }
            },
            Next::Map(len) => {
                check_depth(stack.len() + 1, limits)?;
                if len == 0 {
                    Payload::map(PayloadMap::new())
                } else {
                    stack.push(Frame::MapKey { map: PayloadMap::with_capacity(len), remaining: len });
                    continue 'read;
                }
            },
        };

        loop {
            match stack.pop() {
                None => return Ok(ready),
                Some(Frame::Array { mut items, remaining }) => {
                    items.push(ready);
                    let remaining = remaining - 1;
                    if remaining == 0 {
                        ready = Payload::array(items);
                    } else {
                        stack.push(Frame::Array { items, remaining });
                        continue 'read;
                    }
                },
                Some(Frame::MapKey { map, remaining }) => {
                    stack.push(Frame::MapValue { map, remaining, key: Box::new(ready) });
                    continue 'read;
                },
                Some(Frame::MapValue { mut map, remaining, key }) => {
                    let _ = map.insert(*key, ready)?;
                    let remaining = remaining - 1;
                    if remaining == 0 {
                        ready = Payload::map(map);
                    } else {
                        stack.push(Frame::MapKey { map, remaining });
                        continue 'read;
                    }
                },
            }
        }
    }
}

/// Decode a single value from a byte slice, enforcing `limits`.
///
/// # Errors
///
/// See [`decode`]. Additionally returns [`Error::DataReading`] if `bytes`
/// ends before a complete value has been read.
pub fn decode_from_slice(mut bytes: &[u8], limits: &ParseLimits) -> Result<Payload> {
    decode(&mut bytes, limits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_hex(hex_bytes: &[u8]) -> Result<Payload> {
        decode_from_slice(hex_bytes, &ParseLimits::default())
    }

    #[test]
    fn nil_byte() {
        assert_eq!(decode_hex(&[0xc0]).unwrap(), Payload::nil());
    }

    #[test]
    fn small_uint_is_single_byte() {
        assert_eq!(decode_hex(&[0x2a]).unwrap(), Payload::uint(42));
        assert_eq!(decode_hex(&[0x00]).unwrap(), Payload::uint(0));
    }

    #[test]
    fn small_negative_int() {
        assert_eq!(decode_hex(&[0xff]).unwrap(), Payload::int(-1));
    }

    #[test]
    fn short_string() {
        let mut bytes = vec![0xa5];
        bytes.extend_from_slice(b"hello");
        assert_eq!(decode_hex(&bytes).unwrap(), Payload::str("hello"));
    }

    #[test]
    fn array_with_mixed_elements() {
        let bytes = [0x92, 0x01, 0xa1, b'a'];
        let decoded = decode_hex(&bytes).unwrap();
        assert_eq!(decoded, Payload::array(vec![Payload::int(1), Payload::str("a")]));
    }

    #[test]
    fn map_with_single_entry() {
        let bytes = [0x81, 0xa1, b'k', 0xc0];
        let decoded = decode_hex(&bytes).unwrap();
        let mut expected = PayloadMap::new();
        expected.insert_str("k", Payload::nil()).unwrap();
        assert_eq!(decoded, Payload::map(expected));
    }

    #[test]
    fn timestamp_epoch_plus_one_second() {
        let bytes = [0xd6, 0xff, 0x00, 0x00, 0x00, 0x01];
        assert_eq!(decode_hex(&bytes).unwrap(), Payload::timestamp(1, 0).unwrap());
    }

    #[test]
    fn timestamp_negative_second_uses_12_byte_form() {
        let mut bytes = vec![0xc7, 12, 0xff];
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.extend_from_slice(&(-1i64).to_be_bytes());
        assert_eq!(decode_hex(&bytes).unwrap(), Payload::timestamp(-1, 0).unwrap());
    }

    #[test]
    fn reserved_marker_rejected() {
        assert_eq!(decode_hex(&[0xc1]).unwrap_err(), Error::TypeMarkerReading(0xc1));
    }

    #[test]
    fn array_length_bomb_rejected_before_allocation() {
        // array32 claiming 0xffff_ffff elements, no further bytes present.
        let bytes = [0xdd, 0xff, 0xff, 0xff, 0xff];
        let err = decode_hex(&bytes).unwrap_err();
        assert_eq!(
            err,
            Error::LengthTooLong {
                kind: LengthKind::Array,
                declared: 0xffff_ffff,
                max: ParseLimits::DEFAULT_MAX_ARRAY_LENGTH,
            }
        );
    }

    #[test]
    fn nesting_bomb_rejected_by_depth_check() {
        let bytes = vec![0x91u8; 10_000];
        let err = decode_hex(&bytes).unwrap_err();
        assert_eq!(
            err,
            Error::MaxDepthExceeded { depth: ParseLimits::DEFAULT_MAX_DEPTH + 1, max_depth: ParseLimits::DEFAULT_MAX_DEPTH }
        );
    }

    #[test]
    fn truncated_input_is_data_reading_error() {
        assert!(matches!(decode_hex(&[0xa5, b'h', b'e']), Err(Error::DataReading(_))));
    }

    #[test]
    fn duplicate_map_keys_last_occurrence_wins() {
        let bytes = [0x82, 0xa1, b'a', 0x01, 0xa1, b'a', 0x02];
        let decoded = decode_hex(&bytes).unwrap();
        let map = decoded.as_map().unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get_str("a"), Some(&Payload::int(2)));
    }

    #[test]
    fn encode_decode_round_trip_through_deep_array() {
        let mut value = Payload::array(vec![]);
        for _ in 0..500 {
            value = Payload::array(vec![value]);
        }
        let encoded = crate::encode::encode_to_vec(&value).unwrap();
        let decoded = decode_from_slice(&encoded, &ParseLimits::default()).unwrap();
        assert_eq!(decoded, value);
    }

    proptest::proptest! {
        #[test]
        fn arbitrary_bytes_never_panic(bytes: Vec<u8>) {
            let _ = decode_from_slice(&bytes, &ParseLimits::default());
        }

        #[test]
        fn a_length_cap_of_zero_rejects_every_non_empty_array(len in 1u32..1000) {
            let limits = ParseLimits::new().with_max_array_length(0);
            let mut bytes = vec![0xdd];
            bytes.extend_from_slice(&len.to_be_bytes());
            let err = decode(&mut bytes.as_slice(), &limits).unwrap_err();
            proptest::prop_assert_eq!(
                err,
                Error::LengthTooLong { kind: LengthKind::Array, declared: len as usize, max: 0 }
            );
        }
    }
}
