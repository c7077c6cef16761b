//! The encoder: `Payload` → MessagePack bytes.
//!
//! Every value is written using the narrowest wire format that represents
//! it — the minimum-length-encoding rule. Like the decoder, the encoder
//! walks the `Payload` tree iteratively over an explicit `Vec<Frame>`
//! work-stack rather than recursing per nesting level, so encoding a
//! deeply nested caller-built value (the same shape [`crate::Payload`]'s
//! iterative `Drop` exists to tear down) cannot overflow the native call
//! stack.

use crate::{
    error::{Error, Result},
    io::Sink,
    payload::Payload,
    timestamp,
};

const TIMESTAMP_TYPE_ID: u8 = 0xff; // -1i8 as u8

fn write_u8(sink: &mut impl Sink, byte: u8) -> Result<()> {
    sink.write_all(&[byte])
}

fn write_len_u8(sink: &mut impl Sink, marker: u8, len: usize) -> Result<()> {
    write_u8(sink, marker)?;
    #[allow(clippy::cast_possible_truncation)]
    sink.write_all(&[len as u8])
}

fn write_len_u16(sink: &mut impl Sink, marker: u8, len: usize) -> Result<()> {
    write_u8(sink, marker)?;
    #[allow(clippy::cast_possible_truncation)]
    sink.write_all(&(len as u16).to_be_bytes())
}

fn write_len_u32(sink: &mut impl Sink, marker: u8, len: usize) -> Result<()> {
    write_u8(sink, marker)?;
    #[allow(clippy::cast_possible_truncation)]
    sink.write_all(&(len as u32).to_be_bytes())
}

fn write_uint(sink: &mut impl Sink, value: u64) -> Result<()> {
    if value < 0x80 {
        #[allow(clippy::cast_possible_truncation)]
        write_u8(sink, value as u8)
    } else if value <= u64::from(u8::MAX) {
        #[allow(clippy::cast_possible_truncation)]
        write_len_u8(sink, 0xcc, value as usize)
    } else if value <= u64::from(u16::MAX) {
        #[allow(clippy::cast_possible_truncation)]
        write_len_u16(sink, 0xcd, value as usize)
    } else if value <= u64::from(u32::MAX) {
        #[allow(clippy::cast_possible_truncation)]
        write_len_u32(sink, 0xce, value as usize)
    } else {
        write_u8(sink, 0xcf)?;
        sink.write_all(&value.to_be_bytes())
    }
}

fn write_int(sink: &mut impl Sink, value: i64) -> Result<()> {
    if value >= 0 {
        #[allow(clippy::cast_sign_loss)]
        return write_uint(sink, value as u64);
    }
    if value >= -32 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        write_u8(sink, value as u8)
    } else if value >= i64::from(i8::MIN) {
        #[allow(clippy::cast_possible_truncation)]
        sink.write_all(&[0xd0, value as i8 as u8])
    } else if value >= i64::from(i16::MIN) {
        write_u8(sink, 0xd1)?;
        #[allow(clippy::cast_possible_truncation)]
        sink.write_all(&(value as i16).to_be_bytes())
    } else if value >= i64::from(i32::MIN) {
        write_u8(sink, 0xd2)?;
        #[allow(clippy::cast_possible_truncation)]
        sink.write_all(&(value as i32).to_be_bytes())
    } else {
        write_u8(sink, 0xd3)?;
        sink.write_all(&value.to_be_bytes())
    }
}

fn write_str_header(sink: &mut impl Sink, len: usize) -> Result<()> {
    if len <= 31 {
        #[allow(clippy::cast_possible_truncation)]
        write_u8(sink, 0xa0 | len as u8)
    } else if len <= usize::from(u8::MAX) {
        write_len_u8(sink, 0xd9, len)
    } else if len <= usize::from(u16::MAX) {
        write_len_u16(sink, 0xda, len)
    } else if u32::try_from(len).is_ok() {
        write_len_u32(sink, 0xdb, len)
    } else {
        Err(Error::InputValueTooLarge("str body longer than u32::MAX"))
    }
}

fn write_bin_header(sink: &mut impl Sink, len: usize) -> Result<()> {
    if len <= usize::from(u8::MAX) {
        write_len_u8(sink, 0xc4, len)
    } else if len <= usize::from(u16::MAX) {
        write_len_u16(sink, 0xc5, len)
    } else if u32::try_from(len).is_ok() {
        write_len_u32(sink, 0xc6, len)
    } else {
        Err(Error::InputValueTooLarge("bin body longer than u32::MAX"))
    }
}

fn write_array_header(sink: &mut impl Sink, len: usize) -> Result<()> {
    if len <= 15 {
        #[allow(clippy::cast_possible_truncation)]
        write_u8(sink, 0x90 | len as u8)
    } else if len <= usize::from(u16::MAX) {
        write_len_u16(sink, 0xdc, len)
    } else if u32::try_from(len).is_ok() {
        write_len_u32(sink, 0xdd, len)
    } else {
        Err(Error::InputValueTooLarge("array longer than u32::MAX"))
    }
}

fn write_map_header(sink: &mut impl Sink, len: usize) -> Result<()> {
    if len <= 15 {
        #[allow(clippy::cast_possible_truncation)]
        write_u8(sink, 0x80 | len as u8)
    } else if len <= usize::from(u16::MAX) {
        write_len_u16(sink, 0xde, len)
    } else if u32::try_from(len).is_ok() {
        write_len_u32(sink, 0xdf, len)
    } else {
        Err(Error::InputValueTooLarge("map longer than u32::MAX"))
    }
}

fn write_ext_header(sink: &mut impl Sink, type_id: u8, len: usize) -> Result<()> {
    match len {
        1 => write_u8(sink, 0xd4)?,
        2 => write_u8(sink, 0xd5)?,
        4 => write_u8(sink, 0xd6)?,
        8 => write_u8(sink, 0xd7)?,
        16 => write_u8(sink, 0xd8)?,
        _ if len <= usize::from(u8::MAX) => write_len_u8(sink, 0xc7, len)?,
        _ if len <= usize::from(u16::MAX) => write_len_u16(sink, 0xc8, len)?,
        _ if u32::try_from(len).is_ok() => write_len_u32(sink, 0xc9, len)?,
        _ => return Err(Error::InputValueTooLarge("ext body longer than u32::MAX")),
    }
    write_u8(sink, type_id)
}

/// An open container awaiting more children, mirroring [`crate::decode`]'s
/// own work-stack frame.
enum Frame<'a> {
    /// Remaining elements of an array.
    Array(std::slice::Iter<'a, Payload>),
    /// A map entry's value, about to be written now that its key is done.
    MapValue { iter: std::slice::Iter<'a, (Payload, Payload)>, value: &'a Payload },
    /// Remaining entries of a map, awaiting the next key.
    MapNext(std::slice::Iter<'a, (Payload, Payload)>),
}

/// Encode one value over an explicit work-stack.
///
/// Array and map children are pushed onto `stack` rather than reached via a
/// recursive call, so the Rust call stack stays flat regardless of how
/// deeply the caller nested `payload`.
///
/// # Errors
///
/// Propagates any [`Error`] the `sink` reports, or [`Error::InputValueTooLarge`]
/// if a string/binary/ext body or a container exceeds `u32::MAX` elements.
#[tracing::instrument(level = "trace", skip(sink))]
pub fn encode(payload: &Payload, sink: &mut impl Sink) -> Result<()> {
    let mut stack: Vec<Frame<'_>> = Vec::new();
    let mut current = payload;

    'write: loop {
        match current {
            Payload::Array(items) => {
                write_array_header(sink, items.len())?;
                let mut iter = items.iter();
                if let Some(first) = iter.next() {
                    stack.push(Frame::Array(iter));
                    current = first;
                    continue 'write;
                }
            },
            Payload::Map(map) => {
                write_map_header(sink, map.len())?;
                let mut iter = map.iter();
                if let Some((key, value)) = iter.next() {
                    stack.push(Frame::MapValue { iter, value });
                    current = key;
                    continue 'write;
                }
            },
            Payload::Nil => write_u8(sink, 0xc0)?,
            Payload::Bool(false) => write_u8(sink, 0xc2)?,
            Payload::Bool(true) => write_u8(sink, 0xc3)?,
            Payload::Int(value) => write_int(sink, *value)?,
            Payload::Uint(value) => write_uint(sink, *value)?,
            Payload::Float(value) => {
                write_u8(sink, 0xcb)?;
                sink.write_all(&value.to_be_bytes())?;
            },
            Payload::Str(bytes) => {
                write_str_header(sink, bytes.len())?;
                sink.write_all(bytes)?;
            },
            Payload::Bin(bytes) => {
                write_bin_header(sink, bytes.len())?;
                sink.write_all(bytes)?;
            },
            Payload::Ext(type_id, bytes) => {
                #[allow(clippy::cast_sign_loss)]
                write_ext_header(sink, *type_id as u8, bytes.len())?;
                sink.write_all(bytes)?;
            },
            Payload::Timestamp(seconds, nanoseconds) => {
                let body = timestamp::encode_timestamp(*seconds, *nanoseconds);
                write_ext_header(sink, TIMESTAMP_TYPE_ID, body.len())?;
                sink.write_all(&body)?;
            },
        }

        loop {
            match stack.pop() {
                None => return Ok(()),
                Some(Frame::Array(mut iter)) => {
                    if let Some(next_item) = iter.next() {
                        stack.push(Frame::Array(iter));
                        current = next_item;
                        continue 'write;
                    }
                },
                Some(Frame::MapValue { iter, value }) => {
                    stack.push(Frame::MapNext(iter));
                    current = value;
                    continue 'write;
                },
                Some(Frame::MapNext(mut iter)) => {
                    if let Some((key, value)) = iter.next() {
                        stack.push(Frame::MapValue { iter, value });
                        current = key;
                        continue 'write;
                    }
                },
            }
        }
    }
}

/// Encode a value into a freshly-allocated byte vector.
///
/// # Errors
///
/// See [`encode`].
pub fn encode_to_vec(payload: &Payload) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode(payload, &mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nil_is_single_byte() {
        assert_eq!(encode_to_vec(&Payload::nil()).unwrap(), vec![0xc0]);
    }

    #[test]
    fn small_uint_is_positive_fixint() {
        assert_eq!(encode_to_vec(&Payload::uint(42)).unwrap(), vec![0x2a]);
        assert_eq!(encode_to_vec(&Payload::uint(0)).unwrap(), vec![0x00]);
    }

    #[test]
    fn small_negative_int_is_negative_fixint() {
        assert_eq!(encode_to_vec(&Payload::int(-1)).unwrap(), vec![0xff]);
    }

    #[test]
    fn non_negative_int_uses_unsigned_minimal_form() {
        assert_eq!(encode_to_vec(&Payload::int(42)).unwrap(), vec![0x2a]);
        assert_eq!(encode_to_vec(&Payload::int(1000)).unwrap(), vec![0xcd, 0x03, 0xe8]);
    }

    #[test]
    fn short_string_uses_fixstr() {
        let encoded = encode_to_vec(&Payload::str("hello")).unwrap();
        assert_eq!(encoded, [vec![0xa5], b"hello".to_vec()].concat());
    }

    #[test]
    fn array_and_nested_values() {
        let payload = Payload::array(vec![Payload::int(1), Payload::str("a")]);
        let encoded = encode_to_vec(&payload).unwrap();
        assert_eq!(encoded, vec![0x92, 0x01, 0xa1, b'a']);
    }

    #[test]
    fn map_with_single_entry() {
        let mut map = crate::map::PayloadMap::new();
        map.insert_str("k", Payload::nil()).unwrap();
        let encoded = encode_to_vec(&Payload::map(map)).unwrap();
        assert_eq!(encoded, vec![0x81, 0xa1, b'k', 0xc0]);
    }

    #[test]
    fn timestamp_seconds_one_uses_timestamp32() {
        let payload = Payload::timestamp(1, 0).unwrap();
        let encoded = encode_to_vec(&payload).unwrap();
        assert_eq!(encoded, vec![0xd6, 0xff, 0x00, 0x00, 0x00, 0x01]);
    }

    #[test]
    fn timestamp_negative_seconds_uses_timestamp96() {
        let payload = Payload::timestamp(-1, 0).unwrap();
        let encoded = encode_to_vec(&payload).unwrap();
        assert_eq!(encoded[0], 0xc7);
        assert_eq!(encoded[1], 12);
        assert_eq!(encoded[2], TIMESTAMP_TYPE_ID);
    }

    #[test]
    fn deeply_nested_array_encodes_without_overflow() {
        let mut value = Payload::array(vec![]);
        for _ in 0..200_000 {
            value = Payload::array(vec![value]);
        }
        let encoded = encode_to_vec(&value).unwrap();
        assert_eq!(encoded.iter().filter(|&&b| b == 0x91).count(), 200_000);
    }

    proptest::proptest! {
        #[test]
        fn int_round_trips_through_minimal_encoding(value: i64) {
            let encoded = encode_to_vec(&Payload::int(value)).unwrap();
            let decoded = crate::decode::decode_from_slice(&encoded, &crate::ParseLimits::default()).unwrap();
            proptest::prop_assert_eq!(decoded.get_int().unwrap(), value);
        }

        #[test]
        fn uint_round_trips_through_minimal_encoding(value: u64) {
            let encoded = encode_to_vec(&Payload::uint(value)).unwrap();
            let decoded = crate::decode::decode_from_slice(&encoded, &crate::ParseLimits::default()).unwrap();
            proptest::prop_assert_eq!(decoded.get_uint().unwrap(), value);
        }

        #[test]
        fn string_round_trips(value: String) {
            let encoded = encode_to_vec(&Payload::str(value.clone())).unwrap();
            let decoded = crate::decode::decode_from_slice(&encoded, &crate::ParseLimits::default()).unwrap();
            proptest::prop_assert_eq!(decoded.as_str().unwrap(), value);
        }

        #[test]
        fn array_of_ints_round_trips(values: Vec<i64>) {
            let payload = Payload::array(values.iter().copied().map(Payload::int).collect());
            let encoded = encode_to_vec(&payload).unwrap();
            let decoded = crate::decode::decode_from_slice(&encoded, &crate::ParseLimits::default()).unwrap();
            proptest::prop_assert_eq!(decoded, payload);
        }
    }
}
