//! The Timestamp extension type (ext type id `-1`).
//!
//! MessagePack defines three wire formats for a timestamp, chosen by how
//! much range is actually needed — the same minimum-length-encoding spirit
//! as the rest of the format. This module is the one place that knows the
//! three byte layouts; [`crate::encode`] and [`crate::decode`] call into it
//! rather than duplicating the layout logic inline.

use crate::error::{Error, Result};

const NANOS_MAX: u32 = 999_999_999;
/// Largest `seconds` value the 64-bit format's 34-bit unsigned field holds.
const TIMESTAMP64_MAX_SECONDS: i64 = (1 << 34) - 1;

/// Encode `(seconds, nanoseconds)` into the narrowest of the three
/// Timestamp wire bodies (4, 8, or 12 bytes).
///
/// # Panics
///
/// Never, provided `nanoseconds <= 999_999_999` — callers reach this only
/// through [`crate::Payload::timestamp`], which enforces that invariant at
/// construction.
#[must_use]
pub fn encode_timestamp(seconds: i64, nanoseconds: u32) -> Vec<u8> {
    debug_assert!(nanoseconds <= NANOS_MAX);

    if nanoseconds == 0 && (0..=i64::from(u32::MAX)).contains(&seconds) {
        #[allow(clippy::cast_possible_truncation)]
        let seconds32 = seconds as u32;
        return seconds32.to_be_bytes().to_vec();
    }

    if (0..=TIMESTAMP64_MAX_SECONDS).contains(&seconds) {
        #[allow(clippy::cast_sign_loss)]
        let packed = (u64::from(nanoseconds) << 34) | (seconds as u64);
        return packed.to_be_bytes().to_vec();
    }

    let mut body = Vec::with_capacity(12);
    body.extend_from_slice(&nanoseconds.to_be_bytes());
    body.extend_from_slice(&seconds.to_be_bytes());
    body
}

/// Decode a Timestamp extension body, accepting all three wire formats.
///
/// # Errors
///
/// Returns [`Error::ExtTypeLength`] if `body` is not 4, 8, or 12 bytes.
/// Returns [`Error::InvalidType`] if the decoded `nanoseconds` exceeds
/// `999_999_999` — the `timestamp 64` format's 30-bit field and the
/// `timestamp 96` format's full `u32` field can both carry a value wider
/// than a valid nanosecond count permits.
pub fn decode_timestamp(body: &[u8]) -> Result<(i64, u32)> {
    let (seconds, nanoseconds) = match body.len() {
        4 => {
            let mut buf = [0u8; 4];
            buf.copy_from_slice(body);
            (i64::from(u32::from_be_bytes(buf)), 0)
        },
        8 => {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(body);
            let packed = u64::from_be_bytes(buf);
            let seconds = packed & ((1u64 << 34) - 1);
            #[allow(clippy::cast_possible_truncation)]
            let nanoseconds = (packed >> 34) as u32;
            (seconds as i64, nanoseconds)
        },
        12 => {
            let mut nanos_buf = [0u8; 4];
            nanos_buf.copy_from_slice(&body[0..4]);
            let mut seconds_buf = [0u8; 8];
            seconds_buf.copy_from_slice(&body[4..12]);
            (i64::from_be_bytes(seconds_buf), u32::from_be_bytes(nanos_buf))
        },
        other => return Err(Error::ExtTypeLength(other)),
    };

    if nanoseconds > NANOS_MAX {
        return Err(Error::InvalidType("timestamp nanoseconds exceeds 999_999_999"));
    }
    Ok((seconds, nanoseconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_uses_timestamp32() {
        let body = encode_timestamp(1, 0);
        assert_eq!(body, vec![0x00, 0x00, 0x00, 0x01]);
        assert_eq!(decode_timestamp(&body).unwrap(), (1, 0));
    }

    #[test]
    fn negative_seconds_uses_timestamp96() {
        let body = encode_timestamp(-1, 0);
        assert_eq!(body.len(), 12);
        assert_eq!(decode_timestamp(&body).unwrap(), (-1, 0));
    }

    #[test]
    fn nanoseconds_uses_timestamp64_when_in_range() {
        let body = encode_timestamp(1_000_000_000, 500);
        assert_eq!(body.len(), 8);
        assert_eq!(decode_timestamp(&body).unwrap(), (1_000_000_000, 500));
    }

    #[test]
    fn seconds_beyond_34_bits_uses_timestamp96() {
        let seconds = TIMESTAMP64_MAX_SECONDS + 1;
        let body = encode_timestamp(seconds, 1);
        assert_eq!(body.len(), 12);
        assert_eq!(decode_timestamp(&body).unwrap(), (seconds, 1));
    }

    #[test]
    fn invalid_body_length_rejected() {
        assert_eq!(decode_timestamp(&[0u8; 5]).unwrap_err(), Error::ExtTypeLength(5));
    }

    #[test]
    fn timestamp64_with_out_of_range_nanos_rejected() {
        // 30-bit nanos field set to its max (1_073_741_823), seconds 0.
        let packed: u64 = (u64::from(u32::MAX >> 2)) << 34;
        let body = packed.to_be_bytes();
        assert!(matches!(decode_timestamp(&body), Err(Error::InvalidType(_))));
    }

    #[test]
    fn timestamp96_with_out_of_range_nanos_rejected() {
        let mut body = Vec::with_capacity(12);
        body.extend_from_slice(&u32::MAX.to_be_bytes());
        body.extend_from_slice(&0i64.to_be_bytes());
        assert!(matches!(decode_timestamp(&body), Err(Error::InvalidType(_))));
    }

    #[test]
    fn round_trips_across_representative_values() {
        for (seconds, nanos) in [(0_i64, 0_u32), (-62135596800, 0), (253402300799, 999_999_999), (4294967295, 0)] {
            let body = encode_timestamp(seconds, nanos);
            assert_eq!(decode_timestamp(&body).unwrap(), (seconds, nanos));
        }
    }
}
