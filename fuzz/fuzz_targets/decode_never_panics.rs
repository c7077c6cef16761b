//! Fuzz target for the decoder's resilience to adversarial input.
//!
//! # Strategy
//!
//! - Deeply nested: arrays/maps nested to arbitrary depth (stack overflow)
//! - Huge lengths: headers claiming massive string/binary/array/map lengths
//!   (memory exhaustion if allocated before being checked)
//! - Random bytes: completely arbitrary input (general malformation)
//! - Reserved marker: the `0xc1` byte in various positions
//! - Truncated containers: a length prefix with no body following it
//!
//! # Invariants
//!
//! - `decode_from_slice` never panics, on any input.
//! - A declared length or nesting depth beyond the default `ParseLimits`
//!   is always rejected with an `Error`, never accepted.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use msgpack_core::{decode_from_slice, ParseLimits};

#[derive(Debug, Clone, Arbitrary)]
enum Attack {
    DeeplyNestedArray { depth: u16 },
    DeeplyNestedMap { depth: u16 },
    HugeArrayLength { claimed_len: u32 },
    HugeMapLength { claimed_len: u32 },
    HugeStringLength { claimed_len: u32 },
    HugeBinLength { claimed_len: u32 },
    RandomBytes { bytes: Vec<u8> },
    ReservedMarkerAt { position: u8, bytes: Vec<u8> },
    TruncatedHeader { marker: u8 },
}

fn nested_array(depth: usize) -> Vec<u8> {
    let mut bytes = vec![0x91u8; depth];
    bytes.push(0x00);
    bytes
}

fn nested_map(depth: usize) -> Vec<u8> {
    let mut bytes = Vec::new();
    for _ in 0..depth {
        bytes.push(0x81);
        bytes.extend_from_slice(&[0xa1, b'k']);
    }
    bytes.push(0x00);
    bytes
}

fn huge_header(marker: u8, claimed_len: u32) -> Vec<u8> {
    let mut bytes = vec![marker];
    bytes.extend_from_slice(&claimed_len.to_be_bytes());
    bytes
}

fuzz_target!(|attack: Attack| {
    let limits = ParseLimits::default();
    let bytes = match attack {
        Attack::DeeplyNestedArray { depth } => nested_array(usize::from(depth)),
        Attack::DeeplyNestedMap { depth } => nested_map(usize::from(depth)),
        Attack::HugeArrayLength { claimed_len } => huge_header(0xdd, claimed_len),
        Attack::HugeMapLength { claimed_len } => huge_header(0xdf, claimed_len),
        Attack::HugeStringLength { claimed_len } => huge_header(0xdb, claimed_len),
        Attack::HugeBinLength { claimed_len } => huge_header(0xc6, claimed_len),
        Attack::RandomBytes { bytes } => bytes,
        Attack::ReservedMarkerAt { position, mut bytes } => {
            if !bytes.is_empty() {
                let index = usize::from(position) % bytes.len();
                bytes[index] = 0xc1;
            }
            bytes
        },
        Attack::TruncatedHeader { marker } => vec![marker],
    };

    let _ = decode_from_slice(&bytes, &limits);
});
