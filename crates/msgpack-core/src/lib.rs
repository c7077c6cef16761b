//! A hardened, streaming MessagePack codec.
//!
//! This crate encodes and decodes the [MessagePack](https://msgpack.org)
//! binary format, including the Timestamp extension type (ext type id
//! `-1`). The encoder always emits the narrowest wire format that
//! represents a value (minimum-length encoding); the decoder is iterative
//! rather than recursive and enforces caller-configured resource limits
//! ([`ParseLimits`]) on every declared length and nesting depth *before*
//! allocating anything sized by that value, so it is safe to point
//! directly at untrusted input.
//!
//! ```
//! use msgpack_core::{decode_from_slice, encode_to_vec, ParseLimits, Payload};
//!
//! let original = Payload::array(vec![Payload::uint(42), Payload::str("hi")]);
//! let bytes = encode_to_vec(&original).unwrap();
//! let decoded = decode_from_slice(&bytes, &ParseLimits::default()).unwrap();
//! assert_eq!(original, decoded);
//! ```
//!
//! # Non-goals
//!
//! This crate does not implement `serde::Serialize`/`Deserialize` for
//! arbitrary Rust types, does not interpret application-defined extension
//! type bodies beyond Timestamp, and does not provide a schema or
//! validation layer above the wire format itself.

mod decode;
mod encode;
mod error;
mod io;
mod limits;
mod map;
mod marker;
mod payload;
mod timestamp;

pub use decode::{decode, decode_from_slice};
pub use encode::{encode, encode_to_vec};
pub use error::{Error, LengthKind, Result};
pub use io::{IoSink, IoSource, Sink, Source};
pub use limits::ParseLimits;
pub use map::PayloadMap;
pub use payload::Payload;
