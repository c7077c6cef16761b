//! Error taxonomy for the MessagePack codec.
//!
//! Every failure mode the encoder or decoder can produce is a variant of
//! [`Error`]. There is no hidden `panic!`/`unwrap()` path in non-test code:
//! anything that can go wrong on adversarial input surfaces here instead.
//!
//! We avoid `std::io::Error` as the crate-wide error type because `io::Error`
//! is neither `Clone` nor `PartialEq`, which makes it awkward to assert
//! against in tests and to compare in caller retry logic. Boundary I/O
//! failures are instead captured as an owned message inside
//! [`Error::DataReading`] / [`Error::DataWriting`].

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Which declared length exceeded its configured cap.
///
/// Kept as a field on a single [`Error::LengthTooLong`] variant rather than
/// five near-identical variants (`StringTooLong`, `BinDataLengthTooLong`,
/// `ExtDataTooLarge`, `ArrayTooLarge`, `MapTooLarge`) — the distinction
/// callers need to observe is preserved in this field, not dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthKind {
    /// A `str` payload's declared byte length.
    Str,
    /// A `bin` payload's declared byte length.
    Bin,
    /// An `ext` payload's declared byte length.
    Ext,
    /// An array's declared element count.
    Array,
    /// A map's declared entry count.
    Map,
}

impl std::fmt::Display for LengthKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Str => "string",
            Self::Bin => "binary",
            Self::Ext => "ext",
            Self::Array => "array",
            Self::Map => "map",
        };
        f.write_str(name)
    }
}

/// All errors the codec can produce.
///
/// # Security
///
/// Every variant that carries a declared length or depth is populated
/// *before* the decoder performs any allocation proportional to that value
/// (spec invariant: length-before-allocation). Constructing one of these
/// never itself allocates more than the error's own fields.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The byte source reported insufficient bytes or an I/O failure.
    #[error("data reading error: {0}")]
    DataReading(String),

    /// The byte sink reported a short write or an I/O failure.
    #[error("data writing error: {0}")]
    DataWriting(String),

    /// The leading byte was the reserved marker `0xc1`, or a marker appeared
    /// in a context where it cannot be valid (e.g. a map key slot expecting
    /// a value).
    #[error("invalid or reserved type marker: {0:#04x}")]
    TypeMarkerReading(u8),

    /// A length prefix (for a str/bin/ext/array/map format) could not be
    /// read in full.
    #[error("could not read length prefix ({needed} bytes needed)")]
    LengthReading {
        /// Number of bytes the length prefix requires.
        needed: usize,
    },

    /// An accessor was used against a `Payload` of the wrong variant, a
    /// Timestamp extension carried a bad length or out-of-range nanoseconds,
    /// or a NaN float was used as a map key.
    #[error("invalid type: {0}")]
    InvalidType(&'static str),

    /// A declared length exceeded its configured cap. See [`LengthKind`]
    /// for which kind of length this was.
    #[error("{kind} length {declared} exceeds configured maximum {max}")]
    LengthTooLong {
        /// Which kind of length was rejected.
        kind: LengthKind,
        /// The length the input declared.
        declared: usize,
        /// The configured cap it exceeded.
        max: usize,
    },

    /// A container push would have exceeded `max_depth`.
    #[error("nesting depth {depth} exceeds configured maximum {max_depth}")]
    MaxDepthExceeded {
        /// The depth the push would have reached.
        depth: usize,
        /// The configured cap it exceeded.
        max_depth: usize,
    },

    /// An encoder input does not fit even the widest available format
    /// (e.g. a string or binary body longer than `2^32 - 1` bytes).
    #[error("value too large to encode: {0}")]
    InputValueTooLarge(&'static str),

    /// Ext type id `-1` (Timestamp) carried a body length other than 4, 8,
    /// or 12 bytes.
    #[error("timestamp extension had invalid body length: {0}")]
    ExtTypeLength(usize),

    /// The allocator refused a request (`try_reserve` failed).
    #[error("out of memory")]
    OutOfMemory,
}
