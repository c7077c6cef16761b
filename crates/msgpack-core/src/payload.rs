//! The in-memory value model.
//!
//! [`Payload`] is a tagged union covering every MessagePack value this
//! crate's decoder can produce and this crate's encoder can accept. It is
//! hand-rolled rather than `serde`-derived because this crate *is* the
//! serialization layer, not a consumer of one.

use bytes::Bytes;

use crate::{
    error::{Error, Result},
    map::PayloadMap,
};

/// A single MessagePack value.
///
/// # Invariants
///
/// - A [`Payload::Timestamp`] always has `nanoseconds <= 999_999_999`.
/// - A [`Payload::Ext`] never carries type id `-1`; that id always decodes
///   to (and only encodes from) [`Payload::Timestamp`].
///
/// Both invariants are enforced at construction time ([`Payload::ext`],
/// [`Payload::timestamp`]) and by the decoder, so a `Payload` reached
/// through any public API upholds them.
#[derive(Debug, Clone)]
pub enum Payload {
    /// The nil value.
    Nil,
    /// A boolean.
    Bool(bool),
    /// A signed 64-bit integer.
    Int(i64),
    /// An unsigned 64-bit integer.
    Uint(u64),
    /// An IEEE-754 double precision float.
    Float(f64),
    /// A string body. Bytes are not validated as UTF-8 on decode; use
    /// [`Payload::as_str`] to validate on access, or [`Payload::as_str_bytes`]
    /// to read the raw bytes.
    Str(Bytes),
    /// A binary body.
    Bin(Bytes),
    /// An ordered sequence of values.
    Array(Vec<Payload>),
    /// A mapping from [`Payload`] keys to [`Payload`] values.
    Map(PayloadMap),
    /// An application extension: an 8-bit signed type id (never `-1`) plus
    /// an owned byte body.
    Ext(i8, Bytes),
    /// A Timestamp extension value (type id `-1`): signed seconds since the
    /// Unix epoch, plus nanoseconds within that second (`0..=999_999_999`).
    Timestamp(i64, u32),
}

impl Payload {
    /// The nil value.
    #[must_use]
    pub const fn nil() -> Self {
        Self::Nil
    }

    /// A boolean value.
    #[must_use]
    pub const fn bool(value: bool) -> Self {
        Self::Bool(value)
    }

    /// A signed integer value.
    #[must_use]
    pub const fn int(value: i64) -> Self {
        Self::Int(value)
    }

    /// An unsigned integer value.
    #[must_use]
    pub const fn uint(value: u64) -> Self {
        Self::Uint(value)
    }

    /// A floating point value.
    #[must_use]
    pub const fn float(value: f64) -> Self {
        Self::Float(value)
    }

    /// A string value. The bytes are not checked for UTF-8 validity here;
    /// see [`Payload::as_str`].
    pub fn str(bytes: impl Into<Bytes>) -> Self {
        Self::Str(bytes.into())
    }

    /// A binary value.
    pub fn bin(bytes: impl Into<Bytes>) -> Self {
        Self::Bin(bytes.into())
    }

    /// An array value.
    #[must_use]
    pub const fn array(items: Vec<Payload>) -> Self {
        Self::Array(items)
    }

    /// A map value.
    #[must_use]
    pub const fn map(map: PayloadMap) -> Self {
        Self::Map(map)
    }

    /// An application extension value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidType`] if `type_id` is `-1`; that id is
    /// reserved for [`Payload::timestamp`].
    pub fn ext(type_id: i8, bytes: impl Into<Bytes>) -> Result<Self> {
        if type_id == -1 {
            return Err(Error::InvalidType("ext type id -1 is reserved for Timestamp"));
        }
        Ok(Self::Ext(type_id, bytes.into()))
    }

    /// A Timestamp extension value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidType`] if `nanoseconds > 999_999_999`.
    pub fn timestamp(seconds: i64, nanoseconds: u32) -> Result<Self> {
        if nanoseconds > 999_999_999 {
            return Err(Error::InvalidType("timestamp nanoseconds out of range"));
        }
        Ok(Self::Timestamp(seconds, nanoseconds))
    }

    /// Strict accessor: the signed integer, or [`Error::InvalidType`] if
    /// this is not a [`Payload::Int`].
    pub fn as_int(&self) -> Result<i64> {
        match self {
            Self::Int(value) => Ok(*value),
            _ => Err(Error::InvalidType("expected int")),
        }
    }

    /// Strict accessor: the unsigned integer, or [`Error::InvalidType`] if
    /// this is not a [`Payload::Uint`].
    pub fn as_uint(&self) -> Result<u64> {
        match self {
            Self::Uint(value) => Ok(*value),
            _ => Err(Error::InvalidType("expected uint")),
        }
    }

    /// Strict accessor: the float, or [`Error::InvalidType`] if this is not
    /// a [`Payload::Float`].
    pub fn as_float(&self) -> Result<f64> {
        match self {
            Self::Float(value) => Ok(*value),
            _ => Err(Error::InvalidType("expected float")),
        }
    }

    /// Strict accessor: the boolean, or [`Error::InvalidType`] if this is
    /// not a [`Payload::Bool`].
    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Self::Bool(value) => Ok(*value),
            _ => Err(Error::InvalidType("expected bool")),
        }
    }

    /// Strict accessor: the string, validated as UTF-8 on access. Fails
    /// with [`Error::InvalidType`] if this is not a [`Payload::Str`] or the
    /// bytes are not valid UTF-8.
    pub fn as_str(&self) -> Result<&str> {
        match self {
            Self::Str(bytes) => {
                std::str::from_utf8(bytes).map_err(|_| Error::InvalidType("str payload is not valid UTF-8"))
            },
            _ => Err(Error::InvalidType("expected str")),
        }
    }

    /// Strict accessor: the string's raw bytes, without UTF-8 validation.
    pub fn as_str_bytes(&self) -> Result<&[u8]> {
        match self {
            Self::Str(bytes) => Ok(bytes),
            _ => Err(Error::InvalidType("expected str")),
        }
    }

    /// Strict accessor: the binary body, or [`Error::InvalidType`] if this
    /// is not a [`Payload::Bin`].
    pub fn as_bin(&self) -> Result<&[u8]> {
        match self {
            Self::Bin(bytes) => Ok(bytes),
            _ => Err(Error::InvalidType("expected bin")),
        }
    }

    /// Lenient accessor: a signed integer, admitting cross-conversion from
    /// [`Payload::Uint`] when the value fits in `i64`.
    pub fn get_int(&self) -> Result<i64> {
        match self {
            Self::Int(value) => Ok(*value),
            Self::Uint(value) => i64::try_from(*value).map_err(|_| Error::InvalidType("uint does not fit in i64")),
            _ => Err(Error::InvalidType("expected int or uint")),
        }
    }

    /// Lenient accessor: an unsigned integer, admitting cross-conversion
    /// from [`Payload::Int`] when the value fits in `u64`.
    pub fn get_uint(&self) -> Result<u64> {
        match self {
            Self::Uint(value) => Ok(*value),
            Self::Int(value) => u64::try_from(*value).map_err(|_| Error::InvalidType("int does not fit in u64")),
            _ => Err(Error::InvalidType("expected int or uint")),
        }
    }

    /// The array, or [`Error::InvalidType`] if this is not a
    /// [`Payload::Array`].
    pub fn as_array(&self) -> Result<&[Payload]> {
        match self {
            Self::Array(items) => Ok(items),
            _ => Err(Error::InvalidType("expected array")),
        }
    }

    /// A mutable view of the array, or [`Error::InvalidType`] if this is
    /// not a [`Payload::Array`].
    pub fn as_array_mut(&mut self) -> Result<&mut Vec<Payload>> {
        match self {
            Self::Array(items) => Ok(items),
            _ => Err(Error::InvalidType("expected array")),
        }
    }

    /// Number of elements, if this is an array.
    pub fn array_len(&self) -> Result<usize> {
        Ok(self.as_array()?.len())
    }

    /// Bounds-checked element access.
    pub fn array_get(&self, index: usize) -> Result<&Payload> {
        self.as_array()?.get(index).ok_or(Error::InvalidType("array index out of bounds"))
    }

    /// Bounds-checked element assignment.
    pub fn array_set(&mut self, index: usize, value: Payload) -> Result<()> {
        let slot = self.as_array_mut()?.get_mut(index).ok_or(Error::InvalidType("array index out of bounds"))?;
        *slot = value;
        Ok(())
    }

    /// The map, or [`Error::InvalidType`] if this is not a [`Payload::Map`].
    pub fn as_map(&self) -> Result<&PayloadMap> {
        match self {
            Self::Map(map) => Ok(map),
            _ => Err(Error::InvalidType("expected map")),
        }
    }

    /// A mutable view of the map, or [`Error::InvalidType`] if this is not
    /// a [`Payload::Map`].
    pub fn as_map_mut(&mut self) -> Result<&mut PayloadMap> {
        match self {
            Self::Map(map) => Ok(map),
            _ => Err(Error::InvalidType("expected map")),
        }
    }

    /// Sugar over [`PayloadMap::get_str`] for a map payload.
    pub fn map_get_str(&self, key: &str) -> Result<Option<&Payload>> {
        Ok(self.as_map()?.get_str(key))
    }

    /// Sugar over [`PayloadMap::insert_str`] for a map payload.
    pub fn map_put_str(&mut self, key: impl Into<Bytes>, value: Payload) -> Result<Option<Payload>> {
        self.as_map_mut()?.insert_str(key, value)
    }

    /// Sugar over [`PayloadMap::get`] for a map payload.
    pub fn map_get(&self, key: &Payload) -> Result<Option<&Payload>> {
        Ok(self.as_map()?.get(key))
    }

    /// Sugar over [`PayloadMap::insert`] for a map payload.
    pub fn map_put(&mut self, key: Payload, value: Payload) -> Result<Option<Payload>> {
        self.as_map_mut()?.insert(key, value)
    }
}

impl From<bool> for Payload {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Payload {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u64> for Payload {
    fn from(value: u64) -> Self {
        Self::Uint(value)
    }
}

impl From<f64> for Payload {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Self::Str(Bytes::copy_from_slice(value.as_bytes()))
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Self::Str(Bytes::from(value.into_bytes()))
    }
}

impl From<Vec<u8>> for Payload {
    fn from(value: Vec<u8>) -> Self {
        Self::Bin(Bytes::from(value))
    }
}

/// Structural equality: same variant, componentwise-equal content.
///
/// Floats compare with ordinary IEEE-754 `==` semantics, so a NaN payload
/// never equals anything, including another NaN — this is why NaN is
/// rejected as a map key ([`PayloadMap::insert`]) rather than merely
/// "working but never found again".
///
/// Maps compare as mappings (entry set equality), not by the order entries
/// were inserted in; arrays compare positionally.
impl PartialEq for Payload {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Nil, Self::Nil) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Uint(a), Self::Uint(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Bin(a), Self::Bin(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Ext(ta, ba), Self::Ext(tb, bb)) => ta == tb && ba == bb,
            (Self::Timestamp(sa, na), Self::Timestamp(sb, nb)) => sa == sb && na == nb,
            _ => false,
        }
    }
}

/// Structural hash consistent with [`PartialEq for Payload`](#impl-PartialEq-for-Payload).
///
/// Stable only within a single process lifetime (it is seeded by whatever
/// `std::collections::hash_map::DefaultHasher` does, which is explicitly
/// unspecified across Rust versions/processes) — matching spec's "Hashing
/// ... is stable within a single process lifetime only."
impl std::hash::Hash for Payload {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Nil => {},
            Self::Bool(value) => value.hash(state),
            Self::Int(value) => value.hash(state),
            Self::Uint(value) => value.hash(state),
            Self::Float(value) => {
                let bits = if *value == 0.0 { 0.0_f64.to_bits() } else { value.to_bits() };
                bits.hash(state);
            },
            Self::Str(bytes) | Self::Bin(bytes) => bytes.hash(state),
            Self::Array(items) => {
                for item in items {
                    item.hash(state);
                }
            },
            Self::Map(map) => map.hash(state),
            Self::Ext(type_id, bytes) => {
                type_id.hash(state);
                bytes.hash(state);
            },
            Self::Timestamp(seconds, nanos) => {
                seconds.hash(state);
                nanos.hash(state);
            },
        }
    }
}

/// Iterative teardown.
///
/// A deeply nested `Payload` built from adversarial decoder input must not
/// be freed by the compiler's default recursive drop glue — that would
/// recurse once per nesting level and could overflow the stack on exactly
/// the input `max_depth` exists to guard against. Instead, each container's
/// children are moved onto an explicit heap-allocated stack before they are
/// allowed to drop, so the Rust call stack never holds more than a constant
/// number of `Payload::drop` frames regardless of tree depth.
impl Drop for Payload {
    fn drop(&mut self) {
        let mut pending = match self {
            Self::Array(items) => std::mem::take(items),
            Self::Map(map) => {
                let mut items = Vec::new();
                for (key, value) in std::mem::take(map).into_entries() {
                    items.push(key);
                    items.push(value);
                }
                items
            },
            _ => return,
        };

        while let Some(mut value) = pending.pop() {
            match &mut value {
                Self::Array(items) => pending.extend(std::mem::take(items)),
                Self::Map(map) => {
                    for (key, nested) in std::mem::take(map).into_entries() {
                        pending.push(key);
                        pending.push(nested);
                    }
                },
                _ => {},
            }
            // `value`'s own drop glue runs when it falls out of scope here;
            // its containers are already empty, so that glue is O(1).
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_accessors_reject_wrong_variant() {
        assert!(Payload::Nil.as_int().is_err());
        assert_eq!(Payload::Int(5).as_int().unwrap(), 5);
        assert!(Payload::Int(5).as_uint().is_err());
    }

    #[test]
    fn lenient_accessors_cross_convert_in_range() {
        assert_eq!(Payload::Uint(5).get_int().unwrap(), 5);
        assert_eq!(Payload::Int(5).get_uint().unwrap(), 5);
        assert!(Payload::Int(-1).get_uint().is_err());
        assert!(Payload::Uint(u64::MAX).get_int().is_err());
    }

    #[test]
    fn ext_rejects_timestamp_type_id() {
        assert!(Payload::ext(-1, Bytes::new()).is_err());
        assert!(Payload::ext(5, Bytes::new()).is_ok());
    }

    #[test]
    fn timestamp_rejects_overflowing_nanos() {
        assert!(Payload::timestamp(0, 999_999_999).is_ok());
        assert!(Payload::timestamp(0, 1_000_000_000).is_err());
    }

    #[test]
    fn nan_never_equals_nan() {
        let a = Payload::Float(f64::NAN);
        let b = Payload::Float(f64::NAN);
        assert_ne!(a, b);
        assert_ne!(a, a.clone());
    }

    #[test]
    fn array_bounds_checked() {
        let mut arr = Payload::array(vec![Payload::int(1)]);
        assert!(arr.array_get(5).is_err());
        assert!(arr.array_set(5, Payload::int(2)).is_err());
        arr.array_set(0, Payload::int(9)).unwrap();
        assert_eq!(arr.array_get(0).unwrap(), &Payload::int(9));
    }

    #[test]
    fn deeply_nested_array_drops_without_overflow() {
        let mut value = Payload::array(vec![]);
        for _ in 0..200_000 {
            value = Payload::array(vec![value]);
        }
        drop(value);
    }

    fn hash_of(value: &Payload) -> u64 {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn positive_and_negative_zero_hash_equal() {
        let a = Payload::float(0.0);
        let b = Payload::float(-0.0);
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    proptest::proptest! {
        #[test]
        fn equal_non_nan_values_hash_equal(value: i64) {
            let a = Payload::int(value);
            let b = Payload::int(value);
            proptest::prop_assert_eq!(a.clone(), b.clone());
            proptest::prop_assert_eq!(hash_of(&a), hash_of(&b));
        }

        #[test]
        fn clone_is_structurally_equal(value: i64, text: String) {
            let payload = Payload::array(vec![Payload::int(value), Payload::str(text)]);
            proptest::prop_assert_eq!(payload.clone(), payload);
        }
    }
}
