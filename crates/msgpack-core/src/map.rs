//! The map value's storage representation.
//!
//! MessagePack map keys are arbitrary values, not just strings, so
//! [`PayloadMap`] cannot simply be a `std::collections::HashMap` keyed by
//! [`Payload`] (that would require `Payload: Eq + Hash` with the usual
//! float-NaN headaches baked into the trait bound itself rather than
//! handled explicitly at insertion). Instead it is an insertion-ordered
//! `Vec` of entries, with a `Box<str>`-keyed index maintained alongside it
//! as a fast path for the overwhelmingly common case of string keys —
//! object-shaped maps, the one this crate's callers build and consume the
//! most.

use std::collections::HashMap;

use bytes::Bytes;

use crate::{
    error::{Error, Result},
    payload::Payload,
};

/// Storage for a MessagePack map value.
///
/// Lookup and insertion by a UTF-8 string key ([`PayloadMap::get_str`],
/// [`PayloadMap::insert_str`]) are O(1) via an internal index. Lookup and
/// insertion by an arbitrary [`Payload`] key fall back to a linear scan
/// unless that key happens to be a valid-UTF-8 string, in which case they
/// also take the fast path.
#[derive(Debug, Clone, Default)]
pub struct PayloadMap {
    entries: Vec<(Payload, Payload)>,
    string_index: HashMap<Box<str>, usize>,
}

impl PayloadMap {
    /// An empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty map with room for `capacity` entries without reallocating.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self { entries: Vec::with_capacity(capacity), string_index: HashMap::with_capacity(capacity) }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(key, value)` pairs in insertion order (subject to the
    /// last-write-wins rule described on [`PayloadMap::insert`]).
    pub fn iter(&self) -> std::slice::Iter<'_, (Payload, Payload)> {
        self.entries.iter()
    }

    /// Consume the map, returning its entries in insertion order.
    pub(crate) fn into_entries(self) -> Vec<(Payload, Payload)> {
        self.entries
    }

    fn utf8_key(bytes: &[u8]) -> Option<&str> {
        std::str::from_utf8(bytes).ok()
    }

    /// Look up a value by arbitrary key, using the string fast path when
    /// `key` is a valid-UTF-8 [`Payload::Str`].
    pub fn get(&self, key: &Payload) -> Option<&Payload> {
        if let Payload::Str(bytes) = key {
            if let Some(key) = Self::utf8_key(bytes) {
                return self.get_str(key);
            }
        }
        self.entries.iter().find(|(candidate, _)| candidate == key).map(|(_, value)| value)
    }

    /// Look up a value by UTF-8 string key. O(1).
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&Payload> {
        self.string_index.get(key).and_then(|&index| self.entries.get(index)).map(|(_, value)| value)
    }

    /// Insert a key-value pair.
    ///
    /// If `key` already exists, its value is replaced in place (the entry
    /// keeps its original position) and the previous value is returned.
    /// This gives last-occurrence-wins semantics for the duplicate-key case
    /// the decoder may encounter on untrusted input, without disturbing
    /// iteration order for every other entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidType`] if `key` is a NaN float: such a key
    /// can never compare equal to itself, so it could never be looked back
    /// up, and is rejected here rather than silently accepted and orphaned.
    pub fn insert(&mut self, key: Payload, value: Payload) -> Result<Option<Payload>> {
        if let Payload::Float(f) = &key {
            if f.is_nan() {
                return Err(Error::InvalidType("NaN is not a valid map key"));
            }
        }

        if let Payload::Str(bytes) = &key {
            if let Some(s) = Self::utf8_key(bytes) {
                let s: Box<str> = s.into();
                if let Some(&index) = self.string_index.get(&s) {
                    let previous = std::mem::replace(&mut self.entries[index].1, value);
                    return Ok(Some(previous));
                }
                let index = self.entries.len();
                self.entries.push((key, value));
                self.string_index.insert(s, index);
                return Ok(None);
            }
        }

        if let Some(index) = self.entries.iter().position(|(candidate, _)| candidate == &key) {
            let previous = std::mem::replace(&mut self.entries[index].1, value);
            return Ok(Some(previous));
        }
        self.entries.push((key, value));
        Ok(None)
    }

    /// Sugar over [`PayloadMap::insert`] for a UTF-8 string key.
    ///
    /// # Errors
    ///
    /// See [`PayloadMap::insert`].
    pub fn insert_str(&mut self, key: impl Into<Bytes>, value: Payload) -> Result<Option<Payload>> {
        self.insert(Payload::Str(key.into()), value)
    }
}

/// Map equality is entry-set equality: two maps are equal when they have
/// the same number of entries and every key in one maps to an equal value
/// in the other, regardless of insertion order.
impl PartialEq for PayloadMap {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.entries.iter().all(|(key, value)| other.get(key) == Some(value))
    }
}

/// Order-independent hash, consistent with the entry-set [`PartialEq`]
/// above: entries are hashed individually and combined with XOR so that
/// two maps with the same entries in different orders hash identically.
impl std::hash::Hash for PayloadMap {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        let mut combined: u64 = 0;
        for (key, value) in &self.entries {
            let mut entry_hasher = std::collections::hash_map::DefaultHasher::new();
            key.hash(&mut entry_hasher);
            value.hash(&mut entry_hasher);
            combined ^= entry_hasher.finish();
        }
        combined.hash(state);
    }
}
