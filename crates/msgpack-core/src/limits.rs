//! Decode resource limits.
//!
//! [`ParseLimits`] is the only configuration surface this crate has: six
//! caps the decoder checks a declared length or the current nesting depth
//! against *before* performing any allocation or read proportional to that
//! value. There is no config file format — callers construct one in-process
//! via consuming `with_*` builder methods, the same pattern other builder
//! types in this crate's ecosystem use.

/// Bounds on what the decoder will accept from untrusted input.
///
/// # Invariants
///
/// Every field here is compared against a decoded length *before* any
/// allocation or read of the bytes that length describes. This is what
/// makes the decoder safe to point at adversarial input: a header claiming
/// a billion-element array is rejected the moment its length prefix is
/// read, never after attempting to allocate for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseLimits {
    max_depth: usize,
    max_array_length: usize,
    max_map_size: usize,
    max_string_length: usize,
    max_bin_length: usize,
    max_ext_length: usize,
}

const MIB: usize = 1024 * 1024;

impl ParseLimits {
    /// Default nesting depth cap.
    pub const DEFAULT_MAX_DEPTH: usize = 1000;
    /// Default array length cap.
    pub const DEFAULT_MAX_ARRAY_LENGTH: usize = 1_000_000;
    /// Default map size cap.
    pub const DEFAULT_MAX_MAP_SIZE: usize = 1_000_000;
    /// Default string length cap (100 MiB).
    pub const DEFAULT_MAX_STRING_LENGTH: usize = 100 * MIB;
    /// Default binary length cap (100 MiB).
    pub const DEFAULT_MAX_BIN_LENGTH: usize = 100 * MIB;
    /// Default ext payload length cap (100 MiB).
    pub const DEFAULT_MAX_EXT_LENGTH: usize = 100 * MIB;

    /// Start from the default limits (see the `DEFAULT_*` associated
    /// constants), then narrow with the `with_*` builder methods.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_depth: Self::DEFAULT_MAX_DEPTH,
            max_array_length: Self::DEFAULT_MAX_ARRAY_LENGTH,
            max_map_size: Self::DEFAULT_MAX_MAP_SIZE,
            max_string_length: Self::DEFAULT_MAX_STRING_LENGTH,
            max_bin_length: Self::DEFAULT_MAX_BIN_LENGTH,
            max_ext_length: Self::DEFAULT_MAX_EXT_LENGTH,
        }
    }

    /// Override the maximum container-nesting depth.
    #[must_use]
    pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Override the maximum array element count.
    #[must_use]
    pub const fn with_max_array_length(mut self, max_array_length: usize) -> Self {
        self.max_array_length = max_array_length;
        self
    }

    /// Override the maximum map entry count.
    #[must_use]
    pub const fn with_max_map_size(mut self, max_map_size: usize) -> Self {
        self.max_map_size = max_map_size;
        self
    }

    /// Override the maximum string byte length.
    #[must_use]
    pub const fn with_max_string_length(mut self, max_string_length: usize) -> Self {
        self.max_string_length = max_string_length;
        self
    }

    /// Override the maximum binary byte length.
    #[must_use]
    pub const fn with_max_bin_length(mut self, max_bin_length: usize) -> Self {
        self.max_bin_length = max_bin_length;
        self
    }

    /// Override the maximum ext payload byte length.
    #[must_use]
    pub const fn with_max_ext_length(mut self, max_ext_length: usize) -> Self {
        self.max_ext_length = max_ext_length;
        self
    }

    /// Maximum container-nesting depth.
    #[must_use]
    pub const fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Maximum array element count.
    #[must_use]
    pub const fn max_array_length(&self) -> usize {
        self.max_array_length
    }

    /// Maximum map entry count.
    #[must_use]
    pub const fn max_map_size(&self) -> usize {
        self.max_map_size
    }

    /// Maximum string byte length.
    #[must_use]
    pub const fn max_string_length(&self) -> usize {
        self.max_string_length
    }

    /// Maximum binary byte length.
    #[must_use]
    pub const fn max_bin_length(&self) -> usize {
        self.max_bin_length
    }

    /// Maximum ext payload byte length.
    #[must_use]
    pub const fn max_ext_length(&self) -> usize {
        self.max_ext_length
    }
}

impl Default for ParseLimits {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let limits = ParseLimits::default();
        assert_eq!(limits.max_depth(), 1000);
        assert_eq!(limits.max_array_length(), 1_000_000);
        assert_eq!(limits.max_map_size(), 1_000_000);
        assert_eq!(limits.max_string_length(), 100 * MIB);
        assert_eq!(limits.max_bin_length(), 100 * MIB);
        assert_eq!(limits.max_ext_length(), 100 * MIB);
    }

    #[test]
    fn builder_overrides_only_named_field() {
        let limits = ParseLimits::new().with_max_depth(10);
        assert_eq!(limits.max_depth(), 10);
        assert_eq!(limits.max_array_length(), ParseLimits::DEFAULT_MAX_ARRAY_LENGTH);
    }
}
