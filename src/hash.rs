//! 32-bit FNV-1a hashing.
//!
//! Signatures and shader combination ids must be identical across runs and
//! platforms because they are persisted in pipeline cache files, so the std
//! `Hasher` family (randomly seeded or unspecified) is not usable here.
//! Integers are folded in little-endian byte order.

/// FNV-1a 32-bit offset basis.
pub const FNV1A_INITIAL_HASH_32: u32 = 0x811C_9DC5;

/// FNV-1a 32-bit prime.
pub const FNV1A_PRIME_32: u32 = 0x0100_0193;

/// Folds `bytes` into `hash`.
#[inline]
#[must_use]
pub const fn fnv1a_32(bytes: &[u8], mut hash: u32) -> u32 {
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u32;
        hash = hash.wrapping_mul(FNV1A_PRIME_32);
        i += 1;
    }
    hash
}

/// Stable 32-bit id for a property or asset name.
///
/// Usable in `const` context so property ids can be declared as constants.
#[inline]
#[must_use]
pub const fn string_id(name: &str) -> u32 {
    fnv1a_32(name.as_bytes(), FNV1A_INITIAL_HASH_32)
}

/// Incremental FNV-1a combinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fnv1a32(u32);

impl Default for Fnv1a32 {
    fn default() -> Self {
        Self::new()
    }
}

impl Fnv1a32 {
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self(FNV1A_INITIAL_HASH_32)
    }

    /// Starts a hash already seeded with `value`.
    #[inline]
    #[must_use]
    pub const fn seeded(value: u32) -> Self {
        Self::new().with_u32(value)
    }

    #[inline]
    #[must_use]
    pub const fn with_u32(self, value: u32) -> Self {
        Self(fnv1a_32(&value.to_le_bytes(), self.0))
    }

    #[inline]
    #[must_use]
    pub const fn with_i32(self, value: i32) -> Self {
        Self(fnv1a_32(&value.to_le_bytes(), self.0))
    }

    #[inline]
    pub fn write_u32(&mut self, value: u32) {
        *self = self.with_u32(value);
    }

    #[inline]
    pub fn write_i32(&mut self, value: i32) {
        *self = self.with_i32(value);
    }

    #[inline]
    #[must_use]
    pub const fn finish(self) -> u32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_vectors() {
        // Published FNV-1a 32-bit test vectors
        assert_eq!(string_id(""), 0x811C_9DC5);
        assert_eq!(string_id("a"), 0xE40C_292C);
        assert_eq!(string_id("foobar"), 0xBF9C_F968);
    }

    #[test]
    fn test_incremental_matches_bulk() {
        let mut hasher = Fnv1a32::new();
        hasher.write_u32(0x0403_0201);
        hasher.write_i32(-1);
        let bulk = fnv1a_32(&[1, 2, 3, 4, 0xFF, 0xFF, 0xFF, 0xFF], FNV1A_INITIAL_HASH_32);
        assert_eq!(hasher.finish(), bulk);
    }

    #[test]
    fn test_order_matters() {
        let a = Fnv1a32::new().with_u32(1).with_u32(2).finish();
        let b = Fnv1a32::new().with_u32(2).with_u32(1).finish();
        assert_ne!(a, b);
    }
}
