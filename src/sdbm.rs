use std::hash::{BuildHasher, Hasher};

/// Running sdbm hash over the bytes written to it.
///
/// The state is a wrapping 32-bit signed accumulator, so the same payload
/// always produces the same value regardless of platform.
#[derive(Debug, Clone, Copy, Default)]
pub struct SdbmHasher {
    state: i32,
}

impl SdbmHasher {
    /// Hashes a byte slice in one go.
    #[inline]
    pub fn hash_bytes(bytes: &[u8]) -> i32 {
        let mut hasher = Self::default();
        hasher.write(bytes);
        hasher.state
    }

    /// Current accumulator value.
    #[inline]
    pub fn value(&self) -> i32 {
        self.state
    }
}

impl Hasher for SdbmHasher {
    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            let h = self.state;
            self.state = (byte as i32)
                .wrapping_add(h.wrapping_shl(6))
                .wrapping_add(h.wrapping_shl(16))
                .wrapping_sub(h);
        }
    }

    /// Sign-extends the accumulator so negative hashes stay negative when
    /// the table reinterprets the result as `i64`.
    #[inline]
    fn finish(&self) -> u64 {
        self.state as i64 as u64
    }
}

/// Builds [`SdbmHasher`]s. This is the default hasher of
/// [`HashedStore`](crate::HashedStore).
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildSdbmHasher;

impl BuildHasher for BuildSdbmHasher {
    type Hasher = SdbmHasher;

    #[inline]
    fn build_hasher(&self) -> SdbmHasher {
        SdbmHasher::default()
    }
}
