//! Value hashing for the secondary index
//!
//! The index key of every value is the low 64 bits of its XXH3-128 hash,
//! computed over the UTF-8 bytes with a fixed seed. The seed never varies
//! between processes, so runs stay comparable.

use xxhash_rust::xxh3::xxh3_128_with_seed;

/// Seed shared by every run unless overridden.
pub const DEFAULT_HASH_SEED: u64 = 0x1DE7_B3AC_C0FF_EE00;

/// Derives the 64-bit secondary-index key of a value.
///
/// Implementations must be pure: the same value always yields the same hash.
pub trait ValueHasher: Send + Sync {
    /// Hash a value
    fn hash(&self, value: &str) -> u64;
}

/// XXH3-128 based indexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Indexer {
    seed: u64,
}

impl Indexer {
    /// Indexer with [`DEFAULT_HASH_SEED`]
    pub fn new() -> Self {
        Self {
            seed: DEFAULT_HASH_SEED,
        }
    }

    /// Indexer with a caller-chosen fixed seed
    pub fn with_seed(seed: u64) -> Self {
        Self { seed }
    }

    /// Seed in use
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Full 128-bit hash of a value
    #[inline]
    pub fn hash128(&self, value: &str) -> u128 {
        xxh3_128_with_seed(value.as_bytes(), self.seed)
    }
}

impl Default for Indexer {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueHasher for Indexer {
    /// Low 64 bits of [`Indexer::hash128`]
    #[inline]
    fn hash(&self, value: &str) -> u64 {
        self.hash128(value) as u64
    }
}

impl<T: ValueHasher + ?Sized> ValueHasher for &T {
    #[inline]
    fn hash(&self, value: &str) -> u64 {
        (**self).hash(value)
    }
}

impl<T: ValueHasher + ?Sized> ValueHasher for std::sync::Arc<T> {
    #[inline]
    fn hash(&self, value: &str) -> u64 {
        (**self).hash(value)
    }
}
