use crate::{hashed_store, ranked_store};

/// Construction-time sizing for a [`FrequencyIndex`](crate::FrequencyIndex).
///
/// Both stores grow on demand, so these are starting points rather than
/// limits. Neither may exceed 10,000,000.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexConfig {
    /// Requested slot count of the hash table; rounded up to a prime.
    pub table_capacity: usize,
    /// Initial length of the ranking array.
    pub ranking_capacity: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig {
            table_capacity: hashed_store::DEFAULT_CAPACITY,
            ranking_capacity: ranked_store::DEFAULT_CAPACITY,
        }
    }
}

impl IndexConfig {
    /// Sizes both stores for about `distinct_keys` keys without growing.
    pub fn for_distinct_keys(distinct_keys: usize) -> Self {
        IndexConfig {
            table_capacity: distinct_keys.saturating_mul(2).saturating_add(1),
            ranking_capacity: distinct_keys.saturating_add(distinct_keys / 9 + 1),
        }
    }
}
