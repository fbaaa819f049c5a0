use std::hash::BuildHasher;

use tracing::warn;

use crate::config::IndexConfig;
use crate::error::{Error, Result};
use crate::hashed_store::HashedStore;
use crate::key::WeightedKey;
use crate::ranked_store::RankedStore;
use crate::sdbm::BuildSdbmHasher;

/// Exact occurrence counts for string keys, with rank queries.
///
/// Counts live in a [`HashedStore`]; a [`RankedStore`] holds a copy of each
/// key weighted by its count. Every [`record`](Self::record) updates the
/// hash table first and the ranking second, and undoes the first step if
/// the second fails, so the two never disagree once a call returns.
pub struct FrequencyIndex<S = BuildSdbmHasher> {
    counts: HashedStore<WeightedKey, i64, S>,
    ranking: RankedStore,
}

impl FrequencyIndex<BuildSdbmHasher> {
    pub fn new() -> Result<Self> {
        Self::with_config(IndexConfig::default())
    }

    pub fn with_config(config: IndexConfig) -> Result<Self> {
        Self::with_config_and_hasher(config, BuildSdbmHasher)
    }
}

impl<S: BuildHasher> FrequencyIndex<S> {
    pub fn with_config_and_hasher(config: IndexConfig, hasher: S) -> Result<Self> {
        Ok(FrequencyIndex {
            counts: HashedStore::with_capacity_and_hasher(config.table_capacity, hasher)?,
            ranking: RankedStore::with_capacity(config.ranking_capacity)?,
        })
    }

    /// Adds `amount` occurrences of `key` and returns its new count.
    pub fn record(&mut self, key: &str, amount: i64) -> Result<i64> {
        let lookup = WeightedKey::unweighted(key);

        match self.counts.get(&lookup).copied() {
            Some(previous) => {
                let count = previous.checked_add(amount).ok_or_else(|| {
                    Error::InvalidArgument(format!(
                        "count for {:?} overflows: {} + {}",
                        key, previous, amount
                    ))
                })?;
                self.counts.add(lookup, count)?;
                let replaced = self
                    .ranking
                    .update_entry_from(previous, WeightedKey::new(key, count));
                debug_assert!(replaced.is_some(), "ranking lost track of {:?}", key);
                Ok(count)
            }
            None => {
                self.counts.add(WeightedKey::new(key, amount), amount)?;
                if let Err(err) = self.ranking.add(WeightedKey::new(key, amount)) {
                    warn!(key, %err, "ranking store refused a new key, rolling back its count");
                    self.counts.remove(&lookup);
                    return Err(err);
                }
                Ok(amount)
            }
        }
    }

    /// Count for `key`, or `None` if it was never recorded.
    pub fn get(&self, key: &str) -> Option<i64> {
        self.counts.get(&WeightedKey::unweighted(key)).copied()
    }

    /// Count for `key`, zero if it was never recorded.
    pub fn count(&self, key: &str) -> i64 {
        self.get(key).unwrap_or(0)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.counts.contains(&WeightedKey::unweighted(key))
    }

    /// Key at zero-based rank `n`, most frequent first.
    pub fn nth_most_frequent(&mut self, n: usize) -> Result<&str> {
        self.ranking.get_n_max(n).map(WeightedKey::payload)
    }

    /// Up to `k` keys with their counts, most frequent first.
    pub fn top(&mut self, k: usize) -> impl Iterator<Item = (&str, i64)> {
        self.ranking
            .top(k)
            .iter()
            .map(|entry| (entry.payload(), entry.weight()))
    }

    /// Number of distinct keys recorded.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}
