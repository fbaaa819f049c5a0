use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::key::WeightedKey;

/// Hard ceiling on the number of entries the backing array may hold.
pub const MAX_CAPACITY: usize = 10_000_000;
pub const DEFAULT_CAPACITY: usize = 1_024;
/// The backing array grows once occupancy passes this fraction.
pub const MAX_LOAD_FACTOR: f64 = 0.9;
/// A run-adaptive stable sort is used while at most this fraction of the
/// entries changed since the last sort.
pub const SORT_RATIO: f64 = 0.3;

const MIN_CAPACITY: usize = 2;

/// Puts entries into rank order (see [`WeightedKey::rank_cmp`]).
#[cfg_attr(test, mockall::automock)]
pub trait Sorter {
    /// `dirty` is the number of appends and updates since the slice was
    /// last sorted.
    fn sort(&mut self, entries: &mut [WeightedKey], dirty: usize);
}

/// Merges existing sorted runs when few entries changed, otherwise does a
/// full unstable sort.
#[derive(Debug, Default, Clone, Copy)]
pub struct AdaptiveSort;

impl Sorter for AdaptiveSort {
    fn sort(&mut self, entries: &mut [WeightedKey], dirty: usize) {
        if dirty as f64 <= SORT_RATIO * entries.len() as f64 {
            trace!(entries = entries.len(), dirty, "run-merging sort");
            entries.sort_by(WeightedKey::rank_cmp);
        } else {
            trace!(entries = entries.len(), dirty, "unstable sort");
            entries.sort_unstable_by(WeightedKey::rank_cmp);
        }
    }
}

/// Densely packed array of weighted keys answering "which key holds rank n".
///
/// Sorting is deferred to the first rank query after a mutation, so a
/// burst of appends and updates costs one sort rather than one per
/// mutation. Entries are never removed; the caller appends each distinct
/// payload once and updates it in place afterwards.
pub struct RankedStore<S = AdaptiveSort> {
    entries: Vec<WeightedKey>,
    capacity: usize,
    max_capacity: usize,
    dirty: usize,
    sorter: S,
}

impl RankedStore<AdaptiveSort> {
    pub fn new() -> Result<Self> {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Self::with_capacity_and_sorter(capacity, AdaptiveSort)
    }
}

impl<S: Sorter> RankedStore<S> {
    pub fn with_capacity_and_sorter(capacity: usize, sorter: S) -> Result<Self> {
        Self::with_limit(capacity, MAX_CAPACITY, sorter)
    }

    /// Like [`with_capacity_and_sorter`](Self::with_capacity_and_sorter)
    /// with a lower ceiling than [`MAX_CAPACITY`].
    pub(crate) fn with_limit(capacity: usize, max_capacity: usize, sorter: S) -> Result<Self> {
        if capacity > max_capacity {
            return Err(Error::CapacityExceeded {
                requested: capacity,
                limit: max_capacity,
            });
        }
        Ok(RankedStore {
            entries: Vec::with_capacity(capacity),
            capacity,
            max_capacity,
            dirty: 0,
            sorter,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True when the entries are in rank order right now.
    pub fn is_sorted(&self) -> bool {
        self.dirty == 0
    }

    /// Appends `item` at the end, growing the backing array if needed.
    pub fn add(&mut self, item: WeightedKey) -> Result<()> {
        self.reserve_one()?;
        self.entries.push(item);
        self.dirty += 1;
        Ok(())
    }

    /// Replaces the entry with the same payload as `item`, returning the
    /// entry it replaced, or `None` if no entry matched.
    ///
    /// While the store is sorted this binary searches at `item`'s own
    /// weight, which only hits when the weight is unchanged; otherwise it
    /// scans. Use [`update_entry_from`](Self::update_entry_from) when the
    /// old weight is known.
    pub fn update_entry(&mut self, item: WeightedKey) -> Option<WeightedKey> {
        self.update_entry_from(item.weight(), item)
    }

    /// Like [`update_entry`](Self::update_entry), but binary searches at
    /// the entry's weight before this update while the store is sorted.
    /// A hint that misses falls back to a linear scan.
    pub fn update_entry_from(
        &mut self,
        previous_weight: i64,
        item: WeightedKey,
    ) -> Option<WeightedKey> {
        let position = if self.is_sorted() {
            self.position_sorted(previous_weight, &item)
                .or_else(|| self.position_linear(&item))
        } else {
            self.position_linear(&item)
        };
        self.replace_at(position, item)
    }

    /// The entry at zero-based rank `n`, highest weight first.
    pub fn get_n_max(&mut self, n: usize) -> Result<&WeightedKey> {
        if n >= self.entries.len() {
            return Err(Error::IndexOutOfBounds {
                index: n,
                len: self.entries.len(),
            });
        }
        self.ensure_sorted();
        Ok(&self.entries[n])
    }

    /// The first `k` entries in rank order (fewer if the store is smaller).
    pub fn top(&mut self, k: usize) -> &[WeightedKey] {
        self.ensure_sorted();
        let k = k.min(self.entries.len());
        &self.entries[..k]
    }

    fn ensure_sorted(&mut self) {
        if !self.is_sorted() {
            self.sorter.sort(&mut self.entries, self.dirty);
            self.dirty = 0;
        }
    }

    fn position_linear(&self, item: &WeightedKey) -> Option<usize> {
        self.entries.iter().position(|entry| entry == item)
    }

    fn position_sorted(&self, previous_weight: i64, item: &WeightedKey) -> Option<usize> {
        self.entries
            .binary_search_by(|entry| {
                previous_weight
                    .cmp(&entry.weight())
                    .then_with(|| item.payload().cmp(entry.payload()))
            })
            .ok()
    }

    fn replace_at(&mut self, position: Option<usize>, item: WeightedKey) -> Option<WeightedKey> {
        // Any replacement may break the global order, whichever search found it.
        self.dirty += 1;
        let position = position?;
        Some(std::mem::replace(&mut self.entries[position], item))
    }

    fn reserve_one(&mut self) -> Result<()> {
        let needed = self.entries.len() + 1;
        if needed as f64 <= MAX_LOAD_FACTOR * self.capacity as f64 {
            return Ok(());
        }

        let grown = self
            .capacity
            .saturating_mul(2)
            .max(MIN_CAPACITY)
            .min(self.max_capacity);
        if grown > self.capacity {
            debug!(
                old_capacity = self.capacity,
                new_capacity = grown,
                entries = self.entries.len(),
                "growing ranked store"
            );
            self.entries.reserve_exact(grown - self.entries.len());
            self.capacity = grown;
        } else if needed > self.capacity {
            return Err(Error::CapacityExceeded {
                requested: needed,
                limit: self.max_capacity,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    fn populated(weights: &[(&str, i64)]) -> RankedStore {
        let mut store = RankedStore::new().unwrap();
        for (payload, weight) in weights {
            store.add(WeightedKey::new(*payload, *weight)).unwrap();
        }
        store
    }

    fn ranks(store: &mut RankedStore) -> Vec<String> {
        (0..store.len())
            .map(|n| store.get_n_max(n).unwrap().payload().to_string())
            .collect()
    }

    #[test]
    fn test_new() {
        let store = RankedStore::new().unwrap();
        assert_eq!(store.len(), 0);
        assert_eq!(store.capacity(), DEFAULT_CAPACITY);
        assert!(store.is_empty());
        assert!(store.is_sorted());
    }

    #[test]
    fn test_rank_order() {
        let mut store = populated(&[("a", 5), ("b", 3), ("c", 9), ("d", 3)]);
        assert_eq!(store.get_n_max(0).unwrap().payload(), "c");
        assert_eq!(store.get_n_max(0).unwrap().weight(), 9);
        assert_eq!(store.get_n_max(1).unwrap().payload(), "a");
        assert_eq!(store.get_n_max(2).unwrap().payload(), "d");
        assert_eq!(store.get_n_max(3).unwrap().payload(), "b");
    }

    #[test]
    fn test_out_of_range_rank() {
        let mut store = populated(&[("a", 1), ("b", 2)]);
        assert_eq!(
            store.get_n_max(2).unwrap_err(),
            Error::IndexOutOfBounds { index: 2, len: 2 }
        );

        let mut empty = RankedStore::new().unwrap();
        assert!(matches!(
            empty.get_n_max(0),
            Err(Error::IndexOutOfBounds { index: 0, len: 0 })
        ));
    }

    #[test]
    fn test_add_marks_unsorted() {
        let mut store = populated(&[("a", 1)]);
        assert!(!store.is_sorted());
        store.get_n_max(0).unwrap();
        assert!(store.is_sorted());
        store.add(WeightedKey::new("b", 2)).unwrap();
        assert!(!store.is_sorted());
        assert_eq!(store.get_n_max(0).unwrap().payload(), "b");
    }

    #[test]
    fn test_update_entry_unsorted() {
        let mut store = populated(&[("a", 1), ("b", 2), ("c", 3)]);
        let old = store.update_entry(WeightedKey::new("a", 10)).unwrap();
        assert_eq!(old.weight(), 1);
        assert_eq!(ranks(&mut store), vec!["a", "c", "b"]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_update_entry_from_sorted() {
        let mut store = populated(&[("a", 1), ("b", 2), ("c", 3), ("d", 4), ("e", 5)]);
        store.get_n_max(0).unwrap();
        assert!(store.is_sorted());

        let old = store.update_entry_from(2, WeightedKey::new("b", 7)).unwrap();
        assert_eq!(old.weight(), 2);
        assert!(!store.is_sorted());
        assert_eq!(ranks(&mut store), vec!["b", "e", "d", "c", "a"]);
    }

    #[test]
    fn test_update_entry_from_wrong_hint_falls_back() {
        let mut store = populated(&[("a", 1), ("b", 2), ("c", 3)]);
        store.get_n_max(0).unwrap();

        let old = store.update_entry_from(99, WeightedKey::new("a", 4)).unwrap();
        assert_eq!(old.weight(), 1);
        assert_eq!(store.get_n_max(0).unwrap().payload(), "a");
    }

    #[test]
    fn test_update_missing_entry() {
        let mut store = populated(&[("a", 1)]);
        assert!(store.update_entry(WeightedKey::new("zzz", 4)).is_none());
        assert!(store.update_entry_from(0, WeightedKey::new("zzz", 4)).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_growth() {
        let mut store = RankedStore::with_capacity(10).unwrap();
        for i in 0..9 {
            store.add(WeightedKey::new(format!("item{}", i), i)).unwrap();
        }
        assert_eq!(store.capacity(), 10);
        store.add(WeightedKey::new("item9", 9)).unwrap();
        assert_eq!(store.capacity(), 20);
        assert_eq!(store.get_n_max(0).unwrap().payload(), "item9");
    }

    #[test]
    fn test_growth_from_zero_capacity() {
        let mut store = RankedStore::with_capacity(0).unwrap();
        for i in 0..100 {
            store.add(WeightedKey::new(format!("item{}", i), i)).unwrap();
            assert!(store.len() <= store.capacity());
        }
        assert_eq!(store.get_n_max(99).unwrap().payload(), "item0");
    }

    #[test]
    fn test_capacity_ceiling() {
        let result = RankedStore::with_capacity(MAX_CAPACITY + 1);
        assert_eq!(
            result.err(),
            Some(Error::CapacityExceeded {
                requested: MAX_CAPACITY + 1,
                limit: MAX_CAPACITY
            })
        );
    }

    #[test]
    fn test_growth_clamps_at_ceiling_then_refuses() {
        let mut store = RankedStore::with_limit(4, 6, AdaptiveSort).unwrap();
        for i in 0..3 {
            store.add(WeightedKey::new(format!("item{}", i), i)).unwrap();
        }
        assert_eq!(store.capacity(), 4);

        // Doubling to 8 is clamped to the ceiling of 6.
        store.add(WeightedKey::new("item3", 3)).unwrap();
        assert_eq!(store.capacity(), 6);

        store.add(WeightedKey::new("item4", 4)).unwrap();
        store.add(WeightedKey::new("item5", 5)).unwrap();
        assert_eq!(store.len(), 6);

        assert_eq!(
            store.add(WeightedKey::new("item6", 6)).unwrap_err(),
            Error::CapacityExceeded {
                requested: 7,
                limit: 6
            }
        );
        assert_eq!(store.len(), 6);
        assert_eq!(store.capacity(), 6);
        assert_eq!(store.get_n_max(0).unwrap().payload(), "item5");
    }

    #[test]
    fn test_construction_above_custom_ceiling() {
        assert!(matches!(
            RankedStore::with_limit(7, 6, AdaptiveSort),
            Err(Error::CapacityExceeded { requested: 7, limit: 6 })
        ));
    }

    #[test]
    fn test_top() {
        let mut store = populated(&[("a", 5), ("b", 3), ("c", 9)]);
        let top: Vec<_> = store.top(2).iter().map(|k| k.payload()).collect();
        assert_eq!(top, vec!["c", "a"]);
        assert_eq!(store.top(10).len(), 3);
    }

    #[test]
    fn test_sort_runs_once_per_mutation_burst() {
        let mut sorter = MockSorter::new();
        sorter
            .expect_sort()
            .times(1)
            .returning(|entries, _| entries.sort_unstable_by(WeightedKey::rank_cmp));

        let mut store = RankedStore::with_capacity_and_sorter(16, sorter).unwrap();
        for (payload, weight) in [("a", 5), ("b", 3), ("c", 9), ("d", 3)] {
            store.add(WeightedKey::new(payload, weight)).unwrap();
        }

        let first = store.get_n_max(1).unwrap().clone();
        let second = store.get_n_max(1).unwrap().clone();
        assert_eq!(first, second);
        assert_eq!(second.payload(), "a");
        assert_eq!(store.top(4).len(), 4);
    }

    #[test]
    fn test_update_triggers_new_sort() {
        let mut sorter = MockSorter::new();
        sorter
            .expect_sort()
            .times(2)
            .returning(|entries, _| entries.sort_unstable_by(WeightedKey::rank_cmp));

        let mut store = RankedStore::with_capacity_and_sorter(16, sorter).unwrap();
        store.add(WeightedKey::new("a", 1)).unwrap();
        store.add(WeightedKey::new("b", 2)).unwrap();
        assert_eq!(store.get_n_max(0).unwrap().payload(), "b");

        store.update_entry_from(1, WeightedKey::new("a", 3));
        assert_eq!(store.get_n_max(0).unwrap().payload(), "a");
        assert_eq!(store.get_n_max(1).unwrap().payload(), "b");
    }

    #[test]
    fn test_adaptive_sort_matches_full_sort() {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut store = RankedStore::with_capacity(8).unwrap();
        let mut weights = Vec::new();

        for i in 0..300 {
            let weight = rng.random_range(0..50);
            store.add(WeightedKey::new(format!("k{}", i), weight)).unwrap();
            weights.push(weight);
        }
        store.get_n_max(0).unwrap();

        // A handful of updates keeps the dirty count under the run-merging
        // threshold; a large burst pushes it over.
        for burst in [5, 200] {
            for _ in 0..burst {
                let i = rng.random_range(0..weights.len());
                let previous = weights[i];
                weights[i] += rng.random_range(1..10);
                let item = WeightedKey::new(format!("k{}", i), weights[i]);
                store.update_entry_from(previous, item);
            }

            let mut expected: Vec<_> = weights
                .iter()
                .enumerate()
                .map(|(i, w)| WeightedKey::new(format!("k{}", i), *w))
                .collect();
            expected.sort_by(WeightedKey::rank_cmp);

            let actual: Vec<_> = store
                .top(weights.len())
                .iter()
                .map(|k| (k.payload(), k.weight()))
                .collect();
            let expected: Vec<_> = expected.iter().map(|k| (k.payload(), k.weight())).collect();
            assert_eq!(actual, expected);
        }
    }

    #[test]
    fn test_adaptive_sort_both_paths() {
        for dirty in [0, 4] {
            let mut entries = vec![
                WeightedKey::new("a", 1),
                WeightedKey::new("b", 3),
                WeightedKey::new("c", 3),
                WeightedKey::new("d", 2),
            ];
            AdaptiveSort.sort(&mut entries, dirty);
            let order: Vec<_> = entries.iter().map(|k| k.payload()).collect();
            assert_eq!(order, vec!["c", "b", "d", "a"]);
        }
    }

    #[test]
    fn test_bottom_fraction_bumped_to_top() {
        let n = 5_000;
        let mut store = RankedStore::with_capacity(n).unwrap();
        for i in 0..n {
            store.add(WeightedKey::new(format!("k{:05}", i), i as i64)).unwrap();
        }
        store.get_n_max(0).unwrap();

        // Exactly SORT_RATIO of the entries, so the run-merging path is taken.
        let bumped = (SORT_RATIO * n as f64) as usize;
        for i in 0..bumped {
            let item = WeightedKey::new(format!("k{:05}", i), (n + i) as i64);
            assert!(store.update_entry_from(i as i64, item).is_some());
        }

        let top = store.top(n);
        for (rank, entry) in top.iter().take(bumped).enumerate() {
            assert_eq!(entry.weight(), (n + bumped - 1 - rank) as i64);
        }
        for pair in top.windows(2) {
            assert!(pair[0].weight() > pair[1].weight());
        }
        assert_eq!(top[bumped].weight(), (n - 1) as i64);
        assert_eq!(top[n - 1].payload(), format!("k{:05}", bumped));
    }

    #[test]
    fn test_update_entry_sorted_same_weight() {
        let mut store = populated(&[("a", 1), ("b", 2), ("c", 3)]);
        store.get_n_max(0).unwrap();

        let old = store.update_entry(WeightedKey::new("b", 2)).unwrap();
        assert_eq!(old.payload(), "b");

        // A changed weight misses the binary search and falls back to the scan.
        store.get_n_max(0).unwrap();
        let old = store.update_entry(WeightedKey::new("a", 9)).unwrap();
        assert_eq!(old.weight(), 1);
        assert_eq!(ranks(&mut store), vec!["a", "c", "b"]);
    }
}
