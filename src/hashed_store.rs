use std::hash::{BuildHasher, Hash};
use std::mem;

use tracing::debug;

use crate::error::{Error, Result};
use crate::sdbm::BuildSdbmHasher;

/// Hard ceiling on the number of slots in a table.
pub const MAX_CAPACITY: usize = 10_000_000;
/// Requested capacity of a default table, rounded up to a prime on construction.
pub const DEFAULT_CAPACITY: usize = 1_024;
/// Live entries may occupy at most this fraction of the slots.
pub const MAX_LOAD_FACTOR: f64 = 0.5;

enum Slot<K, V> {
    Empty,
    Occupied(K, V),
    Tombstone,
}

/// Where a probe for a key ended up.
enum Probe {
    /// A live slot holding an equal key.
    Found(usize),
    /// The key is absent; this is the slot an insertion should use.
    Vacant(usize),
}

/// Open-addressing hash table with linear probing and tombstone deletion.
///
/// The slot count is always an odd prime. Whenever live entries would
/// exceed half the slots, the table is rebuilt at the next prime past twice
/// its size; growth past [`MAX_CAPACITY`] is refused with
/// [`Error::CapacityExceeded`] and leaves the table untouched.
pub struct HashedStore<K, V, S = BuildSdbmHasher> {
    slots: Vec<Slot<K, V>>,
    len: usize,
    hasher: S,
}

impl<K: Hash + Eq, V> HashedStore<K, V, BuildSdbmHasher> {
    pub fn new() -> Result<Self> {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Self::with_capacity_and_hasher(capacity, BuildSdbmHasher)
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> HashedStore<K, V, S> {
    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Result<Self> {
        check_capacity(capacity)?;
        let capacity = next_prime(capacity);
        check_capacity(capacity)?;

        Ok(HashedStore {
            slots: empty_slots(capacity),
            len: 0,
            hasher,
        })
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots in the backing array.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Inserts `value` under `key`, returning the value it replaced.
    ///
    /// Inserting a new key may grow the table. If growth would pass
    /// [`MAX_CAPACITY`] the insertion is rejected and nothing changes.
    pub fn add(&mut self, key: K, value: V) -> Result<Option<V>> {
        let index = match self.probe(&key) {
            Probe::Found(index) => {
                let Slot::Occupied(_, current) = &mut self.slots[index] else {
                    unreachable!("probe reported a live slot that is not occupied");
                };
                return Ok(Some(mem::replace(current, value)));
            }
            Probe::Vacant(index) => index,
        };

        let grow_to = if self.exceeds_load(self.len + 1) {
            Some(self.next_capacity()?)
        } else {
            None
        };

        self.slots[index] = Slot::Occupied(key, value);
        self.len += 1;

        if let Some(capacity) = grow_to {
            self.rehash(capacity);
        }
        Ok(None)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        let index = self.find(key)?;
        match &self.slots[index] {
            Slot::Occupied(_, value) => Some(value),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let index = self.find(key)?;
        match &mut self.slots[index] {
            Slot::Occupied(_, value) => Some(value),
            _ => None,
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Removes `key`, leaving a tombstone in its slot.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let index = self.find(key)?;
        match mem::replace(&mut self.slots[index], Slot::Tombstone) {
            Slot::Occupied(_, value) => {
                self.len -= 1;
                Some(value)
            }
            other => {
                self.slots[index] = other;
                None
            }
        }
    }

    /// Empties every slot without changing the capacity.
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = Slot::Empty;
        }
        self.len = 0;
    }

    /// Live entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.slots.iter().filter_map(|slot| match slot {
            Slot::Occupied(key, value) => Some((key, value)),
            _ => None,
        })
    }

    fn home_index(&self, key: &K) -> usize {
        let capacity = self.slots.len() as i64;
        let mut index = (self.hasher.hash_one(key) as i64) % capacity;
        if index < 0 {
            index += capacity;
        }
        index as usize
    }

    fn find(&self, key: &K) -> Option<usize> {
        match self.probe(key) {
            Probe::Found(index) => Some(index),
            Probe::Vacant(_) => None,
        }
    }

    /// Walks the probe sequence from the key's home slot.
    ///
    /// Stops at an equal live key or at the first empty slot. The first
    /// tombstone passed on the way is the preferred insertion point. The
    /// walk visits each slot at most once, so a table with no empty slot
    /// left still terminates.
    fn probe(&self, key: &K) -> Probe {
        let capacity = self.slots.len();
        let mut index = self.home_index(key);
        let mut first_tombstone = None;

        for _ in 0..capacity {
            match &self.slots[index] {
                Slot::Empty => return Probe::Vacant(first_tombstone.unwrap_or(index)),
                Slot::Occupied(existing, _) if existing == key => return Probe::Found(index),
                Slot::Occupied(..) => {}
                Slot::Tombstone => {
                    first_tombstone.get_or_insert(index);
                }
            }
            index = (index + 1) % capacity;
        }

        // Live entries never fill more than half the table, so a full cycle
        // without an empty slot must have passed a tombstone.
        Probe::Vacant(first_tombstone.unwrap_or(index))
    }

    fn exceeds_load(&self, len: usize) -> bool {
        len as f64 > MAX_LOAD_FACTOR * self.slots.len() as f64
    }

    fn next_capacity(&self) -> Result<usize> {
        let doubled = self.slots.len().saturating_mul(2);
        check_capacity(doubled)?;
        let capacity = next_prime(doubled);
        check_capacity(capacity)?;
        Ok(capacity)
    }

    /// Moves every live entry into a fresh table of `capacity` slots,
    /// dropping tombstones.
    fn rehash(&mut self, capacity: usize) {
        debug!(
            old_capacity = self.slots.len(),
            new_capacity = capacity,
            entries = self.len,
            "growing hashed store"
        );

        let old = mem::replace(&mut self.slots, empty_slots(capacity));
        for slot in old {
            if let Slot::Occupied(key, value) = slot {
                let mut index = self.home_index(&key);
                while !matches!(self.slots[index], Slot::Empty) {
                    index = (index + 1) % capacity;
                }
                self.slots[index] = Slot::Occupied(key, value);
            }
        }
    }
}

fn empty_slots<K, V>(capacity: usize) -> Vec<Slot<K, V>> {
    let mut slots = Vec::with_capacity(capacity);
    slots.resize_with(capacity, || Slot::Empty);
    slots
}

fn check_capacity(capacity: usize) -> Result<()> {
    if capacity > MAX_CAPACITY {
        return Err(Error::CapacityExceeded {
            requested: capacity,
            limit: MAX_CAPACITY,
        });
    }
    Ok(())
}

/// Smallest odd prime that is at least `n`, stepping through odd numbers.
fn next_prime(n: usize) -> usize {
    let mut candidate = if n % 2 == 0 { n + 1 } else { n };
    while !is_prime(candidate) {
        candidate += 2;
    }
    candidate
}

fn is_prime(n: usize) -> bool {
    if n < 2 || n % 2 == 0 {
        return n == 2;
    }
    let mut divisor = 3;
    while divisor * divisor <= n {
        if n % divisor == 0 {
            return false;
        }
        divisor += 2;
    }
    true
}
