use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::sdbm::SdbmHasher;

/// A string key carrying a mutable weight (its occurrence count).
///
/// Identity is the payload alone: equality and hashing ignore the weight,
/// so `WeightedKey::new("x", 1) == WeightedKey::new("x", 99)`. Ordering is
/// by weight ascending, with equal weights broken by the payload in reverse
/// lexicographic order.
#[derive(Debug, Clone)]
pub struct WeightedKey {
    payload: String,
    weight: i64,
}

impl WeightedKey {
    pub fn new(payload: impl Into<String>, weight: i64) -> Self {
        WeightedKey {
            payload: payload.into(),
            weight,
        }
    }

    /// A key with weight zero, used for lookups.
    pub fn unweighted(payload: impl Into<String>) -> Self {
        Self::new(payload, 0)
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn weight(&self) -> i64 {
        self.weight
    }

    pub fn set_weight(&mut self, weight: i64) {
        self.weight = weight;
    }

    /// Returns a copy of this key with a different weight.
    pub fn with_weight(&self, weight: i64) -> Self {
        Self::new(self.payload.clone(), weight)
    }

    /// The sdbm hash of the payload.
    pub fn sdbm_hash(&self) -> i32 {
        SdbmHasher::hash_bytes(self.payload.as_bytes())
    }

    /// Position order used by the ranked store: highest weight first, and
    /// among equal weights the lexicographically larger payload first.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .weight
            .cmp(&self.weight)
            .then_with(|| other.payload.cmp(&self.payload))
    }

    pub fn into_payload(self) -> String {
        self.payload
    }
}

impl PartialEq for WeightedKey {
    fn eq(&self, other: &Self) -> bool {
        self.payload == other.payload
    }
}

impl Eq for WeightedKey {}

impl PartialEq<str> for WeightedKey {
    fn eq(&self, other: &str) -> bool {
        self.payload == other
    }
}

impl PartialEq<&str> for WeightedKey {
    fn eq(&self, other: &&str) -> bool {
        self.payload == *other
    }
}

// Writes the raw payload bytes only, so that hashing through
// `BuildSdbmHasher` yields exactly `sdbm_hash`.
impl Hash for WeightedKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write(self.payload.as_bytes());
    }
}

impl PartialOrd for WeightedKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Not consistent with `Eq` when weights differ for the same payload; the
// stores never hold two keys with the same payload.
impl Ord for WeightedKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.weight
            .cmp(&other.weight)
            .then_with(|| other.payload.cmp(&self.payload))
    }
}

impl fmt::Display for WeightedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.payload)
    }
}
