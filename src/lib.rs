//! Exact frequency counting for a stream of string keys, with rank queries.
//!
//! Two structures do the work:
//!
//! - [`HashedStore`], an open-addressing hash table with linear probing,
//!   tombstone deletion and prime-sized growth, holds the exact count of
//!   every key.
//! - [`RankedStore`], an array of [`WeightedKey`]s that sorts itself lazily
//!   and adaptively, answers "which key holds rank n".
//!
//! [`FrequencyIndex`] keeps the two in step.
//!
//! ```
//! use freqrank::FrequencyIndex;
//!
//! let mut index = FrequencyIndex::new().unwrap();
//! index.record("cat", 1).unwrap();
//! index.record("dog", 2).unwrap();
//! index.record("cat", 3).unwrap();
//!
//! assert_eq!(index.get("cat"), Some(4));
//! assert_eq!(index.nth_most_frequent(0).unwrap(), "cat");
//! ```

mod config;
mod error;
mod index;
mod key;
mod sdbm;

pub mod hashed_store;
pub mod ranked_store;

pub use config::IndexConfig;
pub use error::{Error, Result};
pub use hashed_store::HashedStore;
pub use index::FrequencyIndex;
pub use key::WeightedKey;
pub use ranked_store::{AdaptiveSort, RankedStore, Sorter};
pub use sdbm::{BuildSdbmHasher, SdbmHasher};
