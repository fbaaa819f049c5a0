use thiserror::Error;

/// Errors returned by the stores and the frequency index.
///
/// A lookup that finds nothing is not an error; it is reported as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A store was constructed with, or would have to grow past, more slots
    /// than the hard ceiling allows.
    #[error("capacity {requested} exceeds the limit of {limit} slots")]
    CapacityExceeded { requested: usize, limit: usize },

    /// A rank query asked for a position outside `[0, len)`.
    #[error("rank {index} is out of bounds for {len} entries")]
    IndexOutOfBounds { index: usize, len: usize },

    /// The caller broke the contract of an operation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, Error>;
