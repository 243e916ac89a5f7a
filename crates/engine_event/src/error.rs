//! Event-layer error types.

/// Errors returned by the checked event channel accessors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    /// The logical index is not live: either reclaimed or not yet pushed.
    #[error("event index {index} out of range (live events are {first}..{end})")]
    OutOfRange {
        /// The requested logical index.
        index: usize,
        /// Oldest live index.
        first: usize,
        /// Index the next pushed event will get.
        end: usize,
    },
}
