//! Data-layer error types.

/// Errors returned by the checked (`try_*`) reference map operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReferenceMapError {
    /// Pairs cannot be added to a map backed by lookup functions.
    #[error("reference map is bound to lookup functions")]
    FunctionBound,

    /// No reference is mapped to the given id.
    #[error("no reference mapped to id {0}")]
    MissingId(String),

    /// No id is mapped to the given reference.
    #[error("no id mapped to reference {0}")]
    MissingReference(String),
}
