//! Reflection error types.

/// Errors returned by the checked (`try_*`) reflection accessors.
///
/// Contract violations such as projecting through a null cursor still panic;
/// these variants cover mismatches a generic caller can reasonably probe for.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReflectError {
    /// A value did not have the type the view was bound to.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Name of the type the view expects.
        expected: &'static str,
        /// Name of the type that was requested or supplied.
        found: &'static str,
    },

    /// The cursor has already been stopped or never found an entry.
    #[error("cursor is null")]
    NullCursor,
}
