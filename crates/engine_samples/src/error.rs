//! Sample driver error types.

use engine_data::ReferenceMapError;
use engine_reflect::ReflectError;

/// Errors raised while saving or restoring a reflected dictionary.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// Failed to encode the saved entries to MessagePack.
    #[error("failed to encode entries: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// Failed to decode saved entries from MessagePack.
    #[error("failed to decode entries: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// A key or value did not have the type the driver was asked for.
    #[error(transparent)]
    Reflect(#[from] ReflectError),

    /// A reference had no stable id, or an id no live reference.
    #[error(transparent)]
    Reference(#[from] ReferenceMapError),

    /// The saved data names a key or value type other than the target's.
    #[error("saved data has type id {found:#018x}, dictionary expects `{expected}`")]
    SavedTypeMismatch {
        /// Name of the type the target dictionary is bound to.
        expected: &'static str,
        /// Stable type id found in the saved data.
        found: u64,
    },

    /// The target dictionary cannot accept new entries.
    #[error("dictionary of `{0}` values cannot insert entries")]
    NotInsertable(&'static str),
}
