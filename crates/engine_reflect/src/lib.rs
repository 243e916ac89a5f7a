//! # engine_reflect
//!
//! Runtime reflection for the engine's exchange layer: lets generic code
//! inspect and mutate values whose concrete type it never names.
//!
//! This crate provides:
//!
//! - [`TypeInfo`] — erased type descriptors with stable FNV-1a ids.
//! - [`DictionaryView`] — a capability table over any mapping-like type,
//!   walked through [`Cursor`] / [`ConstCursor`].
//! - [`bindings`] — ready-made tables for `HashMap`, `BTreeMap`,
//!   association lists and fixed-size arrays.

pub mod bindings;
pub mod dictionary;
pub mod error;
pub mod type_info;

pub use bindings::Dictionary;
pub use dictionary::{ConstCursor, Cursor, CursorHandle, DictionaryOps, DictionaryView, Entries};
pub use error::ReflectError;
pub use type_info::{ReflectTypeId, TypeInfo};
