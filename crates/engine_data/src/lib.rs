//! # engine_data
//!
//! Support for translating references while serializing.
//!
//! This crate provides:
//!
//! - [`ReferenceMap`] — reference ↔ identifier lookup, backed by an explicit
//!   [`ReferenceTable`] or by caller-supplied functions.
//! - [`error`] — data-layer error types.

pub mod error;
pub mod reference_map;

pub use error::ReferenceMapError;
pub use reference_map::{
    DeserializeFn, ReferenceFunctions, ReferenceMap, ReferenceTable, SerializeFn,
};
