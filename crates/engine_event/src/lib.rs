//! # engine_event
//!
//! Event fan-out for systems that consume the same stream at their own pace.
//!
//! This crate provides:
//!
//! - [`EventChannel`] — append-only event storage with read-count based
//!   reclamation.
//! - [`EventReader`] — a per-system cursor with optional mask filtering.
//! - [`error`] — event-layer error types.

pub mod channel;
pub mod error;
pub mod reader;

pub use channel::{DEFAULT_FILTER_MASK, DEFAULT_PUSH_MASK, EventChannel, EventMask};
pub use error::EventError;
pub use reader::{EventReader, Read, mask_passes};
