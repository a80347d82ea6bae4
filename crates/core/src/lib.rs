//! `hourgrid-core`: shared types for the hour grid.
//!
//! Wire-level records exchanged with the entries backend and the
//! `EntryBackend` contract itself. No engine state, no HTTP.

pub mod backend;
pub mod model;

pub use backend::{BackendError, EntryBackend};
pub use model::{Category, CategoryId, EntryPayload, EntryRecord};
