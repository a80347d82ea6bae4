//! Hours API client: the REST `EntryBackend` plus local credential storage.
//!
//! No grid concepts. No retries.

mod auth;
mod client;

pub use auth::{auth_file_path, delete_auth, load_auth, load_auth_from, save_auth, save_auth_to, AuthCredentials};
pub use client::{HoursClient, DEFAULT_TIMEOUT_SECS};
