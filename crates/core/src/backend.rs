//! Persistence contract consumed by the grid engine.
//!
//! The engine never talks HTTP itself: it drives an `EntryBackend`. The
//! REST client implements it for production, the engine's in-memory
//! backend implements it for tests.

use chrono::NaiveDate;

use crate::model::{Category, CategoryId, EntryPayload, EntryRecord};

/// Error type for backend operations.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendError {
    /// No credentials configured
    NotAuthenticated,
    /// Transport failure (connection refused, DNS, TLS, ...)
    Network(String),
    /// Request exceeded the client timeout
    Timeout(String),
    /// HTTP error with status code
    Http(u16, String),
    /// Server rejected the payload (400/422)
    Validation(String),
    /// Record does not exist (404)
    NotFound(String),
    /// Response body could not be understood
    Parse(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAuthenticated => write!(f, "Not authenticated, run `hgrid login` first"),
            BackendError::Network(msg) => write!(f, "Network error: {}", msg),
            BackendError::Timeout(msg) => write!(f, "Timeout: {}", msg),
            BackendError::Http(code, msg) => write!(f, "HTTP {}: {}", code, msg),
            BackendError::Validation(msg) => write!(f, "Rejected: {}", msg),
            BackendError::NotFound(what) => write!(f, "Not found: {}", what),
            BackendError::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

/// The generic CRUD backend the grid reconciles against.
///
/// Calls are blocking and issued one at a time by the engine.
pub trait EntryBackend {
    /// All persisted rows for `subject_id` with `from <= date <= to`.
    fn fetch_entries(
        &self,
        subject_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<EntryRecord>, BackendError>;

    /// Create a row, returning its backend id.
    fn create_entry(&self, subject_id: &str, entry: &EntryPayload) -> Result<String, BackendError>;

    fn update_entry(&self, persisted_id: &str, entry: &EntryPayload) -> Result<(), BackendError>;

    fn delete_entry(&self, persisted_id: &str) -> Result<(), BackendError>;

    /// Categories available in a subject context (e.g. the equipment type).
    fn list_categories(&self, context_id: &str) -> Result<Vec<Category>, BackendError>;

    /// Create a category inline from the grid.
    fn create_category(&self, name: &str) -> Result<CategoryId, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(BackendError::Http(500, "boom".into()).to_string(), "HTTP 500: boom");
        assert_eq!(BackendError::NotFound("E1".into()).to_string(), "Not found: E1");
        assert!(BackendError::NotAuthenticated.to_string().contains("hgrid login"));
    }
}
