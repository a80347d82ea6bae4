//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain    | Description                                 |
//! |---------|-----------|---------------------------------------------|
//! | 0       | Universal | Success                                     |
//! | 1       | Universal | General error (unspecified)                 |
//! | 2       | Universal | CLI usage error (bad args, missing context) |
//! | 10-19   | backend   | Auth, transport and server rejections       |
//! | 20-29   | grid      | Loading, edit validation, partial saves     |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use hourgrid_core::BackendError;
use hourgrid_engine::{EditError, GridError};

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Backend (10-19)
// =============================================================================

/// No saved token, or the server refused it (401/403).
pub const EXIT_NOT_AUTH: u8 = 10;

/// Network failure, unexpected HTTP status or unreadable response.
pub const EXIT_NETWORK: u8 = 11;

/// Server rejected the request (400/422) or the record is gone (404).
pub const EXIT_REJECTED: u8 = 12;

/// Request exceeded the configured timeout.
pub const EXIT_TIMEOUT: u8 = 13;

// =============================================================================
// Grid (20-29)
// =============================================================================

/// Entries could not be loaded; nothing was changed.
pub const EXIT_HYDRATION: u8 = 20;

/// Edit would push a day past its capacity.
pub const EXIT_CAPACITY: u8 = 21;

/// Edit rejected locally (negative hours, unknown category, wrong year).
pub const EXIT_INVALID_EDIT: u8 = 22;

/// Save ran but at least one operation failed.
pub const EXIT_PARTIAL_SAVE: u8 = 23;

// =============================================================================
// Error mapping
// =============================================================================

pub fn backend_exit_code(err: &BackendError) -> u8 {
    match err {
        BackendError::NotAuthenticated => EXIT_NOT_AUTH,
        BackendError::Network(_) | BackendError::Http(..) | BackendError::Parse(_) => EXIT_NETWORK,
        BackendError::Validation(_) | BackendError::NotFound(_) => EXIT_REJECTED,
        BackendError::Timeout(_) => EXIT_TIMEOUT,
    }
}

pub fn grid_exit_code(err: &GridError) -> u8 {
    match err {
        GridError::Hydration(BackendError::NotAuthenticated) => EXIT_NOT_AUTH,
        GridError::Hydration(_) => EXIT_HYDRATION,
        GridError::Backend(e) => backend_exit_code(e),
        GridError::View(_) => EXIT_USAGE,
    }
}

pub fn edit_exit_code(err: &EditError) -> u8 {
    match err {
        EditError::Capacity(_) => EXIT_CAPACITY,
        _ => EXIT_INVALID_EDIT,
    }
}
