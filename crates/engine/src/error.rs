use std::fmt;

use chrono::NaiveDate;
use hourgrid_core::{BackendError, CategoryId};

use crate::capacity::CapacityError;
use crate::navigation::CellAddress;

/// A rejected local edit. The store is unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum EditError {
    /// The day would exceed its capacity.
    Capacity(CapacityError),
    /// Negative, NaN or infinite hours.
    InvalidValue(f64),
    /// Editor buffer is not a number.
    Unparsable(String),
    /// Date outside the year the grid holds.
    OutsideYear { date: NaiveDate, year: i32 },
    UnknownCategory(CategoryId),
    /// Address outside the current view window.
    OutOfView(CellAddress),
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Capacity(err) => write!(f, "{err}"),
            Self::InvalidValue(v) => write!(f, "invalid hours: {v}"),
            Self::Unparsable(text) => write!(f, "not a number: '{text}'"),
            Self::OutsideYear { date, year } => write!(f, "{date} is outside {year}"),
            Self::UnknownCategory(id) => write!(f, "unknown category: {id}"),
            Self::OutOfView(addr) => {
                write!(f, "row {}, column {} is outside the view", addr.row, addr.col)
            }
        }
    }
}

impl std::error::Error for EditError {}

impl From<CapacityError> for EditError {
    fn from(err: CapacityError) -> Self {
        Self::Capacity(err)
    }
}

/// Bad view window parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    InvalidAnchor { month: u32, year: i32 },
}

impl fmt::Display for ViewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAnchor { month, year } => write!(f, "invalid anchor month {month}/{year}"),
        }
    }
}

impl std::error::Error for ViewError {}

/// Grid-level failures that involve the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum GridError {
    /// Initial or refresh fetch failed; nothing was changed locally.
    Hydration(BackendError),
    /// Any other backend call (categories) failed.
    Backend(BackendError),
    View(ViewError),
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hydration(err) => write!(f, "could not load entries: {err}"),
            Self::Backend(err) => write!(f, "{err}"),
            Self::View(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for GridError {}

impl From<ViewError> for GridError {
    fn from(err: ViewError) -> Self {
        Self::View(err)
    }
}
