//! View windows: read-only lenses over the full-year store.
//!
//! Week and fifteen-day windows always start on the 1st of the anchor
//! month; they are fixed spans, not rolling windows. The fifteen-day mode
//! covers 14 days.

use chrono::{Datelike, Duration, NaiveDate};
use hourgrid_core::Category;
use serde::{Deserialize, Serialize};

use crate::error::ViewError;
use crate::store::{CellState, CellStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    Week,
    FifteenDay,
    #[default]
    Month,
}

impl ViewMode {
    /// Fixed length in days, `None` for the calendar month.
    pub fn span_days(&self) -> Option<i64> {
        match self {
            ViewMode::Week => Some(7),
            ViewMode::FifteenDay => Some(14),
            ViewMode::Month => None,
        }
    }
}

impl std::fmt::Display for ViewMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViewMode::Week => write!(f, "week"),
            ViewMode::FifteenDay => write!(f, "fifteen_day"),
            ViewMode::Month => write!(f, "month"),
        }
    }
}

/// Projection parameters. Owns no data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewWindowConfig {
    pub mode: ViewMode,
    /// 1-based month
    pub anchor_month: u32,
    pub anchor_year: i32,
}

impl ViewWindowConfig {
    pub fn new(mode: ViewMode, anchor_month: u32, anchor_year: i32) -> Self {
        Self { mode, anchor_month, anchor_year }
    }

    pub fn range(&self) -> Result<DateRange, ViewError> {
        range(self)
    }
}

/// Inclusive date span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }

    pub fn len(&self) -> usize {
        ((self.end - self.start).num_days() + 1).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Date shown on view row `row`.
    pub fn date_at(&self, row: usize) -> Option<NaiveDate> {
        if row >= self.len() {
            return None;
        }
        self.start.checked_add_signed(Duration::days(row as i64))
    }

    pub fn row_of(&self, date: NaiveDate) -> Option<usize> {
        self.contains(date).then(|| (date - self.start).num_days() as usize)
    }
}

/// Visible date range for a window configuration.
pub fn range(config: &ViewWindowConfig) -> Result<DateRange, ViewError> {
    let invalid = || ViewError::InvalidAnchor {
        month: config.anchor_month,
        year: config.anchor_year,
    };
    let start = NaiveDate::from_ymd_opt(config.anchor_year, config.anchor_month, 1).ok_or_else(invalid)?;
    let end = match config.mode.span_days() {
        Some(days) => start + Duration::days(days - 1),
        None => last_day_of_month(start).ok_or_else(invalid)?,
    };
    Ok(DateRange { start, end })
}

fn last_day_of_month(first: NaiveDate) -> Option<NaiveDate> {
    let (year, month) = if first.month() == 12 {
        (first.year() + 1, 1)
    } else {
        (first.year(), first.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).and_then(|next| next.pred_opt())
}

/// One date row of the projected matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixRow {
    pub date: NaiveDate,
    /// One cell per category, in category order
    pub cells: Vec<CellState>,
    pub total: f64,
}

/// A slice of the store ready for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleMatrix {
    pub range: DateRange,
    pub categories: Vec<Category>,
    pub rows: Vec<MatrixRow>,
    /// Per-category sum over the window
    pub column_totals: Vec<f64>,
}

impl VisibleMatrix {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn col_count(&self) -> usize {
        self.categories.len()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&CellState> {
        self.rows.get(row).and_then(|r| r.cells.get(col))
    }

    pub fn grand_total(&self) -> f64 {
        self.column_totals.iter().sum()
    }
}

/// Slice `store` to `range` × `categories`. Pure read.
pub fn project(store: &CellStore, range: DateRange, categories: &[Category]) -> VisibleMatrix {
    let mut column_totals = vec![0.0; categories.len()];
    let rows = range
        .days()
        .map(|date| {
            let cells: Vec<CellState> = categories.iter().map(|c| store.read(date, &c.id)).collect();
            for (total, cell) in column_totals.iter_mut().zip(&cells) {
                *total += cell.value;
            }
            let total = cells.iter().map(|c| c.value).sum();
            MatrixRow { date, cells, total }
        })
        .collect();

    VisibleMatrix {
        range,
        categories: categories.to_vec(),
        rows,
        column_totals,
    }
}
