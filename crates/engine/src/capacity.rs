//! Per-day capacity rule: the hours booked on one date, summed across all
//! categories, never exceed the daily maximum.

use chrono::NaiveDate;
use hourgrid_core::CategoryId;

use crate::store::{CellStore, EPSILON};

/// Hours available in one day.
pub const DAILY_CAPACITY: f64 = 24.0;

/// An edit that would overbook a day. The store is left untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct CapacityError {
    pub date: NaiveDate,
    /// Value the caller tried to write
    pub attempted: f64,
    /// Hours already booked on `date` by the other categories
    pub current_total: f64,
    pub limit: f64,
}

impl CapacityError {
    /// Largest value that would have been accepted.
    pub fn remaining(&self) -> f64 {
        (self.limit - self.current_total).max(0.0)
    }
}

impl std::fmt::Display for CapacityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}h already booked, adding {}h would exceed the {}h daily limit",
            self.date, self.current_total, self.attempted, self.limit
        )
    }
}

impl std::error::Error for CapacityError {}

/// Gatekeeper for every committed value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapacityValidator {
    limit: f64,
}

impl Default for CapacityValidator {
    fn default() -> Self {
        Self { limit: DAILY_CAPACITY }
    }
}

impl CapacityValidator {
    /// Hours booked on `date` by every category except `editing`.
    ///
    /// The cell under edit contributes nothing: its value is about to be
    /// replaced.
    pub fn day_total_excluding(&self, store: &CellStore, date: NaiveDate, editing: &CategoryId) -> f64 {
        store
            .categories()
            .iter()
            .filter(|c| *c != editing)
            .map(|c| store.value(date, c))
            .sum()
    }

    pub fn check(
        &self,
        store: &CellStore,
        date: NaiveDate,
        category: &CategoryId,
        new_value: f64,
    ) -> Result<(), CapacityError> {
        let current_total = self.day_total_excluding(store, date, category);
        // Slack only absorbs rounding in the sum; one cell never exceeds the limit.
        if new_value > self.limit || current_total + new_value > self.limit + EPSILON {
            return Err(CapacityError {
                date,
                attempted: new_value,
                current_total,
                limit: self.limit,
            });
        }
        Ok(())
    }

    /// Validate, then write through to the store.
    pub fn try_write(
        &self,
        store: &mut CellStore,
        date: NaiveDate,
        category: &CategoryId,
        new_value: f64,
        owner: Option<&str>,
    ) -> Result<(), CapacityError> {
        self.check(store, date, category, new_value)?;
        store.write(date, category, new_value, owner);
        Ok(())
    }
}
