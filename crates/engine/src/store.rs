//! Full-year sparse cell store.
//!
//! Keyed by (date, category). Spans one calendar year regardless of what a
//! view window currently shows, so an edit made in week view is still there
//! when the user switches to month view. Entries are never removed: a
//! deleted cell is zeroed and loses its persisted id.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use hourgrid_core::{CategoryId, EntryRecord};

/// Float slack for hour comparisons (quarter hours sum exactly, tenths don't).
pub(crate) const EPSILON: f64 = 1e-9;

pub(crate) fn is_zero(value: f64) -> bool {
    value.abs() < EPSILON
}

pub(crate) fn same_value(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

/// Address of one cell in the store.
///
/// Ordering is date-major, so iterating the store walks day by day.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    pub date: NaiveDate,
    pub category: CategoryId,
}

impl CellKey {
    pub fn new(date: NaiveDate, category: &CategoryId) -> Self {
        Self { date, category: category.clone() }
    }
}

impl std::fmt::Display for CellKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.date, self.category)
    }
}

/// State of one (date, category) cell.
///
/// `persisted_id` doubles as the persisted flag: a cell is persisted iff it
/// carries a backend id.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CellState {
    /// Current hours
    pub value: f64,
    pub owner_ref: Option<String>,
    pub persisted_id: Option<String>,
    /// Hours as last confirmed by the backend
    pub baseline_value: f64,
    pub baseline_owner_ref: Option<String>,
}

impl CellState {
    pub fn is_persisted(&self) -> bool {
        self.persisted_id.is_some()
    }

    /// True when the cell differs from what the backend holds.
    pub fn is_dirty(&self) -> bool {
        if self.is_persisted() {
            !same_value(self.value, self.baseline_value) || self.owner_ref != self.baseline_owner_ref
        } else {
            !is_zero(self.value)
        }
    }

    /// Persisted, zeroed locally, but non-zero on the backend.
    pub fn is_pending_deletion(&self) -> bool {
        self.is_persisted() && is_zero(self.value) && self.baseline_value > EPSILON
    }

    /// Never persisted and never given a value.
    fn is_untouched(&self) -> bool {
        !self.is_persisted() && is_zero(self.value) && is_zero(self.baseline_value)
    }

    fn from_record(record: &EntryRecord) -> Self {
        Self {
            value: record.quantity,
            owner_ref: record.owner_ref.clone(),
            persisted_id: Some(record.persisted_id.clone()),
            baseline_value: record.quantity,
            baseline_owner_ref: record.owner_ref.clone(),
        }
    }

    /// Back to the implicit zero/unpersisted default.
    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Outcome of a hydration pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HydrateStats {
    /// Records overlaid onto cells
    pub applied: usize,
    /// Records overlaid onto cells that kept their unsaved local edit
    pub preserved_edits: usize,
    /// Persisted cells the fetch no longer returned
    pub vanished: usize,
    /// Records outside the store year
    pub skipped: usize,
}

/// The authoritative in-memory map for one subject and one year.
#[derive(Debug, Clone)]
pub struct CellStore {
    year: i32,
    categories: Vec<CategoryId>,
    cells: BTreeMap<CellKey, CellState>,
}

impl CellStore {
    /// Empty store for `year`. Cells appear as categories are added.
    pub fn new(year: i32) -> Self {
        Self { year, categories: Vec::new(), cells: BTreeMap::new() }
    }

    pub fn with_categories(year: i32, categories: impl IntoIterator<Item = CategoryId>) -> Self {
        let mut store = Self::new(year);
        for category in categories {
            store.add_category(category);
        }
        store
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// Categories in column order (insertion order).
    pub fn categories(&self) -> &[CategoryId] {
        &self.categories
    }

    pub fn has_category(&self, category: &CategoryId) -> bool {
        self.categories.contains(category)
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date.year() == self.year
    }

    /// Every date of the store year, January 1st first.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        let year = self.year;
        NaiveDate::from_ymd_opt(year, 1, 1)
            .into_iter()
            .flat_map(|first| first.iter_days())
            .take_while(move |d| d.year() == year)
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, 1, 1)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, 12, 31)
    }

    /// Extend every date with a fresh unpersisted zero cell for `category`.
    ///
    /// Existing cells are left alone. Returns false if the category was
    /// already known.
    pub fn add_category(&mut self, category: CategoryId) -> bool {
        if self.has_category(&category) {
            return false;
        }
        let dates: Vec<NaiveDate> = self.dates().collect();
        for date in dates {
            self.cells.entry(CellKey::new(date, &category)).or_default();
        }
        self.categories.push(category);
        true
    }

    /// Overlay a fetch onto the store.
    ///
    /// Every (date, category) of the year ends up materialized. Clean cells
    /// take the server state; cells holding unsaved local edits keep their
    /// value and owner and only adopt the server's id and baseline.
    pub fn hydrate(&mut self, records: &[EntryRecord]) -> HydrateStats {
        let mut stats = HydrateStats::default();
        let mut fetched: HashMap<CellKey, &EntryRecord> = HashMap::new();

        for record in records {
            if !self.contains_date(record.date) {
                log::warn!(
                    "hydrate: skipping entry {} dated {} outside {}",
                    record.persisted_id,
                    record.date,
                    self.year
                );
                stats.skipped += 1;
                continue;
            }
            if !self.has_category(&record.category_id) {
                log::debug!("hydrate: registering category {} from fetch", record.category_id);
                self.add_category(record.category_id.clone());
            }
            let key = CellKey::new(record.date, &record.category_id);
            if let Some(previous) = fetched.insert(key, record) {
                log::warn!(
                    "hydrate: entries {} and {} share {} {}, keeping the latter",
                    previous.persisted_id,
                    record.persisted_id,
                    record.date,
                    record.category_id
                );
            }
        }

        for (key, cell) in self.cells.iter_mut() {
            match fetched.get(key) {
                Some(record) if cell.is_dirty() => {
                    cell.persisted_id = Some(record.persisted_id.clone());
                    cell.baseline_value = record.quantity;
                    cell.baseline_owner_ref = record.owner_ref.clone();
                    stats.applied += 1;
                    stats.preserved_edits += 1;
                }
                Some(record) => {
                    *cell = CellState::from_record(record);
                    stats.applied += 1;
                }
                None if cell.is_persisted() => {
                    stats.vanished += 1;
                    if cell.is_dirty() && !is_zero(cell.value) {
                        // Local edit on a row the server dropped: re-create it.
                        cell.persisted_id = None;
                        cell.baseline_value = 0.0;
                        cell.baseline_owner_ref = None;
                    } else {
                        cell.reset();
                    }
                }
                None => {}
            }
        }

        stats
    }

    pub fn get(&self, date: NaiveDate, category: &CategoryId) -> Option<&CellState> {
        self.cells.get(&CellKey::new(date, category))
    }

    /// The cell, or the implicit zero/unpersisted default.
    pub fn read(&self, date: NaiveDate, category: &CategoryId) -> CellState {
        self.get(date, category).cloned().unwrap_or_default()
    }

    pub fn value(&self, date: NaiveDate, category: &CategoryId) -> f64 {
        self.get(date, category).map(|c| c.value).unwrap_or(0.0)
    }

    /// Store a value. Not validated here; callers go through
    /// `CapacityValidator::try_write`.
    ///
    /// `owner` of `None` keeps the cell's current owner. A cell coming into
    /// existence gets a zero baseline with its own owner, so a brand-new
    /// cell never reads as "changed from some prior owner".
    pub fn write(&mut self, date: NaiveDate, category: &CategoryId, value: f64, owner: Option<&str>) {
        if !self.has_category(category) {
            self.add_category(category.clone());
        }
        let cell = self.cells.entry(CellKey::new(date, category)).or_default();
        if cell.is_untouched() {
            cell.baseline_value = 0.0;
            cell.baseline_owner_ref = owner.map(str::to_string);
        }
        cell.value = value;
        if let Some(owner) = owner {
            cell.owner_ref = Some(owner.to_string());
        }
    }

    /// Reassign (or clear) the owner without touching the value.
    pub fn set_owner(&mut self, date: NaiveDate, category: &CategoryId, owner: Option<String>) {
        if !self.has_category(category) {
            self.add_category(category.clone());
        }
        let cell = self.cells.entry(CellKey::new(date, category)).or_default();
        cell.owner_ref = owner;
    }

    /// Sum of live values across all categories for `date`.
    pub fn day_total(&self, date: NaiveDate) -> f64 {
        self.categories.iter().map(|c| self.value(date, c)).sum()
    }

    /// All cells in (date, category) order.
    pub fn iter(&self) -> impl Iterator<Item = (&CellKey, &CellState)> {
        self.cells.iter()
    }

    pub(crate) fn get_mut(&mut self, key: &CellKey) -> Option<&mut CellState> {
        self.cells.get_mut(key)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn dirty_count(&self) -> usize {
        self.cells.values().filter(|c| c.is_dirty()).count()
    }
}
