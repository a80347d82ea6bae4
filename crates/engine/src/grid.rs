//! `TimeGrid`: the host-facing editor for one subject and one year.
//!
//! Holds the cell store, the deletion queue and the navigator, and wires
//! them to a backend: hydrate on open, project on render, validate on edit,
//! reconcile on save.

use chrono::NaiveDate;
use hourgrid_core::{Category, CategoryId, EntryBackend};

use crate::capacity::CapacityValidator;
use crate::deletion::DeletionQueue;
use crate::error::{EditError, GridError, ViewError};
use crate::navigation::{clamp, CellAddress, GridNavigator, KeyEffect, KeyInput, KeyOutcome, NavCommand, NavMode};
use crate::reconcile::{self, ReconcileOptions, ReconcilePlan, ReconcileResult};
use crate::store::{is_zero, CellKey, CellState, CellStore, HydrateStats};
use crate::view::{self, DateRange, ViewMode, ViewWindowConfig, VisibleMatrix};

pub struct TimeGrid {
    subject_id: String,
    store: CellStore,
    deletions: DeletionQueue,
    categories: Vec<Category>,
    validator: CapacityValidator,
    options: ReconcileOptions,
    view: ViewWindowConfig,
    window: DateRange,
    nav: GridNavigator,
    owner_candidates: Vec<String>,
}

impl TimeGrid {
    /// Empty grid for `subject_id` covering `year`, showing January.
    pub fn new(subject_id: impl Into<String>, year: i32, categories: Vec<Category>) -> Self {
        let store = CellStore::with_categories(year, categories.iter().map(|c| c.id.clone()));
        let view = ViewWindowConfig::new(ViewMode::Month, 1, year);
        let window = match view.range() {
            Ok(window) => window,
            Err(_) => {
                let first = store.first_date().unwrap_or_default();
                DateRange { start: first, end: first }
            }
        };
        Self {
            subject_id: subject_id.into(),
            store,
            deletions: DeletionQueue::new(),
            categories,
            validator: CapacityValidator::default(),
            options: ReconcileOptions::default(),
            view,
            window,
            nav: GridNavigator::new(),
            owner_candidates: Vec::new(),
        }
    }

    /// Load categories for `context_id` and hydrate the full year.
    pub fn open<B: EntryBackend + ?Sized>(
        backend: &B,
        subject_id: &str,
        context_id: &str,
        year: i32,
    ) -> Result<Self, GridError> {
        let categories = backend.list_categories(context_id).map_err(GridError::Backend)?;
        let mut grid = Self::new(subject_id, year, categories);
        grid.refresh(backend)?;
        Ok(grid)
    }

    /// Re-fetch the year and merge it into the store.
    ///
    /// On failure the store is left exactly as it was.
    pub fn refresh<B: EntryBackend + ?Sized>(&mut self, backend: &B) -> Result<HydrateStats, GridError> {
        let (Some(from), Some(to)) = (self.store.first_date(), self.store.last_date()) else {
            return Ok(HydrateStats::default());
        };
        let records = backend
            .fetch_entries(&self.subject_id, from, to)
            .map_err(GridError::Hydration)?;
        let stats = self.store.hydrate(&records);

        // Categories seen only in the fetch get a placeholder name.
        for id in self.store.categories() {
            if !self.categories.iter().any(|c| &c.id == id) {
                self.categories.push(Category::new(id.clone(), id.to_string()));
            }
        }

        let store = &self.store;
        self.deletions.retain(|id, key| {
            store.get(key.date, &key.category).and_then(|c| c.persisted_id.as_deref()) == Some(id)
        });

        log::debug!(
            "hydrated {} for {}: {} applied, {} kept local edits, {} vanished",
            self.subject_id,
            self.store.year(),
            stats.applied,
            stats.preserved_edits,
            stats.vanished
        );
        Ok(stats)
    }

    pub fn with_options(mut self, options: ReconcileOptions) -> Self {
        self.options = options;
        self
    }

    pub fn set_owner_candidates(&mut self, owners: Vec<String>) {
        self.owner_candidates = owners;
    }

    pub fn owner_candidates(&self) -> &[String] {
        &self.owner_candidates
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn year(&self) -> i32 {
        self.store.year()
    }

    pub fn store(&self) -> &CellStore {
        &self.store
    }

    pub fn deletions(&self) -> &DeletionQueue {
        &self.deletions
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category_by_name(&self, name: &str) -> Option<&Category> {
        self.categories
            .iter()
            .find(|c| c.id.as_str() == name || c.name.eq_ignore_ascii_case(name))
    }

    // -----------------------------------------------------------------------
    // View
    // -----------------------------------------------------------------------

    pub fn view(&self) -> ViewWindowConfig {
        self.view
    }

    pub fn window(&self) -> DateRange {
        self.window
    }

    /// Switch the view window. Focus is clamped to the new shape.
    pub fn set_view(&mut self, config: ViewWindowConfig) -> Result<DateRange, ViewError> {
        let window = config.range()?;
        self.view = config;
        self.window = window;
        self.nav.focus = clamp(self.nav.focus, window.len(), self.categories.len());
        Ok(window)
    }

    /// Project any window over the store without changing the current one.
    pub fn visible_matrix(&self, config: ViewWindowConfig) -> Result<VisibleMatrix, ViewError> {
        Ok(view::project(&self.store, config.range()?, &self.categories))
    }

    pub fn current_matrix(&self) -> VisibleMatrix {
        view::project(&self.store, self.window, &self.categories)
    }

    // -----------------------------------------------------------------------
    // Edits
    // -----------------------------------------------------------------------

    pub fn cell(&self, date: NaiveDate, category: &CategoryId) -> CellState {
        self.store.read(date, category)
    }

    /// Validate and store a value. A non-zero value on a cell queued for
    /// deletion cancels that deletion.
    pub fn edit_cell(
        &mut self,
        date: NaiveDate,
        category: &CategoryId,
        value: f64,
        owner: Option<&str>,
    ) -> Result<(), EditError> {
        if !value.is_finite() || value < 0.0 {
            return Err(EditError::InvalidValue(value));
        }
        self.check_target(date, category)?;
        self.validator.try_write(&mut self.store, date, category, value, owner)?;

        if !is_zero(value) {
            if let Some(id) = self.store.get(date, category).and_then(|c| c.persisted_id.clone()) {
                if self.deletions.cancel(&id) {
                    log::debug!("edit on {date} {category} cancelled pending delete of {id}");
                }
            }
        }
        Ok(())
    }

    /// Zero a cell; a persisted one is also queued for deletion.
    ///
    /// Returns whether a deletion was queued.
    pub fn mark_deleted(&mut self, date: NaiveDate, category: &CategoryId) -> Result<bool, EditError> {
        self.check_target(date, category)?;
        let persisted_id = self.store.get(date, category).and_then(|c| c.persisted_id.clone());
        self.store.write(date, category, 0.0, None);
        Ok(match persisted_id {
            Some(id) => {
                self.deletions.enqueue(id, CellKey::new(date, category));
                true
            }
            None => false,
        })
    }

    /// Reassign or clear a cell's owner.
    pub fn assign_owner(
        &mut self,
        date: NaiveDate,
        category: &CategoryId,
        owner: Option<String>,
    ) -> Result<(), EditError> {
        self.check_target(date, category)?;
        self.store.set_owner(date, category, owner);
        Ok(())
    }

    fn check_target(&self, date: NaiveDate, category: &CategoryId) -> Result<(), EditError> {
        if !self.store.contains_date(date) {
            return Err(EditError::OutsideYear { date, year: self.store.year() });
        }
        if !self.store.has_category(category) {
            return Err(EditError::UnknownCategory(category.clone()));
        }
        Ok(())
    }

    /// Create a category on the backend and give it a column.
    pub fn add_category<B: EntryBackend + ?Sized>(&mut self, backend: &B, name: &str) -> Result<CategoryId, GridError> {
        let id = backend.create_category(name).map_err(GridError::Backend)?;
        self.insert_category(Category::new(id.clone(), name));
        Ok(id)
    }

    /// Add a known category column. No-op if already present.
    pub fn insert_category(&mut self, category: Category) {
        if self.categories.iter().any(|c| c.id == category.id) {
            return;
        }
        self.store.add_category(category.id.clone());
        self.categories.push(category);
    }

    // -----------------------------------------------------------------------
    // Save
    // -----------------------------------------------------------------------

    /// What `save` would send, without sending it.
    pub fn pending_changes(&self) -> ReconcilePlan {
        reconcile::plan(&self.store, &self.deletions)
    }

    pub fn has_unsaved_changes(&self) -> bool {
        !self.pending_changes().is_empty()
    }

    pub fn save<B: EntryBackend + ?Sized>(&mut self, backend: &B) -> ReconcileResult {
        reconcile::reconcile(&mut self.store, &mut self.deletions, backend, &self.subject_id, &self.options)
    }

    // -----------------------------------------------------------------------
    // Keyboard
    // -----------------------------------------------------------------------

    pub fn focus(&self) -> CellAddress {
        self.nav.focus
    }

    pub fn mode(&self) -> &NavMode {
        &self.nav.mode
    }

    pub fn clipboard(&self) -> Option<f64> {
        self.nav.clipboard
    }

    /// Date and category under a view address.
    pub fn cell_at(&self, addr: CellAddress) -> Option<(NaiveDate, CategoryId)> {
        let date = self.window.date_at(addr.row)?;
        let category = self.categories.get(addr.col)?;
        Some((date, category.id.clone()))
    }

    /// Feed one key event, focused at `at`. Returns the new focus and what
    /// happened.
    pub fn handle_key(&mut self, input: KeyInput, at: CellAddress) -> KeyOutcome {
        let rows = self.window.len();
        let cols = self.categories.len();
        self.nav.focus = clamp(at, rows, cols);

        let effect = match self.nav.interpret(input) {
            NavCommand::None => KeyEffect::None,
            NavCommand::Move(motion) => {
                self.nav.focus = self.nav.step(motion, rows, cols);
                KeyEffect::None
            }
            NavCommand::BeginEdit(first) => {
                let initial = match first {
                    Some(c) => c.to_string(),
                    None => self.focused_cell().map(|c| format_hours(c.value)).unwrap_or_default(),
                };
                self.nav.begin_edit(initial);
                KeyEffect::EditStarted
            }
            NavCommand::EditInput(c) => {
                self.nav.push_char(c);
                KeyEffect::None
            }
            NavCommand::EditBackspace => {
                self.nav.pop_char();
                KeyEffect::None
            }
            NavCommand::CancelEdit => {
                self.nav.idle();
                KeyEffect::EditCancelled
            }
            NavCommand::Commit(motion) => {
                let buffer = self.nav.buffer().unwrap_or_default().trim().to_string();
                let parsed = if buffer.is_empty() {
                    Ok(0.0)
                } else {
                    buffer.parse::<f64>().map_err(|_| EditError::Unparsable(buffer.clone()))
                };
                match parsed.and_then(|value| self.write_focused(value).map(|()| value)) {
                    Ok(value) => {
                        self.nav.idle();
                        self.nav.focus = self.nav.step(motion, rows, cols);
                        KeyEffect::Committed(value)
                    }
                    Err(err) => KeyEffect::Rejected(err),
                }
            }
            NavCommand::Copy => match self.focused_cell() {
                Some(cell) => {
                    self.nav.clipboard = Some(cell.value);
                    KeyEffect::Copied(cell.value)
                }
                None => KeyEffect::None,
            },
            NavCommand::Paste => match self.nav.clipboard {
                Some(value) => match self.write_focused(value) {
                    Ok(()) => KeyEffect::Pasted(value),
                    Err(err) => KeyEffect::Rejected(err),
                },
                None => KeyEffect::None,
            },
            NavCommand::Delete => match self.cell_at(self.nav.focus) {
                Some((date, category)) => match self.mark_deleted(date, &category) {
                    Ok(queued) => KeyEffect::Deleted { queued },
                    Err(err) => KeyEffect::Rejected(err),
                },
                None => KeyEffect::None,
            },
            NavCommand::Save => KeyEffect::SaveRequested,
            NavCommand::OpenOwnerPicker => {
                if self.owner_candidates.is_empty() || self.cell_at(self.nav.focus).is_none() {
                    KeyEffect::None
                } else {
                    let current = self.focused_cell().and_then(|c| c.owner_ref);
                    let selected = current
                        .and_then(|o| self.owner_candidates.iter().position(|c| *c == o))
                        .unwrap_or(0);
                    self.nav.mode = NavMode::PickingOwner { selected };
                    KeyEffect::OwnerPickerOpened
                }
            }
            NavCommand::PickerStep(delta) => {
                self.nav.step_picker(delta, self.owner_candidates.len());
                KeyEffect::None
            }
            NavCommand::PickOwner => {
                let picked = match self.nav.mode {
                    NavMode::PickingOwner { selected } => self.owner_candidates.get(selected).cloned(),
                    _ => None,
                };
                self.nav.idle();
                match (picked, self.cell_at(self.nav.focus)) {
                    (Some(owner), Some((date, category))) => {
                        match self.assign_owner(date, &category, Some(owner.clone())) {
                            Ok(()) => KeyEffect::OwnerAssigned(owner),
                            Err(err) => KeyEffect::Rejected(err),
                        }
                    }
                    _ => KeyEffect::OwnerPickerClosed,
                }
            }
            NavCommand::ClosePicker => {
                self.nav.idle();
                KeyEffect::OwnerPickerClosed
            }
        };

        KeyOutcome { focus: self.nav.focus, effect }
    }

    fn focused_cell(&self) -> Option<CellState> {
        self.cell_at(self.nav.focus).map(|(date, category)| self.store.read(date, &category))
    }

    fn write_focused(&mut self, value: f64) -> Result<(), EditError> {
        let focus = self.nav.focus;
        let (date, category) = self.cell_at(focus).ok_or(EditError::OutOfView(focus))?;
        self.edit_cell(date, &category, value, None)
    }
}

/// Hours as typed into the editor: no trailing `.0`.
pub fn format_hours(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
