//! In-process `EntryBackend` for tests and offline use.
//!
//! Records every call so callers can assert on what reached the backend,
//! and can be told to fail specific operations.

use std::cell::RefCell;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use hourgrid_core::{BackendError, Category, CategoryId, EntryBackend, EntryPayload, EntryRecord};

/// One backend call, in the order it was made.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Fetch { subject_id: String, from: NaiveDate, to: NaiveDate },
    Create { subject_id: String, payload: EntryPayload },
    Update { id: String, payload: EntryPayload },
    Delete { id: String },
    ListCategories { context_id: String },
    CreateCategory { name: String },
}

impl BackendCall {
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Create { .. } | Self::Update { .. } | Self::Delete { .. })
    }
}

/// Operation the backend should fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailOn {
    Fetch,
    Create { date: NaiveDate, category: CategoryId },
    Update(String),
    Delete(String),
}

#[derive(Debug, Default)]
struct State {
    entries: BTreeMap<String, (String, EntryPayload)>,
    categories: Vec<Category>,
    calls: Vec<BackendCall>,
    failures: Vec<FailOn>,
    next_id: u64,
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: RefCell<State>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_categories(categories: Vec<Category>) -> Self {
        let backend = Self::new();
        backend.state.borrow_mut().categories = categories;
        backend
    }

    /// Store an entry directly, bypassing the call log. Returns its id.
    pub fn seed(&self, subject_id: &str, payload: EntryPayload) -> String {
        let mut state = self.state.borrow_mut();
        let id = state.allocate_id();
        state.entries.insert(id.clone(), (subject_id.to_string(), payload));
        id
    }

    /// Remove an entry behind the grid's back, as another client would.
    pub fn remove(&self, id: &str) -> bool {
        self.state.borrow_mut().entries.remove(id).is_some()
    }

    pub fn fail_on(&self, failure: FailOn) {
        self.state.borrow_mut().failures.push(failure);
    }

    pub fn clear_failures(&self) {
        self.state.borrow_mut().failures.clear();
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.state.borrow().calls.clone()
    }

    /// Drain the call log.
    pub fn take_calls(&self) -> Vec<BackendCall> {
        std::mem::take(&mut self.state.borrow_mut().calls)
    }

    pub fn entry(&self, id: &str) -> Option<EntryPayload> {
        self.state.borrow().entries.get(id).map(|(_, p)| p.clone())
    }

    pub fn entry_count(&self) -> usize {
        self.state.borrow().entries.len()
    }

    /// Stored records for a subject, ordered by id.
    pub fn records(&self, subject_id: &str) -> Vec<EntryRecord> {
        self.state
            .borrow()
            .entries
            .iter()
            .filter(|(_, (subject, _))| subject == subject_id)
            .map(|(id, (_, p))| to_record(id, p))
            .collect()
    }
}

impl State {
    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        format!("E{}", self.next_id)
    }

    fn rejects(&self, failure: &FailOn) -> bool {
        self.failures.contains(failure)
    }
}

fn to_record(id: &str, payload: &EntryPayload) -> EntryRecord {
    EntryRecord {
        persisted_id: id.to_string(),
        date: payload.date,
        category_id: payload.category_id.clone(),
        quantity: payload.quantity,
        owner_ref: payload.owner_ref.clone(),
    }
}

impl EntryBackend for MemoryBackend {
    fn fetch_entries(&self, subject_id: &str, from: NaiveDate, to: NaiveDate) -> Result<Vec<EntryRecord>, BackendError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(BackendCall::Fetch { subject_id: subject_id.to_string(), from, to });
        if state.rejects(&FailOn::Fetch) {
            return Err(BackendError::Network("connection refused".to_string()));
        }
        Ok(state
            .entries
            .iter()
            .filter(|(_, (subject, p))| subject == subject_id && from <= p.date && p.date <= to)
            .map(|(id, (_, p))| to_record(id, p))
            .collect())
    }

    fn create_entry(&self, subject_id: &str, payload: &EntryPayload) -> Result<String, BackendError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(BackendCall::Create { subject_id: subject_id.to_string(), payload: payload.clone() });
        let failure = FailOn::Create { date: payload.date, category: payload.category_id.clone() };
        if state.rejects(&failure) {
            return Err(BackendError::Validation(format!("entry for {} rejected", payload.date)));
        }
        let id = state.allocate_id();
        state.entries.insert(id.clone(), (subject_id.to_string(), payload.clone()));
        Ok(id)
    }

    fn update_entry(&self, id: &str, payload: &EntryPayload) -> Result<(), BackendError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(BackendCall::Update { id: id.to_string(), payload: payload.clone() });
        if state.rejects(&FailOn::Update(id.to_string())) {
            return Err(BackendError::Validation(format!("entry {id} rejected")));
        }
        match state.entries.get_mut(id) {
            Some((_, stored)) => {
                *stored = payload.clone();
                Ok(())
            }
            None => Err(BackendError::NotFound(format!("entry {id}"))),
        }
    }

    fn delete_entry(&self, id: &str) -> Result<(), BackendError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(BackendCall::Delete { id: id.to_string() });
        if state.rejects(&FailOn::Delete(id.to_string())) {
            return Err(BackendError::Http(500, "internal error".to_string()));
        }
        match state.entries.remove(id) {
            Some(_) => Ok(()),
            None => Err(BackendError::NotFound(format!("entry {id}"))),
        }
    }

    fn list_categories(&self, context_id: &str) -> Result<Vec<Category>, BackendError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(BackendCall::ListCategories { context_id: context_id.to_string() });
        Ok(state.categories.clone())
    }

    fn create_category(&self, name: &str) -> Result<CategoryId, BackendError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(BackendCall::CreateCategory { name: name.to_string() });
        if state.categories.iter().any(|c| c.name.eq_ignore_ascii_case(name)) {
            return Err(BackendError::Validation(format!("category '{name}' already exists")));
        }
        let id = CategoryId::new(format!("C{}", state.categories.len() + 1));
        state.categories.push(Category::new(id.clone(), name));
        Ok(id)
    }
}
