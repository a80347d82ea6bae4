//! Diff-based persistence.
//!
//! `plan` classifies every cell of the store (not only the visible window)
//! against its baseline; `reconcile` executes the plan against an
//! `EntryBackend`, deletions first, then creates and updates, one call at a
//! time. A failed call is recorded and the batch carries on. Successful
//! calls rebase the touched cell's baseline, failed ones leave it alone so
//! the next save retries them.

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use hourgrid_core::{BackendError, CategoryId, EntryBackend, EntryPayload};
use serde::Serialize;

use crate::deletion::DeletionQueue;
use crate::store::{is_zero, CellKey, CellStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Knobs for a reconciliation round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Creates without an owner fail locally instead of reaching the backend.
    pub require_owner: bool,
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedDelete {
    pub persisted_id: String,
    pub key: CellKey,
}

/// A create or an update.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedWrite {
    pub kind: OperationKind,
    pub key: CellKey,
    /// Set for updates
    pub persisted_id: Option<String>,
    pub payload: EntryPayload,
}

/// Everything a save would do, computed without I/O.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcilePlan {
    pub deletes: Vec<PlannedDelete>,
    pub writes: Vec<PlannedWrite>,
    /// Queued deletions dropped because their cell is non-zero again
    pub cancelled: Vec<String>,
}

impl ReconcilePlan {
    pub fn len(&self) -> usize {
        self.deletes.len() + self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn count(&self, kind: OperationKind) -> usize {
        match kind {
            OperationKind::Delete => self.deletes.len(),
            _ => self.writes.iter().filter(|w| w.kind == kind).count(),
        }
    }
}

/// Classify every cell of `store`.
///
/// - create: non-zero, never persisted
/// - update: non-zero, persisted, value or owner moved off the baseline
/// - delete: persisted, zeroed, baseline non-zero; unioned with `deletions`
///
/// Anything else is skipped. Queued deletions whose cell holds a non-zero
/// value again are reported as cancelled instead of planned.
pub fn plan(store: &CellStore, deletions: &DeletionQueue) -> ReconcilePlan {
    let mut out = ReconcilePlan::default();
    let mut seen: BTreeSet<String> = BTreeSet::new();

    for (persisted_id, key) in deletions.iter() {
        let revived = store
            .get(key.date, &key.category)
            .map(|c| c.persisted_id.as_deref() == Some(persisted_id) && !is_zero(c.value))
            .unwrap_or(false);
        if revived {
            out.cancelled.push(persisted_id.to_string());
            continue;
        }
        seen.insert(persisted_id.to_string());
        out.deletes.push(PlannedDelete { persisted_id: persisted_id.to_string(), key: key.clone() });
    }

    for (key, cell) in store.iter() {
        let payload = || EntryPayload {
            date: key.date,
            category_id: key.category.clone(),
            quantity: cell.value,
            owner_ref: cell.owner_ref.clone(),
        };
        match &cell.persisted_id {
            None if !is_zero(cell.value) => out.writes.push(PlannedWrite {
                kind: OperationKind::Create,
                key: key.clone(),
                persisted_id: None,
                payload: payload(),
            }),
            Some(id) if !is_zero(cell.value) && cell.is_dirty() => out.writes.push(PlannedWrite {
                kind: OperationKind::Update,
                key: key.clone(),
                persisted_id: Some(id.clone()),
                payload: payload(),
            }),
            Some(id) if cell.is_pending_deletion() => {
                if seen.insert(id.clone()) {
                    out.deletes.push(PlannedDelete { persisted_id: id.clone(), key: key.clone() });
                }
            }
            _ => {}
        }
    }

    out
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// Why one operation did not go through.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileError {
    /// Caught before any network call.
    Validation(String),
    /// The backend call failed.
    Persistence(BackendError),
}

impl fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(msg) => write!(f, "{msg}"),
            Self::Persistence(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ReconcileError {}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileFailure {
    pub kind: OperationKind,
    pub date: NaiveDate,
    pub category: CategoryId,
    pub persisted_id: Option<String>,
    pub error: ReconcileError,
}

impl fmt::Display for ReconcileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({}", self.date, self.category, self.kind)?;
        if let Some(id) = &self.persisted_id {
            write!(f, " {id}")?;
        }
        write!(f, "): {}", self.error)
    }
}

/// Outcome of a reconciliation round. Partial success is normal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileResult {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Queued deletions dropped because the cell was filled again
    pub cancelled: usize,
    pub failures: Vec<ReconcileFailure>,
}

impl ReconcileResult {
    pub fn succeeded(&self) -> usize {
        self.created + self.updated + self.deleted
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Number of operations attempted.
    pub fn attempted(&self) -> usize {
        self.succeeded() + self.failed()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// One-line summary for a toast, e.g.
    /// `12 saved, 1 failed: 2024-01-05 trn (create): HTTP 500: boom`.
    pub fn summary(&self) -> String {
        if self.attempted() == 0 {
            return "No changes to save".to_string();
        }
        let mut out = format!("{} saved", self.succeeded());
        if !self.failures.is_empty() {
            let detail: Vec<String> = self.failures.iter().map(|f| f.to_string()).collect();
            out.push_str(&format!(", {} failed: {}", self.failed(), detail.join("; ")));
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Execute
// ---------------------------------------------------------------------------

/// Push every changed cell of `store` to `backend`.
///
/// Runs the full plan even when calls fail. Implicit deletions are added to
/// `deletions` before executing so a failed one stays queued.
pub fn reconcile<B: EntryBackend + ?Sized>(
    store: &mut CellStore,
    deletions: &mut DeletionQueue,
    backend: &B,
    subject_id: &str,
    options: &ReconcileOptions,
) -> ReconcileResult {
    let plan = plan(store, deletions);
    let mut result = ReconcileResult::default();

    log::debug!(
        "reconcile {subject_id}: {} delete(s), {} create(s), {} update(s), {} cancelled",
        plan.deletes.len(),
        plan.count(OperationKind::Create),
        plan.count(OperationKind::Update),
        plan.cancelled.len()
    );

    for id in &plan.cancelled {
        deletions.cancel(id);
        result.cancelled += 1;
    }
    for del in &plan.deletes {
        deletions.enqueue(del.persisted_id.clone(), del.key.clone());
    }

    for del in plan.deletes {
        match backend.delete_entry(&del.persisted_id) {
            Ok(()) => {
                deletions.cancel(&del.persisted_id);
                if let Some(cell) = store.get_mut(&del.key) {
                    if cell.persisted_id.as_deref() == Some(del.persisted_id.as_str()) {
                        cell.reset();
                    }
                }
                result.deleted += 1;
            }
            Err(err) => {
                log::warn!("delete {} ({}) failed: {}", del.persisted_id, del.key, err);
                result.failures.push(ReconcileFailure {
                    kind: OperationKind::Delete,
                    date: del.key.date,
                    category: del.key.category,
                    persisted_id: Some(del.persisted_id),
                    error: ReconcileError::Persistence(err),
                });
            }
        }
    }

    for write in plan.writes {
        let outcome = match write.kind {
            OperationKind::Create if options.require_owner && write.payload.owner_ref.is_none() => {
                Err(ReconcileError::Validation("owner is required for new entries".to_string()))
            }
            OperationKind::Create => backend
                .create_entry(subject_id, &write.payload)
                .map(Some)
                .map_err(ReconcileError::Persistence),
            _ => {
                let id = write.persisted_id.as_deref().unwrap_or_default();
                backend
                    .update_entry(id, &write.payload)
                    .map(|()| None)
                    .map_err(ReconcileError::Persistence)
            }
        };

        match outcome {
            Ok(new_id) => {
                if let Some(cell) = store.get_mut(&write.key) {
                    if let Some(id) = new_id {
                        cell.persisted_id = Some(id);
                    }
                    cell.baseline_value = write.payload.quantity;
                    cell.baseline_owner_ref = write.payload.owner_ref.clone();
                }
                match write.kind {
                    OperationKind::Create => result.created += 1,
                    _ => result.updated += 1,
                }
            }
            Err(err) => {
                log::warn!("{} {} failed: {}", write.kind, write.key, err);
                result.failures.push(ReconcileFailure {
                    kind: write.kind,
                    date: write.key.date,
                    category: write.key.category,
                    persisted_id: write.persisted_id,
                    error: err,
                });
            }
        }
    }

    log::info!("reconcile {subject_id}: {}", result.summary());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use hourgrid_core::EntryRecord;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn store_with(records: &[(&str, &str, &str, f64)]) -> CellStore {
        let mut store = CellStore::with_categories(2024, ["exc".into(), "trn".into()]);
        let recs: Vec<EntryRecord> = records
            .iter()
            .map(|(id, date, cat, qty)| EntryRecord {
                persisted_id: id.to_string(),
                date: d(date),
                category_id: (*cat).into(),
                quantity: *qty,
                owner_ref: None,
            })
            .collect();
        store.hydrate(&recs);
        store
    }

    #[test]
    fn test_clean_store_plans_nothing() {
        let store = store_with(&[("E1", "2024-02-01", "exc", 8.0)]);
        assert!(plan(&store, &DeletionQueue::new()).is_empty());
    }

    #[test]
    fn test_classification() {
        let mut store = store_with(&[
            ("E1", "2024-02-01", "exc", 8.0),
            ("E2", "2024-02-02", "exc", 4.0),
            ("E3", "2024-02-03", "exc", 2.0),
        ]);
        store.write(d("2024-02-01"), &"exc".into(), 0.0, None); // delete
        store.write(d("2024-02-02"), &"exc".into(), 5.0, None); // update
        store.set_owner(d("2024-02-03"), &"exc".into(), Some("D1".into())); // owner-only update
        store.write(d("2024-06-30"), &"trn".into(), 3.0, None); // create, far outside any view

        let p = plan(&store, &DeletionQueue::new());
        assert_eq!(p.count(OperationKind::Delete), 1);
        assert_eq!(p.count(OperationKind::Update), 2);
        assert_eq!(p.count(OperationKind::Create), 1);
        assert_eq!(p.deletes[0].persisted_id, "E1");
        let create = p.writes.iter().find(|w| w.kind == OperationKind::Create).unwrap();
        assert_eq!(create.payload.date, d("2024-06-30"));
        assert_eq!(create.payload.quantity, 3.0);
    }

    #[test]
    fn test_zero_unpersisted_is_ignored() {
        let mut store = store_with(&[]);
        store.write(d("2024-02-01"), &"exc".into(), 3.0, None);
        store.write(d("2024-02-01"), &"exc".into(), 0.0, None);
        assert!(plan(&store, &DeletionQueue::new()).is_empty());
    }

    #[test]
    fn test_queued_and_implicit_delete_dedup() {
        let mut store = store_with(&[("E1", "2024-02-01", "exc", 8.0)]);
        store.write(d("2024-02-01"), &"exc".into(), 0.0, None);
        let mut q = DeletionQueue::new();
        q.enqueue("E1", CellKey::new(d("2024-02-01"), &"exc".into()));

        let p = plan(&store, &q);
        assert_eq!(p.deletes.len(), 1);
    }

    #[test]
    fn test_revived_cell_cancels_queued_delete() {
        let mut store = store_with(&[("E1", "2024-02-01", "exc", 8.0)]);
        let mut q = DeletionQueue::new();
        q.enqueue("E1", CellKey::new(d("2024-02-01"), &"exc".into()));
        store.write(d("2024-02-01"), &"exc".into(), 6.0, None);

        let p = plan(&store, &q);
        assert!(p.deletes.is_empty());
        assert_eq!(p.cancelled, vec!["E1".to_string()]);
        assert_eq!(p.count(OperationKind::Update), 1);
    }

    #[test]
    fn test_summary_text() {
        let mut r = ReconcileResult { created: 10, updated: 2, ..Default::default() };
        assert_eq!(r.summary(), "12 saved");
        r.failures.push(ReconcileFailure {
            kind: OperationKind::Create,
            date: d("2024-01-05"),
            category: "trn".into(),
            persisted_id: None,
            error: ReconcileError::Persistence(BackendError::Http(500, "boom".into())),
        });
        assert_eq!(r.summary(), "12 saved, 1 failed: 2024-01-05 trn (create): HTTP 500: boom");
        assert_eq!(ReconcileResult::default().summary(), "No changes to save");
    }
}
