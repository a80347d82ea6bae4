// End-to-end grid behaviour against the in-memory backend.

use chrono::NaiveDate;
use hourgrid_core::{Category, CategoryId, EntryPayload};
use hourgrid_engine::memory::{BackendCall, FailOn, MemoryBackend};
use hourgrid_engine::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn exc() -> CategoryId {
    "exc".into()
}

fn trn() -> CategoryId {
    "trn".into()
}

fn backend() -> MemoryBackend {
    MemoryBackend::with_categories(vec![
        Category::new("exc", "Excavation"),
        Category::new("trn", "Transport"),
    ])
}

fn entry(date: &str, cat: &str, hours: f64, owner: Option<&str>) -> EntryPayload {
    EntryPayload {
        date: d(date),
        category_id: cat.into(),
        quantity: hours,
        owner_ref: owner.map(str::to_string),
    }
}

/// Open the grid and drop the load calls from the log.
fn open(backend: &MemoryBackend) -> TimeGrid {
    let grid = TimeGrid::open(backend, "truck-7", "site-1", 2024).unwrap();
    backend.take_calls();
    grid
}

// ---------------------------------------------------------------------------
// Capacity
// ---------------------------------------------------------------------------

#[test]
fn test_capacity_scenario() {
    let backend = backend();
    let mut grid = open(&backend);
    let day = d("2024-01-05");

    grid.edit_cell(day, &exc(), 10.0, None).unwrap();
    assert_eq!(grid.store().day_total(day), 10.0);

    let err = grid.edit_cell(day, &trn(), 16.0, None).unwrap_err();
    match err {
        EditError::Capacity(cap) => {
            assert_eq!(cap.current_total, 10.0);
            assert_eq!(cap.attempted, 16.0);
            assert_eq!(cap.limit, DAILY_CAPACITY);
        }
        other => panic!("expected capacity error, got {other:?}"),
    }
    assert_eq!(grid.cell(day, &trn()).value, 0.0);

    grid.edit_cell(day, &trn(), 14.0, None).unwrap();
    assert_eq!(grid.store().day_total(day), 24.0);
}

#[test]
fn test_lowering_own_cell_on_full_day_is_allowed() {
    let backend = backend();
    let mut grid = open(&backend);
    let day = d("2024-01-05");
    grid.edit_cell(day, &exc(), 24.0, None).unwrap();
    grid.edit_cell(day, &exc(), 20.0, None).unwrap();
    assert!(grid.edit_cell(day, &trn(), 4.5, None).is_err());
    grid.edit_cell(day, &trn(), 4.0, None).unwrap();
}

#[test]
fn test_invalid_targets_are_rejected() {
    let backend = backend();
    let mut grid = open(&backend);
    assert_eq!(grid.edit_cell(d("2024-01-05"), &exc(), -1.0, None), Err(EditError::InvalidValue(-1.0)));
    assert!(matches!(
        grid.edit_cell(d("2025-01-05"), &exc(), 1.0, None),
        Err(EditError::OutsideYear { year: 2024, .. })
    ));
    assert!(matches!(
        grid.edit_cell(d("2024-01-05"), &"nope".into(), 1.0, None),
        Err(EditError::UnknownCategory(_))
    ));
    assert!(!grid.has_unsaved_changes());
}

// ---------------------------------------------------------------------------
// Save
// ---------------------------------------------------------------------------

#[test]
fn test_zeroing_persisted_cell_deletes_it() {
    let backend = backend();
    let id = backend.seed("truck-7", entry("2024-02-01", "exc", 8.0, None));
    let mut grid = open(&backend);
    let day = d("2024-02-01");
    assert_eq!(grid.cell(day, &exc()).persisted_id.as_deref(), Some(id.as_str()));

    grid.edit_cell(day, &exc(), 0.0, None).unwrap();
    let result = grid.save(&backend);

    assert_eq!(backend.take_calls(), vec![BackendCall::Delete { id }]);
    assert_eq!(result.deleted, 1);
    assert!(result.is_success());
    let cell = grid.cell(day, &exc());
    assert_eq!(cell.value, 0.0);
    assert_eq!(cell.baseline_value, 0.0);
    assert_eq!(cell.persisted_id, None);
    assert_eq!(backend.entry_count(), 0);
}

#[test]
fn test_new_cell_creates_once() {
    let backend = backend();
    let mut grid = open(&backend);
    let day = d("2024-03-10");

    grid.edit_cell(day, &trn(), 5.0, Some("D2")).unwrap();
    let result = grid.save(&backend);

    assert_eq!(
        backend.take_calls(),
        vec![BackendCall::Create {
            subject_id: "truck-7".to_string(),
            payload: entry("2024-03-10", "trn", 5.0, Some("D2")),
        }]
    );
    assert_eq!(result.created, 1);
    let cell = grid.cell(day, &trn());
    assert!(cell.is_persisted());
    assert_eq!(cell.baseline_value, 5.0);
    assert_eq!(cell.baseline_owner_ref.as_deref(), Some("D2"));

    let again = grid.save(&backend);
    assert_eq!(again.attempted(), 0);
    assert!(backend.take_calls().is_empty());
    assert_eq!(again.summary(), "No changes to save");
}

#[test]
fn test_partial_failure_is_retried() {
    let backend = backend();
    let mut grid = open(&backend);
    grid.edit_cell(d("2024-04-01"), &exc(), 6.0, None).unwrap();
    grid.edit_cell(d("2024-04-02"), &exc(), 7.0, None).unwrap();
    backend.fail_on(FailOn::Create { date: d("2024-04-02"), category: exc() });

    let result = grid.save(&backend);
    assert_eq!(result.succeeded(), 1);
    assert_eq!(result.failed(), 1);
    let failure = &result.failures[0];
    assert_eq!(failure.kind, OperationKind::Create);
    assert_eq!(failure.date, d("2024-04-02"));
    assert_eq!(failure.category, exc());

    assert!(grid.cell(d("2024-04-01"), &exc()).is_persisted());
    let failed = grid.cell(d("2024-04-02"), &exc());
    assert!(!failed.is_persisted());
    assert_eq!(failed.baseline_value, 0.0);
    assert!(failed.is_dirty());

    backend.clear_failures();
    backend.take_calls();
    let retry = grid.save(&backend);
    assert_eq!(retry.created, 1);
    assert_eq!(backend.take_calls().len(), 1);
    assert!(!grid.has_unsaved_changes());
}

#[test]
fn test_failed_update_keeps_baseline_and_is_retried() {
    let backend = backend();
    let id = backend.seed("truck-7", entry("2024-05-06", "trn", 4.0, Some("D1")));
    let mut grid = open(&backend);
    grid.edit_cell(d("2024-05-06"), &trn(), 9.0, Some("D2")).unwrap();
    grid.edit_cell(d("2024-05-07"), &trn(), 3.0, None).unwrap();
    backend.fail_on(FailOn::Update(id.clone()));

    let result = grid.save(&backend);
    assert_eq!(result.created, 1);
    assert_eq!(result.updated, 0);
    assert_eq!(result.failed(), 1);
    let failure = &result.failures[0];
    assert_eq!(failure.kind, OperationKind::Update);
    assert_eq!(failure.persisted_id.as_deref(), Some(id.as_str()));
    assert!(matches!(failure.error, ReconcileError::Persistence(_)));

    let cell = grid.cell(d("2024-05-06"), &trn());
    assert_eq!(cell.value, 9.0);
    assert_eq!(cell.baseline_value, 4.0);
    assert_eq!(cell.baseline_owner_ref.as_deref(), Some("D1"));
    assert!(cell.is_dirty());
    assert_eq!(backend.entry(&id).unwrap().quantity, 4.0);

    backend.clear_failures();
    backend.take_calls();
    let retry = grid.save(&backend);
    assert_eq!(retry.updated, 1);
    assert!(retry.is_success());
    match backend.take_calls().as_slice() {
        [BackendCall::Update { id: called, payload }] => {
            assert_eq!(called, &id);
            assert_eq!(payload.quantity, 9.0);
            assert_eq!(payload.owner_ref.as_deref(), Some("D2"));
        }
        other => panic!("expected a single update, got {other:?}"),
    }
    let cell = grid.cell(d("2024-05-06"), &trn());
    assert_eq!(cell.baseline_value, 9.0);
    assert_eq!(cell.baseline_owner_ref.as_deref(), Some("D2"));
    assert!(!grid.has_unsaved_changes());
}

#[test]
fn test_failed_delete_stays_queued() {
    let backend = backend();
    let id = backend.seed("truck-7", entry("2024-02-01", "exc", 8.0, None));
    let mut grid = open(&backend);
    assert!(grid.mark_deleted(d("2024-02-01"), &exc()).unwrap());

    backend.fail_on(FailOn::Delete(id.clone()));
    let result = grid.save(&backend);
    assert_eq!(result.failed(), 1);
    assert!(grid.deletions().contains(&id));

    backend.clear_failures();
    let retry = grid.save(&backend);
    assert_eq!(retry.deleted, 1);
    assert!(grid.deletions().is_empty());
}

#[test]
fn test_owner_only_change_is_an_update() {
    let backend = backend();
    let id = backend.seed("truck-7", entry("2024-05-02", "trn", 3.0, Some("D1")));
    let mut grid = open(&backend);

    grid.assign_owner(d("2024-05-02"), &trn(), Some("D4".to_string())).unwrap();
    let plan = grid.pending_changes();
    assert_eq!(plan.count(OperationKind::Update), 1);

    grid.save(&backend);
    assert_eq!(backend.entry(&id).unwrap().owner_ref.as_deref(), Some("D4"));
}

#[test]
fn test_require_owner_blocks_anonymous_creates() {
    let backend = backend();
    let mut grid = open(&backend).with_options(ReconcileOptions { require_owner: true });
    grid.edit_cell(d("2024-04-01"), &exc(), 6.0, None).unwrap();

    let result = grid.save(&backend);
    assert_eq!(result.failed(), 1);
    assert!(matches!(result.failures[0].error, ReconcileError::Validation(_)));
    assert!(backend.take_calls().is_empty());
}

// ---------------------------------------------------------------------------
// Deletion queue
// ---------------------------------------------------------------------------

#[test]
fn test_double_delete_issues_one_call() {
    let backend = backend();
    backend.seed("truck-7", entry("2024-02-01", "exc", 8.0, None));
    let mut grid = open(&backend);

    assert!(grid.mark_deleted(d("2024-02-01"), &exc()).unwrap());
    grid.mark_deleted(d("2024-02-01"), &exc()).unwrap();
    assert_eq!(grid.deletions().len(), 1);

    grid.save(&backend);
    let deletes = backend.take_calls().into_iter().filter(|c| matches!(c, BackendCall::Delete { .. })).count();
    assert_eq!(deletes, 1);
}

#[test]
fn test_revive_cancels_pending_delete() {
    let backend = backend();
    let id = backend.seed("truck-7", entry("2024-02-01", "exc", 8.0, None));
    let mut grid = open(&backend);

    grid.mark_deleted(d("2024-02-01"), &exc()).unwrap();
    grid.edit_cell(d("2024-02-01"), &exc(), 6.0, None).unwrap();
    assert!(grid.deletions().is_empty());

    let result = grid.save(&backend);
    assert_eq!(result.updated, 1);
    assert_eq!(result.deleted, 0);
    assert_eq!(backend.entry(&id).unwrap().quantity, 6.0);
}

#[test]
fn test_deleting_unpersisted_cell_queues_nothing() {
    let backend = backend();
    let mut grid = open(&backend);
    grid.edit_cell(d("2024-02-01"), &exc(), 3.0, None).unwrap();
    assert!(!grid.mark_deleted(d("2024-02-01"), &exc()).unwrap());
    assert!(grid.pending_changes().is_empty());
}

// ---------------------------------------------------------------------------
// Views and hydration
// ---------------------------------------------------------------------------

#[test]
fn test_edit_survives_view_switch() {
    let backend = backend();
    let mut grid = open(&backend);
    grid.set_view(ViewWindowConfig::new(ViewMode::Week, 6, 2024)).unwrap();
    grid.edit_cell(d("2024-06-03"), &exc(), 4.0, None).unwrap();

    grid.set_view(ViewWindowConfig::new(ViewMode::Month, 6, 2024)).unwrap();
    let matrix = grid.current_matrix();
    assert_eq!(matrix.row_count(), 30);
    assert_eq!(matrix.cell(2, 0).unwrap().value, 4.0);
    assert_eq!(matrix.column_totals[0], 4.0);
}

#[test]
fn test_save_covers_cells_outside_the_view() {
    let backend = backend();
    let mut grid = open(&backend);
    grid.edit_cell(d("2024-11-20"), &exc(), 2.0, None).unwrap();
    grid.set_view(ViewWindowConfig::new(ViewMode::Week, 1, 2024)).unwrap();
    assert_eq!(grid.save(&backend).created, 1);
}

#[test]
fn test_open_fetches_the_whole_year() {
    let backend = backend();
    TimeGrid::open(&backend, "truck-7", "site-1", 2024).unwrap();
    assert!(backend.calls().contains(&BackendCall::Fetch {
        subject_id: "truck-7".to_string(),
        from: d("2024-01-01"),
        to: d("2024-12-31"),
    }));
}

#[test]
fn test_failed_refresh_keeps_local_state() {
    let backend = backend();
    let mut grid = open(&backend);
    grid.edit_cell(d("2024-02-01"), &exc(), 3.0, None).unwrap();
    backend.fail_on(FailOn::Fetch);

    assert!(matches!(grid.refresh(&backend), Err(GridError::Hydration(_))));
    assert_eq!(grid.cell(d("2024-02-01"), &exc()).value, 3.0);
}

#[test]
fn test_refresh_keeps_unsaved_edits() {
    let backend = backend();
    let id = backend.seed("truck-7", entry("2024-02-01", "exc", 8.0, None));
    let mut grid = open(&backend);
    grid.edit_cell(d("2024-02-01"), &exc(), 5.0, None).unwrap();

    let stats = grid.refresh(&backend).unwrap();
    assert_eq!(stats.preserved_edits, 1);
    let cell = grid.cell(d("2024-02-01"), &exc());
    assert_eq!(cell.value, 5.0);
    assert_eq!(cell.persisted_id.as_deref(), Some(id.as_str()));
}

#[test]
fn test_refresh_prunes_deletes_for_vanished_entries() {
    let backend = backend();
    let id = backend.seed("truck-7", entry("2024-02-01", "exc", 8.0, None));
    let mut grid = open(&backend);
    grid.mark_deleted(d("2024-02-01"), &exc()).unwrap();

    backend.remove(&id);
    grid.refresh(&backend).unwrap();
    assert!(grid.deletions().is_empty());
    assert!(grid.pending_changes().is_empty());
}

#[test]
fn test_add_category_creates_a_column() {
    let backend = backend();
    let mut grid = open(&backend);
    let id = grid.add_category(&backend, "Idle").unwrap();
    assert_eq!(grid.categories().len(), 3);
    grid.edit_cell(d("2024-07-01"), &id, 1.5, None).unwrap();
    assert_eq!(grid.current_matrix().col_count(), 3);

    assert!(matches!(grid.add_category(&backend, "idle"), Err(GridError::Backend(_))));
}
