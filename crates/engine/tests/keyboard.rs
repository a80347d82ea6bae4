// Keyboard-driven editing through `TimeGrid::handle_key`.

use chrono::NaiveDate;
use hourgrid_core::{Category, CategoryId};
use hourgrid_engine::*;

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn grid() -> TimeGrid {
    let mut grid = TimeGrid::new(
        "truck-7",
        2024,
        vec![Category::new("exc", "Excavation"), Category::new("trn", "Transport")],
    );
    grid.set_view(ViewWindowConfig::new(ViewMode::Week, 1, 2024)).unwrap();
    grid
}

fn type_keys(grid: &mut TimeGrid, text: &str) {
    for c in text.chars() {
        let at = grid.focus();
        grid.handle_key(KeyInput::plain(Key::Char(c)), at);
    }
}

fn press(grid: &mut TimeGrid, input: KeyInput) -> KeyOutcome {
    let at = grid.focus();
    grid.handle_key(input, at)
}

#[test]
fn test_type_and_commit_moves_to_next_cell() {
    let mut grid = grid();
    type_keys(&mut grid, "7.5");
    assert_eq!(grid.mode(), &NavMode::Editing { buffer: "7.5".to_string() });

    let out = press(&mut grid, KeyInput::plain(Key::Enter));
    assert_eq!(out.effect, KeyEffect::Committed(7.5));
    assert_eq!(out.focus, CellAddress::new(0, 1));
    assert_eq!(grid.cell(d("2024-01-01"), &CategoryId::from("exc")).value, 7.5);
}

#[test]
fn test_tab_wraps_to_next_row() {
    let mut grid = grid();
    let out = grid.handle_key(KeyInput::plain(Key::Tab), CellAddress::new(0, 1));
    assert_eq!(out.focus, CellAddress::new(1, 0));
    let out = press(&mut grid, KeyInput::shift(Key::Tab));
    assert_eq!(out.focus, CellAddress::new(0, 1));
}

#[test]
fn test_over_capacity_commit_stays_in_edit() {
    let mut grid = grid();
    grid.edit_cell(d("2024-01-01"), &"exc".into(), 20.0, None).unwrap();
    grid.handle_key(KeyInput::plain(Key::Char('9')), CellAddress::new(0, 1));

    let out = press(&mut grid, KeyInput::plain(Key::Enter));
    assert!(matches!(out.effect, KeyEffect::Rejected(EditError::Capacity(_))));
    assert_eq!(out.focus, CellAddress::new(0, 1));
    assert!(grid.mode().is_editing());
    assert_eq!(grid.cell(d("2024-01-01"), &"trn".into()).value, 0.0);

    let out = press(&mut grid, KeyInput::plain(Key::Esc));
    assert_eq!(out.effect, KeyEffect::EditCancelled);
    assert_eq!(grid.mode(), &NavMode::Idle);
}

#[test]
fn test_copy_paste_is_validated() {
    let mut grid = grid();
    grid.edit_cell(d("2024-01-01"), &"exc".into(), 16.0, None).unwrap();
    let out = grid.handle_key(KeyInput::ctrl(Key::Char('c')), CellAddress::new(0, 0));
    assert_eq!(out.effect, KeyEffect::Copied(16.0));

    // Same day: 16 + 16 > 24.
    let out = grid.handle_key(KeyInput::ctrl(Key::Char('v')), CellAddress::new(0, 1));
    assert!(matches!(out.effect, KeyEffect::Rejected(_)));

    let out = grid.handle_key(KeyInput::ctrl(Key::Char('v')), CellAddress::new(1, 1));
    assert_eq!(out.effect, KeyEffect::Pasted(16.0));
    assert_eq!(grid.cell(d("2024-01-02"), &"trn".into()).value, 16.0);
}

#[test]
fn test_delete_key_zeroes_cell() {
    let mut grid = grid();
    grid.edit_cell(d("2024-01-03"), &"trn".into(), 2.0, None).unwrap();
    let out = grid.handle_key(KeyInput::plain(Key::Delete), CellAddress::new(2, 1));
    assert_eq!(out.effect, KeyEffect::Deleted { queued: false });
    assert_eq!(grid.cell(d("2024-01-03"), &"trn".into()).value, 0.0);
}

#[test]
fn test_owner_picker() {
    let mut grid = grid();
    grid.set_owner_candidates(vec!["D1".to_string(), "D2".to_string(), "D3".to_string()]);

    let out = grid.handle_key(KeyInput::ctrl(Key::Char('o')), CellAddress::new(0, 0));
    assert_eq!(out.effect, KeyEffect::OwnerPickerOpened);
    assert_eq!(grid.mode(), &NavMode::PickingOwner { selected: 0 });

    press(&mut grid, KeyInput::plain(Key::Down));
    press(&mut grid, KeyInput::plain(Key::Down));
    press(&mut grid, KeyInput::plain(Key::Down));
    assert_eq!(grid.mode(), &NavMode::PickingOwner { selected: 2 });

    let out = press(&mut grid, KeyInput::plain(Key::Enter));
    assert_eq!(out.effect, KeyEffect::OwnerAssigned("D3".to_string()));
    assert_eq!(grid.cell(d("2024-01-01"), &"exc".into()).owner_ref.as_deref(), Some("D3"));
    assert_eq!(grid.mode(), &NavMode::Idle);
}

#[test]
fn test_picker_without_candidates_does_nothing() {
    let mut grid = grid();
    let out = press(&mut grid, KeyInput::ctrl(Key::Char('o')));
    assert_eq!(out.effect, KeyEffect::None);
    assert_eq!(grid.mode(), &NavMode::Idle);
}

#[test]
fn test_focus_is_clamped_after_view_shrinks() {
    let mut grid = grid();
    grid.set_view(ViewWindowConfig::new(ViewMode::Month, 1, 2024)).unwrap();
    grid.handle_key(KeyInput::plain(Key::Down), CellAddress::new(29, 1));
    assert_eq!(grid.focus(), CellAddress::new(30, 1));

    grid.set_view(ViewWindowConfig::new(ViewMode::Week, 1, 2024)).unwrap();
    assert_eq!(grid.focus(), CellAddress::new(6, 1));
}

#[test]
fn test_ctrl_s_requests_save() {
    let mut grid = grid();
    assert_eq!(press(&mut grid, KeyInput::ctrl(Key::Char('s'))).effect, KeyEffect::SaveRequested);
}

#[test]
fn test_cell_at_outside_the_view_is_none() {
    let grid = grid();
    assert_eq!(grid.cell_at(CellAddress::new(0, 1)), Some((d("2024-01-01"), CategoryId::from("trn"))));
    assert_eq!(grid.cell_at(CellAddress::new(7, 0)), None);
    assert_eq!(grid.cell_at(CellAddress::new(1_000_000_000, 0)), None);
    assert_eq!(grid.cell_at(CellAddress::new(usize::MAX, 0)), None);
    assert_eq!(grid.cell_at(CellAddress::new(0, 2)), None);
}

#[test]
fn test_single_cell_above_a_full_day_is_rejected() {
    let mut grid = grid();
    let err = grid.edit_cell(d("2024-01-05"), &"exc".into(), 24.0000000009, None).unwrap_err();
    assert!(matches!(err, EditError::Capacity(_)));
    assert_eq!(grid.store().day_total(d("2024-01-05")), 0.0);
}
