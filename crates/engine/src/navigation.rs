//! Keyboard navigation / clipboard state machine.
//!
//! Pure interpretation: the navigator maps a key to a `NavCommand` given its
//! mode and the matrix shape. It owns no cell data; the grid executes the
//! reads and writes a command implies.

/// Keys the grid reacts to. Hosts translate their own key events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Tab,
    /// Shift+Tab as reported by terminals
    BackTab,
    Enter,
    Esc,
    Backspace,
    Delete,
    F2,
    Char(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Self = Self { shift: false, ctrl: false, alt: false };
    pub const SHIFT: Self = Self { shift: true, ctrl: false, alt: false };
    pub const CTRL: Self = Self { shift: false, ctrl: true, alt: false };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyInput {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    pub fn plain(key: Key) -> Self {
        Self::new(key, Modifiers::NONE)
    }

    pub fn shift(key: Key) -> Self {
        Self::new(key, Modifiers::SHIFT)
    }

    pub fn ctrl(key: Key) -> Self {
        Self::new(key, Modifiers::CTRL)
    }
}

/// (row, col) in the current view: row = date index, col = category index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct CellAddress {
    pub row: usize,
    pub col: usize,
}

impl CellAddress {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NavMode {
    #[default]
    Idle,
    /// Typing a value into the focused cell
    Editing { buffer: String },
    /// Choosing an owner for the focused cell among the candidates
    PickingOwner { selected: usize },
}

impl NavMode {
    pub fn is_editing(&self) -> bool {
        matches!(self, NavMode::Editing { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Up,
    Down,
    Left,
    Right,
    /// Next column, wrapping to the next row
    Next,
    /// Previous column, wrapping to the previous row
    Prev,
}

/// What a key asks the grid to do.
#[derive(Debug, Clone, PartialEq)]
pub enum NavCommand {
    None,
    Move(Motion),
    BeginEdit(Option<char>),
    EditInput(char),
    EditBackspace,
    CancelEdit,
    /// Commit the editor buffer, then move on success.
    Commit(Motion),
    Copy,
    Paste,
    Delete,
    Save,
    OpenOwnerPicker,
    PickerStep(isize),
    PickOwner,
    ClosePicker,
}

/// Side effect reported back to the host after a key.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyEffect {
    None,
    EditStarted,
    EditCancelled,
    Committed(f64),
    Copied(f64),
    Pasted(f64),
    /// Cell zeroed; `true` when a backend deletion was queued
    Deleted { queued: bool },
    /// Edit or paste refused; the store is unchanged
    Rejected(crate::error::EditError),
    /// Host should call `TimeGrid::save`
    SaveRequested,
    OwnerPickerOpened,
    OwnerAssigned(String),
    OwnerPickerClosed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyOutcome {
    pub focus: CellAddress,
    pub effect: KeyEffect,
}

/// Focus, mode and the single-value clipboard register.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridNavigator {
    pub focus: CellAddress,
    pub mode: NavMode,
    pub clipboard: Option<f64>,
}

impl GridNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interpret(&self, input: KeyInput) -> NavCommand {
        let KeyInput { key, modifiers } = input;
        match &self.mode {
            NavMode::Idle => {
                if modifiers.ctrl {
                    return match key {
                        Key::Char('c') | Key::Char('C') => NavCommand::Copy,
                        Key::Char('v') | Key::Char('V') => NavCommand::Paste,
                        Key::Char('s') | Key::Char('S') => NavCommand::Save,
                        Key::Char('o') | Key::Char('O') => NavCommand::OpenOwnerPicker,
                        _ => NavCommand::None,
                    };
                }
                match key {
                    Key::Delete => NavCommand::Delete,
                    Key::F2 => NavCommand::BeginEdit(None),
                    Key::Char(c) if is_value_char(c) => NavCommand::BeginEdit(Some(c)),
                    _ => motion_for(key, modifiers).map(NavCommand::Move).unwrap_or(NavCommand::None),
                }
            }
            NavMode::Editing { .. } => match key {
                Key::Esc => NavCommand::CancelEdit,
                Key::Backspace => NavCommand::EditBackspace,
                Key::Char(c) if is_value_char(c) && !modifiers.ctrl => NavCommand::EditInput(c),
                _ => motion_for(key, modifiers).map(NavCommand::Commit).unwrap_or(NavCommand::None),
            },
            NavMode::PickingOwner { .. } => match key {
                Key::Up => NavCommand::PickerStep(-1),
                Key::Down => NavCommand::PickerStep(1),
                Key::Enter => NavCommand::PickOwner,
                Key::Esc => NavCommand::ClosePicker,
                _ => NavCommand::None,
            },
        }
    }

    /// Focus after `motion` in a `rows` × `cols` matrix.
    ///
    /// Arrows clamp at the edges. Next/Prev wrap across rows and stop at the
    /// first and last cell.
    pub fn step(&self, motion: Motion, rows: usize, cols: usize) -> CellAddress {
        if rows == 0 || cols == 0 {
            return CellAddress::default();
        }
        let CellAddress { row, col } = clamp(self.focus, rows, cols);
        match motion {
            Motion::Up => CellAddress::new(row.saturating_sub(1), col),
            Motion::Down => CellAddress::new((row + 1).min(rows - 1), col),
            Motion::Left => CellAddress::new(row, col.saturating_sub(1)),
            Motion::Right => CellAddress::new(row, (col + 1).min(cols - 1)),
            Motion::Next => {
                if col + 1 < cols {
                    CellAddress::new(row, col + 1)
                } else if row + 1 < rows {
                    CellAddress::new(row + 1, 0)
                } else {
                    CellAddress::new(row, col)
                }
            }
            Motion::Prev => {
                if col > 0 {
                    CellAddress::new(row, col - 1)
                } else if row > 0 {
                    CellAddress::new(row - 1, cols - 1)
                } else {
                    CellAddress::new(row, col)
                }
            }
        }
    }

    pub fn begin_edit(&mut self, initial: String) {
        self.mode = NavMode::Editing { buffer: initial };
    }

    pub fn push_char(&mut self, c: char) {
        if let NavMode::Editing { buffer } = &mut self.mode {
            buffer.push(c);
        }
    }

    pub fn pop_char(&mut self) {
        if let NavMode::Editing { buffer } = &mut self.mode {
            buffer.pop();
        }
    }

    pub fn buffer(&self) -> Option<&str> {
        match &self.mode {
            NavMode::Editing { buffer } => Some(buffer),
            _ => None,
        }
    }

    /// Move the picker selection, clamped to `len` candidates.
    pub fn step_picker(&mut self, delta: isize, len: usize) {
        if let NavMode::PickingOwner { selected } = &mut self.mode {
            let max = len.saturating_sub(1) as isize;
            *selected = (*selected as isize + delta).clamp(0, max) as usize;
        }
    }

    pub fn idle(&mut self) {
        self.mode = NavMode::Idle;
    }
}

pub(crate) fn clamp(addr: CellAddress, rows: usize, cols: usize) -> CellAddress {
    CellAddress::new(
        addr.row.min(rows.saturating_sub(1)),
        addr.col.min(cols.saturating_sub(1)),
    )
}

fn is_value_char(c: char) -> bool {
    c.is_ascii_digit() || c == '.'
}

fn motion_for(key: Key, modifiers: Modifiers) -> Option<Motion> {
    match key {
        Key::Up => Some(Motion::Up),
        Key::Down => Some(Motion::Down),
        Key::Left => Some(Motion::Left),
        Key::Right => Some(Motion::Right),
        Key::BackTab => Some(Motion::Prev),
        Key::Tab | Key::Enter if modifiers.shift => Some(Motion::Prev),
        Key::Tab | Key::Enter => Some(Motion::Next),
        _ => None,
    }
}
