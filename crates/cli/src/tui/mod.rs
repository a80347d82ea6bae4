//! Interactive grid editor (`hgrid edit`).
//!
//! The engine owns focus, edit mode and the clipboard; this module only maps
//! crossterm keys onto `KeyInput`, pages the view window and draws the
//! projected matrix.

use std::io::stdout;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame, Terminal,
};

use hourgrid_core::EntryBackend;
use hourgrid_engine::grid::format_hours;
use hourgrid_engine::{
    CellAddress, Key, KeyEffect, KeyInput, Modifiers, NavMode, TimeGrid, ViewMode, ViewWindowConfig,
};

use crate::render;

const DATE_WIDTH: usize = 14;
const TOTAL_WIDTH: usize = 6;

struct TuiApp<B: EntryBackend> {
    grid: TimeGrid,
    backend: B,
    scroll_row: usize,
    status: String,
    should_quit: bool,
    /// First `q` with unsaved changes only warns
    quit_armed: bool,
    show_help: bool,
    /// Name typed into the new-category prompt, when open
    new_category: Option<String>,
}

impl<B: EntryBackend> TuiApp<B> {
    fn new(grid: TimeGrid, backend: B) -> Self {
        Self {
            grid,
            backend,
            scroll_row: 0,
            status: String::new(),
            should_quit: false,
            quit_armed: false,
            show_help: false,
            new_category: None,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if self.show_help {
            // Any key dismisses help
            self.show_help = false;
            return;
        }
        if self.new_category.is_some() {
            self.handle_category_prompt(key);
            return;
        }

        let idle = matches!(self.grid.mode(), NavMode::Idle);
        if idle && key.modifiers.is_empty() || idle && key.modifiers == KeyModifiers::SHIFT {
            let handled = match key.code {
                KeyCode::Char('q') => {
                    self.request_quit();
                    true
                }
                KeyCode::Char('?') => {
                    self.show_help = true;
                    true
                }
                KeyCode::Char('[') => {
                    self.page_window(-1);
                    true
                }
                KeyCode::Char(']') => {
                    self.page_window(1);
                    true
                }
                KeyCode::Char('v') => {
                    self.cycle_mode();
                    true
                }
                KeyCode::Char('r') => {
                    self.refresh();
                    true
                }
                KeyCode::Char('+') => {
                    self.new_category = Some(String::new());
                    true
                }
                _ => false,
            };
            if handled {
                return;
            }
        }
        self.quit_armed = false;

        let Some(input) = map_key(key) else {
            return;
        };
        let at = self.grid.focus();
        let outcome = self.grid.handle_key(input, at);
        match outcome.effect {
            KeyEffect::None | KeyEffect::EditStarted => {}
            KeyEffect::EditCancelled => self.status.clear(),
            KeyEffect::Committed(_) | KeyEffect::Pasted(_) => self.status.clear(),
            KeyEffect::Copied(v) => self.status = format!("Copied {}", format_hours(v)),
            KeyEffect::Deleted { queued: true } => self.status = "Deleted (saved on Ctrl+S)".into(),
            KeyEffect::Deleted { queued: false } => self.status.clear(),
            KeyEffect::Rejected(err) => self.status = err.to_string(),
            KeyEffect::SaveRequested => self.save(),
            KeyEffect::OwnerPickerOpened => self.status = "Pick owner: Up/Down, Enter, Esc".into(),
            KeyEffect::OwnerAssigned(owner) => self.status = format!("Owner set to {}", owner),
            KeyEffect::OwnerPickerClosed => self.status.clear(),
        }
    }

    fn handle_category_prompt(&mut self, key: KeyEvent) {
        let Some(name) = self.new_category.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => self.new_category = None,
            KeyCode::Backspace => {
                name.pop();
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => name.push(c),
            KeyCode::Enter => {
                let name = name.trim().to_string();
                self.new_category = None;
                if name.is_empty() {
                    return;
                }
                if self.grid.category_by_name(&name).is_some() {
                    self.status = format!("Category '{}' already exists", name);
                    return;
                }
                self.status = match self.grid.add_category(&self.backend, &name) {
                    Ok(id) => format!("Added category {} ({})", name, id),
                    Err(e) => e.to_string(),
                };
            }
            _ => {}
        }
    }

    fn request_quit(&mut self) {
        if self.grid.has_unsaved_changes() && !self.quit_armed {
            self.quit_armed = true;
            self.status = "Unsaved changes: Ctrl+S to save, q again to discard".into();
            return;
        }
        self.should_quit = true;
    }

    fn save(&mut self) {
        let result = self.grid.save(&self.backend);
        self.status = result.summary();
    }

    fn refresh(&mut self) {
        self.status = match self.grid.refresh(&self.backend) {
            Ok(stats) if stats.preserved_edits > 0 => {
                format!("Reloaded, kept {} unsaved edit(s)", stats.preserved_edits)
            }
            Ok(_) => "Reloaded".into(),
            Err(e) => e.to_string(),
        };
    }

    fn page_window(&mut self, delta: i32) {
        let view = self.grid.view();
        let month = view.anchor_month as i32 + delta;
        if !(1..=12).contains(&month) {
            return;
        }
        self.set_view(ViewWindowConfig::new(view.mode, month as u32, view.anchor_year));
    }

    fn cycle_mode(&mut self) {
        let view = self.grid.view();
        let mode = match view.mode {
            ViewMode::Week => ViewMode::FifteenDay,
            ViewMode::FifteenDay => ViewMode::Month,
            ViewMode::Month => ViewMode::Week,
        };
        self.set_view(ViewWindowConfig { mode, ..view });
    }

    fn set_view(&mut self, config: ViewWindowConfig) {
        match self.grid.set_view(config) {
            Ok(_) => {
                self.scroll_row = 0;
                self.status.clear();
            }
            Err(e) => self.status = e.to_string(),
        }
    }

    fn ensure_visible(&mut self, visible_rows: usize) {
        let row = self.grid.focus().row;
        if row < self.scroll_row {
            self.scroll_row = row;
        }
        if visible_rows > 0 && row >= self.scroll_row + visible_rows {
            self.scroll_row = row - visible_rows + 1;
        }
    }

    fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let chunks = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(area);

        self.draw_title(frame, chunks[0]);
        self.draw_grid(frame, chunks[1]);
        self.draw_status(frame, chunks[2]);

        if let NavMode::PickingOwner { selected } = self.grid.mode() {
            self.draw_picker(frame, area, *selected);
        }
        if self.show_help {
            self.draw_help(frame, area);
        }
    }

    fn draw_title(&self, frame: &mut Frame, area: Rect) {
        let window = self.grid.window();
        let dirty = if self.grid.has_unsaved_changes() { " [modified]" } else { "" };
        let title = format!(
            " hgrid: {} | {} {} .. {}{} ",
            self.grid.subject_id(),
            self.grid.view().mode,
            window.start,
            window.end,
            dirty
        );
        let para = Paragraph::new(Line::from(vec![Span::styled(
            title,
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )]))
        .style(Style::default().bg(Color::Cyan));
        frame.render_widget(para, area);
    }

    fn draw_grid(&self, frame: &mut Frame, area: Rect) {
        let matrix = self.grid.current_matrix();
        if matrix.col_count() == 0 {
            let msg = Paragraph::new("(no categories, press + to add one)")
                .style(Style::default().fg(Color::DarkGray));
            frame.render_widget(msg, area);
            return;
        }

        let widths = render::column_widths(&matrix);
        let focus = self.grid.focus();
        let editing = self.grid.mode();

        let mut header = vec![Span::styled(
            format!("{:<w$}", "", w = DATE_WIDTH),
            Style::default().fg(Color::DarkGray),
        )];
        for (c, (category, w)) in matrix.categories.iter().zip(&widths).enumerate() {
            let style = if c == focus.col {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            };
            header.push(Span::styled(format!(" {:>w$}", category.name, w = *w), style));
        }
        header.push(Span::styled(
            format!(" {:>w$}", "Total", w = TOTAL_WIDTH),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));

        let visible_rows = area.height.saturating_sub(2) as usize;
        let end_row = (self.scroll_row + visible_rows).min(matrix.row_count());
        let mut lines: Vec<Line> = Vec::with_capacity(visible_rows + 2);
        lines.push(Line::from(header));

        for r in self.scroll_row..end_row {
            let row = &matrix.rows[r];
            let is_cursor_row = r == focus.row;
            let date_style = if is_cursor_row {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            let mut spans = vec![Span::styled(
                format!("{:<w$}", row.date.format("%a %Y-%m-%d").to_string(), w = DATE_WIDTH),
                date_style,
            )];

            for (c, (cell, w)) in row.cells.iter().zip(&widths).enumerate() {
                let here = CellAddress::new(r, c) == focus;
                let text = match editing {
                    NavMode::Editing { buffer } if here => format!("{}_", buffer),
                    _ => render::cell_text(cell),
                };
                let style = if here {
                    Style::default().fg(Color::Black).bg(Color::White).add_modifier(Modifier::BOLD)
                } else if cell.is_dirty() {
                    Style::default().fg(Color::LightGreen)
                } else if is_cursor_row {
                    Style::default().fg(Color::White)
                } else {
                    Style::default().fg(Color::Gray)
                };
                spans.push(Span::raw(" "));
                spans.push(Span::styled(format!("{:>w$}", text, w = *w), style));
            }

            let total_style = if row.total >= hourgrid_engine::DAILY_CAPACITY {
                Style::default().fg(Color::Red)
            } else {
                Style::default().fg(Color::Gray)
            };
            spans.push(Span::styled(
                format!(" {:>w$}", format_hours(row.total), w = TOTAL_WIDTH),
                total_style,
            ));
            lines.push(Line::from(spans));
        }

        let mut footer = vec![Span::styled(
            format!("{:<w$}", "Total", w = DATE_WIDTH),
            Style::default().fg(Color::Cyan),
        )];
        for (total, w) in matrix.column_totals.iter().zip(&widths) {
            footer.push(Span::styled(format!(" {:>w$}", format_hours(*total), w = *w), Style::default().fg(Color::Cyan)));
        }
        footer.push(Span::styled(
            format!(" {:>w$}", format_hours(matrix.grand_total()), w = TOTAL_WIDTH),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));
        lines.push(Line::from(footer));

        frame.render_widget(Paragraph::new(lines), area);
    }

    fn draw_status(&self, frame: &mut Frame, area: Rect) {
        let focus = self.grid.focus();
        let left = match self.grid.cell_at(focus) {
            Some((date, category)) => {
                let cell = self.grid.cell(date, &category);
                let owner = cell.owner_ref.as_deref().unwrap_or("-");
                format!(" {} {} = {}h  owner: {}", date, category, format_hours(cell.value), owner)
            }
            None => String::new(),
        };
        if let Some(name) = &self.new_category {
            let prompt = format!(" New category: {}_  (Enter: create, Esc: cancel)", name);
            let para = Paragraph::new(Line::from(vec![Span::styled(
                prompt,
                Style::default().fg(Color::Black).bg(Color::Yellow),
            )]))
            .style(Style::default().bg(Color::Yellow));
            frame.render_widget(para, area);
            return;
        }
        let right = if self.status.is_empty() {
            "Ctrl+S: save  ?: help ".to_string()
        } else {
            format!("{} ", self.status)
        };

        let padding = (area.width as usize)
            .saturating_sub(left.chars().count() + right.chars().count());
        let status = format!("{}{:pad$}{}", left, "", right, pad = padding);
        let para = Paragraph::new(Line::from(vec![Span::styled(
            status,
            Style::default().fg(Color::Black).bg(Color::DarkGray),
        )]))
        .style(Style::default().bg(Color::DarkGray));
        frame.render_widget(para, area);
    }

    fn draw_picker(&self, frame: &mut Frame, area: Rect, selected: usize) {
        let owners = self.grid.owner_candidates();
        let width: u16 = owners.iter().map(|o| o.chars().count()).max().unwrap_or(0) as u16 + 8;
        let height: u16 = owners.len() as u16 + 2;
        let popup = centered(area, width.max(20), height);

        let lines: Vec<Line> = owners
            .iter()
            .enumerate()
            .map(|(i, owner)| {
                let style = if i == selected {
                    Style::default().fg(Color::Black).bg(Color::White).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::White)
                };
                Line::from(Span::styled(format!("  {}  ", owner), style))
            })
            .collect();

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Owner ")
            .style(Style::default().bg(Color::Black));
        frame.render_widget(Clear, popup);
        frame.render_widget(Paragraph::new(lines).block(block), popup);
    }

    fn draw_help(&self, frame: &mut Frame, area: Rect) {
        let help_lines = [
            "",
            "  Navigation",
            "  ----------",
            "  arrows            Move cursor",
            "  Tab / Shift+Tab   Next/prev cell",
            "  [ / ]             Prev/next month",
            "  v                 Week / 15 days / month",
            "",
            "  Editing",
            "  -------",
            "  0-9 .  / F2       Edit cell",
            "  Enter / Tab       Commit and move",
            "  Esc               Cancel edit",
            "  Delete            Clear cell",
            "  Ctrl+C / Ctrl+V   Copy / paste hours",
            "  Ctrl+O            Pick owner",
            "  +                 Add category",
            "",
            "  General",
            "  -------",
            "  Ctrl+S            Save",
            "  r                 Reload from server",
            "  q                 Quit",
            "  ?                 Toggle this help",
            "",
        ];

        let popup = centered(area, 44, help_lines.len() as u16);
        let lines: Vec<Line> = help_lines
            .iter()
            .map(|s| Line::from(Span::styled(*s, Style::default().fg(Color::White))))
            .collect();

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Keybindings ")
            .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .style(Style::default().bg(Color::Black));

        frame.render_widget(Clear, popup);
        frame.render_widget(Paragraph::new(lines).block(block), popup);
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let x = area.width.saturating_sub(width) / 2;
    let y = area.height.saturating_sub(height) / 2;
    Rect::new(area.x + x, area.y + y, width.min(area.width), height.min(area.height))
}

/// Translate a terminal key into the engine's key vocabulary.
fn map_key(key: KeyEvent) -> Option<KeyInput> {
    let modifiers = Modifiers {
        shift: key.modifiers.contains(KeyModifiers::SHIFT),
        ctrl: key.modifiers.contains(KeyModifiers::CONTROL),
        alt: key.modifiers.contains(KeyModifiers::ALT),
    };
    let key = match key.code {
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Tab => Key::Tab,
        KeyCode::BackTab => Key::BackTab,
        KeyCode::Enter => Key::Enter,
        KeyCode::Esc => Key::Esc,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Delete => Key::Delete,
        KeyCode::F(2) => Key::F2,
        KeyCode::Char(c) => Key::Char(c),
        _ => return None,
    };
    Some(KeyInput::new(key, modifiers))
}

/// Run the interactive editor until the user quits.
pub fn run<B: EntryBackend>(grid: TimeGrid, backend: B) -> Result<(), String> {
    run_app(TuiApp::new(grid, backend))
}

fn run_app<B: EntryBackend>(mut app: TuiApp<B>) -> Result<(), String> {
    terminal::enable_raw_mode()
        .map_err(|e| format!("failed to enable raw mode: {}", e))?;
    stdout()
        .execute(EnterAlternateScreen)
        .map_err(|e| format!("failed to enter alternate screen: {}", e))?;

    struct Cleanup;
    impl Drop for Cleanup {
        fn drop(&mut self) {
            let _ = stdout().execute(LeaveAlternateScreen);
            let _ = terminal::disable_raw_mode();
        }
    }
    let _cleanup = Cleanup;

    let backend = CrosstermBackend::new(stdout());
    let mut terminal =
        Terminal::new(backend).map_err(|e| format!("failed to create terminal: {}", e))?;

    loop {
        let height = terminal.size().map(|s| s.height).unwrap_or_default();
        // title + header + footer + status
        app.ensure_visible(height.saturating_sub(4) as usize);

        terminal
            .draw(|frame| app.draw(frame))
            .map_err(|e| format!("draw error: {}", e))?;

        if event::poll(Duration::from_millis(100))
            .map_err(|e| format!("event poll error: {}", e))?
        {
            if let Event::Key(key) =
                event::read().map_err(|e| format!("event read error: {}", e))?
            {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
