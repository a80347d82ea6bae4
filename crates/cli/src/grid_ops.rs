//! Grid commands: categories, show, set, delete, edit.

use chrono::{Datelike, NaiveDate};
use hourgrid_client::HoursClient;
use hourgrid_config::Settings;
use hourgrid_core::{CategoryId, EntryBackend};
use hourgrid_engine::{GridError, ReconcileResult, TimeGrid, ViewWindowConfig};

use crate::exit_codes::*;
use crate::{current_year_month, render, tui, CliError, WindowArgs};

fn client(settings: &Settings) -> Result<HoursClient, CliError> {
    Ok(HoursClient::from_saved_auth(settings.request_timeout())?)
}

fn resolve_context(settings: &Settings, context: Option<String>) -> Result<String, CliError> {
    context
        .or_else(|| settings.category_context.clone())
        .ok_or_else(|| {
            CliError::usage("No category context given")
                .with_hint(format!("pass --context or set grid.categoryContext in {}", Settings::config_path_display()))
        })
}

fn open_grid(
    settings: &Settings,
    client: &HoursClient,
    subject: &str,
    context: &str,
    year: i32,
) -> Result<TimeGrid, CliError> {
    let mut grid = TimeGrid::open(client, subject, context, year)?.with_options(settings.reconcile_options());
    grid.set_owner_candidates(settings.owners.clone());
    Ok(grid)
}

/// Category by id, or by case-insensitive name.
fn resolve_category(grid: &TimeGrid, name: &str) -> Result<CategoryId, CliError> {
    grid.category_by_name(name).map(|c| c.id.clone()).ok_or_else(|| {
        let known: Vec<&str> = grid.categories().iter().map(|c| c.name.as_str()).collect();
        CliError::usage(format!("Unknown category '{}'", name)).with_hint(format!("known: {}", known.join(", ")))
    })
}

fn window_config(settings: &Settings, args: &WindowArgs) -> ViewWindowConfig {
    let (this_year, this_month) = current_year_month();
    let mode = args.mode.map(Into::into).unwrap_or(settings.default_view);
    ViewWindowConfig::new(mode, args.month.unwrap_or(this_month), args.year.unwrap_or(this_year))
}

fn finish_save(result: &ReconcileResult) -> Result<(), CliError> {
    if result.is_success() {
        eprintln!("{}", result.summary());
        return Ok(());
    }
    Err(CliError::new(EXIT_PARTIAL_SAVE, result.summary()))
}

// ── Categories ──────────────────────────────────────────────────────

pub fn cmd_categories(settings: &Settings, context: Option<String>) -> Result<(), CliError> {
    let context = resolve_context(settings, context)?;
    let categories = client(settings)?.list_categories(&context)?;
    if categories.is_empty() {
        eprintln!("No categories in {}", context);
    }
    for category in categories {
        println!("{}\t{}", category.id, category.name);
    }
    Ok(())
}

pub fn cmd_category_add(settings: &Settings, context: Option<String>, name: String) -> Result<(), CliError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CliError::usage("Category name is empty"));
    }
    let client = client(settings)?;
    if let Ok(context) = resolve_context(settings, context) {
        let existing = client.list_categories(&context)?;
        if existing.iter().any(|c| c.name.eq_ignore_ascii_case(name)) {
            return Err(CliError::new(EXIT_REJECTED, format!("Category '{}' already exists in {}", name, context)));
        }
    }
    let id = client.create_category(name)?;
    println!("{}\t{}", id, name);
    Ok(())
}

// ── Show ────────────────────────────────────────────────────────────

pub fn cmd_show(settings: &Settings, window: WindowArgs, json: bool) -> Result<(), CliError> {
    let context = resolve_context(settings, window.context.clone())?;
    let config = window_config(settings, &window);
    let client = client(settings)?;
    let grid = open_grid(settings, &client, &window.subject, &context, config.anchor_year)?;
    let matrix = grid.visible_matrix(config).map_err(GridError::from)?;

    if json {
        let out = render::matrix_json(&window.subject, config, &matrix);
        let text = serde_json::to_string_pretty(&out).map_err(|e| CliError::new(EXIT_ERROR, e.to_string()))?;
        println!("{}", text);
    } else {
        print!("{}", render::matrix_table(&matrix));
    }
    Ok(())
}

// ── Set / Delete ────────────────────────────────────────────────────

pub fn cmd_set(
    settings: &Settings,
    subject: String,
    context: Option<String>,
    date: NaiveDate,
    category: String,
    value: f64,
    owner: Option<String>,
) -> Result<(), CliError> {
    let context = resolve_context(settings, context)?;
    let client = client(settings)?;
    let mut grid = open_grid(settings, &client, &subject, &context, date.year())?;
    let category = resolve_category(&grid, &category)?;

    grid.edit_cell(date, &category, value, owner.as_deref())?;
    finish_save(&grid.save(&client))
}

pub fn cmd_delete(
    settings: &Settings,
    subject: String,
    context: Option<String>,
    date: NaiveDate,
    category: String,
) -> Result<(), CliError> {
    let context = resolve_context(settings, context)?;
    let client = client(settings)?;
    let mut grid = open_grid(settings, &client, &subject, &context, date.year())?;
    let category = resolve_category(&grid, &category)?;

    if !grid.mark_deleted(date, &category)? && !grid.has_unsaved_changes() {
        eprintln!("Nothing booked on {} for {}", date, category);
        return Ok(());
    }
    finish_save(&grid.save(&client))
}

// ── Edit ────────────────────────────────────────────────────────────

pub fn cmd_edit(settings: &Settings, window: WindowArgs) -> Result<(), CliError> {
    let context = resolve_context(settings, window.context.clone())?;
    let config = window_config(settings, &window);
    let client = client(settings)?;
    let mut grid = open_grid(settings, &client, &window.subject, &context, config.anchor_year)?;
    grid.set_view(config).map_err(GridError::from)?;

    tui::run(grid, client).map_err(|e| CliError::new(EXIT_ERROR, e))
}
