//! Plain-text and JSON output for `hgrid show`.

use hourgrid_engine::grid::format_hours;
use hourgrid_engine::{CellState, ViewWindowConfig, VisibleMatrix};
use serde_json::json;

const DATE_WIDTH: usize = 14;
const MIN_COL_WIDTH: usize = 6;

/// Hours for display: blank when zero, `*` suffix when unsaved.
pub fn cell_text(cell: &CellState) -> String {
    let mut text = if cell.value == 0.0 { String::new() } else { format_hours(cell.value) };
    if cell.is_dirty() {
        text.push('*');
    }
    text
}

pub fn column_widths(matrix: &VisibleMatrix) -> Vec<usize> {
    matrix
        .categories
        .iter()
        .map(|c| c.name.chars().count().max(MIN_COL_WIDTH))
        .collect()
}

/// Date rows × category columns, with a total column and a total row.
pub fn matrix_table(matrix: &VisibleMatrix) -> String {
    let widths = column_widths(matrix);
    let mut out = String::new();

    out.push_str(&format!("{:<w$}", "Date", w = DATE_WIDTH));
    for (category, w) in matrix.categories.iter().zip(&widths) {
        out.push_str(&format!(" {:>w$}", category.name, w = *w));
    }
    out.push_str(&format!(" {:>6}\n", "Total"));

    for row in &matrix.rows {
        out.push_str(&format!("{:<w$}", row.date.format("%a %Y-%m-%d").to_string(), w = DATE_WIDTH));
        for (cell, w) in row.cells.iter().zip(&widths) {
            out.push_str(&format!(" {:>w$}", cell_text(cell), w = *w));
        }
        out.push_str(&format!(" {:>6}\n", format_hours(row.total)));
    }

    out.push_str(&format!("{:<w$}", "Total", w = DATE_WIDTH));
    for (total, w) in matrix.column_totals.iter().zip(&widths) {
        out.push_str(&format!(" {:>w$}", format_hours(*total), w = *w));
    }
    out.push_str(&format!(" {:>6}\n", format_hours(matrix.grand_total())));
    out
}

pub fn matrix_json(subject: &str, config: ViewWindowConfig, matrix: &VisibleMatrix) -> serde_json::Value {
    let rows: Vec<serde_json::Value> = matrix
        .rows
        .iter()
        .map(|row| {
            let cells: Vec<serde_json::Value> = matrix
                .categories
                .iter()
                .zip(&row.cells)
                .filter(|(_, cell)| cell.value != 0.0 || cell.is_persisted())
                .map(|(category, cell)| {
                    json!({
                        "category_id": category.id,
                        "hours": cell.value,
                        "owner_ref": cell.owner_ref,
                        "id": cell.persisted_id,
                    })
                })
                .collect();
            json!({
                "date": row.date,
                "total": row.total,
                "cells": cells,
            })
        })
        .collect();

    json!({
        "subject": subject,
        "mode": config.mode,
        "start": matrix.range.start,
        "end": matrix.range.end,
        "categories": matrix.categories,
        "rows": rows,
        "column_totals": matrix.column_totals,
        "total": matrix.grand_total(),
    })
}
