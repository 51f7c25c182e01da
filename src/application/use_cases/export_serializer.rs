// ============================================================
// EXPORT SERIALIZER
// ============================================================
// Filtered rows -> CSV text (header row, no index column)

use super::row_selection::select_rows;
use crate::domain::error::{AppError, Result};
use crate::domain::table::{ExportRequest, Table};

pub fn export_csv(table: &Table, request: &ExportRequest) -> Result<String> {
    let selected = select_rows(table, request.search.as_deref(), &request.filters);
    if selected.is_empty() {
        return Ok(String::new());
    }

    let projection = project_columns(table, request.columns.as_deref());

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer
        .write_record(projection.iter().map(|(_, name)| name.as_str()))
        .map_err(|e| AppError::Internal(format!("Failed to write CSV header: {}", e)))?;

    for row in &selected {
        let record = projection.iter().map(|(idx, _)| {
            row.value_at(*idx)
                .and_then(|cell| cell.display_text())
                .unwrap_or_default()
        });
        writer
            .write_record(record)
            .map_err(|e| AppError::Internal(format!("Failed to write CSV row: {}", e)))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("Failed to flush CSV output: {}", e)))?;

    String::from_utf8(bytes)
        .map_err(|e| AppError::Internal(format!("CSV output is not valid UTF-8: {}", e)))
}

/// Allowlisted columns that exist, in the caller's order; every column when
/// no allowlist is given or none of its names exist.
fn project_columns<'a>(table: &'a Table, allowlist: Option<&[String]>) -> Vec<(usize, &'a String)> {
    let all = || table.columns().iter().enumerate().collect::<Vec<_>>();

    let Some(allowlist) = allowlist else {
        return all();
    };

    let mut picked: Vec<(usize, &String)> = Vec::with_capacity(allowlist.len());
    for name in allowlist {
        if let Some(idx) = table.column_index(name) {
            if !picked.iter().any(|(seen, _)| *seen == idx) {
                picked.push((idx, &table.columns()[idx]));
            }
        }
    }

    if picked.is_empty() {
        tracing::debug!("No allowlisted column exists; exporting all columns");
        return all();
    }

    picked
}
