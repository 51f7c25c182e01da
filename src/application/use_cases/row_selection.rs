// Search + filter pass shared by the query, aggregation and export engines.

use crate::domain::table::{Filter, Filters, Row, Table};

/// Rows matching the search term and every filter, in stored order.
///
/// Search: any cell's text contains the term, case-insensitively.
/// Filters: AND across columns; columns missing from the table are ignored.
pub fn select_rows<'a>(table: &'a Table, search: Option<&str>, filters: &Filters) -> Vec<&'a Row> {
    let term = search.filter(|s| !s.is_empty()).map(str::to_lowercase);

    let resolved: Vec<(usize, &Filter)> = filters
        .iter()
        .filter_map(|(column, filter)| table.column_index(column).map(|idx| (idx, filter)))
        .collect();

    table
        .rows()
        .iter()
        .filter(|row| term.as_deref().map_or(true, |t| row_contains(row, t)))
        .filter(|row| {
            resolved.iter().all(|(idx, filter)| {
                row.value_at(*idx)
                    .map(|cell| filter.matches(cell))
                    .unwrap_or(false)
            })
        })
        .collect()
}

fn row_contains(row: &Row, lowered_term: &str) -> bool {
    row.iter().any(|(_, cell)| {
        cell.display_text()
            .map(|text| text.to_lowercase().contains(lowered_term))
            .unwrap_or(false)
    })
}
