// ============================================================
// QUERY ENGINE
// ============================================================
// search -> filters -> total -> sort -> paginate

use std::cmp::Ordering;

use super::row_selection::select_rows;
use crate::domain::table::{CellValue, Row, RowsPage, RowsQuery, SortDirection, Table};

/// Run a paged query. `query` is expected to be validated already.
pub fn query_rows(table: &Table, query: &RowsQuery) -> RowsPage {
    if table.is_empty() {
        return RowsPage {
            total: 0,
            page: query.page,
            page_size: query.page_size,
            rows: Vec::new(),
        };
    }

    let mut selected = select_rows(table, query.search.as_deref(), &query.filters);
    let total = selected.len();

    if let Some(idx) = query.sort_by.as_deref().and_then(|c| table.column_index(c)) {
        // sort_by is stable
        selected.sort_by(|a, b| compare_cells(a.value_at(idx), b.value_at(idx), query.sort_dir));
    }

    let start = query.page.saturating_sub(1).saturating_mul(query.page_size);
    let rows: Vec<Row> = usize::try_from(start)
        .map(|start| {
            selected
                .into_iter()
                .skip(start)
                .take(query.page_size as usize)
                .cloned()
                .collect()
        })
        .unwrap_or_default();

    RowsPage {
        total,
        page: query.page,
        page_size: query.page_size,
        rows,
    }
}

/// Total order used for sorting: nulls last in both directions, then
/// `Number < Bool < Date < Text`, then by value within a kind.
pub fn compare_cells(
    a: Option<&CellValue>,
    b: Option<&CellValue>,
    direction: SortDirection,
) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());

    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => {
            let ordering = compare_present(a, b);
            match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        }
    }
}

fn type_rank(value: &CellValue) -> u8 {
    match value {
        CellValue::Number(_) => 0,
        CellValue::Bool(_) => 1,
        CellValue::Date(_) => 2,
        CellValue::Text(_) => 3,
        CellValue::Null => 4,
    }
}

fn compare_present(a: &CellValue, b: &CellValue) -> Ordering {
    match (a, b) {
        (CellValue::Number(x), CellValue::Number(y)) => x.total_cmp(y),
        (CellValue::Bool(x), CellValue::Bool(y)) => x.cmp(y),
        (CellValue::Date(x), CellValue::Date(y)) | (CellValue::Text(x), CellValue::Text(y)) => {
            x.cmp(y)
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::table::{Filter, Filters};

    fn numbered(count: usize) -> Table {
        Table::new(
            vec!["id".into(), "parity".into()],
            (0..count)
                .map(|i| {
                    vec![
                        CellValue::Number(i as f64),
                        if i % 2 == 0 { "even".into() } else { "odd".into() },
                    ]
                })
                .collect(),
        )
    }

    fn ids(page: &RowsPage) -> Vec<f64> {
        page.rows
            .iter()
            .filter_map(|r| r.get("id").and_then(CellValue::as_number))
            .collect()
    }

    #[test]
    fn test_empty_table_short_circuits() {
        let page = query_rows(&Table::default(), &RowsQuery::default().paged(3, 10));
        assert_eq!(page.total, 0);
        assert_eq!(page.page, 3);
        assert!(page.rows.is_empty());
    }

    #[test]
    fn test_total_is_independent_of_paging() {
        let table = numbered(23);
        let filters = Filters::new().with("parity", Filter::Contains("even".into()));

        let mut seen = 0;
        for page in 1..=5 {
            let result = query_rows(
                &table,
                &RowsQuery::default().filters(filters.clone()).paged(page, 5),
            );
            assert_eq!(result.total, 12);
            seen += result.rows.len();
        }
        assert_eq!(seen, 12);
    }

    #[test]
    fn test_out_of_range_page_is_empty() {
        let page = query_rows(&numbered(3), &RowsQuery::default().paged(9, 50));
        assert_eq!(page.total, 3);
        assert!(page.rows.is_empty());
    }

    #[test]
    fn test_sort_desc_and_unknown_column() {
        let table = numbered(4);
        let page = query_rows(&table, &RowsQuery::default().sort("id", SortDirection::Desc));
        assert_eq!(ids(&page), vec![3.0, 2.0, 1.0, 0.0]);

        let page = query_rows(&table, &RowsQuery::default().sort("missing", SortDirection::Desc));
        assert_eq!(ids(&page), vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_mixed_column_total_order() {
        let table = Table::new(
            vec!["v".into()],
            vec![
                vec!["banana".into()],
                vec![CellValue::Null],
                vec![CellValue::Number(10.0)],
                vec!["apple".into()],
                vec![CellValue::Number(2.0)],
            ],
        );

        let render = |dir| -> Vec<Option<String>> {
            query_rows(&table, &RowsQuery::default().sort("v", dir))
                .rows
                .iter()
                .map(|r| r.get("v").and_then(CellValue::display_text))
                .collect()
        };

        let some = |s: &str| Some(s.to_string());
        assert_eq!(
            render(SortDirection::Asc),
            vec![some("2"), some("10"), some("apple"), some("banana"), None]
        );
        assert_eq!(
            render(SortDirection::Desc),
            vec![some("banana"), some("apple"), some("10"), some("2"), None]
        );
    }

    #[test]
    fn test_sort_is_stable() {
        let table = numbered(6);
        let page = query_rows(&table, &RowsQuery::default().sort("parity", SortDirection::Asc));
        assert_eq!(ids(&page), vec![0.0, 2.0, 4.0, 1.0, 3.0, 5.0]);
    }
}
