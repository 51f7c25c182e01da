// ============================================================
// TABLE
// ============================================================
// Rectangular in-memory view over one file's rows, built per request

use std::collections::HashMap;

use super::{CellValue, Row};

/// Rows normalized to one ordered column set.
///
/// Every row holds exactly `columns.len()` cells in column order, so
/// positional lookups (`Row::value_at`) are valid for all rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Build from a header and raw cell rows. Short rows are padded with `Null`.
    pub fn new(columns: Vec<String>, raw_rows: Vec<Vec<CellValue>>) -> Self {
        let rows = raw_rows
            .into_iter()
            .map(|mut cells| {
                cells.resize(columns.len(), CellValue::Null);
                columns.iter().cloned().zip(cells).collect::<Row>()
            })
            .collect();

        Self { columns, rows }
    }

    /// Build from stored rows whose column sets may differ.
    /// Columns are the union in first-seen order; gaps become `Null`.
    pub fn from_rows(stored: Vec<Row>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for row in &stored {
            for column in row.columns() {
                if !positions.contains_key(column) {
                    positions.insert(column.to_string(), columns.len());
                    columns.push(column.to_string());
                }
            }
        }

        let rows = stored
            .into_iter()
            .map(|row| {
                let mut cells = vec![CellValue::Null; columns.len()];
                for (column, value) in row {
                    if let Some(&idx) = positions.get(&column) {
                        cells[idx] = value;
                    }
                }
                Row::from_distinct(columns.iter().cloned().zip(cells).collect())
            })
            .collect();

        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Values of one column in row order (empty for unknown columns).
    pub fn column_values<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a CellValue> + 'a {
        let index = self.column_index(name);
        self.rows
            .iter()
            .filter_map(move |row| index.and_then(|i| row.value_at(i)))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, CellValue)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_from_rows_unions_columns() {
        let table = Table::from_rows(vec![
            row(&[("a", CellValue::Number(1.0))]),
            row(&[("b", "x".into()), ("a", CellValue::Number(2.0))]),
        ]);

        assert_eq!(table.columns(), &["a".to_string(), "b".to_string()]);
        assert_eq!(table.rows()[0].get("b"), Some(&CellValue::Null));
        assert_eq!(table.rows()[1].value_at(0), Some(&CellValue::Number(2.0)));
    }

    #[test]
    fn test_new_pads_short_rows() {
        let table = Table::new(
            vec!["a".into(), "b".into()],
            vec![vec![CellValue::Number(1.0)]],
        );

        assert_eq!(table.rows()[0].len(), 2);
        assert_eq!(table.column_values("b").collect::<Vec<_>>(), vec![&CellValue::Null]);
    }

    #[test]
    fn test_from_rows_aligns_wide_rows_positionally() {
        let width = 300;
        let stored: Vec<Row> = (0..2_000)
            .map(|r| {
                // every other row stores its columns back to front
                let mut cols: Vec<usize> = (0..width).collect();
                if r % 2 == 1 {
                    cols.reverse();
                }
                cols.into_iter()
                    .map(|c| (format!("c{}", c), CellValue::Number((r * width + c) as f64)))
                    .collect()
            })
            .collect();

        let table = Table::from_rows(stored);

        assert_eq!(table.columns().len(), width);
        assert_eq!(table.columns()[299], "c299");
        let last = &table.rows()[1_999];
        assert_eq!(last.value_at(0), Some(&CellValue::Number((1_999 * width) as f64)));
        assert_eq!(
            last.value_at(299),
            Some(&CellValue::Number((1_999 * width + 299) as f64))
        );
        assert_eq!(last.columns().nth(5), Some("c5"));
    }
}
