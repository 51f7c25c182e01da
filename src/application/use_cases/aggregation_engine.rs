// ============================================================
// AGGREGATION ENGINE
// ============================================================
// Group-by + metrics over the rows surviving search and filters

use std::collections::HashMap;

use super::row_selection::select_rows;
use crate::domain::table::{AggFunction, AggregateRequest, CellValue, Metric, Row, Table};

/// Hashable form of a non-null cell; exact value equality, no string folding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyPart {
    Number(u64),
    Bool(bool),
    Date(String),
    Text(String),
}

impl KeyPart {
    fn from_cell(cell: &CellValue) -> Option<Self> {
        match cell {
            CellValue::Null => None,
            // -0.0 and 0.0 land in one group
            CellValue::Number(n) if *n == 0.0 => Some(KeyPart::Number(0f64.to_bits())),
            CellValue::Number(n) => Some(KeyPart::Number(n.to_bits())),
            CellValue::Bool(b) => Some(KeyPart::Bool(*b)),
            CellValue::Date(s) => Some(KeyPart::Date(s.clone())),
            CellValue::Text(s) => Some(KeyPart::Text(s.clone())),
        }
    }
}

struct Group<'a> {
    key_cells: Vec<CellValue>,
    rows: Vec<&'a Row>,
}

/// Resolved metric bound to a column position
struct BoundMetric {
    name: String,
    column: usize,
    function: AggFunction,
}

pub fn aggregate(table: &Table, request: &AggregateRequest) -> Vec<Row> {
    if table.is_empty() {
        return Vec::new();
    }

    let selected = select_rows(table, request.search.as_deref(), &request.filters);
    let metrics = bind_metrics(table, &request.resolved_metrics());

    let group_columns: Vec<(usize, &str)> = request
        .group_by
        .iter()
        .filter_map(|c| table.column_index(c).map(|idx| (idx, c.as_str())))
        .collect();

    if metrics.is_empty() {
        tracing::debug!(
            "No usable metrics; returning {} filtered rows unchanged",
            selected.len()
        );
        return selected.into_iter().cloned().collect();
    }

    if group_columns.is_empty() {
        let mut row = Row::with_capacity(metrics.len());
        for metric in &metrics {
            row.insert(metric.name.clone(), compute(metric, &selected));
        }
        return vec![row];
    }

    let groups = partition(&selected, &group_columns);
    tracing::debug!("Aggregated {} rows into {} groups", selected.len(), groups.len());

    groups
        .into_iter()
        .map(|group| {
            let mut row = Row::with_capacity(group_columns.len() + metrics.len());
            for ((_, name), cell) in group_columns.iter().zip(group.key_cells) {
                row.insert(*name, cell);
            }
            for metric in &metrics {
                row.insert(metric.name.clone(), compute(metric, &group.rows));
            }
            row
        })
        .collect()
}

/// Drop metrics on unknown columns; the first of two metrics with one output name wins.
fn bind_metrics(table: &Table, metrics: &[Metric]) -> Vec<BoundMetric> {
    let mut bound: Vec<BoundMetric> = Vec::with_capacity(metrics.len());

    for metric in metrics {
        let Some(column) = table.column_index(&metric.column) else {
            tracing::debug!("Skipping metric on unknown column '{}'", metric.column);
            continue;
        };

        let name = metric.output_name();
        if bound.iter().any(|b| b.name == name) {
            continue;
        }

        bound.push(BoundMetric {
            name,
            column,
            function: metric.function,
        });
    }

    bound
}

/// Groups in first-seen order; rows with a null key value are left out.
fn partition<'a>(rows: &[&'a Row], group_columns: &[(usize, &str)]) -> Vec<Group<'a>> {
    let mut index: HashMap<Vec<KeyPart>, usize> = HashMap::new();
    let mut groups: Vec<Group<'a>> = Vec::new();

    for row in rows {
        let cells: Vec<&CellValue> = group_columns
            .iter()
            .map(|(idx, _)| row.value_at(*idx).unwrap_or(&CellValue::Null))
            .collect();

        let Some(key) = cells
            .iter()
            .map(|cell| KeyPart::from_cell(cell))
            .collect::<Option<Vec<_>>>()
        else {
            continue;
        };

        match index.get(&key) {
            Some(&slot) => groups[slot].rows.push(row),
            None => {
                index.insert(key, groups.len());
                groups.push(Group {
                    key_cells: cells.into_iter().cloned().collect(),
                    rows: vec![row],
                });
            }
        }
    }

    groups
}

fn compute(metric: &BoundMetric, rows: &[&Row]) -> CellValue {
    if metric.function == AggFunction::Count {
        return CellValue::Number(rows.len() as f64);
    }

    let values: Vec<f64> = rows
        .iter()
        .filter_map(|row| row.value_at(metric.column))
        .filter_map(CellValue::as_number)
        .collect();

    if values.is_empty() {
        return CellValue::Null;
    }

    let result = match metric.function {
        AggFunction::Count => values.len() as f64,
        AggFunction::Sum => values.iter().sum(),
        AggFunction::Avg => values.iter().sum::<f64>() / values.len() as f64,
        AggFunction::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
        AggFunction::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    };

    CellValue::Number(result)
}
