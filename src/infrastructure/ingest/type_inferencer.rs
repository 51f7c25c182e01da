// ============================================================
// TYPE INFERENCER
// ============================================================
// Classify each column as number / date / string from messy values

use std::collections::BTreeMap;

use super::date_parser::parse_lenient_datetime;
use crate::domain::table::{parse_clean_number, CellValue, ColumnDescriptor, ColumnType, Table};

/// Per-column inference result
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnProfile {
    pub name: String,

    /// Share of values parseable as numbers after cleaning (0.0 - 1.0)
    pub numeric_ratio: f64,

    /// Share of values parseable as dates (0.0 - 1.0)
    pub date_ratio: f64,

    /// Decided by native cell types without ratio heuristics
    pub native: bool,

    pub column_type: ColumnType,
}

/// Column type inference with configurable thresholds
pub struct TypeInferencer {
    /// Minimum cleaned-numeric ratio for `number` (default: 0.5)
    numeric_threshold: f64,

    /// Minimum date ratio for `date` (default: 0.5)
    date_threshold: f64,

    /// Minimum ratio for promoting the best candidate when nothing is numeric (default: 0.2)
    fallback_threshold: f64,
}

impl Default for TypeInferencer {
    fn default() -> Self {
        Self {
            numeric_threshold: 0.5,
            date_threshold: 0.5,
            fallback_threshold: 0.2,
        }
    }
}

impl TypeInferencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Profile every column, then apply the at-least-one-number fallback.
    pub fn profile(&self, table: &Table) -> Vec<ColumnProfile> {
        let mut profiles: Vec<ColumnProfile> = table
            .columns()
            .iter()
            .map(|name| self.profile_column(name, table))
            .collect();

        if !profiles.iter().any(|p| p.column_type == ColumnType::Number) {
            // First column wins among equal ratios
            let best = profiles
                .iter_mut()
                .filter(|p| !p.native)
                .fold(None::<&mut ColumnProfile>, |best, p| match best {
                    Some(b) if b.numeric_ratio >= p.numeric_ratio => Some(b),
                    _ => Some(p),
                });

            if let Some(best) = best {
                if best.numeric_ratio >= self.fallback_threshold {
                    tracing::debug!(
                        "No numeric column detected; promoting '{}' (ratio {:.2})",
                        best.name,
                        best.numeric_ratio
                    );
                    best.column_type = ColumnType::Number;
                }
            }
        }

        profiles
    }

    /// Column name -> inferred type
    pub fn infer(&self, table: &Table) -> BTreeMap<String, ColumnType> {
        self.profile(table)
            .into_iter()
            .map(|p| (p.name, p.column_type))
            .collect()
    }

    /// Descriptor stored alongside an uploaded file
    pub fn describe(&self, table: &Table) -> ColumnDescriptor {
        ColumnDescriptor {
            columns: table.columns().to_vec(),
            types: self.infer(table),
        }
    }

    fn profile_column(&self, name: &str, table: &Table) -> ColumnProfile {
        let values: Vec<&CellValue> = table.column_values(name).collect();

        if let Some(column_type) = native_type(&values) {
            return ColumnProfile {
                name: name.to_string(),
                numeric_ratio: if column_type == ColumnType::Number { 1.0 } else { 0.0 },
                date_ratio: if column_type == ColumnType::Date { 1.0 } else { 0.0 },
                native: true,
                column_type,
            };
        }

        let texts: Vec<Option<String>> = values.iter().map(|v| v.display_text()).collect();
        let numeric_ratio = ratio(&texts, |s| parse_clean_number(s).is_some());
        let date_ratio = ratio(&texts, |s| parse_lenient_datetime(s).is_some());

        let column_type = if numeric_ratio >= self.numeric_threshold && numeric_ratio >= date_ratio
        {
            ColumnType::Number
        } else if date_ratio >= self.date_threshold {
            ColumnType::Date
        } else {
            ColumnType::String
        };

        tracing::debug!(
            column = name,
            numeric_ratio,
            date_ratio,
            "Inferred column type {}",
            column_type
        );

        ColumnProfile {
            name: name.to_string(),
            numeric_ratio,
            date_ratio,
            native: false,
            column_type,
        }
    }
}

/// Type implied by native cells alone: every present value is a number
/// (or every one a date), with at least one present.
fn native_type(values: &[&CellValue]) -> Option<ColumnType> {
    let mut present = values.iter().filter(|v| !v.is_null()).peekable();
    let first = present.peek()?;

    let expected = match first {
        CellValue::Number(_) => ColumnType::Number,
        CellValue::Date(_) => ColumnType::Date,
        _ => return None,
    };

    present
        .all(|v| match expected {
            ColumnType::Number => matches!(v, CellValue::Number(_)),
            _ => matches!(v, CellValue::Date(_)),
        })
        .then_some(expected)
}

/// Fraction of all values (missing ones included) accepted by `accept`.
fn ratio(texts: &[Option<String>], accept: impl Fn(&str) -> bool) -> f64 {
    if texts.is_empty() {
        return 0.0;
    }

    let hits = texts
        .iter()
        .filter(|t| t.as_deref().map(&accept).unwrap_or(false))
        .count();

    hits as f64 / texts.len() as f64
}
