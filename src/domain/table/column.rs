// ============================================================
// COLUMN METADATA
// ============================================================
// Inferred column types, computed once at upload time

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::CellValue;

/// Semantic type inferred for a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Number,
    Date,
    String,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Number => write!(f, "number"),
            ColumnType::Date => write!(f, "date"),
            ColumnType::String => write!(f, "string"),
        }
    }
}

/// Advisory column metadata stored with a file. Never enforced as a schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column names in source order
    pub columns: Vec<String>,

    /// Inferred type per column
    pub types: BTreeMap<String, ColumnType>,
}

impl ColumnDescriptor {
    /// Type recorded for a column, `String` when unknown
    pub fn type_of(&self, column: &str) -> ColumnType {
        self.types.get(column).copied().unwrap_or(ColumnType::String)
    }
}

/// Column listing entry with a few sample values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnInfo {
    pub name: String,

    #[serde(rename = "type")]
    pub column_type: ColumnType,

    pub sample_values: Vec<CellValue>,
}
