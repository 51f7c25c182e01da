// ============================================================
// QUERY TYPES
// ============================================================
// Search / filter / sort / pagination inputs and the paged result

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::str::FromStr;
use validator::Validate;

use super::numeric::parse_plain_number;
use super::{CellValue, Row};

pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Per-column predicate, decided once when the request is decoded
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Case-insensitive substring match on the value's text
    Contains(String),

    /// Inclusive numeric bounds; a missing bound is not checked
    Range { min: Option<f64>, max: Option<f64> },
}

impl Filter {
    /// Decode one filter entry. `null` and arrays carry no usable predicate.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Object(bounds) => Some(Filter::Range {
                min: bounds.get("min").and_then(bound_value),
                max: bounds.get("max").and_then(bound_value),
            }),
            Value::String(s) => Some(Filter::Contains(s.clone())),
            Value::Number(n) => n
                .as_f64()
                .and_then(|f| CellValue::Number(f).display_text())
                .map(Filter::Contains),
            Value::Bool(b) => Some(Filter::Contains(b.to_string())),
            Value::Null | Value::Array(_) => None,
        }
    }

    pub fn matches(&self, cell: &CellValue) -> bool {
        match self {
            Filter::Contains(needle) => cell
                .display_text()
                .map(|text| text.to_lowercase().contains(&needle.to_lowercase()))
                .unwrap_or(false),
            Filter::Range { min: None, max: None } => true,
            Filter::Range { min, max } => match cell.as_number() {
                Some(value) => {
                    min.map_or(true, |lo| value >= lo) && max.map_or(true, |hi| value <= hi)
                }
                None => false,
            },
        }
    }
}

fn bound_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_plain_number(s),
        _ => None,
    }
}

/// Ordered set of column filters, combined with logical AND
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    entries: Vec<(String, Filter)>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, filter: Filter) -> Self {
        self.entries.push((column.into(), filter));
        self
    }

    /// Decode a JSON object of `column -> filter`. Anything else means no filters.
    pub fn from_json(value: &Value) -> Self {
        let Value::Object(map) = value else {
            return Self::default();
        };

        let entries = map
            .iter()
            .filter_map(|(column, raw)| Filter::from_json(raw).map(|f| (column.clone(), f)))
            .collect();

        Self { entries }
    }

    /// Parse caller-supplied filter JSON; malformed input is treated as no filters.
    pub fn parse_lenient(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => Self::from_json(&value),
            Err(e) => {
                tracing::debug!("Ignoring malformed filter JSON: {}", e);
                Self::default()
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Filter)> {
        self.entries.iter().map(|(column, filter)| (column.as_str(), filter))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<'de> Deserialize<'de> for Filters {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(|value| Filters::from_json(&value))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(format!("sort_dir must be 'asc' or 'desc', got '{}'", other)),
        }
    }
}

impl<'de> Deserialize<'de> for SortDirection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

fn default_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE as u64
}

/// Paged row request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RowsQuery {
    #[serde(default)]
    pub search: Option<String>,

    #[serde(default)]
    pub filters: Filters,

    #[serde(default)]
    pub sort_by: Option<String>,

    #[serde(default)]
    pub sort_dir: SortDirection,

    /// 1-based page number
    #[serde(default = "default_page")]
    #[validate(range(min = 1))]
    pub page: u64,

    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, max = 500))]
    pub page_size: u64,
}

impl Default for RowsQuery {
    fn default() -> Self {
        Self {
            search: None,
            filters: Filters::default(),
            sort_by: None,
            sort_dir: SortDirection::Asc,
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl RowsQuery {
    pub fn paged(mut self, page: u64, page_size: u64) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn filters(mut self, filters: Filters) -> Self {
        self.filters = filters;
        self
    }

    pub fn sort(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
        self.sort_by = Some(column.into());
        self.sort_dir = direction;
        self
    }
}

/// One page of filtered rows plus the filtered total
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowsPage {
    pub total: usize,
    pub page: u64,
    pub page_size: u64,
    pub rows: Vec<Row>,
}
