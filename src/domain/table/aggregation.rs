// ============================================================
// AGGREGATION & EXPORT REQUESTS
// ============================================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::Filters;

/// Aggregation function applied to one column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggFunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggFunction::Count => "count",
            AggFunction::Sum => "sum",
            AggFunction::Avg => "avg",
            AggFunction::Min => "min",
            AggFunction::Max => "max",
        }
    }
}

impl fmt::Display for AggFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggFunction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "count" => Ok(AggFunction::Count),
            "sum" => Ok(AggFunction::Sum),
            "avg" => Ok(AggFunction::Avg),
            "min" => Ok(AggFunction::Min),
            "max" => Ok(AggFunction::Max),
            other => Err(format!("unknown aggregation function '{}'", other)),
        }
    }
}

/// Metric as it arrives on the wire: `{col, agg}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRequest {
    pub col: String,
    pub agg: String,
}

impl MetricRequest {
    pub fn new(col: impl Into<String>, agg: AggFunction) -> Self {
        Self {
            col: col.into(),
            agg: agg.as_str().to_string(),
        }
    }
}

/// Metric with a resolved function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metric {
    pub column: String,
    pub function: AggFunction,
}

impl Metric {
    /// Output column name: `<column>_<function>`
    pub fn output_name(&self) -> String {
        format!("{}_{}", self.column, self.function)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AggregateRequest {
    #[serde(default)]
    pub group_by: Vec<String>,

    pub metrics: Vec<MetricRequest>,

    #[serde(default)]
    pub filters: Filters,

    #[serde(default)]
    pub search: Option<String>,
}

impl AggregateRequest {
    /// Metrics with a known function; unknown function names are dropped.
    pub fn resolved_metrics(&self) -> Vec<Metric> {
        self.metrics
            .iter()
            .filter_map(|m| match m.agg.parse::<AggFunction>() {
                Ok(function) => Some(Metric {
                    column: m.col.clone(),
                    function,
                }),
                Err(e) => {
                    tracing::debug!("Skipping metric on '{}': {}", m.col, e);
                    None
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExportRequest {
    pub search: Option<String>,
    pub filters: Filters,

    /// Column allowlist in output order
    pub columns: Option<Vec<String>>,
}

impl ExportRequest {
    /// Split a comma-separated allowlist, dropping blanks.
    pub fn parse_columns(raw: &str) -> Option<Vec<String>> {
        let columns: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from)
            .collect();

        if columns.is_empty() {
            None
        } else {
            Some(columns)
        }
    }
}
