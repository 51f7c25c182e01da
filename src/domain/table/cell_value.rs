// ============================================================
// CELL VALUE
// ============================================================
// Dynamically-typed scalar stored in a row

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::numeric::parse_clean_number;

/// Format used for every date cell produced by the engine
pub const ISO_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A single cell of a loosely-typed row
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Missing or empty value
    Null,

    Bool(bool),

    Number(f64),

    Text(String),

    /// Native date/time from a spreadsheet, kept as an ISO-8601 string
    Date(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Text representation used by search, contains-filters and CSV export.
    /// Null has no text and never matches anything.
    pub fn display_text(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            CellValue::Bool(b) => Some(b.to_string()),
            CellValue::Number(n) => Some(n.to_string()),
            CellValue::Text(s) | CellValue::Date(s) => Some(s.clone()),
        }
    }

    /// Best-effort numeric coercion; failures are `None`, never errors.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) if n.is_finite() => Some(*n),
            CellValue::Number(_) | CellValue::Null | CellValue::Date(_) => None,
            CellValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            CellValue::Text(s) => parse_clean_number(s),
        }
    }
}

impl From<Value> for CellValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => CellValue::Null,
            Value::Bool(b) => CellValue::Bool(b),
            Value::Number(n) => n.as_f64().map(CellValue::Number).unwrap_or(CellValue::Null),
            Value::String(s) => CellValue::Text(s),
            other => CellValue::Text(other.to_string()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Null => serializer.serialize_none(),
            CellValue::Bool(b) => serializer.serialize_bool(*b),
            CellValue::Number(n) => {
                // Integral values round-trip as JSON integers
                if n.fract() == 0.0 && n.abs() < 9.0e15 {
                    serializer.serialize_i64(*n as i64)
                } else if n.is_finite() {
                    serializer.serialize_f64(*n)
                } else {
                    serializer.serialize_none()
                }
            }
            CellValue::Text(s) | CellValue::Date(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(CellValue::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_text() {
        assert_eq!(CellValue::Number(5.0).display_text().as_deref(), Some("5"));
        assert_eq!(CellValue::Number(2.5).display_text().as_deref(), Some("2.5"));
        assert_eq!(CellValue::Bool(true).display_text().as_deref(), Some("true"));
        assert_eq!(CellValue::Null.display_text(), None);
    }

    #[test]
    fn test_as_number_coerces_text() {
        assert_eq!(CellValue::from("$100.00").as_number(), Some(100.0));
        assert_eq!(CellValue::from("n/a").as_number(), None);
        assert_eq!(CellValue::Date("2024-01-01T00:00:00".into()).as_number(), None);
        assert_eq!(CellValue::Null.as_number(), None);
    }

    #[test]
    fn test_json_shape() {
        let values = vec![
            CellValue::Null,
            CellValue::Number(3.0),
            CellValue::Number(1.5),
            CellValue::Text("a".into()),
            CellValue::Date("2024-01-01T00:00:00".into()),
        ];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"[null,3,1.5,"a","2024-01-01T00:00:00"]"#);
    }

    #[test]
    fn test_nested_json_kept_as_text() {
        let value: CellValue = serde_json::from_str("[1,2]").unwrap();
        assert_eq!(value, CellValue::Text("[1,2]".into()));
    }
}
