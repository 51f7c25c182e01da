// ============================================================
// FILE PARSER
// ============================================================
// Turn uploaded CSV / spreadsheet bytes into a rectangular table

use csv::{ReaderBuilder, Trim};

use super::encoding::decode_csv_bytes;
use super::spreadsheet;
use crate::domain::error::{AppError, Result};
use crate::domain::table::{parse_plain_number, CellValue, Table};

/// Strings read as missing values in CSV input
const NA_MARKERS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "null", "NULL", "None", "#N/A", "<NA>",
];

/// Upload formats recognised by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Xlsx,
    Xls,
}

impl FileFormat {
    pub fn from_filename(filename: &str) -> Option<Self> {
        let lower = filename.trim().to_ascii_lowercase();
        if lower.ends_with(".csv") {
            Some(FileFormat::Csv)
        } else if lower.ends_with(".xlsx") {
            Some(FileFormat::Xlsx)
        } else if lower.ends_with(".xls") {
            Some(FileFormat::Xls)
        } else {
            None
        }
    }
}

/// Parser for uploaded tabular files (comma-delimited CSV, xlsx, xls)
#[derive(Debug, Default, Clone, Copy)]
pub struct FileParser;

impl FileParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse raw upload bytes, dispatching on the file extension.
    pub fn parse_bytes(&self, bytes: &[u8], filename: &str) -> Result<Table> {
        let table = match FileFormat::from_filename(filename) {
            Some(FileFormat::Csv) => {
                let (content, _) = decode_csv_bytes(bytes)?;
                self.parse_content(&content)?
            }
            Some(format @ (FileFormat::Xlsx | FileFormat::Xls)) => {
                spreadsheet::parse_workbook(bytes, format)?
            }
            None => return Err(AppError::ParseError("unsupported file format".to_string())),
        };

        tracing::debug!(
            "Parsed {} into {} rows x {} columns",
            filename,
            table.len(),
            table.columns().len()
        );
        Ok(table)
    }

    /// Parse already-decoded CSV text.
    pub fn parse_content(&self, content: &str) -> Result<Table> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b',')
            .trim(Trim::None)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| AppError::ParseError(format!("Failed to read CSV headers: {}", e)))?
            .clone();

        if headers.is_empty() {
            return Err(AppError::ParseError(
                "No columns to parse from file".to_string(),
            ));
        }

        let width = headers.len();
        let mut raw_rows: Vec<Vec<String>> = Vec::new();

        for (index, result) in reader.records().enumerate() {
            let record = result.map_err(|e| {
                AppError::ParseError(format!("Failed to parse CSV row {}: {}", index + 1, e))
            })?;

            if record.len() > width {
                let line = record.position().map(|p| p.line()).unwrap_or(index as u64 + 2);
                return Err(AppError::ParseError(format!(
                    "Expected {} fields in line {}, saw {}",
                    width,
                    line,
                    record.len()
                )));
            }

            raw_rows.push(record.iter().map(str::to_string).collect());
        }

        let columns = normalize_headers(headers.iter());
        Ok(Table::new(columns, typed_columns(raw_rows, width)))
    }
}

/// `" Unit Price "` -> `"unit_price"`
pub fn normalize_column_name(name: &str) -> String {
    name.trim().replace(' ', "_").to_lowercase()
}

/// Normalize header names and disambiguate repeats with `.1`, `.2`, ...
pub(super) fn normalize_headers<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();

    for (idx, name) in raw.enumerate() {
        let base = if name.trim().is_empty() {
            normalize_column_name(&format!("Unnamed: {}", idx))
        } else {
            normalize_column_name(name)
        };

        let mut candidate = base.clone();
        let mut suffix = 1;
        while columns.contains(&candidate) {
            candidate = format!("{}.{}", base, suffix);
            suffix += 1;
        }
        columns.push(candidate);
    }

    columns
}

fn is_na(raw: &str) -> bool {
    NA_MARKERS.contains(&raw.trim())
}

/// Columns whose every present value is a plain number become numeric cells;
/// everything else stays text. Missing values become `Null`.
fn typed_columns(raw_rows: Vec<Vec<String>>, width: usize) -> Vec<Vec<CellValue>> {
    let numeric: Vec<bool> = (0..width)
        .map(|col| {
            raw_rows
                .iter()
                .filter_map(|row| row.get(col))
                .filter(|v| !is_na(v))
                .all(|v| parse_plain_number(v).is_some())
        })
        .collect();

    raw_rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .enumerate()
                .map(|(col, raw)| {
                    if is_na(&raw) {
                        CellValue::Null
                    } else if numeric[col] {
                        parse_plain_number(&raw)
                            .map(CellValue::Number)
                            .unwrap_or(CellValue::Text(raw))
                    } else {
                        CellValue::Text(raw)
                    }
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_csv() {
        let content = "name,age,city\nAlice,30,NYC\nBob,25,LA";
        let table = FileParser::new().parse_content(content).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.columns(), &["name", "age", "city"]);
        assert_eq!(table.rows()[0].get("name"), Some(&CellValue::from("Alice")));
        assert_eq!(table.rows()[0].get("age"), Some(&CellValue::Number(30.0)));
    }

    #[test]
    fn test_column_name_normalization() {
        assert_eq!(normalize_column_name("  First Name "), "first_name");
        assert_eq!(normalize_column_name("Unit  Price"), "unit__price");

        let table = FileParser::new()
            .parse_content(" Order ID ,Amount\n1,2")
            .unwrap();
        assert_eq!(table.columns(), &["order_id", "amount"]);
    }

    #[test]
    fn test_mixed_column_stays_text() {
        let table = FileParser::new()
            .parse_content("amount\n$100.00\n50")
            .unwrap();
        assert_eq!(table.rows()[1].get("amount"), Some(&CellValue::from("50")));
    }

    #[test]
    fn test_na_markers_and_short_rows_become_null() {
        let table = FileParser::new()
            .parse_content("a,b,c\n1,N/A\n2,,x")
            .unwrap();

        assert_eq!(table.rows()[0].get("b"), Some(&CellValue::Null));
        assert_eq!(table.rows()[0].get("c"), Some(&CellValue::Null));
        assert_eq!(table.rows()[1].get("a"), Some(&CellValue::Number(2.0)));
    }

    #[test]
    fn test_extra_fields_fail() {
        let err = FileParser::new()
            .parse_content("a,b\n1,2,3")
            .unwrap_err();
        assert!(matches!(err, AppError::ParseError(msg) if msg.contains("Expected 2 fields")));
    }

    #[test]
    fn test_duplicate_headers_are_suffixed() {
        let table = FileParser::new().parse_content("x,X,x\n1,2,3").unwrap();
        assert_eq!(table.columns(), &["x", "x.1", "x.2"]);
    }

    #[test]
    fn test_empty_input_fails() {
        let err = FileParser::new().parse_bytes(b"", "empty.csv").unwrap_err();
        assert!(matches!(err, AppError::ParseError(_)));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = FileParser::new().parse_bytes(b"{}", "data.json").unwrap_err();
        assert!(matches!(err, AppError::ParseError(msg) if msg == "unsupported file format"));
    }

    #[test]
    fn test_latin1_bytes_parse() {
        let table = FileParser::new()
            .parse_bytes(b"City\nM\xFCnchen", "cities.CSV")
            .unwrap();
        assert_eq!(table.rows()[0].get("city"), Some(&CellValue::from("München")));
    }

    #[test]
    fn test_header_only_csv_has_no_rows() {
        let table = FileParser::new().parse_bytes(b"a,b\n", "h.csv").unwrap();
        assert!(table.is_empty());
        assert_eq!(table.columns(), &["a", "b"]);
    }
}
