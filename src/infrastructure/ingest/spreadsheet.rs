// ============================================================
// SPREADSHEET READER
// ============================================================
// First worksheet of an .xlsx / .xls upload, first row as header

use super::file_parser::FileFormat;
use crate::domain::error::{AppError, Result};
use crate::domain::table::Table;

#[cfg(feature = "spreadsheet")]
pub fn parse_workbook(bytes: &[u8], format: FileFormat) -> Result<Table> {
    use calamine::{Xls, Xlsx};
    use std::io::Cursor;

    match format {
        FileFormat::Xlsx => read_first_sheet::<Xlsx<Cursor<&[u8]>>>(bytes, "xlsx"),
        FileFormat::Xls => read_first_sheet::<Xls<Cursor<&[u8]>>>(bytes, "xls"),
        FileFormat::Csv => Err(AppError::Internal(
            "CSV input routed to the spreadsheet reader".to_string(),
        )),
    }
}

#[cfg(not(feature = "spreadsheet"))]
pub fn parse_workbook(_bytes: &[u8], format: FileFormat) -> Result<Table> {
    let kind = match format {
        FileFormat::Xls => "xls",
        _ => "xlsx",
    };
    Err(AppError::ParseError(format!(
        "Missing optional spreadsheet support for .{} files; rebuild with the `spreadsheet` feature to enable Excel parsing",
        kind
    )))
}

#[cfg(feature = "spreadsheet")]
fn read_first_sheet<'a, R>(bytes: &'a [u8], kind: &str) -> Result<Table>
where
    R: calamine::Reader<std::io::Cursor<&'a [u8]>>,
    R::Error: std::fmt::Display,
{
    let mut workbook = R::new(std::io::Cursor::new(bytes)).map_err(|e| {
        AppError::ParseError(format!("Failed to open {} workbook: {}", kind, e))
    })?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::ParseError("No worksheet found".to_string()))?
        .map_err(|e| AppError::ParseError(format!("Failed to read worksheet: {}", e)))?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Err(AppError::ParseError(
            "No columns to parse from file".to_string(),
        ));
    };

    let header_names: Vec<String> = header.iter().map(|cell| cell.to_string()).collect();
    let columns = super::file_parser::normalize_headers(header_names.iter().map(String::as_str));

    let raw_rows = rows
        .map(|row| row.iter().map(cell_value).collect::<Vec<_>>())
        .filter(|cells| cells.iter().any(|c| !c.is_null()))
        .collect();

    Ok(Table::new(columns, raw_rows))
}

#[cfg(feature = "spreadsheet")]
fn cell_value(cell: &calamine::Data) -> crate::domain::table::CellValue {
    use super::date_parser::to_iso_string;
    use crate::domain::table::CellValue;
    use calamine::Data;

    match cell {
        Data::Empty | Data::Error(_) => CellValue::Null,
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::String(s) if s.trim().is_empty() => CellValue::Null,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::DateTime(dt) if dt.is_duration() => CellValue::Number(dt.as_f64()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) => CellValue::Date(to_iso_string(&value)),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => CellValue::Date(s.clone()),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

#[cfg(all(test, feature = "spreadsheet"))]
mod tests {
    use super::*;
    use crate::domain::table::{CellValue, ColumnType};
    use crate::infrastructure::ingest::{FileParser, TypeInferencer};
    use calamine::Data;

    const SALES_XLSX: &[u8] = include_bytes!("../../../tests/fixtures/sales.xlsx");

    #[test]
    fn test_garbage_bytes_are_parse_errors() {
        let err = parse_workbook(b"definitely not a zip archive", FileFormat::Xlsx).unwrap_err();
        assert!(matches!(err, AppError::ParseError(msg) if msg.contains("xlsx")));

        let err = parse_workbook(b"nor an OLE file", FileFormat::Xls).unwrap_err();
        assert!(matches!(err, AppError::ParseError(_)));
    }

    #[test]
    fn test_cell_mapping() {
        assert_eq!(cell_value(&Data::Int(3)), CellValue::Number(3.0));
        assert_eq!(cell_value(&Data::Empty), CellValue::Null);
        assert_eq!(cell_value(&Data::String("  ".into())), CellValue::Null);
        assert_eq!(cell_value(&Data::Bool(true)), CellValue::Bool(true));
        assert_eq!(
            cell_value(&Data::DateTimeIso("2024-01-01T00:00:00".into())),
            CellValue::Date("2024-01-01T00:00:00".into())
        );
    }

    #[test]
    fn test_first_sheet_with_header_row() {
        let table = parse_workbook(SALES_XLSX, FileFormat::Xlsx).unwrap();

        assert_eq!(table.columns(), &["region", "sold_on", "amount", "region.1"]);
        // row 3 of the sheet is blank and the second sheet is never read
        assert_eq!(table.len(), 2);

        let first = &table.rows()[0];
        assert_eq!(first.get("region"), Some(&CellValue::from("East")));
        assert_eq!(
            first.get("sold_on"),
            Some(&CellValue::Date("2024-01-01T00:00:00".into()))
        );
        assert_eq!(first.get("amount"), Some(&CellValue::Number(100.0)));
        assert_eq!(table.rows()[1].get("region.1"), Some(&CellValue::from("y")));
    }

    #[test]
    fn test_workbook_columns_infer_native_types() {
        let table = FileParser::new().parse_bytes(SALES_XLSX, "Sales.XLSX").unwrap();
        let types = TypeInferencer::new().infer(&table);

        assert_eq!(types["region"], ColumnType::String);
        assert_eq!(types["sold_on"], ColumnType::Date);
        assert_eq!(types["amount"], ColumnType::Number);
        assert_eq!(types["region.1"], ColumnType::String);
    }
}
