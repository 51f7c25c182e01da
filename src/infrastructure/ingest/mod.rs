// ============================================================
// INGEST INFRASTRUCTURE LAYER
// ============================================================
// File parsing, encoding detection, and column type inference

mod date_parser;
mod encoding;
mod file_parser;
mod spreadsheet;
mod type_inferencer;

pub use date_parser::{parse_lenient_datetime, to_iso_string};
pub use encoding::{decode_csv_bytes, CsvEncoding, ENCODING_PREFERENCE};
pub use file_parser::{normalize_column_name, FileFormat, FileParser};
pub use type_inferencer::{ColumnProfile, TypeInferencer};
