// ============================================================
// TABLE DOMAIN LAYER
// ============================================================
// Core types and value objects for the tabular data engine
// No I/O, no async

mod aggregation;
mod cell_value;
mod column;
mod data_table;
mod numeric;
mod query;
mod row;

pub use aggregation::{AggFunction, AggregateRequest, ExportRequest, Metric, MetricRequest};
pub use cell_value::{CellValue, ISO_DATETIME_FORMAT};
pub use column::{ColumnDescriptor, ColumnInfo, ColumnType};
pub use data_table::Table;
pub use numeric::{parse_clean_number, parse_plain_number};
pub use query::{Filter, Filters, RowsPage, RowsQuery, SortDirection, DEFAULT_PAGE_SIZE};
pub use row::Row;
