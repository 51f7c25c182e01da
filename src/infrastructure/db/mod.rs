// ============================================================
// DATASET STORE
// ============================================================
// File metadata + row persistence behind one async trait

mod memory;
mod sqlite;

pub use memory::MemoryDatasetStore;
pub use sqlite::SqliteDatasetStore;

use async_trait::async_trait;

use crate::domain::dataset::{FileRecord, NewFileRecord};
use crate::domain::error::Result;
use crate::domain::table::Row;

#[async_trait]
pub trait DatasetStore: Send + Sync {
    /// Persist a file record and return it with its assigned id
    async fn create_file(&self, file: NewFileRecord) -> Result<FileRecord>;

    async fn file_by_id(&self, id: i64) -> Result<Option<FileRecord>>;

    /// Newest first; `owner` of `None` lists every owner
    async fn list_files(&self, owner: Option<i64>, offset: i64, limit: i64)
        -> Result<Vec<FileRecord>>;

    async fn count_files(&self, owner: Option<i64>) -> Result<i64>;

    /// Append rows in ingestion order
    async fn append_rows(&self, file_id: i64, rows: &[Row]) -> Result<()>;

    /// Every row of a file in ingestion order
    async fn rows_for_file(&self, file_id: i64) -> Result<Vec<Row>>;

    /// First `limit` rows of a file
    async fn head_rows(&self, file_id: i64, limit: i64) -> Result<Vec<Row>>;

    /// Remove a file and its rows; returns whether anything was deleted
    async fn delete_file(&self, id: i64) -> Result<bool>;
}
