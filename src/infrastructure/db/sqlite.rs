use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::str::FromStr;
use std::time::Duration;

use super::DatasetStore;
use crate::domain::dataset::{FileRecord, NewFileRecord};
use crate::domain::error::{AppError, Result};
use crate::domain::table::{CellValue, ColumnDescriptor, Row};

const SCHEMA: &str = include_str!("../../../resources/schema.sql");

pub struct SqliteDatasetStore {
    pool: SqlitePool,
}

impl SqliteDatasetStore {
    /// Open (or create) the database and apply the schema.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let in_memory = database_url.contains(":memory:");

        let mut options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to parse connection string: {}", e))
            })?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        if !in_memory {
            options = options
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal);
        }

        // Each in-memory connection would be a separate database
        let max_connections = if in_memory { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect: {}", e)))?;

        sqlx::raw_sql(SCHEMA)
            .execute(&pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to apply schema: {}", e)))?;

        tracing::info!("Dataset store ready at {}", database_url);
        Ok(Self { pool })
    }
}

#[async_trait]
impl DatasetStore for SqliteDatasetStore {
    async fn create_file(&self, file: NewFileRecord) -> Result<FileRecord> {
        let uploaded_at = Utc::now();
        let columns_json = serde_json::to_string(&file.columns)
            .map_err(|e| AppError::Internal(format!("Failed to encode columns: {}", e)))?;

        let result = sqlx::query(
            "INSERT INTO files (owner_id, filename, storage_path, uploaded_at, row_count, columns_json)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(file.owner_id)
        .bind(&file.filename)
        .bind(&file.storage_path)
        .bind(uploaded_at)
        .bind(file.row_count)
        .bind(&columns_json)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to save file: {}", e)))?;

        Ok(FileRecord {
            id: result.last_insert_rowid(),
            owner_id: file.owner_id,
            filename: file.filename,
            storage_path: file.storage_path,
            uploaded_at,
            row_count: file.row_count,
            columns: file.columns,
        })
    }

    async fn file_by_id(&self, id: i64) -> Result<Option<FileRecord>> {
        let entity = sqlx::query_as::<_, FileEntity>(
            "SELECT id, owner_id, filename, storage_path, uploaded_at, row_count, columns_json
             FROM files WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to fetch file: {}", e)))?;

        entity.map(FileRecord::try_from).transpose()
    }

    async fn list_files(
        &self,
        owner: Option<i64>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<FileRecord>> {
        sqlx::query_as::<_, FileEntity>(
            "SELECT id, owner_id, filename, storage_path, uploaded_at, row_count, columns_json
             FROM files
             WHERE (?1 IS NULL OR owner_id = ?1)
             ORDER BY id DESC
             LIMIT ?2 OFFSET ?3",
        )
        .bind(owner)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to list files: {}", e)))?
        .into_iter()
        .map(FileRecord::try_from)
        .collect()
    }

    async fn count_files(&self, owner: Option<i64>) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM files WHERE (?1 IS NULL OR owner_id = ?1)")
            .bind(owner)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to count files: {}", e)))
    }

    async fn append_rows(&self, file_id: i64, rows: &[Row]) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to begin transaction: {}", e)))?;

        for row in rows {
            let data_json = encode_row(row)?;

            sqlx::query("INSERT INTO file_rows (file_id, data_json) VALUES (?, ?)")
                .bind(file_id)
                .bind(data_json)
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to save row: {}", e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to commit rows: {}", e)))?;

        tracing::debug!(file_id, "Stored {} rows", rows.len());
        Ok(())
    }

    async fn rows_for_file(&self, file_id: i64) -> Result<Vec<Row>> {
        let payloads: Vec<String> = sqlx::query_scalar(
            "SELECT data_json FROM file_rows WHERE file_id = ? ORDER BY id ASC",
        )
        .bind(file_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to fetch rows: {}", e)))?;

        payloads.iter().map(|raw| decode_row(raw)).collect()
    }

    async fn head_rows(&self, file_id: i64, limit: i64) -> Result<Vec<Row>> {
        let payloads: Vec<String> = sqlx::query_scalar(
            "SELECT data_json FROM file_rows WHERE file_id = ? ORDER BY id ASC LIMIT ?",
        )
        .bind(file_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to fetch rows: {}", e)))?;

        payloads.iter().map(|raw| decode_row(raw)).collect()
    }

    async fn delete_file(&self, id: i64) -> Result<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to begin transaction: {}", e)))?;

        sqlx::query("DELETE FROM file_rows WHERE file_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to delete rows: {}", e)))?;

        let result = sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to delete file: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to commit delete: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }
}

// ============================================================
// ROW PAYLOADS
// ============================================================
// Same JSON as the API except dates, which are tagged as {"$date": "<iso>"}
// so they come back as dates rather than text

const DATE_TAG: &str = "$date";

fn encode_row(row: &Row) -> Result<String> {
    serde_json::to_string(&StoredRow(row))
        .map_err(|e| AppError::Internal(format!("Failed to encode row: {}", e)))
}

fn decode_row(raw: &str) -> Result<Row> {
    serde_json::from_str::<LoadedRow>(raw)
        .map(|loaded| loaded.0)
        .map_err(|e| AppError::DatabaseError(format!("Corrupt row payload: {}", e)))
}

struct StoredRow<'a>(&'a Row);

struct StoredCell<'a>(&'a CellValue);

impl Serialize for StoredRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (column, value) in self.0.iter() {
            map.serialize_entry(column, &StoredCell(value))?;
        }
        map.end()
    }
}

impl Serialize for StoredCell<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.0 {
            CellValue::Date(iso) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(DATE_TAG, iso)?;
                map.end()
            }
            other => other.serialize(serializer),
        }
    }
}

struct LoadedRow(Row);

struct LoadedRowVisitor;

impl<'de> Visitor<'de> for LoadedRowVisitor {
    type Value = LoadedRow;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a stored row object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<LoadedRow, A::Error> {
        let mut cells = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((column, value)) = access.next_entry::<String, Value>()? {
            cells.push((column, load_cell(value)));
        }
        Ok(LoadedRow(cells.into_iter().collect()))
    }
}

impl<'de> Deserialize<'de> for LoadedRow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(LoadedRowVisitor)
    }
}

fn load_cell(value: Value) -> CellValue {
    match value {
        Value::Object(map) if map.len() == 1 => match map.get(DATE_TAG) {
            Some(Value::String(iso)) => CellValue::Date(iso.clone()),
            _ => CellValue::from(Value::Object(map)),
        },
        other => CellValue::from(other),
    }
}

// Internal entity for database mapping
#[derive(sqlx::FromRow)]
struct FileEntity {
    id: i64,
    owner_id: i64,
    filename: String,
    storage_path: String,
    uploaded_at: DateTime<Utc>,
    row_count: i64,
    columns_json: String,
}

impl TryFrom<FileEntity> for FileRecord {
    type Error = AppError;

    fn try_from(e: FileEntity) -> Result<Self> {
        let columns: ColumnDescriptor = serde_json::from_str(&e.columns_json)
            .map_err(|err| AppError::DatabaseError(format!("Corrupt column descriptor: {}", err)))?;

        Ok(Self {
            id: e.id,
            owner_id: e.owner_id,
            filename: e.filename,
            storage_path: e.storage_path,
            uploaded_at: e.uploaded_at,
            row_count: e.row_count,
            columns,
        })
    }
}
