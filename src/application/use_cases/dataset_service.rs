// ============================================================
// DATASET SERVICE
// ============================================================
// Upload, access control, and per-request engine runs over stored files

use std::path::{Path, PathBuf};
use std::sync::Arc;

use validator::Validate;

use super::aggregation_engine;
use super::export_serializer;
use super::query_engine;
use crate::domain::dataset::{Caller, FileList, FileRecord, NewFileRecord, UploadSummary};
use crate::domain::error::{AppError, Result};
use crate::domain::table::{
    AggregateRequest, ColumnDescriptor, ColumnInfo, ExportRequest, Row, RowsPage, RowsQuery,
    Table,
};
use crate::infrastructure::config::Settings;
use crate::infrastructure::db::DatasetStore;
use crate::infrastructure::ingest::{FileParser, TypeInferencer};
use crate::infrastructure::storage;

const MAX_LIST_PAGE_SIZE: i64 = 100;
const COLUMN_PREVIEW_ROWS: i64 = 5;
const COLUMN_SAMPLE_VALUES: usize = 3;

pub struct DatasetService {
    store: Arc<dyn DatasetStore>,
    upload_dir: PathBuf,
    max_upload_bytes: u64,
    parser: FileParser,
    inferencer: TypeInferencer,
}

impl DatasetService {
    pub fn new(store: Arc<dyn DatasetStore>, upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            upload_dir: upload_dir.into(),
            max_upload_bytes: Settings::default().max_upload_bytes,
            parser: FileParser::new(),
            inferencer: TypeInferencer::new(),
        }
    }

    pub fn from_settings(store: Arc<dyn DatasetStore>, settings: &Settings) -> Self {
        Self::new(store, settings.upload_dir.clone()).with_max_upload_bytes(settings.max_upload_bytes)
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: u64) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    /// Store, parse and persist an uploaded file.
    pub async fn upload(&self, caller: &Caller, filename: &str, bytes: &[u8]) -> Result<UploadSummary> {
        if bytes.len() as u64 > self.max_upload_bytes {
            return Err(AppError::ValidationError(format!(
                "File is too large: {} bytes (limit {})",
                bytes.len(),
                self.max_upload_bytes
            )));
        }

        // Reject unreadable input before anything is written
        let table = self.parser.parse_bytes(bytes, filename)?;
        let columns = self.inferencer.describe(&table);

        let path = storage::upload_path(&self.upload_dir, caller.user_id, filename);
        storage::save_upload(&path, bytes).await?;

        let file = match self.persist(caller, filename, &path, &table, columns).await {
            Ok(file) => file,
            Err(e) => {
                if let Err(cleanup) = storage::remove_upload(&path).await {
                    tracing::warn!("Failed to remove stored upload {}: {}", path.display(), cleanup);
                }
                return Err(e);
            }
        };

        tracing::info!(
            file_id = file.id,
            owner_id = caller.user_id,
            "Uploaded {} ({} rows, {} columns)",
            file.filename,
            file.row_count,
            file.columns.columns.len()
        );

        Ok(UploadSummary::from(&file))
    }

    /// File record plus rows; the record is removed again if the rows fail.
    async fn persist(
        &self,
        caller: &Caller,
        filename: &str,
        path: &Path,
        table: &Table,
        columns: ColumnDescriptor,
    ) -> Result<FileRecord> {
        let file = self
            .store
            .create_file(NewFileRecord {
                owner_id: caller.user_id,
                filename: filename.to_string(),
                storage_path: path.to_string_lossy().into_owned(),
                row_count: table.len() as i64,
                columns,
            })
            .await?;

        if let Err(e) = self.store.append_rows(file.id, table.rows()).await {
            tracing::warn!(file_id = file.id, "Row ingestion failed, rolling back: {}", e);
            if let Err(cleanup) = self.store.delete_file(file.id).await {
                tracing::warn!(file_id = file.id, "Rollback failed: {}", cleanup);
            }
            return Err(e);
        }

        Ok(file)
    }

    /// Files visible to the caller, newest first. `page` is 1-based.
    pub async fn list_files(&self, caller: &Caller, page: i64, page_size: i64) -> Result<FileList> {
        if page < 1 {
            return Err(AppError::ValidationError("page must be >= 1".to_string()));
        }
        if !(1..=MAX_LIST_PAGE_SIZE).contains(&page_size) {
            return Err(AppError::ValidationError(format!(
                "page_size must be between 1 and {}",
                MAX_LIST_PAGE_SIZE
            )));
        }

        let owner = caller.owner_scope();
        let offset = (page - 1).saturating_mul(page_size);
        let total = self.store.count_files(owner).await?;
        let files = self.store.list_files(owner, offset, page_size).await?;

        Ok(FileList { total, files })
    }

    pub async fn get_file(&self, caller: &Caller, file_id: i64) -> Result<FileRecord> {
        let file = self
            .store
            .file_by_id(file_id)
            .await?
            .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

        caller.authorize(&file)?;
        Ok(file)
    }

    /// Delete the file, its rows, and the stored upload.
    pub async fn delete_file(&self, caller: &Caller, file_id: i64) -> Result<()> {
        let file = self.get_file(caller, file_id).await?;

        self.store.delete_file(file.id).await?;
        if let Err(e) = storage::remove_upload(&PathBuf::from(&file.storage_path)).await {
            tracing::warn!(file_id, "Failed to remove stored upload: {}", e);
        }

        tracing::info!(file_id, "Deleted {}", file.filename);
        Ok(())
    }

    pub async fn get_rows(&self, caller: &Caller, file_id: i64, query: &RowsQuery) -> Result<RowsPage> {
        query.validate()?;

        let table = self.load_table(caller, file_id).await?;
        let page = query_engine::query_rows(&table, query);

        tracing::debug!(file_id, total = page.total, "Served page {}", page.page);
        Ok(page)
    }

    pub async fn aggregate(
        &self,
        caller: &Caller,
        file_id: i64,
        request: &AggregateRequest,
    ) -> Result<Vec<Row>> {
        let table = self.load_table(caller, file_id).await?;
        let result = aggregation_engine::aggregate(&table, request);

        tracing::debug!(file_id, "Aggregation produced {} rows", result.len());
        Ok(result)
    }

    /// Column names with their stored type and up to three sample values.
    pub async fn get_columns(&self, caller: &Caller, file_id: i64) -> Result<Vec<ColumnInfo>> {
        let file = self.get_file(caller, file_id).await?;
        let preview = Table::from_rows(self.store.head_rows(file.id, COLUMN_PREVIEW_ROWS).await?);

        Ok(file
            .columns
            .columns
            .iter()
            .map(|name| ColumnInfo {
                name: name.clone(),
                column_type: file.columns.type_of(name),
                sample_values: preview
                    .column_values(name)
                    .filter(|value| !value.is_null())
                    .take(COLUMN_SAMPLE_VALUES)
                    .cloned()
                    .collect(),
            })
            .collect())
    }

    pub async fn export_csv(
        &self,
        caller: &Caller,
        file_id: i64,
        request: &ExportRequest,
    ) -> Result<String> {
        let table = self.load_table(caller, file_id).await?;
        let csv = export_serializer::export_csv(&table, request)?;

        tracing::debug!(file_id, bytes = csv.len(), "Exported CSV");
        Ok(csv)
    }

    /// Resolve, authorize, and load the full row set fresh from the store.
    async fn load_table(&self, caller: &Caller, file_id: i64) -> Result<Table> {
        let file = self.get_file(caller, file_id).await?;
        let rows = self.store.rows_for_file(file.id).await?;
        Ok(Table::from_rows(rows))
    }
}
