use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::DatasetStore;
use crate::domain::dataset::{FileRecord, NewFileRecord};
use crate::domain::error::Result;
use crate::domain::table::Row;

#[derive(Default)]
struct State {
    next_id: i64,
    files: Vec<FileRecord>,
    rows: HashMap<i64, Vec<Row>>,
}

/// Process-local store for tests and embedding without a database
#[derive(Default)]
pub struct MemoryDatasetStore {
    state: RwLock<State>,
}

impl MemoryDatasetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn visible(file: &FileRecord, owner: Option<i64>) -> bool {
    owner.map_or(true, |id| file.owner_id == id)
}

#[async_trait]
impl DatasetStore for MemoryDatasetStore {
    async fn create_file(&self, file: NewFileRecord) -> Result<FileRecord> {
        let mut state = self.state.write().await;
        state.next_id += 1;

        let record = FileRecord {
            id: state.next_id,
            owner_id: file.owner_id,
            filename: file.filename,
            storage_path: file.storage_path,
            uploaded_at: Utc::now(),
            row_count: file.row_count,
            columns: file.columns,
        };
        state.files.push(record.clone());
        Ok(record)
    }

    async fn file_by_id(&self, id: i64) -> Result<Option<FileRecord>> {
        let state = self.state.read().await;
        Ok(state.files.iter().find(|f| f.id == id).cloned())
    }

    async fn list_files(
        &self,
        owner: Option<i64>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<FileRecord>> {
        let state = self.state.read().await;
        Ok(state
            .files
            .iter()
            .rev()
            .filter(|f| visible(f, owner))
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn count_files(&self, owner: Option<i64>) -> Result<i64> {
        let state = self.state.read().await;
        Ok(state.files.iter().filter(|f| visible(f, owner)).count() as i64)
    }

    async fn append_rows(&self, file_id: i64, rows: &[Row]) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .rows
            .entry(file_id)
            .or_default()
            .extend_from_slice(rows);
        Ok(())
    }

    async fn rows_for_file(&self, file_id: i64) -> Result<Vec<Row>> {
        let state = self.state.read().await;
        Ok(state.rows.get(&file_id).cloned().unwrap_or_default())
    }

    async fn head_rows(&self, file_id: i64, limit: i64) -> Result<Vec<Row>> {
        let state = self.state.read().await;
        Ok(state
            .rows
            .get(&file_id)
            .map(|rows| rows.iter().take(limit.max(0) as usize).cloned().collect())
            .unwrap_or_default())
    }

    async fn delete_file(&self, id: i64) -> Result<bool> {
        let mut state = self.state.write().await;
        let before = state.files.len();
        state.files.retain(|f| f.id != id);
        state.rows.remove(&id);
        Ok(state.files.len() != before)
    }
}
