use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::error::{AppError, Result};
use super::table::{ColumnDescriptor, ColumnType};

/// An uploaded dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: i64,
    pub owner_id: i64,
    pub filename: String,
    pub storage_path: String,
    pub uploaded_at: DateTime<Utc>,
    pub row_count: i64,
    pub columns: ColumnDescriptor,
}

#[derive(Debug, Clone)]
pub struct NewFileRecord {
    pub owner_id: i64,
    pub filename: String,
    pub storage_path: String,
    pub row_count: i64,
    pub columns: ColumnDescriptor,
}

/// Identity of whoever is calling the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: i64,
    pub is_admin: bool,
}

impl Caller {
    pub fn member(user_id: i64) -> Self {
        Self {
            user_id,
            is_admin: false,
        }
    }

    pub fn admin(user_id: i64) -> Self {
        Self {
            user_id,
            is_admin: true,
        }
    }

    /// Admins see every file, members only their own.
    pub fn authorize(&self, file: &FileRecord) -> Result<()> {
        if self.is_admin || file.owner_id == self.user_id {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Not authorized to access this file".to_string(),
            ))
        }
    }

    /// Owner filter for listings: `None` means every owner.
    pub fn owner_scope(&self) -> Option<i64> {
        if self.is_admin {
            None
        } else {
            Some(self.user_id)
        }
    }
}

/// Upload confirmation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadSummary {
    pub id: i64,
    pub filename: String,
    pub row_count: i64,
    pub columns: Vec<String>,
    pub column_types: BTreeMap<String, ColumnType>,
    pub message: String,
}

impl From<&FileRecord> for UploadSummary {
    fn from(file: &FileRecord) -> Self {
        Self {
            id: file.id,
            filename: file.filename.clone(),
            row_count: file.row_count,
            columns: file.columns.columns.clone(),
            column_types: file.columns.types.clone(),
            message: "File uploaded and parsed successfully".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileList {
    pub total: i64,
    pub files: Vec<FileRecord>,
}
