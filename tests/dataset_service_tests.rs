use std::sync::Arc;

use tabulon_lib::application::DatasetService;
use async_trait::async_trait;
use tabulon_lib::domain::dataset::{Caller, FileRecord, NewFileRecord};
use tabulon_lib::domain::error::{AppError, Result};
use tabulon_lib::domain::table::{
    AggFunction, AggregateRequest, CellValue, ColumnType, ExportRequest, Filters, MetricRequest,
    Row, RowsQuery, SortDirection,
};
use tabulon_lib::infrastructure::db::{DatasetStore, MemoryDatasetStore, SqliteDatasetStore};
use tempfile::TempDir;

const SALES_CSV: &[u8] = b"name,amount,date\nAlice,$100.00,2024-01-01\nBob,50,2024-01-02\n";

fn service_with(store: Arc<dyn DatasetStore>) -> (DatasetService, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let service = DatasetService::new(store, dir.path().join("uploads"));
    (service, dir)
}

fn service() -> (DatasetService, TempDir) {
    service_with(Arc::new(MemoryDatasetStore::new()))
}

/// Memory store whose row inserts always fail
struct RowsRejectingStore(MemoryDatasetStore);

#[async_trait]
impl DatasetStore for RowsRejectingStore {
    async fn create_file(&self, file: NewFileRecord) -> Result<FileRecord> {
        self.0.create_file(file).await
    }

    async fn file_by_id(&self, id: i64) -> Result<Option<FileRecord>> {
        self.0.file_by_id(id).await
    }

    async fn list_files(&self, owner: Option<i64>, offset: i64, limit: i64) -> Result<Vec<FileRecord>> {
        self.0.list_files(owner, offset, limit).await
    }

    async fn count_files(&self, owner: Option<i64>) -> Result<i64> {
        self.0.count_files(owner).await
    }

    async fn append_rows(&self, _file_id: i64, _rows: &[Row]) -> Result<()> {
        Err(AppError::DatabaseError("disk full".to_string()))
    }

    async fn rows_for_file(&self, file_id: i64) -> Result<Vec<Row>> {
        self.0.rows_for_file(file_id).await
    }

    async fn head_rows(&self, file_id: i64, limit: i64) -> Result<Vec<Row>> {
        self.0.head_rows(file_id, limit).await
    }

    async fn delete_file(&self, id: i64) -> Result<bool> {
        self.0.delete_file(id).await
    }
}

#[tokio::test]
async fn test_upload_then_aggregate_scenario() {
    let (service, _dir) = service();
    let alice = Caller::member(1);

    let summary = service.upload(&alice, "sales.csv", SALES_CSV).await.unwrap();
    assert_eq!(summary.row_count, 2);
    assert_eq!(summary.columns, vec!["name", "amount", "date"]);
    assert_eq!(summary.column_types["name"], ColumnType::String);
    assert_eq!(summary.column_types["amount"], ColumnType::Number);
    assert_eq!(summary.column_types["date"], ColumnType::Date);

    let request = AggregateRequest {
        metrics: vec![MetricRequest::new("amount", AggFunction::Sum)],
        ..Default::default()
    };
    let result = service.aggregate(&alice, summary.id, &request).await.unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].get("amount_sum"), Some(&CellValue::Number(150.0)));
    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        serde_json::json!([{ "amount_sum": 150 }])
    );
}

#[tokio::test]
async fn test_upload_is_written_under_owner_prefix() {
    let (service, dir) = service();
    let summary = service
        .upload(&Caller::member(9), "report.csv", SALES_CSV)
        .await
        .unwrap();

    let stored = dir.path().join("uploads").join("9_report.csv");
    assert_eq!(std::fs::read(&stored).unwrap(), SALES_CSV);

    service.delete_file(&Caller::member(9), summary.id).await.unwrap();
    assert!(!stored.exists());
}

#[tokio::test]
async fn test_rows_are_paged_sorted_and_filtered() {
    let (service, _dir) = service();
    let caller = Caller::member(1);
    let summary = service.upload(&caller, "sales.csv", SALES_CSV).await.unwrap();

    let query = RowsQuery::default()
        .sort("name", SortDirection::Desc)
        .paged(1, 1);
    let page = service.get_rows(&caller, summary.id, &query).await.unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.rows.len(), 1);
    assert_eq!(page.rows[0].get("name"), Some(&CellValue::from("Bob")));

    let query = RowsQuery::default().filters(Filters::parse_lenient(r#"{"amount":{"min":60}}"#));
    let page = service.get_rows(&caller, summary.id, &query).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.rows[0].get("name"), Some(&CellValue::from("Alice")));
}

#[tokio::test]
async fn test_invalid_paging_is_rejected() {
    let (service, _dir) = service();
    let caller = Caller::member(1);
    let summary = service.upload(&caller, "sales.csv", SALES_CSV).await.unwrap();

    for query in [RowsQuery::default().paged(0, 10), RowsQuery::default().paged(1, 501)] {
        let err = service.get_rows(&caller, summary.id, &query).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }
}

#[tokio::test]
async fn test_access_control() {
    let (service, _dir) = service();
    let summary = service
        .upload(&Caller::member(1), "sales.csv", SALES_CSV)
        .await
        .unwrap();

    let err = service
        .get_rows(&Caller::member(2), summary.id, &RowsQuery::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = service
        .export_csv(&Caller::member(1), summary.id + 1, &ExportRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    assert!(service
        .get_columns(&Caller::admin(99), summary.id)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_listing_is_scoped_to_caller() {
    let (service, _dir) = service();
    service.upload(&Caller::member(1), "a.csv", SALES_CSV).await.unwrap();
    service.upload(&Caller::member(2), "b.csv", SALES_CSV).await.unwrap();

    let mine = service.list_files(&Caller::member(1), 1, 10).await.unwrap();
    assert_eq!(mine.total, 1);
    assert_eq!(mine.files[0].filename, "a.csv");

    let all = service.list_files(&Caller::admin(3), 1, 10).await.unwrap();
    assert_eq!(all.total, 2);

    assert!(service.list_files(&Caller::admin(3), 1, 101).await.is_err());
}

#[tokio::test]
async fn test_header_only_file_yields_empty_results() {
    let (service, _dir) = service();
    let caller = Caller::member(1);
    let summary = service
        .upload(&caller, "empty.csv", b"name,amount\n")
        .await
        .unwrap();
    assert_eq!(summary.row_count, 0);

    let page = service
        .get_rows(&caller, summary.id, &RowsQuery::default())
        .await
        .unwrap();
    assert_eq!(page.total, 0);
    assert!(page.rows.is_empty());

    let request = AggregateRequest {
        metrics: vec![MetricRequest::new("amount", AggFunction::Sum)],
        ..Default::default()
    };
    assert!(service.aggregate(&caller, summary.id, &request).await.unwrap().is_empty());
    assert_eq!(
        service
            .export_csv(&caller, summary.id, &ExportRequest::default())
            .await
            .unwrap(),
        ""
    );
}

#[tokio::test]
async fn test_columns_carry_types_and_samples() {
    let (service, _dir) = service();
    let caller = Caller::member(1);
    let csv = b"city,score\nOslo,1\nLima,\nRome,3\nBern,4\nKiev,5\nNice,6\n";
    let summary = service.upload(&caller, "cities.csv", csv).await.unwrap();

    let columns = service.get_columns(&caller, summary.id).await.unwrap();
    assert_eq!(columns.len(), 2);
    assert_eq!(columns[0].name, "city");
    assert_eq!(columns[0].sample_values.len(), 3);
    assert_eq!(columns[1].column_type, ColumnType::Number);
    assert_eq!(
        columns[1].sample_values,
        vec![
            CellValue::Number(1.0),
            CellValue::Number(3.0),
            CellValue::Number(4.0)
        ]
    );
}

#[tokio::test]
async fn test_rejected_uploads() {
    let (service, _dir) = service();
    let caller = Caller::member(1);

    let err = service.upload(&caller, "notes.txt", b"hello").await.unwrap_err();
    assert!(matches!(err, AppError::ParseError(_)));

    let small = service.with_max_upload_bytes(8);
    let err = small.upload(&caller, "sales.csv", SALES_CSV).await.unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));
}

#[tokio::test]
async fn test_export_round_trip_with_sqlite_store() {
    let store = SqliteDatasetStore::connect("sqlite::memory:").await.unwrap();
    let (service, _dir) = service_with(Arc::new(store));
    let caller = Caller::member(1);
    let summary = service.upload(&caller, "sales.csv", SALES_CSV).await.unwrap();

    let request = ExportRequest {
        columns: ExportRequest::parse_columns("date,name"),
        ..Default::default()
    };
    let csv = service.export_csv(&caller, summary.id, &request).await.unwrap();
    assert_eq!(csv, "date,name\n2024-01-01,Alice\n2024-01-02,Bob\n");

    let reupload = service.upload(&caller, "export.csv", csv.as_bytes()).await.unwrap();
    assert_eq!(reupload.row_count, 2);
    assert_eq!(reupload.columns, vec!["date", "name"]);
}

#[tokio::test]
async fn test_failed_ingest_leaves_nothing_behind() {
    let (service, dir) = service_with(Arc::new(RowsRejectingStore(MemoryDatasetStore::new())));
    let caller = Caller::member(1);

    let err = service.upload(&caller, "s.csv", SALES_CSV).await.unwrap_err();
    assert!(matches!(err, AppError::DatabaseError(_)));

    assert!(!dir.path().join("uploads").join("1_s.csv").exists());
    assert_eq!(service.list_files(&caller, 1, 10).await.unwrap().total, 0);
}
