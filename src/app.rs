use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::application::DatasetService;
use crate::domain::dataset::Caller;
use crate::domain::error::{AppError, Result};
use crate::infrastructure::config::Settings;
use crate::infrastructure::db::SqliteDatasetStore;

const LOCAL_USER_ID: i64 = 1;

/// Install the global subscriber. `RUST_LOG` wins over `filter`.
pub fn init_tracing(filter: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt().with_env_filter(env_filter).try_init();
}

/// Ingest every file named on the command line and print its upload summary as JSON.
pub async fn run() -> Result<()> {
    let _ = dotenvy::dotenv();

    let settings = Settings::load()?;
    init_tracing(&settings.log_filter);

    let paths: Vec<String> = std::env::args().skip(1).collect();
    if paths.is_empty() {
        tracing::warn!("No input files given; usage: tabulon <file.csv|file.xlsx>...");
        return Ok(());
    }

    let store = SqliteDatasetStore::connect(&settings.database_url).await?;
    let service = DatasetService::from_settings(Arc::new(store), &settings);
    let caller = Caller::member(LOCAL_USER_ID);

    for raw in &paths {
        let path = Path::new(raw);
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| AppError::ValidationError(format!("Not a file path: {}", raw)))?;

        let bytes = tokio::fs::read(path).await?;
        let summary = service.upload(&caller, &filename, &bytes).await?;

        let json = serde_json::to_string_pretty(&summary)
            .map_err(|e| AppError::Internal(format!("Failed to encode summary: {}", e)))?;
        println!("{}", json);
    }

    Ok(())
}
