//! Runtime settings
//!
//! Sources, lowest precedence first: built-in defaults, `tabulon.toml`,
//! `tabulon.local.toml`, then `TABULON_*` environment variables.
//!
//! ```bash
//! TABULON_DATABASE_URL=sqlite:///var/lib/tabulon/data.db
//! TABULON_MAX_UPLOAD_BYTES=104857600
//! ```

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const ENV_PREFIX: &str = "TABULON_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// SQLite connection string for file metadata and rows
    pub database_url: String,

    /// Directory raw uploads are written to
    pub upload_dir: PathBuf,

    /// Largest accepted upload in bytes
    pub max_upload_bytes: u64,

    /// `tracing` env-filter directive, overridden by `RUST_LOG`
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://tabulon.db".to_string(),
            upload_dir: PathBuf::from("./uploads"),
            max_upload_bytes: 50 * 1024 * 1024,
            log_filter: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load from the default files and the environment
    pub fn load() -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("tabulon.toml"))
            .merge(Toml::file("tabulon.local.toml"))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
    }

    /// Load from a specific file, still honouring the environment
    pub fn from_file(path: &str) -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
    }
}
