//! Persistent storage
//!
//! Uploaded files, application settings and the model selection store.

pub mod results;
pub mod settings;
pub mod uploads;
pub mod validator;

use std::path::PathBuf;
use thiserror::Error;

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "MODELBENCH_DATA_DIR";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Could not determine a data directory")]
    NoDataDir,
}

/// Root directory for uploads, settings and the selection store
pub fn get_data_dir() -> Result<PathBuf, StorageError> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }

    directories::ProjectDirs::from("com", "ModelBench", "ModelBench")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or(StorageError::NoDataDir)
}
