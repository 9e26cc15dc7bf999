//! Settings storage
//!
//! Server settings persisted as `settings.json` in the data directory, with a
//! few environment overrides for deployment.

use crate::storage::validator::SizeLimits;
use crate::storage::{get_data_dir, StorageError};
use crate::types::config::CommandSpec;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const BIND_ENV: &str = "MODELBENCH_BIND";
pub const PORT_ENV: &str = "MODELBENCH_PORT";
pub const EVALUATOR_URL_ENV: &str = "MODELBENCH_EVALUATOR_URL";

const MB: u64 = 1024 * 1024;

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Address the HTTP server binds to
    pub bind_address: String,
    /// Port of the HTTP server (one port for every route)
    pub port: u16,
    /// Directory holding uploads, relative to the data dir unless absolute
    pub uploads_dir: PathBuf,
    /// Upload ceilings
    #[serde(default)]
    pub limits: SizeLimits,
    /// Rows sampled when inferring column types
    #[serde(default = "default_sample_rows")]
    pub sample_rows: usize,
    /// Command evaluating a custom model against a dataset
    pub evaluator_command: CommandSpec,
    /// Evaluation service URL; takes precedence over the command when set
    #[serde(default)]
    pub evaluator_url: Option<String>,
    /// Upper bound on a single evaluation
    pub evaluation_timeout_secs: u64,
    /// Command running single-shot inference on a stored model
    pub inference_command: CommandSpec,
    pub inference_timeout_secs: u64,
    /// Allow cross-origin requests from the dashboard
    #[serde(default = "default_cors")]
    pub enable_cors: bool,
}

fn default_sample_rows() -> usize {
    1000
}

fn default_cors() -> bool {
    true
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 3000,
            uploads_dir: PathBuf::from("uploads"),
            limits: SizeLimits::default(),
            sample_rows: default_sample_rows(),
            evaluator_command: CommandSpec::new("python3", &["model_evaluator.py"]),
            evaluator_url: None,
            evaluation_timeout_secs: 300,
            inference_command: CommandSpec::new("python3", &["model_inference.py"]),
            inference_timeout_secs: 60,
            enable_cors: default_cors(),
        }
    }
}

impl AppSettings {
    /// Validate settings values
    ///
    /// Clamps out-of-range values back into something the server can run with.
    pub fn validate(&mut self) {
        let defaults = SizeLimits::default();
        if self.limits.dataset_max_bytes == 0 {
            self.limits.dataset_max_bytes = defaults.dataset_max_bytes;
        }
        if self.limits.pickle_model_max_bytes == 0 {
            self.limits.pickle_model_max_bytes = defaults.pickle_model_max_bytes;
        }
        if self.limits.model_max_bytes == 0 {
            self.limits.model_max_bytes = defaults.model_max_bytes;
        }
        // Hard ceiling: 4 GB per file
        self.limits.model_max_bytes = self.limits.model_max_bytes.min(4096 * MB);

        self.sample_rows = self.sample_rows.clamp(10, 100_000);
        self.evaluation_timeout_secs = self.evaluation_timeout_secs.clamp(1, 3600);
        self.inference_timeout_secs = self.inference_timeout_secs.clamp(1, 600);

        if self.bind_address.trim().is_empty() {
            self.bind_address = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            self.port = 3000;
        }

        if let Some(url) = &self.evaluator_url {
            if url.trim().is_empty() {
                self.evaluator_url = None;
            }
        }
    }

    /// Apply `MODELBENCH_*` environment overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(bind) = lookup(BIND_ENV) {
            self.bind_address = bind;
        }
        if let Some(port) = lookup(PORT_ENV) {
            match port.parse() {
                Ok(port) => self.port = port,
                Err(_) => tracing::warn!("Ignoring invalid {}={}", PORT_ENV, port),
            }
        }
        if let Some(url) = lookup(EVALUATOR_URL_ENV) {
            self.evaluator_url = Some(url);
        }
    }

    pub fn evaluation_timeout(&self) -> Duration {
        Duration::from_secs(self.evaluation_timeout_secs)
    }

    pub fn inference_timeout(&self) -> Duration {
        Duration::from_secs(self.inference_timeout_secs)
    }

    /// Uploads directory resolved against the data directory
    pub fn uploads_root(&self, data_dir: &Path) -> PathBuf {
        if self.uploads_dir.is_absolute() {
            self.uploads_dir.clone()
        } else {
            data_dir.join(&self.uploads_dir)
        }
    }
}

/// Get the settings file path
fn get_settings_path() -> Result<PathBuf, StorageError> {
    Ok(get_data_dir()?.join("settings.json"))
}

/// Load settings from disk
///
/// Returns default settings if the file doesn't exist or is corrupted.
/// Environment overrides are applied last.
pub fn load_settings() -> AppSettings {
    let mut settings = match get_settings_path() {
        Ok(path) => load_settings_from(&path),
        Err(e) => {
            tracing::warn!("Failed to locate settings, using defaults: {}", e);
            AppSettings::default()
        }
    };
    settings.apply_env_overrides();
    settings.validate();
    settings
}

/// Load settings from a specific file, falling back to defaults
pub fn load_settings_from(path: &Path) -> AppSettings {
    match load_settings_internal(path) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!("Failed to load settings, using defaults: {}", e);
            AppSettings::default()
        }
    }
}

/// Internal settings loading with error propagation
fn load_settings_internal(path: &Path) -> Result<AppSettings, StorageError> {
    if !path.exists() {
        tracing::info!("Settings file not found, using defaults");
        return Ok(AppSettings::default());
    }

    let json = fs::read_to_string(path)?;
    let mut settings: AppSettings = serde_json::from_str(&json)?;
    settings.validate();

    tracing::debug!("Loaded settings from {}", path.display());
    Ok(settings)
}

/// Save settings to disk
pub fn save_settings(settings: &AppSettings) -> Result<(), StorageError> {
    save_settings_to(settings, &get_settings_path()?)
}

pub fn save_settings_to(settings: &AppSettings, path: &Path) -> Result<(), StorageError> {
    // Ensure the parent directory exists
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json)?;

    tracing::debug!("Saved settings to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_settings() {
        let settings = AppSettings::default();
        assert_eq!(settings.port, 3000);
        assert_eq!(settings.sample_rows, 1000);
        assert_eq!(settings.limits.dataset_max_bytes, 100 * MB);
        assert!(settings.evaluator_url.is_none());
    }

    #[test]
    fn test_settings_validation() {
        let mut settings = AppSettings::default();

        settings.sample_rows = 0;
        settings.evaluation_timeout_secs = 0;
        settings.limits.dataset_max_bytes = 0;
        settings.port = 0;
        settings.evaluator_url = Some("  ".into());
        settings.validate();

        assert_eq!(settings.sample_rows, 10);
        assert_eq!(settings.evaluation_timeout_secs, 1);
        assert_eq!(settings.limits.dataset_max_bytes, 100 * MB);
        assert_eq!(settings.port, 3000);
        assert!(settings.evaluator_url.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (BIND_ENV, "0.0.0.0"),
            (PORT_ENV, "8080"),
            (EVALUATOR_URL_ENV, "http://eval:9000/evaluate"),
        ]
        .into_iter()
        .collect();

        let mut settings = AppSettings::default();
        settings.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(settings.bind_address, "0.0.0.0");
        assert_eq!(settings.port, 8080);
        assert_eq!(
            settings.evaluator_url.as_deref(),
            Some("http://eval:9000/evaluate")
        );
    }

    #[test]
    fn test_invalid_port_override_is_ignored() {
        let mut settings = AppSettings::default();
        settings.apply_overrides(|key| (key == PORT_ENV).then(|| "not-a-port".to_string()));
        assert_eq!(settings.port, 3000);
    }

    #[test]
    fn test_settings_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = AppSettings::default();
        settings.port = 4100;
        settings.evaluator_command = CommandSpec::new("evaluate-model", &[]);
        save_settings_to(&settings, &path).unwrap();

        let loaded = load_settings_from(&path);
        assert_eq!(loaded.port, 4100);
        assert_eq!(loaded.evaluator_command.program, "evaluate-model");
    }

    #[test]
    fn test_corrupt_settings_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let loaded = load_settings_from(&path);
        assert_eq!(loaded.port, AppSettings::default().port);
    }

    #[test]
    fn test_uploads_root() {
        let settings = AppSettings::default();
        assert_eq!(
            settings.uploads_root(Path::new("/data")),
            PathBuf::from("/data/uploads")
        );
    }
}
