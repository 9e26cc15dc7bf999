//! Upload validation
//!
//! Accept or reject an upload from its metadata alone (name and declared
//! size). Never reads file content.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::file::FileKind;

pub const DATASET_EXTENSIONS: &[&str] = &["csv", "xlsx", "xls"];
pub const MODEL_EXTENSIONS: &[&str] = &["h5", "pt", "pth", "onnx", "pkl"];
pub const PICKLE_EXTENSIONS: &[&str] = &["pkl"];

const MB: u64 = 1024 * 1024;

/// Which set of model formats an endpoint accepts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelProfile {
    /// Pickled estimators only
    Pickle,
    /// Every supported model format
    #[default]
    Standard,
}

/// What the caller is uploading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Dataset,
    Model(ModelProfile),
}

impl UploadKind {
    pub fn file_kind(self) -> FileKind {
        match self {
            UploadKind::Dataset => FileKind::Dataset,
            UploadKind::Model(_) => FileKind::Model,
        }
    }

    pub fn allowed_extensions(self) -> &'static [&'static str] {
        match self {
            UploadKind::Dataset => DATASET_EXTENSIONS,
            UploadKind::Model(ModelProfile::Pickle) => PICKLE_EXTENSIONS,
            UploadKind::Model(ModelProfile::Standard) => MODEL_EXTENSIONS,
        }
    }
}

/// Size ceilings per upload kind, in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeLimits {
    pub dataset_max_bytes: u64,
    pub pickle_model_max_bytes: u64,
    pub model_max_bytes: u64,
}

impl Default for SizeLimits {
    fn default() -> Self {
        Self {
            dataset_max_bytes: 100 * MB,
            pickle_model_max_bytes: 500 * MB,
            model_max_bytes: 1024 * MB,
        }
    }
}

impl SizeLimits {
    pub fn ceiling(&self, kind: UploadKind) -> u64 {
        match kind {
            UploadKind::Dataset => self.dataset_max_bytes,
            UploadKind::Model(ModelProfile::Pickle) => self.pickle_model_max_bytes,
            UploadKind::Model(ModelProfile::Standard) => self.model_max_bytes,
        }
    }
}

/// Metadata of an incoming file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMeta {
    pub name: String,
    /// Declared size in bytes; 0 when not yet known
    pub size: u64,
    pub content_type: Option<String>,
}

impl FileMeta {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            content_type: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("No file selected")]
    MissingFilename,
    #[error("Invalid file type '{extension}'. Supported formats: {allowed}")]
    UnsupportedFormat { extension: String, allowed: String },
    #[error("File too large: {size} bytes exceeds the {limit} byte limit")]
    FileTooLarge { size: u64, limit: u64 },
}

/// Lowercase extension of a file name, without the dot
pub fn extension_of(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let (stem, ext) = base.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Validate an upload, returning its normalized extension
pub fn validate(
    meta: &FileMeta,
    kind: UploadKind,
    limits: &SizeLimits,
) -> Result<String, ValidationError> {
    if meta.name.trim().is_empty() {
        return Err(ValidationError::MissingFilename);
    }

    let allowed = kind.allowed_extensions();
    let extension = extension_of(&meta.name).unwrap_or_default();
    if !allowed.contains(&extension.as_str()) {
        return Err(ValidationError::UnsupportedFormat {
            extension,
            allowed: allowed
                .iter()
                .map(|e| format!(".{}", e))
                .collect::<Vec<_>>()
                .join(", "),
        });
    }

    let limit = limits.ceiling(kind);
    if meta.size > limit {
        return Err(ValidationError::FileTooLarge {
            size: meta.size,
            limit,
        });
    }

    Ok(extension)
}
