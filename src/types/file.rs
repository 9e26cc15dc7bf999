//! Uploaded file types
//!
//! Descriptors for files committed by the upload store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What an upload is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Dataset,
    Model,
}

impl FileKind {
    /// Prefix used when minting ids
    pub fn prefix(self) -> &'static str {
        match self {
            FileKind::Dataset => "dataset",
            FileKind::Model => "model",
        }
    }

    /// Directory name under the uploads root
    pub fn dir_name(self) -> &'static str {
        match self {
            FileKind::Dataset => "datasets",
            FileKind::Model => "models",
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.prefix())
    }
}

/// A committed upload
///
/// The file at `path` is never rewritten once the descriptor has been issued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    /// Stable id, `<kind>_<uuid>`
    pub id: String,
    /// Name on disk (`<id>.<ext>`)
    pub filename: String,
    /// Sanitized name supplied by the client
    pub original_name: String,
    /// Absolute or data-dir relative location of the content
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// Dataset or model
    pub kind: FileKind,
    /// Declared MIME type, if the client sent one
    #[serde(rename = "type")]
    pub content_type: Option<String>,
    /// Lowercase extension without the dot
    pub extension: String,
    pub uploaded_at: DateTime<Utc>,
}
