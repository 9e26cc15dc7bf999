//! Upload store
//!
//! Streams incoming files to a staging area, validates them and commits them
//! under a freshly minted id with a rename, so a crash mid-transfer never
//! leaves a partial file visible under a committed id.
//!
//! Layout under the uploads root:
//!
//! ```text
//! .staging/<uuid>.part        in-flight transfers
//! datasets/<id>.<ext>         committed datasets
//! datasets/<id>.meta.json     descriptor of a committed dataset
//! models/<id>.<ext>           committed models
//! models/<id>.meta.json
//! ```

use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use uuid::Uuid;

use crate::storage::validator::{self, FileMeta, SizeLimits, UploadKind, ValidationError};
use crate::types::file::{FileKind, StoredFile};

const STAGING_DIR: &str = ".staging";
const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("No file part '{0}' in request")]
    MissingField(String),
    #[error("Malformed multipart body: {0}")]
    Multipart(String),
    #[error("Upload '{0}' not found")]
    NotFound(String),
    #[error("Path '{0}' is outside the uploads directory")]
    OutsideUploadRoot(String),
    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Descriptor error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Removes a staged file unless it was committed
struct StagedFile {
    path: PathBuf,
    committed: bool,
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.committed {
            if let Err(e) = std::fs::remove_file(&self.path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Failed to remove staged upload {:?}: {}", self.path, e);
                }
            }
        }
    }
}

/// Filesystem-backed store of uploaded datasets and models
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
    limits: SizeLimits,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>, limits: SizeLimits) -> Self {
        Self {
            root: root.into(),
            limits,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn limits(&self) -> &SizeLimits {
        &self.limits
    }

    /// Create the directory layout
    pub async fn init(&self) -> Result<(), UploadError> {
        fs::create_dir_all(self.root.join(STAGING_DIR)).await?;
        for kind in [FileKind::Dataset, FileKind::Model] {
            fs::create_dir_all(self.kind_dir(kind)).await?;
        }
        Ok(())
    }

    fn kind_dir(&self, kind: FileKind) -> PathBuf {
        self.root.join(kind.dir_name())
    }

    fn meta_path(&self, kind: FileKind, id: &str) -> PathBuf {
        self.kind_dir(kind).join(format!("{}.meta.json", id))
    }

    /// Stream `reader` into the store
    ///
    /// Nothing is persisted unless the whole body was received and accepted.
    pub async fn store<R>(
        &self,
        kind: UploadKind,
        declared_name: &str,
        content_type: Option<String>,
        mut reader: R,
    ) -> Result<StoredFile, UploadError>
    where
        R: AsyncRead + Unpin,
    {
        let mut meta = FileMeta {
            name: declared_name.to_string(),
            size: 0,
            content_type,
        };
        let extension = validator::validate(&meta, kind, &self.limits)?;
        let ceiling = self.limits.ceiling(kind);

        let staging_dir = self.root.join(STAGING_DIR);
        fs::create_dir_all(&staging_dir).await?;
        let mut staged = StagedFile {
            path: staging_dir.join(format!("{}.part", Uuid::new_v4().simple())),
            committed: false,
        };

        let mut file = File::create(&staged.path).await?;
        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut written: u64 = 0;
        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            written += n as u64;
            if written > ceiling {
                tracing::warn!(
                    "Rejected upload {}: exceeded {} bytes mid-transfer",
                    declared_name,
                    ceiling
                );
                return Err(ValidationError::FileTooLarge {
                    size: written,
                    limit: ceiling,
                }
                .into());
            }
            file.write_all(&buf[..n]).await?;
        }
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        meta.size = written;
        validator::validate(&meta, kind, &self.limits)?;

        let file_kind = kind.file_kind();
        let id = format!("{}_{}", file_kind.prefix(), Uuid::new_v4().simple());
        let filename = format!("{}.{}", id, extension);
        let dest_dir = self.kind_dir(file_kind);
        fs::create_dir_all(&dest_dir).await?;
        let dest = dest_dir.join(&filename);

        let stored = StoredFile {
            id: id.clone(),
            filename,
            original_name: sanitize_original_name(declared_name),
            path: dest.clone(),
            size: written,
            kind: file_kind,
            content_type: meta.content_type,
            extension,
            uploaded_at: Utc::now(),
        };

        // Descriptor first: the content file is what makes an id visible
        let staged_meta = staged.path.with_extension("meta.json");
        fs::write(&staged_meta, serde_json::to_vec_pretty(&stored)?).await?;
        fs::rename(&staged_meta, self.meta_path(file_kind, &id)).await?;
        fs::rename(&staged.path, &dest).await?;
        staged.committed = true;

        tracing::info!(
            "Stored {} upload {} as {} ({} bytes)",
            file_kind,
            stored.original_name,
            stored.id,
            stored.size
        );
        Ok(stored)
    }

    /// Look up a committed upload by id
    pub async fn locate(&self, kind: FileKind, id: &str) -> Result<StoredFile, UploadError> {
        if !is_valid_id(id) {
            return Err(UploadError::NotFound(id.to_string()));
        }

        let meta_path = self.meta_path(kind, id);
        let json = match fs::read(&meta_path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(UploadError::NotFound(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let stored: StoredFile = serde_json::from_slice(&json)?;

        if fs::metadata(&stored.path).await.is_err() {
            return Err(UploadError::NotFound(id.to_string()));
        }
        Ok(stored)
    }

    /// Turn a client-supplied id or path into a path inside the store
    ///
    /// Paths must point at committed content of `kind`; descriptors and
    /// uploads of the other kind are rejected.
    pub async fn resolve(&self, kind: FileKind, reference: &str) -> Result<PathBuf, UploadError> {
        let reference = reference.trim();
        if is_valid_id(reference) {
            return Ok(self.locate(kind, reference).await?.path);
        }

        let candidate = PathBuf::from(reference);
        let canonical = fs::canonicalize(&candidate)
            .await
            .map_err(|_| UploadError::NotFound(reference.to_string()))?;
        let kind_root = fs::canonicalize(self.kind_dir(kind)).await?;
        if !canonical.starts_with(&kind_root) {
            return Err(UploadError::OutsideUploadRoot(reference.to_string()));
        }
        let is_descriptor = canonical
            .file_name()
            .is_some_and(|name| name.to_string_lossy().ends_with(".meta.json"));
        if is_descriptor {
            return Err(UploadError::NotFound(reference.to_string()));
        }
        if !fs::metadata(&canonical).await?.is_file() {
            return Err(UploadError::NotFound(reference.to_string()));
        }
        Ok(canonical)
    }

    /// Remove a committed upload and its descriptor
    pub async fn discard(&self, stored: &StoredFile) -> Result<(), UploadError> {
        fs::remove_file(&stored.path).await?;
        let meta_path = self.meta_path(stored.kind, &stored.id);
        if let Err(e) = fs::remove_file(&meta_path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                return Err(e.into());
            }
        }
        tracing::info!("Discarded upload {}", stored.id);
        Ok(())
    }
}

/// Ids are `<kind>_<hex>`; anything else cannot name a committed upload
fn is_valid_id(id: &str) -> bool {
    let Some((prefix, rest)) = id.split_once('_') else {
        return false;
    };
    matches!(prefix, "dataset" | "model")
        && !rest.is_empty()
        && rest.chars().all(|c| c.is_ascii_hexdigit())
}

/// Display-safe version of a client file name
fn sanitize_original_name(name: &str) -> String {
    let base = name
        .trim()
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let mut sanitized = String::with_capacity(base.len());
    for ch in base.chars() {
        let invalid = matches!(ch, '<' | '>' | ':' | '"' | '|' | '?' | '*');
        if invalid || ch.is_control() {
            sanitized.push('_');
        } else {
            sanitized.push(ch);
        }
    }

    while sanitized.ends_with('.') || sanitized.ends_with(' ') {
        sanitized.pop();
    }

    if sanitized.is_empty() {
        "upload".to_string()
    } else {
        sanitized
    }
}
