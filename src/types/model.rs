//! Model types
//!
//! References to models taking part in a comparison.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Serialized model formats the pipeline accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormat {
    /// Keras HDF5
    H5,
    /// PyTorch
    Pt,
    /// PyTorch (alternate extension)
    Pth,
    Onnx,
    /// Pickled scikit-learn style estimator
    Pkl,
}

impl ModelFormat {
    pub const ALL: [ModelFormat; 5] = [
        ModelFormat::H5,
        ModelFormat::Pt,
        ModelFormat::Pth,
        ModelFormat::Onnx,
        ModelFormat::Pkl,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            ModelFormat::H5 => "h5",
            ModelFormat::Pt => "pt",
            ModelFormat::Pth => "pth",
            ModelFormat::Onnx => "onnx",
            ModelFormat::Pkl => "pkl",
        }
    }

    /// Map a file extension (without the dot, any case) to a format
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        Self::ALL.into_iter().find(|f| f.extension() == ext)
    }
}

/// Where a model came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelOrigin {
    /// Built-in catalogue entry, evaluated with simulated metrics
    Library,
    /// Uploaded by the user, evaluated by the external evaluator
    CustomUpload,
}

/// A model selected for comparison
///
/// `name` is the deduplication key of the selection store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelReference {
    pub name: String,
    /// Id of the stored upload, when the model was uploaded
    #[serde(default)]
    pub file_id: Option<String>,
    /// Location of the model file, when known
    #[serde(default)]
    pub path: Option<PathBuf>,
    pub format: ModelFormat,
    pub origin: ModelOrigin,
}

impl ModelReference {
    pub fn library(name: impl Into<String>, format: ModelFormat) -> Self {
        Self {
            name: name.into(),
            file_id: None,
            path: None,
            format,
            origin: ModelOrigin::Library,
        }
    }

    pub fn custom(
        name: impl Into<String>,
        file_id: Option<String>,
        path: impl Into<PathBuf>,
        format: ModelFormat,
    ) -> Self {
        Self {
            name: name.into(),
            file_id,
            path: Some(path.into()),
            format,
            origin: ModelOrigin::CustomUpload,
        }
    }

    pub fn is_library(&self) -> bool {
        self.origin == ModelOrigin::Library
    }
}
