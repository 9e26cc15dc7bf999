//! Model evaluation
//!
//! Library models get simulated metrics; uploaded models are measured by an
//! external evaluator (subprocess or HTTP service) behind [`ExternalEvaluator`].

pub mod dispatcher;
pub mod output;
pub mod process;
pub mod remote;
pub mod simulated;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::evaluation::FoldResult;

pub use dispatcher::EvaluationDispatcher;
pub use process::{InferenceRunner, ProcessEvaluator};
pub use remote::RemoteEvaluator;
pub use simulated::SimulatedEvaluator;

/// Something that can measure a model file against a dataset
#[async_trait]
pub trait ExternalEvaluator: Send + Sync {
    fn name(&self) -> &str;
    async fn evaluate(
        &self,
        model: &Path,
        dataset: &Path,
        target: &str,
    ) -> Result<MeasuredMetrics, DispatchError>;
}

/// Quality metrics reported by an external evaluator
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasuredMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Number of predictions made, 0 when not reported
    pub predictions: usize,
    pub memory_mb: Option<f64>,
    pub folds: Vec<FoldResult>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    #[error("A dataset is required to evaluate an uploaded model")]
    MissingDataset,
    #[error("A target column is required to evaluate an uploaded model")]
    MissingTarget,
    #[error("Model '{0}' has no stored file")]
    MissingModelPath(String),
    #[error("Failed to start evaluator: {0}")]
    Spawn(String),
    #[error("Evaluator exited with code {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },
    #[error("Evaluator timed out after {0:?}")]
    Timeout(Duration),
    #[error("Unreadable evaluator output: {0}")]
    InvalidOutput(String),
    #[error("Evaluator reported an error: {0}")]
    Evaluator(String),
    #[error("Evaluation service error: {0}")]
    Http(String),
}
