//! Evaluation dispatcher
//!
//! Turns a model reference (plus dataset and target for uploaded models) into
//! an [`EvaluationResult`]. Failures are folded into the result; nothing is
//! returned as an `Err`, so one bad model never takes a batch down with it.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::evaluation::simulated::SimulatedEvaluator;
use crate::evaluation::{DispatchError, ExternalEvaluator, MeasuredMetrics};
use crate::system::hardware::HardwareProfile;
use crate::types::evaluation::{EvaluationResult, Metrics};
use crate::types::model::{ModelOrigin, ModelReference};

const MB: f64 = 1024.0 * 1024.0;

pub struct EvaluationDispatcher {
    simulator: SimulatedEvaluator,
    external: Arc<dyn ExternalEvaluator>,
    hardware: HardwareProfile,
}

impl EvaluationDispatcher {
    pub fn new(external: Arc<dyn ExternalEvaluator>) -> Self {
        Self {
            simulator: SimulatedEvaluator::new(),
            external,
            hardware: HardwareProfile::detect(),
        }
    }

    pub fn with_simulator(mut self, simulator: SimulatedEvaluator) -> Self {
        self.simulator = simulator;
        self
    }

    pub fn hardware(&self) -> &HardwareProfile {
        &self.hardware
    }

    /// Evaluate one model
    pub async fn evaluate(
        &self,
        model: &ModelReference,
        dataset: Option<&Path>,
        target: Option<&str>,
    ) -> EvaluationResult {
        let result = match model.origin {
            ModelOrigin::Library => self.evaluate_library(model),
            ModelOrigin::CustomUpload => self.evaluate_custom(model, dataset, target).await,
        };

        match &result.error {
            None => tracing::info!(
                "Evaluated {} (simulated: {}): accuracy {:.3}",
                result.model_name,
                result.is_simulated,
                result.metrics.accuracy
            ),
            Some(error) => tracing::warn!("Evaluation of {} failed: {}", result.model_name, error),
        }
        result
    }

    /// Evaluate several models one after another
    ///
    /// Results come back in input order, one per model.
    pub async fn evaluate_batch(
        &self,
        models: &[ModelReference],
        dataset: Option<&Path>,
        target: Option<&str>,
    ) -> Vec<EvaluationResult> {
        let mut results = Vec::with_capacity(models.len());
        for model in models {
            results.push(self.evaluate(model, dataset, target).await);
        }
        results
    }

    fn evaluate_library(&self, model: &ModelReference) -> EvaluationResult {
        let (metrics, folds) = self.simulator.sample();
        EvaluationResult::success(model, metrics, folds, true)
    }

    async fn evaluate_custom(
        &self,
        model: &ModelReference,
        dataset: Option<&Path>,
        target: Option<&str>,
    ) -> EvaluationResult {
        let dataset_label = dataset.map(|d| d.display().to_string());
        let target_label = target.map(str::to_string);

        let checked = match (model.path.as_deref(), dataset, target) {
            (_, None, _) => Err(DispatchError::MissingDataset),
            (_, _, None) => Err(DispatchError::MissingTarget),
            (_, _, Some(t)) if t.trim().is_empty() => Err(DispatchError::MissingTarget),
            (None, _, _) => Err(DispatchError::MissingModelPath(model.name.clone())),
            (Some(path), Some(dataset), Some(target)) => Ok((path, dataset, target)),
        };
        let (model_path, dataset, target) = match checked {
            Ok(inputs) => inputs,
            Err(e) => {
                return EvaluationResult::failed(model, e.to_string())
                    .with_dataset(dataset_label, target_label);
            }
        };

        let started = Instant::now();
        let outcome = self.external.evaluate(model_path, dataset, target).await;
        let elapsed = started.elapsed();

        match outcome {
            Ok(measured) => {
                let model_size_mb = tokio::fs::metadata(model_path)
                    .await
                    .map(|m| m.len() as f64 / MB)
                    .unwrap_or(0.0);
                let metrics = measured_to_metrics(&measured, elapsed.as_secs_f64(), model_size_mb);
                EvaluationResult::success(model, metrics, measured.folds, false)
                    .with_dataset(dataset_label, target_label)
                    .with_hardware(self.hardware.clone())
            }
            Err(e) => EvaluationResult::failed(model, e.to_string())
                .with_dataset(dataset_label, target_label)
                .with_hardware(self.hardware.clone()),
        }
    }
}

/// Combine reported quality metrics with measured timing
fn measured_to_metrics(measured: &MeasuredMetrics, elapsed_secs: f64, model_size_mb: f64) -> Metrics {
    let elapsed_ms = elapsed_secs * 1000.0;
    let (latency_ms, throughput) = if measured.predictions > 0 && elapsed_secs > 0.0 {
        (
            elapsed_ms / measured.predictions as f64,
            measured.predictions as f64 / elapsed_secs,
        )
    } else {
        (elapsed_ms, 0.0)
    };

    Metrics {
        accuracy: measured.accuracy,
        precision: measured.precision,
        recall: measured.recall,
        f1: measured.f1,
        latency_ms,
        throughput,
        memory_mb: measured.memory_mb.unwrap_or(0.0),
        model_size_mb,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::evaluation::EvaluationStatus;
    use crate::types::model::ModelFormat;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails for model files whose name contains "broken"
    #[derive(Default)]
    struct FakeEvaluator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ExternalEvaluator for FakeEvaluator {
        fn name(&self) -> &str {
            "fake"
        }

        async fn evaluate(
            &self,
            model: &Path,
            _dataset: &Path,
            _target: &str,
        ) -> Result<MeasuredMetrics, DispatchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if model.to_string_lossy().contains("broken") {
                return Err(DispatchError::NonZeroExit {
                    code: 1,
                    stderr: "cannot unpickle".into(),
                });
            }
            Ok(MeasuredMetrics {
                accuracy: 0.9,
                precision: 0.88,
                recall: 0.9,
                f1: 0.89,
                predictions: 30,
                memory_mb: Some(64.0),
                folds: Vec::new(),
            })
        }
    }

    fn dispatcher(fake: Arc<FakeEvaluator>) -> EvaluationDispatcher {
        EvaluationDispatcher::new(fake).with_simulator(SimulatedEvaluator::seeded(1))
    }

    fn custom(name: &str, path: &str) -> ModelReference {
        ModelReference::custom(name, None, path, ModelFormat::Pkl)
    }

    #[tokio::test]
    async fn test_library_is_simulated() {
        let fake = Arc::new(FakeEvaluator::default());
        let d = dispatcher(fake.clone());

        let result = d
            .evaluate(&ModelReference::library("BERT", ModelFormat::Pt), None, None)
            .await;
        assert!(result.is_success());
        assert!(result.is_simulated);
        assert!(result.dataset.is_none());
        assert_eq!(result.folds.len(), 5);
        assert_eq!(fake.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_custom_without_dataset_fails_fast() {
        let fake = Arc::new(FakeEvaluator::default());
        let d = dispatcher(fake.clone());

        let result = d.evaluate(&custom("mine", "mine.pkl"), None, Some("y")).await;
        assert_eq!(result.status, EvaluationStatus::Failed);
        assert!(result.error.as_deref().unwrap().contains("dataset is required"));
        assert!(result.metrics.is_zero());

        let result = d
            .evaluate(&custom("mine", "mine.pkl"), Some(Path::new("d.csv")), None)
            .await;
        assert!(result.error.as_deref().unwrap().contains("target column"));

        assert_eq!(fake.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_custom_success_is_measured() {
        let fake = Arc::new(FakeEvaluator::default());
        let d = dispatcher(fake.clone());

        let result = d
            .evaluate(&custom("mine", "mine.pkl"), Some(Path::new("d.csv")), Some("y"))
            .await;
        assert!(result.is_success());
        assert!(!result.is_simulated);
        assert_eq!(result.metrics.accuracy, 0.9);
        assert_eq!(result.metrics.memory_mb, 64.0);
        assert_eq!(result.dataset.as_deref(), Some("d.csv"));
        assert_eq!(result.target_column.as_deref(), Some("y"));
        assert!(result.hardware.is_some());
    }

    #[tokio::test]
    async fn test_batch_isolates_failures_in_order() {
        let fake = Arc::new(FakeEvaluator::default());
        let d = dispatcher(fake.clone());

        let models = vec![
            custom("A", "a.pkl"),
            custom("B", "broken.pkl"),
            custom("C", "c.pkl"),
        ];
        let results = d
            .evaluate_batch(&models, Some(Path::new("d.csv")), Some("y"))
            .await;

        let summary: Vec<(&str, EvaluationStatus)> = results
            .iter()
            .map(|r| (r.model_name.as_str(), r.status))
            .collect();
        assert_eq!(
            summary,
            [
                ("A", EvaluationStatus::Success),
                ("B", EvaluationStatus::Failed),
                ("C", EvaluationStatus::Success),
            ]
        );
        assert!(results[1].metrics.is_zero());
        assert!(results[1].error.as_deref().unwrap().contains("cannot unpickle"));
        assert_eq!(fake.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_measured_to_metrics() {
        let measured = MeasuredMetrics {
            accuracy: 0.5,
            predictions: 100,
            ..MeasuredMetrics::default()
        };
        let metrics = measured_to_metrics(&measured, 2.0, 12.5);
        assert_eq!(metrics.latency_ms, 20.0);
        assert_eq!(metrics.throughput, 50.0);
        assert_eq!(metrics.model_size_mb, 12.5);

        let silent = MeasuredMetrics::default();
        let metrics = measured_to_metrics(&silent, 0.25, 0.0);
        assert_eq!(metrics.latency_ms, 250.0);
        assert_eq!(metrics.throughput, 0.0);
    }
}
