//! Evaluation types
//!
//! Metrics records and the results produced by the evaluation dispatcher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::system::hardware::HardwareProfile;
use crate::types::model::{ModelOrigin, ModelReference};

/// Performance metrics of one model on one dataset
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Fraction in [0, 1]
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Milliseconds per prediction
    pub latency_ms: f64,
    /// Predictions per second
    pub throughput: f64,
    pub memory_mb: f64,
    pub model_size_mb: f64,
}

impl Metrics {
    pub fn is_zero(&self) -> bool {
        *self == Metrics::default()
    }

    /// Name of the first metric out of range, if any
    ///
    /// Quality scores are fractions in [0, 1]; the rest are finite and non-negative.
    pub fn out_of_range(&self) -> Option<&'static str> {
        let fractions = [
            ("accuracy", self.accuracy),
            ("precision", self.precision),
            ("recall", self.recall),
            ("f1", self.f1),
        ];
        let measures = [
            ("latency_ms", self.latency_ms),
            ("throughput", self.throughput),
            ("memory_mb", self.memory_mb),
            ("model_size_mb", self.model_size_mb),
        ];
        fractions
            .into_iter()
            .find(|(_, v)| !(0.0..=1.0).contains(v))
            .or_else(|| measures.into_iter().find(|(_, v)| !v.is_finite() || *v < 0.0))
            .map(|(name, _)| name)
    }
}

/// One partition of a k-fold style report
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FoldResult {
    pub fold: usize,
    pub accuracy: f64,
    pub f1: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationStatus {
    Success,
    Failed,
}

/// Outcome of evaluating one model
///
/// A failed result carries an error message and all-zero metrics. It must be
/// shown as a failure, never as a zero score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub id: Uuid,
    pub model_name: String,
    pub origin: ModelOrigin,
    /// Dataset the model was measured against; `None` for simulated runs
    pub dataset: Option<String>,
    pub target_column: Option<String>,
    pub metrics: Metrics,
    #[serde(default)]
    pub folds: Vec<FoldResult>,
    pub is_simulated: bool,
    pub status: EvaluationStatus,
    pub error: Option<String>,
    /// Host the measurement ran on
    #[serde(default)]
    pub hardware: Option<HardwareProfile>,
    pub evaluated_at: DateTime<Utc>,
}

impl EvaluationResult {
    pub fn success(
        model: &ModelReference,
        metrics: Metrics,
        folds: Vec<FoldResult>,
        is_simulated: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            model_name: model.name.clone(),
            origin: model.origin,
            dataset: None,
            target_column: None,
            metrics,
            folds,
            is_simulated,
            status: EvaluationStatus::Success,
            error: None,
            hardware: None,
            evaluated_at: Utc::now(),
        }
    }

    pub fn failed(model: &ModelReference, error: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            model_name: model.name.clone(),
            origin: model.origin,
            dataset: None,
            target_column: None,
            metrics: Metrics::default(),
            folds: Vec::new(),
            is_simulated: model.is_library(),
            status: EvaluationStatus::Failed,
            error: Some(error.into()),
            hardware: None,
            evaluated_at: Utc::now(),
        }
    }

    pub fn with_dataset(mut self, dataset: Option<String>, target: Option<String>) -> Self {
        self.dataset = dataset;
        self.target_column = target;
        self
    }

    pub fn with_hardware(mut self, hardware: HardwareProfile) -> Self {
        self.hardware = Some(hardware);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == EvaluationStatus::Success
    }

    /// Reject results whose status, error and metrics contradict each other
    pub fn check_consistency(&self) -> Result<(), String> {
        match (self.status, &self.error) {
            (EvaluationStatus::Success, Some(_)) => {
                return Err("A successful result cannot carry an error".to_string());
            }
            (EvaluationStatus::Failed, None) => {
                return Err("A failed result must carry an error".to_string());
            }
            (EvaluationStatus::Failed, Some(_)) if !self.metrics.is_zero() => {
                return Err("A failed result must have zero metrics".to_string());
            }
            _ => {}
        }
        if let Some(name) = self.metrics.out_of_range() {
            return Err(format!("Metric '{}' is out of range", name));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::model::ModelFormat;

    #[test]
    fn test_failed_result_has_zero_metrics() {
        let model = ModelReference::custom("mine", None, "/tmp/m.pkl", ModelFormat::Pkl);
        let result = EvaluationResult::failed(&model, "evaluator timed out");

        assert!(!result.is_success());
        assert!(result.metrics.is_zero());
        assert_eq!(result.error.as_deref(), Some("evaluator timed out"));
        assert!(!result.is_simulated);
    }

    #[test]
    fn test_consistency_check() {
        let model = ModelReference::library("BERT", ModelFormat::Pt);
        let metrics = Metrics {
            accuracy: 0.99,
            latency_ms: 12.0,
            ..Metrics::default()
        };
        assert!(EvaluationResult::success(&model, metrics, Vec::new(), true)
            .check_consistency()
            .is_ok());
        assert!(EvaluationResult::failed(&model, "boom").check_consistency().is_ok());

        let mut contradictory = EvaluationResult::success(&model, metrics, Vec::new(), true);
        contradictory.error = Some("boom".to_string());
        assert!(contradictory.check_consistency().is_err());

        let mut scored_failure = EvaluationResult::failed(&model, "boom");
        scored_failure.metrics = metrics;
        assert!(scored_failure.check_consistency().is_err());

        let mut silent_failure = EvaluationResult::failed(&model, "boom");
        silent_failure.error = None;
        assert!(silent_failure.check_consistency().is_err());

        let bad = Metrics {
            accuracy: 1.5,
            ..metrics
        };
        let err = EvaluationResult::success(&model, bad, Vec::new(), true)
            .check_consistency()
            .unwrap_err();
        assert!(err.contains("accuracy"));

        let bad = Metrics {
            latency_ms: -1.0,
            ..metrics
        };
        assert_eq!(bad.out_of_range(), Some("latency_ms"));
    }

    #[test]
    fn test_status_wire_name() {
        let model = ModelReference::library("BERT", ModelFormat::Pt);
        let result = EvaluationResult::success(&model, Metrics::default(), Vec::new(), true);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["origin"], "library");
        assert_eq!(json["is_simulated"], true);
    }
}
