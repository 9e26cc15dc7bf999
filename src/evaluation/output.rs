//! Evaluator output contract
//!
//! ```json
//! {"status": "success", "metrics": {"accuracy": 0.93, "precision": 0.92,
//!  "recall": 0.93, "f1_score": 0.92}, "predictions": [0, 1, 2], "memory_mb": 512}
//! {"status": "error", "message": "Target column 'y' not found"}
//! ```

use serde::Deserialize;
use serde_json::Value;

use crate::evaluation::{DispatchError, MeasuredMetrics};
use crate::types::evaluation::FoldResult;

#[derive(Debug, Deserialize)]
struct ReportedMetrics {
    accuracy: f64,
    precision: f64,
    recall: f64,
    #[serde(alias = "f1")]
    f1_score: f64,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum EvaluatorOutput {
    Success {
        metrics: ReportedMetrics,
        #[serde(default)]
        predictions: Vec<Value>,
        #[serde(default)]
        memory_mb: Option<f64>,
        #[serde(default)]
        folds: Vec<FoldResult>,
    },
    Error {
        message: String,
    },
}

/// Parse a JSON evaluator response
pub fn parse_output(value: Value) -> Result<MeasuredMetrics, DispatchError> {
    let output: EvaluatorOutput =
        serde_json::from_value(value).map_err(|e| DispatchError::InvalidOutput(e.to_string()))?;

    match output {
        EvaluatorOutput::Error { message } => Err(DispatchError::Evaluator(message)),
        EvaluatorOutput::Success {
            metrics,
            predictions,
            memory_mb,
            folds,
        } => {
            for (name, v) in [
                ("accuracy", metrics.accuracy),
                ("precision", metrics.precision),
                ("recall", metrics.recall),
                ("f1_score", metrics.f1_score),
            ] {
                if !v.is_finite() || !(0.0..=1.0).contains(&v) {
                    return Err(DispatchError::InvalidOutput(format!(
                        "{} out of range: {}",
                        name, v
                    )));
                }
            }

            Ok(MeasuredMetrics {
                accuracy: metrics.accuracy,
                precision: metrics.precision,
                recall: metrics.recall,
                f1: metrics.f1_score,
                predictions: predictions.len(),
                memory_mb: memory_mb.filter(|m| m.is_finite() && *m >= 0.0),
                folds,
            })
        }
    }
}

/// Parse evaluator stdout
///
/// Evaluators tend to log progress on stdout, so when the whole output is not
/// a JSON document the last line that is one wins.
pub fn parse_stdout(stdout: &str) -> Result<MeasuredMetrics, DispatchError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Err(DispatchError::InvalidOutput("empty output".to_string()));
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return parse_output(value);
    }

    let value = trimmed
        .lines()
        .rev()
        .map(str::trim)
        .filter(|line| line.starts_with('{'))
        .find_map(|line| serde_json::from_str::<Value>(line).ok())
        .ok_or_else(|| DispatchError::InvalidOutput(truncate_output(trimmed, 200)))?;
    parse_output(value)
}

/// Keep the head and tail of long process output
pub fn truncate_output(output: &str, max_chars: usize) -> String {
    let chars: Vec<char> = output.chars().collect();
    if chars.len() <= max_chars {
        return output.to_string();
    }
    let half = max_chars / 2;
    let start: String = chars[..half].iter().collect();
    let end: String = chars[chars.len() - half..].iter().collect();
    format!(
        "{} ... [{} characters omitted] ... {}",
        start,
        chars.len() - 2 * half,
        end
    )
}
