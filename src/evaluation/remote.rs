//! HTTP evaluation service client

use std::path::Path;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::time::Duration;

use crate::evaluation::output::parse_output;
use crate::evaluation::{DispatchError, ExternalEvaluator, MeasuredMetrics};

#[derive(Debug, Serialize)]
struct EvaluateRequest<'a> {
    model_path: String,
    dataset_path: String,
    target_column: &'a str,
}

/// Posts evaluation jobs to a service speaking the evaluator output contract
pub struct RemoteEvaluator {
    client: reqwest::Client,
    url: String,
    limit: Duration,
}

impl RemoteEvaluator {
    pub fn new(url: impl Into<String>, limit: Duration) -> Result<Self, DispatchError> {
        let client = reqwest::Client::builder()
            .timeout(limit)
            .build()
            .map_err(|e| DispatchError::Http(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
            limit,
        })
    }
}

#[async_trait]
impl ExternalEvaluator for RemoteEvaluator {
    fn name(&self) -> &str {
        "remote"
    }

    async fn evaluate(
        &self,
        model: &Path,
        dataset: &Path,
        target: &str,
    ) -> Result<MeasuredMetrics, DispatchError> {
        let request = EvaluateRequest {
            model_path: model.display().to_string(),
            dataset_path: dataset.display().to_string(),
            target_column: target,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DispatchError::Timeout(self.limit)
                } else {
                    DispatchError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        let body: Value = response.json().await.map_err(|e| {
            if status.is_success() {
                DispatchError::InvalidOutput(e.to_string())
            } else {
                DispatchError::Http(format!("service returned {}", status))
            }
        })?;

        // Error bodies that follow the contract carry a useful message
        if !status.is_success() && body.get("status").is_none() {
            return Err(DispatchError::Http(format!("service returned {}", status)));
        }
        parse_output(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;
    use axum::{Json, Router};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/evaluate", addr)
    }

    #[tokio::test]
    async fn test_remote_success() {
        let router = Router::new().route(
            "/evaluate",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["target_column"], "species");
                Json(serde_json::json!({
                    "status": "success",
                    "metrics": {"accuracy": 0.97, "precision": 0.96, "recall": 0.97, "f1_score": 0.96},
                    "predictions": [0, 1, 2]
                }))
            }),
        );
        let url = serve(router).await;

        let evaluator = RemoteEvaluator::new(url, Duration::from_secs(5)).unwrap();
        let measured = evaluator
            .evaluate(Path::new("m.pkl"), Path::new("iris.csv"), "species")
            .await
            .unwrap();
        assert_eq!(measured.accuracy, 0.97);
        assert_eq!(measured.predictions, 3);
    }

    #[tokio::test]
    async fn test_remote_reported_error() {
        let router = Router::new().route(
            "/evaluate",
            post(|| async {
                (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({"status": "error", "message": "bad pickle"})),
                )
            }),
        );
        let url = serve(router).await;

        let evaluator = RemoteEvaluator::new(url, Duration::from_secs(5)).unwrap();
        let err = evaluator
            .evaluate(Path::new("m.pkl"), Path::new("iris.csv"), "species")
            .await
            .unwrap_err();
        assert_eq!(err, DispatchError::Evaluator("bad pickle".to_string()));
    }

    #[tokio::test]
    async fn test_remote_unreachable() {
        let evaluator =
            RemoteEvaluator::new("http://127.0.0.1:9/evaluate", Duration::from_secs(2)).unwrap();
        let err = evaluator
            .evaluate(Path::new("m.pkl"), Path::new("iris.csv"), "species")
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Http(_) | DispatchError::Timeout(_)));
    }
}
