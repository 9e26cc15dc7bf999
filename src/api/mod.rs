//! HTTP API
//!
//! axum router over the upload store, dataset inspector, evaluation
//! dispatcher and result store. Every error leaves as `{"error": "..."}`.

pub mod chat;
pub mod evaluate;
pub mod library;
pub mod selection;
pub mod uploads;

use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use dashmap::DashMap;
use serde::Serialize;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::dataset::ParseError;
use crate::evaluation::{DispatchError, EvaluationDispatcher, InferenceRunner};
use crate::storage::results::{FileBackend, ResultStore};
use crate::storage::settings::AppSettings;
use crate::storage::uploads::{UploadError, UploadStore};
use crate::storage::StorageError;
use crate::system::hardware::HardwareProfile;
use crate::types::evaluation::EvaluationResult;
use crate::types::model::ModelReference;

/// Shared state behind every handler
pub struct ApiState {
    pub settings: AppSettings,
    pub uploads: UploadStore,
    pub dispatcher: EvaluationDispatcher,
    pub inference: InferenceRunner,
    results: Mutex<ResultStore<FileBackend>>,
    /// Model catalogue, keyed by name
    pub library: DashMap<String, ModelReference>,
    /// Every result the server produced or was handed, oldest first
    benchmarks: Mutex<Vec<EvaluationResult>>,
}

impl ApiState {
    pub fn new(
        settings: AppSettings,
        uploads: UploadStore,
        dispatcher: EvaluationDispatcher,
        inference: InferenceRunner,
        results: ResultStore<FileBackend>,
    ) -> Self {
        Self {
            settings,
            uploads,
            dispatcher,
            inference,
            results: Mutex::new(results),
            library: DashMap::new(),
            benchmarks: Mutex::new(Vec::new()),
        }
    }

    /// Lock the result store
    ///
    /// Never hold the guard across an `.await`.
    pub fn results(&self) -> MutexGuard<'_, ResultStore<FileBackend>> {
        self.results.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn benchmarks(&self) -> MutexGuard<'_, Vec<EvaluationResult>> {
        self.benchmarks.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Parse(_) => StatusCode::BAD_REQUEST,
            ApiError::Upload(e) => match e {
                UploadError::NotFound(_) => StatusCode::NOT_FOUND,
                UploadError::Io(_) | UploadError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            },
            ApiError::Dispatch(_) | ApiError::Storage(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Rejected request: {}", self);
        }
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("Background task failed: {}", e))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Build the application router
pub fn create_router(state: Arc<ApiState>) -> Router {
    let enable_cors = state.settings.enable_cors;

    let router = Router::new()
        .route("/health", get(health_check))
        .route(
            "/api/upload/dataset",
            post(uploads::upload_dataset).layer(DefaultBodyLimit::disable()),
        )
        .route(
            "/api/upload/model",
            post(uploads::upload_model).layer(DefaultBodyLimit::disable()),
        )
        .route("/api/dataset/:id/schema", get(uploads::dataset_schema))
        .route("/api/analyze-dataset", post(uploads::analyze_dataset))
        .route("/api/evaluate", post(evaluate::evaluate))
        .route("/api/model/inference", post(evaluate::run_inference))
        .route("/api/chat", post(chat::chat))
        .route(
            "/api/selection",
            get(selection::list)
                .post(selection::add)
                .delete(selection::clear),
        )
        .route(
            "/api/selection/dataset",
            get(selection::get_dataset)
                .put(selection::set_dataset)
                .delete(selection::remove_dataset_model),
        )
        .route("/api/selection/:name", delete(selection::remove))
        .route(
            "/api/models",
            get(library::list_models).post(library::save_model),
        )
        .route(
            "/api/benchmark",
            get(library::list_benchmarks).post(library::save_benchmark),
        )
        .route("/api/system/hardware", get(hardware))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if enable_cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn hardware(State(state): State<Arc<ApiState>>) -> Json<HardwareProfile> {
    Json(state.dispatcher.hardware().clone())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::evaluation::{ExternalEvaluator, MeasuredMetrics, SimulatedEvaluator};
    use crate::types::config::CommandSpec;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use std::path::Path;
    use std::time::Duration;
    use tower::ServiceExt;

    /// Scores every model 0.9 unless its file name contains "broken"
    pub struct StubEvaluator;

    #[async_trait]
    impl ExternalEvaluator for StubEvaluator {
        fn name(&self) -> &str {
            "stub"
        }

        async fn evaluate(
            &self,
            model: &Path,
            _dataset: &Path,
            _target: &str,
        ) -> Result<MeasuredMetrics, DispatchError> {
            if model.to_string_lossy().contains("broken") {
                return Err(DispatchError::Evaluator("cannot load model".into()));
            }
            Ok(MeasuredMetrics {
                accuracy: 0.9,
                precision: 0.9,
                recall: 0.9,
                f1: 0.9,
                predictions: 10,
                memory_mb: None,
                folds: Vec::new(),
            })
        }
    }

    pub async fn test_state(dir: &Path) -> Arc<ApiState> {
        let settings = AppSettings::default();
        let uploads = UploadStore::new(dir.join("uploads"), settings.limits);
        uploads.init().await.unwrap();
        let dispatcher = EvaluationDispatcher::new(Arc::new(StubEvaluator))
            .with_simulator(SimulatedEvaluator::seeded(3));
        let inference = InferenceRunner::new(
            CommandSpec::new("sh", &["-c", "cat"]),
            Duration::from_secs(10),
        );
        let results = ResultStore::init(FileBackend::new(dir.join("state")));
        Arc::new(ApiState::new(settings, uploads, dispatcher, inference, results))
    }

    /// Send one request through a fresh router
    pub async fn send(state: &Arc<ApiState>, request: Request<Body>) -> (StatusCode, Value) {
        let response = create_router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    pub fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    pub fn multipart_request(uri: &str, field: &str, filename: &str, content: &[u8]) -> Request<Body> {
        let boundary = "modelbench-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                field, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap()
    }
}
