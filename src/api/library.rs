//! Model catalogue and benchmark log
//!
//! Both live in memory for the lifetime of the process.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::api::{ApiError, ApiResult, ApiState};
use crate::types::evaluation::EvaluationResult;
use crate::types::model::ModelReference;

#[derive(Debug, Serialize)]
pub struct Saved<T> {
    pub message: &'static str,
    pub data: T,
}

/// GET /api/models, sorted by name
pub async fn list_models(State(state): State<Arc<ApiState>>) -> Json<Vec<ModelReference>> {
    let mut models: Vec<ModelReference> = state
        .library
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    models.sort_by(|a, b| a.name.cmp(&b.name));
    Json(models)
}

/// POST /api/models
///
/// Saving a name that already exists replaces the entry.
pub async fn save_model(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<ModelReference>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Saved<ModelReference>>)> {
    let Json(model) = payload?;
    state.library.insert(model.name.clone(), model.clone());
    tracing::info!("Saved {} to the model library", model.name);
    Ok((
        StatusCode::CREATED,
        Json(Saved {
            message: "Model saved successfully",
            data: model,
        }),
    ))
}

/// GET /api/benchmark
pub async fn list_benchmarks(State(state): State<Arc<ApiState>>) -> Json<Vec<EvaluationResult>> {
    Json(state.benchmarks().clone())
}

/// POST /api/benchmark
///
/// Results whose status, error and metrics disagree are rejected.
pub async fn save_benchmark(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<EvaluationResult>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Saved<EvaluationResult>>)> {
    let Json(result) = payload?;
    result.check_consistency().map_err(ApiError::BadRequest)?;
    state.benchmarks().push(result.clone());
    Ok((
        StatusCode::CREATED,
        Json(Saved {
            message: "Benchmark result saved successfully",
            data: result,
        }),
    ))
}
