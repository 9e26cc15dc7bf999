//! Evaluation and inference endpoints

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::{ApiError, ApiResult, ApiState};
use crate::storage::uploads::UploadError;
use crate::types::evaluation::EvaluationResult;
use crate::types::file::FileKind;
use crate::types::model::{ModelFormat, ModelReference};

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub models: Vec<ModelReference>,
    /// Dataset id or path; falls back to the selected dataset
    #[serde(default)]
    pub dataset_path: Option<String>,
    #[serde(default)]
    pub target_column: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub results: Vec<EvaluationResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceRequest {
    pub model_id: String,
    pub input: Value,
}

#[derive(Debug, Serialize)]
pub struct InferenceResponse {
    pub result: Value,
}

/// Point an uploaded model's reference at its file inside the upload store
///
/// The declared format has to match the stored file's extension.
async fn resolve_model(state: &ApiState, model: &ModelReference) -> ApiResult<ModelReference> {
    if model.is_library() {
        return Ok(model.clone());
    }

    let path = match (&model.file_id, &model.path) {
        (Some(id), _) => state.uploads.locate(FileKind::Model, id).await?.path,
        (None, Some(path)) => {
            state
                .uploads
                .resolve(FileKind::Model, &path.to_string_lossy())
                .await?
        }
        // The dispatcher reports the missing file
        (None, None) => return Ok(model.clone()),
    };

    let stored_format = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(ModelFormat::from_extension);
    if stored_format != Some(model.format) {
        return Err(ApiError::BadRequest(format!(
            "Model '{}' is declared as {} but its file is {}",
            model.name,
            model.format.extension(),
            path.display()
        )));
    }

    let mut resolved = model.clone();
    resolved.path = Some(path);
    Ok(resolved)
}

/// Dataset for a batch, resolved once
///
/// A dataset that cannot be resolved only fails the models that need one.
struct BatchDataset {
    reference: Option<String>,
    resolved: Result<Option<PathBuf>, UploadError>,
}

impl BatchDataset {
    async fn resolve(state: &ApiState, requested: Option<String>) -> Self {
        let reference = match requested.filter(|p| !p.trim().is_empty()) {
            Some(path) => Some(path),
            None => {
                let store = state.results();
                store.dataset_path().map(str::to_string)
            }
        };
        let resolved = match &reference {
            Some(r) => state.uploads.resolve(FileKind::Dataset, r).await.map(Some),
            None => Ok(None),
        };
        if let Err(e) = &resolved {
            tracing::warn!("Dataset for evaluation is unavailable: {}", e);
        }
        Self {
            reference,
            resolved,
        }
    }

    fn label(&self) -> Option<String> {
        match &self.resolved {
            Ok(Some(path)) => Some(path.display().to_string()),
            _ => self.reference.clone(),
        }
    }
}

/// POST /api/evaluate
///
/// Models are evaluated one after another; a model that fails gets a failed
/// result and the rest still run.
pub async fn evaluate(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<EvaluateRequest>, JsonRejection>,
) -> ApiResult<Json<EvaluateResponse>> {
    let Json(request) = payload?;
    if request.models.is_empty() {
        return Err(ApiError::BadRequest("No models to evaluate".to_string()));
    }

    let dataset = BatchDataset::resolve(&state, request.dataset_path).await;
    let target = request
        .target_column
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());

    tracing::info!(
        "Evaluating {} models on {:?}",
        request.models.len(),
        dataset.label()
    );

    let mut results = Vec::with_capacity(request.models.len());
    for model in &request.models {
        let prepared = match (model.is_library(), &dataset.resolved) {
            (true, _) => Ok((model.clone(), None)),
            (false, Err(e)) => Err(e.to_string()),
            (false, Ok(path)) => resolve_model(&state, model)
                .await
                .map(|resolved| (resolved, path.as_deref()))
                .map_err(|e| e.to_string()),
        };

        let result = match prepared {
            Ok((resolved, dataset_path)) => {
                state
                    .dispatcher
                    .evaluate(&resolved, dataset_path, target)
                    .await
            }
            Err(error) => {
                tracing::warn!("Cannot evaluate {}: {}", model.name, error);
                EvaluationResult::failed(model, error)
                    .with_dataset(dataset.label(), target.map(str::to_string))
            }
        };
        results.push(result);
    }

    {
        let mut store = state.results();
        for result in &results {
            if let Err(e) = store.record_result(result.clone()) {
                tracing::warn!("Failed to record result for {}: {}", result.model_name, e);
            }
        }
    }
    state.benchmarks().extend(results.iter().cloned());

    Ok(Json(EvaluateResponse { results }))
}

/// POST /api/model/inference
pub async fn run_inference(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<InferenceRequest>, JsonRejection>,
) -> ApiResult<Json<InferenceResponse>> {
    let Json(request) = payload?;
    let stored = state
        .uploads
        .locate(FileKind::Model, &request.model_id)
        .await?;

    let result = state.inference.run(&stored.path, &request.input).await?;
    tracing::info!("Ran inference on {}", stored.id);
    Ok(Json(InferenceResponse { result }))
}
