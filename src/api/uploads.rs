//! Upload and dataset endpoints

use std::io;
use std::sync::Arc;

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Multipart, Path, Query, State};
use axum::Json;
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use tokio_util::io::StreamReader;

use crate::api::{ApiError, ApiResult, ApiState};
use crate::dataset::{analyze, inspect_with};
use crate::storage::uploads::UploadError;
use crate::storage::validator::{ModelProfile, UploadKind};
use crate::types::dataset::{DatasetAnalysis, DatasetSchema};
use crate::types::file::{FileKind, StoredFile};

#[derive(Debug, Serialize)]
pub struct DatasetUploadResponse {
    #[serde(flatten)]
    pub file: StoredFile,
    pub schema: DatasetSchema,
}

#[derive(Debug, Default, Deserialize)]
pub struct ModelUploadParams {
    #[serde(default)]
    pub profile: ModelProfile,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelUploadResponse {
    pub model_info: StoredFile,
    pub filepath: String,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub dataset_path: String,
    pub target_column: String,
}

/// Stream the first file part named one of `fields` into the upload store
async fn receive_file(
    state: &ApiState,
    multipart: &mut Multipart,
    fields: &[&str],
    kind: UploadKind,
) -> ApiResult<StoredFile> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| UploadError::Multipart(e.body_text()))?
    {
        let Some(name) = field.name() else {
            continue;
        };
        if !fields.contains(&name) {
            continue;
        }

        let declared_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let body = field.map_err(|e| io::Error::new(io::ErrorKind::Other, e.body_text()));
        let reader = StreamReader::new(body);
        tokio::pin!(reader);

        let stored = state
            .uploads
            .store(kind, &declared_name, content_type, reader)
            .await?;
        return Ok(stored);
    }

    Err(UploadError::MissingField(fields.join("' or '")).into())
}

/// POST /api/upload/dataset
///
/// A dataset that cannot be inspected is discarded again, so every stored
/// dataset has a readable schema.
pub async fn upload_dataset(
    State(state): State<Arc<ApiState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<DatasetUploadResponse>> {
    let mut multipart = multipart.map_err(|e| UploadError::Multipart(e.body_text()))?;
    let stored = receive_file(&state, &mut multipart, &["file"], UploadKind::Dataset).await?;

    let path = stored.path.clone();
    let sample_rows = state.settings.sample_rows;
    let inspected = tokio::task::spawn_blocking(move || inspect_with(&path, sample_rows)).await?;

    match inspected {
        Ok(schema) => Ok(Json(DatasetUploadResponse {
            file: stored,
            schema,
        })),
        Err(e) => {
            tracing::warn!("Dataset {} failed inspection: {}", stored.id, e);
            if let Err(discard_err) = state.uploads.discard(&stored).await {
                tracing::warn!("Failed to discard {}: {}", stored.id, discard_err);
            }
            Err(e.into())
        }
    }
}

/// POST /api/upload/model?profile=standard|pickle
pub async fn upload_model(
    State(state): State<Arc<ApiState>>,
    params: Result<Query<ModelUploadParams>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<ModelUploadResponse>> {
    let Query(params) = params?;
    let mut multipart = multipart.map_err(|e| UploadError::Multipart(e.body_text()))?;

    let stored = receive_file(
        &state,
        &mut multipart,
        &["model", "file"],
        UploadKind::Model(params.profile),
    )
    .await?;

    Ok(Json(ModelUploadResponse {
        filepath: stored.path.display().to_string(),
        model_info: stored,
    }))
}

/// GET /api/dataset/:id/schema
pub async fn dataset_schema(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<DatasetSchema>> {
    let stored = state.uploads.locate(FileKind::Dataset, &id).await?;
    let sample_rows = state.settings.sample_rows;
    let schema =
        tokio::task::spawn_blocking(move || inspect_with(&stored.path, sample_rows)).await??;
    Ok(Json(schema))
}

/// POST /api/analyze-dataset
pub async fn analyze_dataset(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<AnalyzeRequest>, axum::extract::rejection::JsonRejection>,
) -> ApiResult<Json<DatasetAnalysis>> {
    let Json(request) = payload?;
    if request.dataset_path.trim().is_empty() || request.target_column.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Dataset path and target column are required".to_string(),
        ));
    }

    let path = state
        .uploads
        .resolve(FileKind::Dataset, &request.dataset_path)
        .await?;
    let target = request.target_column;
    let analysis = tokio::task::spawn_blocking(move || analyze(&path, &target)).await??;
    Ok(Json(analysis))
}
