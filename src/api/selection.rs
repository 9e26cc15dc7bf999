//! Selection endpoints over the result store

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::{ApiResult, ApiState};
use crate::storage::results::SelectedModel;
use crate::types::file::FileKind;
use crate::types::model::ModelReference;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionResponse {
    pub models: Vec<SelectedModel>,
    pub dataset_path: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddResponse {
    /// False when a model with the same name was already selected
    pub added: bool,
    pub models: Vec<SelectedModel>,
}

#[derive(Debug, Serialize)]
pub struct RemoveResponse {
    pub removed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSelection {
    #[serde(default)]
    pub dataset_path: Option<String>,
}

fn snapshot(state: &ApiState) -> SelectionResponse {
    let store = state.results();
    SelectionResponse {
        models: store.list().to_vec(),
        dataset_path: store.dataset_path().map(str::to_string),
    }
}

/// GET /api/selection
pub async fn list(State(state): State<Arc<ApiState>>) -> Json<SelectionResponse> {
    Json(snapshot(&state))
}

/// POST /api/selection
pub async fn add(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<ModelReference>, JsonRejection>,
) -> ApiResult<Json<AddResponse>> {
    let Json(reference) = payload?;
    let mut store = state.results();
    let added = store.add(SelectedModel::new(reference))?;
    Ok(Json(AddResponse {
        added,
        models: store.list().to_vec(),
    }))
}

/// DELETE /api/selection
pub async fn clear(State(state): State<Arc<ApiState>>) -> ApiResult<Json<SelectionResponse>> {
    state.results().clear()?;
    tracing::info!("Cleared model selection");
    Ok(Json(snapshot(&state)))
}

/// DELETE /api/selection/:name
pub async fn remove(
    State(state): State<Arc<ApiState>>,
    Path(name): Path<String>,
) -> ApiResult<Json<RemoveResponse>> {
    remove_named(&state, &name)
}

/// DELETE /api/selection/dataset
///
/// The static dataset route shadows `:name`, so a model called "dataset"
/// is removed here.
pub async fn remove_dataset_model(
    State(state): State<Arc<ApiState>>,
) -> ApiResult<Json<RemoveResponse>> {
    remove_named(&state, "dataset")
}

fn remove_named(state: &ApiState, name: &str) -> ApiResult<Json<RemoveResponse>> {
    let removed = state.results().remove(name)?;
    Ok(Json(RemoveResponse { removed }))
}

/// GET /api/selection/dataset
pub async fn get_dataset(State(state): State<Arc<ApiState>>) -> Json<DatasetSelection> {
    let store = state.results();
    Json(DatasetSelection {
        dataset_path: store.dataset_path().map(str::to_string),
    })
}

/// PUT /api/selection/dataset
///
/// The path must name a stored dataset; `null` clears the selection.
pub async fn set_dataset(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<DatasetSelection>, JsonRejection>,
) -> ApiResult<Json<DatasetSelection>> {
    let Json(selection) = payload?;
    let dataset_path = selection.dataset_path.filter(|p| !p.trim().is_empty());
    if let Some(reference) = &dataset_path {
        state.uploads.resolve(FileKind::Dataset, reference).await?;
    }

    state.results().set_dataset_path(dataset_path.clone())?;
    Ok(Json(DatasetSelection { dataset_path }))
}
