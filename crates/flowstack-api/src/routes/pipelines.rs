use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use flowstack_persist::{normalize_blocks, PipelineRecord};

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct PipelineRequest {
    pub name: String,
    /// Layout document; accepted as an object or a pre-stringified blob.
    #[serde(default)]
    pub blocks: Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PipelineResponse {
    pub id: String,
    pub name: String,
    pub blocks: Value,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<PipelineRecord> for PipelineResponse {
    fn from(record: PipelineRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            blocks: record.blocks,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Create a new pipeline definition
pub async fn create_pipeline(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PipelineRequest>,
) -> ApiResult<(StatusCode, Json<PipelineResponse>)> {
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("pipeline name is required".to_string()));
    }

    let record = state
        .store
        .create(req.name, normalize_blocks(req.blocks))
        .await?;

    Ok((StatusCode::CREATED, Json(record.into())))
}

/// List pipelines, most recently updated first
pub async fn list_pipelines(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<PipelineResponse>>> {
    let records = state.store.list().await?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}

/// Fetch one pipeline definition
pub async fn get_pipeline(
    State(state): State<Arc<AppState>>,
    Path(pipeline_id): Path<String>,
) -> ApiResult<Json<PipelineResponse>> {
    let record = state
        .store
        .get(&pipeline_id)
        .await?
        .ok_or(ApiError::PipelineNotFound(pipeline_id))?;

    Ok(Json(record.into()))
}

/// Replace a pipeline's name and layout
pub async fn update_pipeline(
    State(state): State<Arc<AppState>>,
    Path(pipeline_id): Path<String>,
    Json(req): Json<PipelineRequest>,
) -> ApiResult<Json<PipelineResponse>> {
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("pipeline name is required".to_string()));
    }

    let record = state
        .store
        .update(&pipeline_id, req.name, normalize_blocks(req.blocks))
        .await?;

    Ok(Json(record.into()))
}

/// Delete a pipeline definition
pub async fn delete_pipeline(
    State(state): State<Arc<AppState>>,
    Path(pipeline_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.store.delete(&pipeline_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
