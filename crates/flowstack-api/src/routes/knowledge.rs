use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::{error::ApiResult, state::AppState};

/// Drop a pipeline's knowledge base collection
pub async fn clear_knowledge(
    State(state): State<Arc<AppState>>,
    Path(pipeline_id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.knowledge.clear(&pipeline_id).await?;
    Ok(Json(json!({ "status": "cleared", "pipeline_id": pipeline_id })))
}
