use axum::{
    body::Body,
    extract::{Json, State},
    http::header,
    response::IntoResponse,
};
use bytes::Bytes;
use futures::StreamExt;
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;

use flowstack_types::{encode_event, ExecuteRequest};

use crate::state::AppState;

/// Execute a pipeline and stream progress as newline-delimited JSON.
///
/// Every response line is one complete event record; the stream always closes
/// with a `done` record. Execution failures after the headers are sent arrive
/// as an in-band `error` record, not as an HTTP status.
pub async fn execute_pipeline(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ExecuteRequest>,
) -> impl IntoResponse {
    tracing::info!(pipeline_id = %request.pipeline_id, "execution requested");

    let receiver = state.engine.spawn_execute(request);
    let body_stream = ReceiverStream::new(receiver).map(|event| {
        encode_event(&event)
            .map(Bytes::from)
            .map_err(axum::BoxError::from)
    });

    (
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(body_stream),
    )
}
