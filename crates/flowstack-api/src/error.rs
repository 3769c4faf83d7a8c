use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use flowstack_persist::PersistError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Pipeline not found: {0}")]
    PipelineNotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Storage error: {0}")]
    Persist(PersistError),

    #[error("Knowledge store error: {0}")]
    Knowledge(#[from] anyhow::Error),

    #[error("Internal server error")]
    Internal,
}

impl From<PersistError> for ApiError {
    fn from(e: PersistError) -> Self {
        match e {
            PersistError::PipelineNotFound(id) => Self::PipelineNotFound(id),
            other => Self::Persist(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::PipelineNotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Persist(ref e) => {
                tracing::error!("Storage error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Storage error".to_string())
            }
            ApiError::Knowledge(ref e) => {
                tracing::error!("Knowledge store error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Knowledge store error".to_string(),
                )
            }
            ApiError::Internal => {
                tracing::error!("Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
