use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use db::DbError;
use services::services::effect_pipeline::PipelineError;
use thiserror::Error;
use tracing::error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Database(#[from] DbError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    PayloadTooLarge(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Database(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Pipeline(PipelineError::FileNotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Pipeline(PipelineError::InvalidOptions(_)) => StatusCode::BAD_REQUEST,
            ApiError::Pipeline(PipelineError::Database(e)) if e.is_not_found() => {
                StatusCode::NOT_FOUND
            }
            ApiError::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();
        if status.is_server_error() {
            error!(error = %message, "Request failed");
        }
        (status, Json(ApiResponse::<()>::error(&message))).into_response()
    }
}
