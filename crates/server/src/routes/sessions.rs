use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::generation_session::{GenerationSession, GenerationStatus};
use serde::Deserialize;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{error::ApiError, state::Deployment};

#[derive(Debug, Default, Deserialize)]
pub struct SessionQuery {
    pub status: Option<String>,
}

/// GET /api/sessions
pub async fn list_sessions(
    State(deployment): State<Deployment>,
    Query(query): Query<SessionQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<GenerationSession>>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(|raw| {
            raw.parse::<GenerationStatus>()
                .map_err(|_| ApiError::BadRequest(format!("unknown session status '{raw}'")))
        })
        .transpose()?;
    let sessions = GenerationSession::find_all(&deployment.db().pool, status).await?;
    Ok(ResponseJson(ApiResponse::success(sessions)))
}

/// GET /api/sessions/{id}
pub async fn get_session(
    State(deployment): State<Deployment>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<GenerationSession>>, ApiError> {
    let session = GenerationSession::find_by_id(&deployment.db().pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("session {id} not found")))?;
    Ok(ResponseJson(ApiResponse::success(session)))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new()
        .route("/sessions", get(list_sessions))
        .route("/sessions/{id}", get(get_session))
}
