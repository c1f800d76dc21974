use axum::{
    Router,
    extract::{DefaultBodyLimit, Path, State},
    response::Json as ResponseJson,
    routing::get,
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use db::models::file::{CreateFileRecord, FileRecord};
use serde::Deserialize;
use services::services::file_extraction::extract_text;
use tracing::info;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{error::ApiError, state::Deployment};

/// Room for the JSON envelope around the encoded content
const ENVELOPE_SLACK_BYTES: usize = 16 * 1024;

#[derive(Debug, Deserialize, TS)]
pub struct UploadFileRequest {
    pub name: String,
    pub mime_type: Option<String>,
    pub content_base64: String,
}

fn guess_mime(name: &str) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// POST /api/files
pub async fn upload_file(
    State(deployment): State<Deployment>,
    axum::Json(payload): axum::Json<UploadFileRequest>,
) -> Result<ResponseJson<ApiResponse<FileRecord>>, ApiError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("file name must not be empty".to_string()));
    }
    let bytes = STANDARD
        .decode(payload.content_base64.trim())
        .map_err(|e| ApiError::BadRequest(format!("content_base64 is not valid base64: {e}")))?;

    let limit = deployment.config().max_upload_bytes;
    if bytes.len() > limit {
        return Err(ApiError::PayloadTooLarge(format!(
            "file is {} bytes, limit is {limit}",
            bytes.len()
        )));
    }

    let mime_type = payload
        .mime_type
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| guess_mime(name));
    let extracted_text = extract_text(&bytes, &mime_type);

    let record = FileRecord::create(
        &deployment.db().pool,
        Uuid::new_v4(),
        &CreateFileRecord {
            original_name: name.to_string(),
            mime_type,
            size_bytes: bytes.len() as u64,
            extracted_text,
        },
    )
    .await?;

    info!(
        file_id = %record.id,
        name = %record.original_name,
        mime_type = %record.mime_type,
        size_bytes = record.size_bytes,
        "Stored uploaded file"
    );
    Ok(ResponseJson(ApiResponse::success(record)))
}

pub async fn list_files(
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<Vec<FileRecord>>>, ApiError> {
    let files = FileRecord::find_all(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(files)))
}

pub async fn get_file(
    State(deployment): State<Deployment>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<FileRecord>>, ApiError> {
    let file = FileRecord::find_by_id(&deployment.db().pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("file {id} not found")))?;
    Ok(ResponseJson(ApiResponse::success(file)))
}

pub async fn delete_file(
    State(deployment): State<Deployment>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    if FileRecord::delete(&deployment.db().pool, id).await? == 0 {
        return Err(ApiError::NotFound(format!("file {id} not found")));
    }
    info!(file_id = %id, "Deleted file");
    Ok(ResponseJson(ApiResponse::success(())))
}

/// Request body limit for an upload of `max_upload_bytes` decoded bytes.
/// Saturates for very large limits.
fn upload_body_limit(max_upload_bytes: usize) -> usize {
    max_upload_bytes
        .div_ceil(3)
        .saturating_mul(4)
        .saturating_add(ENVELOPE_SLACK_BYTES)
}

pub fn router(deployment: &Deployment) -> Router<Deployment> {
    let body_limit = upload_body_limit(deployment.config().max_upload_bytes);
    Router::new()
        .route(
            "/files",
            get(list_files)
                .post(upload_file)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/files/{id}", get(get_file).delete(delete_file))
}
