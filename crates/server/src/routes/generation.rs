use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::post,
};
use db::models::{
    effect::{EffectDna, Platform},
    generation_session::{GenerationOptions, GenerationSession},
};
use serde::Deserialize;
use services::services::code_generator::resolve_effect_type;
use tracing::warn;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{error::ApiError, state::Deployment};

pub const MAX_PROMPT_CHARS: usize = 2000;

/// Per-request overrides. Missing fields come from the server config.
#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct GenerationOptionsInput {
    #[serde(default, alias = "type")]
    pub effect_type: Option<String>,
    #[serde(default)]
    pub target_fps: Option<u32>,
    #[serde(default)]
    pub max_memory: Option<u32>,
    #[serde(default)]
    pub enable_constitution: Option<bool>,
    #[serde(default)]
    pub platform: Option<String>,
}

impl GenerationOptionsInput {
    pub fn resolve(&self, defaults: GenerationOptions) -> GenerationOptions {
        GenerationOptions {
            effect_type: self
                .effect_type
                .as_deref()
                .map(resolve_effect_type)
                .unwrap_or(defaults.effect_type),
            target_fps: self.target_fps.unwrap_or(defaults.target_fps),
            max_memory: self.max_memory.unwrap_or(defaults.max_memory),
            enable_constitution: self.enable_constitution.unwrap_or(defaults.enable_constitution),
            platform: self
                .platform
                .as_deref()
                .map(|raw| resolve_platform(raw, defaults.platform))
                .unwrap_or(defaults.platform),
        }
    }
}

fn resolve_platform(raw: &str, fallback: Platform) -> Platform {
    raw.trim().parse().unwrap_or_else(|_| {
        warn!(platform = raw, "Unknown platform, leaving code unadjusted");
        fallback
    })
}

#[derive(Debug, Deserialize, TS)]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(flatten)]
    pub options: GenerationOptionsInput,
}

#[derive(Debug, Deserialize, TS)]
pub struct AnalyzeRequest {
    pub prompt: String,
}

fn validate_prompt(prompt: &str) -> Result<&str, ApiError> {
    let trimmed = prompt.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BadRequest("prompt must not be empty".to_string()));
    }
    if trimmed.chars().count() > MAX_PROMPT_CHARS {
        return Err(ApiError::BadRequest(format!(
            "prompt must be at most {MAX_PROMPT_CHARS} characters"
        )));
    }
    Ok(trimmed)
}

/// POST /api/generate
/// Start generating an effect from a prompt; returns the pending session
pub async fn generate_from_prompt(
    State(deployment): State<Deployment>,
    axum::Json(payload): axum::Json<GenerateRequest>,
) -> Result<ResponseJson<ApiResponse<GenerationSession>>, ApiError> {
    let prompt = validate_prompt(&payload.prompt)?;
    let options = payload.options.resolve(deployment.config().default_options());
    let session = deployment
        .generation()
        .start_from_prompt(prompt, options)
        .await?;
    Ok(ResponseJson(ApiResponse::success(session)))
}

/// POST /api/generate/file/{file_id}
/// Start generating from an uploaded file's extracted text
pub async fn generate_from_file(
    State(deployment): State<Deployment>,
    Path(file_id): Path<Uuid>,
    axum::Json(payload): axum::Json<GenerationOptionsInput>,
) -> Result<ResponseJson<ApiResponse<GenerationSession>>, ApiError> {
    let options = payload.resolve(deployment.config().default_options());
    let session = deployment
        .generation()
        .start_from_file(file_id, options)
        .await?;
    Ok(ResponseJson(ApiResponse::success(session)))
}

/// POST /api/analyze
/// DNA for a prompt without generating anything
pub async fn analyze(
    State(deployment): State<Deployment>,
    axum::Json(payload): axum::Json<AnalyzeRequest>,
) -> Result<ResponseJson<ApiResponse<EffectDna>>, ApiError> {
    if payload.prompt.chars().count() > MAX_PROMPT_CHARS {
        return Err(ApiError::BadRequest(format!(
            "prompt must be at most {MAX_PROMPT_CHARS} characters"
        )));
    }
    let dna = deployment.pipeline().analyze(&payload.prompt);
    Ok(ResponseJson(ApiResponse::success(dna)))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new()
        .route("/generate", post(generate_from_prompt))
        .route("/generate/file/{file_id}", post(generate_from_file))
        .route("/analyze", post(analyze))
}
