use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::effect::{Effect, EffectFilter, EffectStats, EffectType, UpdateEffect};
use serde::Deserialize;
use services::services::constitution::ComplianceReport;
use tracing::info;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{error::ApiError, state::Deployment};

#[derive(Debug, Default, Deserialize)]
pub struct EffectQuery {
    #[serde(rename = "type")]
    pub effect_type: Option<String>,
    pub category: Option<String>,
}

impl EffectQuery {
    fn into_filter(self) -> Result<EffectFilter, ApiError> {
        let effect_type = self
            .effect_type
            .as_deref()
            .map(|raw| {
                raw.parse::<EffectType>()
                    .map_err(|_| ApiError::BadRequest(format!("unknown effect type '{raw}'")))
            })
            .transpose()?;
        Ok(EffectFilter {
            effect_type,
            category: self.category,
        })
    }
}

async fn load(deployment: &Deployment, id: Uuid) -> Result<Effect, ApiError> {
    Effect::find_by_id(&deployment.db().pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("effect {id} not found")))
}

/// GET /api/effects
pub async fn list_effects(
    State(deployment): State<Deployment>,
    Query(query): Query<EffectQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Effect>>>, ApiError> {
    let filter = query.into_filter()?;
    let effects = Effect::find_all(&deployment.db().pool, &filter).await?;
    Ok(ResponseJson(ApiResponse::success(effects)))
}

/// GET /api/effects/stats
pub async fn effect_stats(
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<EffectStats>>, ApiError> {
    let stats = Effect::stats(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(stats)))
}

/// GET /api/effects/{id}
pub async fn get_effect(
    State(deployment): State<Deployment>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Effect>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(load(&deployment, id).await?)))
}

/// PATCH /api/effects/{id}
/// Rename or recategorise. Code and scores are left alone.
pub async fn update_effect(
    State(deployment): State<Deployment>,
    Path(id): Path<Uuid>,
    axum::Json(payload): axum::Json<UpdateEffect>,
) -> Result<ResponseJson<ApiResponse<Effect>>, ApiError> {
    if payload.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
        return Err(ApiError::BadRequest("name must not be empty".to_string()));
    }
    let effect = Effect::update(&deployment.db().pool, id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(effect)))
}

/// DELETE /api/effects/{id}
pub async fn delete_effect(
    State(deployment): State<Deployment>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let rows = Effect::delete(&deployment.db().pool, id).await?;
    if rows == 0 {
        return Err(ApiError::NotFound(format!("effect {id} not found")));
    }
    info!(effect_id = %id, "Deleted effect");
    Ok(ResponseJson(ApiResponse::success(())))
}

/// GET /api/effects/{id}/compliance
/// Recomputed report; the stored effect is not modified
pub async fn effect_compliance(
    State(deployment): State<Deployment>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<ComplianceReport>>, ApiError> {
    let effect = load(&deployment, id).await?;
    let report = deployment.pipeline().score_compliance(&effect);
    Ok(ResponseJson(ApiResponse::success(report)))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new()
        .route("/effects", get(list_effects))
        .route("/effects/stats", get(effect_stats))
        .route(
            "/effects/{id}",
            get(get_effect).patch(update_effect).delete(delete_effect),
        )
        .route("/effects/{id}/compliance", get(effect_compliance))
}
