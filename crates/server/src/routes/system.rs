use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use db::models::{effect::Effect, generation_session::GenerationSession};
use serde::Serialize;
use services::services::system_metrics::SystemMetrics;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{error::ApiError, state::Deployment};

#[derive(Debug, Serialize, TS)]
pub struct SystemStatus {
    #[serde(flatten)]
    pub host: SystemMetrics,
    pub average_response_ms: f64,
    pub requests_served: u64,
    pub server_uptime_secs: u64,
    pub effect_count: usize,
    pub running_sessions: usize,
}

/// GET /api/system/status
pub async fn system_status(
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<SystemStatus>>, ApiError> {
    let pool = &deployment.db().pool;
    let host = deployment.metrics().snapshot().await;
    let effect_count = Effect::stats(pool).await?.total;
    let running_sessions = GenerationSession::count_running(pool).await?;
    let times = deployment.response_times();

    Ok(ResponseJson(ApiResponse::success(SystemStatus {
        host,
        average_response_ms: times.average_ms(),
        requests_served: times.count(),
        server_uptime_secs: deployment.uptime_secs(),
        effect_count,
        running_sessions,
    })))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new().route("/system/status", get(system_status))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::http::StatusCode;
    use serde_json::json;
    use services::services::system_metrics::{MetricsSource, SystemMetrics};

    use crate::{
        config::ServerConfig,
        routes::{
            self,
            testing::{get, post, wait_for_session},
        },
        state::Deployment,
    };

    struct FixedMetrics;

    #[async_trait]
    impl MetricsSource for FixedMetrics {
        async fn snapshot(&self) -> SystemMetrics {
            SystemMetrics {
                cpu_usage_percent: 12.5,
                memory_used_mb: 2048,
                memory_total_mb: 8192,
                memory_usage_percent: 25.0,
                uptime_secs: 3600,
            }
        }
    }

    fn app() -> axum::Router {
        routes::router(Deployment::with_metrics(
            ServerConfig::default(),
            Arc::new(FixedMetrics),
        ))
    }

    #[tokio::test]
    async fn reports_host_metrics() {
        let app = app();
        let (status, body) = get(&app, "/api/system/status").await;
        assert_eq!(status, StatusCode::OK);
        let data = &body["data"];
        assert_eq!(data["cpu_usage_percent"], 12.5);
        assert_eq!(data["memory_total_mb"], 8192);
        assert_eq!(data["uptime_secs"], 3600);
        assert_eq!(data["effect_count"], 0);
        assert_eq!(data["running_sessions"], 0);
    }

    #[tokio::test]
    async fn counts_requests_and_effects() {
        let app = app();
        let (_, body) = post(&app, "/api/generate", json!({ "prompt": "neon ripple" })).await;
        let id = body["data"]["id"].as_str().unwrap().to_string();
        wait_for_session(&app, &id).await;

        let (_, status) = get(&app, "/api/system/status").await;
        let data = &status["data"];
        assert_eq!(data["effect_count"], 1);
        assert_eq!(data["running_sessions"], 0);
        // the status request itself is recorded after its body is built
        assert!(data["requests_served"].as_u64().unwrap() >= 2);
        assert!(data["average_response_ms"].as_f64().unwrap() >= 0.0);
    }
}
