use axum::{Router, middleware};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{middleware::track_response_time, state::Deployment};

pub mod effects;
pub mod files;
pub mod generation;
pub mod health;
pub mod sessions;
pub mod system;

pub fn router(deployment: Deployment) -> Router {
    let api = Router::new()
        .merge(health::router(&deployment))
        .merge(generation::router(&deployment))
        .merge(sessions::router(&deployment))
        .merge(effects::router(&deployment))
        .merge(files::router(&deployment))
        .merge(system::router(&deployment));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", api)
        .layer(middleware::from_fn_with_state(
            deployment.clone(),
            track_response_time,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(deployment)
}
