use std::{sync::Arc, time::Instant};

use db::DBService;
use services::services::{
    effect_pipeline::{EffectGenerationService, EffectPipeline},
    system_metrics::{MetricsSource, ResponseTimeTracker, SysinfoMetrics},
};

use crate::config::ServerConfig;

/// Shared handles for every request handler. Cloning is cheap.
#[derive(Clone)]
pub struct Deployment {
    db: DBService,
    generation: EffectGenerationService,
    metrics: Arc<dyn MetricsSource>,
    response_times: Arc<ResponseTimeTracker>,
    config: Arc<ServerConfig>,
    started_at: Instant,
}

impl Deployment {
    pub fn new(config: ServerConfig) -> Self {
        Self::with_metrics(config, Arc::new(SysinfoMetrics::new()))
    }

    pub fn with_metrics(config: ServerConfig, metrics: Arc<dyn MetricsSource>) -> Self {
        let db = DBService::new();
        let generation = EffectGenerationService::new(db.clone(), EffectPipeline::new());
        Self {
            db,
            generation,
            metrics,
            response_times: Arc::new(ResponseTimeTracker::new()),
            config: Arc::new(config),
            started_at: Instant::now(),
        }
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn generation(&self) -> &EffectGenerationService {
        &self.generation
    }

    pub fn pipeline(&self) -> &EffectPipeline {
        self.generation.pipeline()
    }

    pub fn metrics(&self) -> &dyn MetricsSource {
        self.metrics.as_ref()
    }

    pub fn response_times(&self) -> &ResponseTimeTracker {
        &self.response_times
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
