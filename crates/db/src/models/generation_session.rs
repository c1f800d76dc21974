use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use super::effect::{EffectType, Platform};
use crate::{DbError, MemoryPool, store::Record};

/// Progress of one generation pipeline run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GenerationStatus {
    #[default]
    Pending,
    Analyzing,
    Generating,
    Optimizing,
    Scoring,
    Completed,
    Failed,
}

impl GenerationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, GenerationStatus::Completed | GenerationStatus::Failed)
    }
}

/// What the prompt of a session was taken from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SessionSource {
    #[default]
    Prompt,
    File,
}

/// Options accepted by the generation pipeline
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, TS)]
pub struct GenerationOptions {
    pub effect_type: EffectType,
    /// Frames per second, 30..=120
    pub target_fps: u32,
    /// Memory budget in MB, 64..=1024
    pub max_memory: u32,
    pub enable_constitution: bool,
    pub platform: Platform,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            effect_type: EffectType::Javascript,
            target_fps: 60,
            max_memory: 256,
            enable_constitution: true,
            platform: Platform::Web,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct GenerationSession {
    pub id: Uuid,
    pub source: SessionSource,
    pub prompt: String,
    pub file_id: Option<Uuid>,
    pub options: GenerationOptions,
    pub status: GenerationStatus,
    pub effect_id: Option<Uuid>,
    pub error_message: Option<String>,
    pub elapsed_ms: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for GenerationSession {
    const KIND: &'static str = "session";

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateGenerationSession {
    pub source: SessionSource,
    pub prompt: String,
    pub file_id: Option<Uuid>,
    pub options: GenerationOptions,
}

impl GenerationSession {
    pub async fn create(
        pool: &MemoryPool,
        id: Uuid,
        data: &CreateGenerationSession,
    ) -> Result<Self, DbError> {
        let now = Utc::now();
        pool.sessions().insert(GenerationSession {
            id,
            source: data.source,
            prompt: data.prompt.clone(),
            file_id: data.file_id,
            options: data.options,
            status: GenerationStatus::Pending,
            effect_id: None,
            error_message: None,
            elapsed_ms: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn find_by_id(pool: &MemoryPool, id: Uuid) -> Result<Option<Self>, DbError> {
        Ok(pool.sessions().get(id))
    }

    pub async fn find_all(
        pool: &MemoryPool,
        status: Option<GenerationStatus>,
    ) -> Result<Vec<Self>, DbError> {
        Ok(pool
            .sessions()
            .list(|session| status.is_none_or(|s| s == session.status)))
    }

    pub async fn update_status(
        pool: &MemoryPool,
        id: Uuid,
        status: GenerationStatus,
    ) -> Result<(), DbError> {
        pool.sessions().update(id, |session| session.status = status)?;
        Ok(())
    }

    pub async fn mark_completed(
        pool: &MemoryPool,
        id: Uuid,
        effect_id: Uuid,
        elapsed_ms: u64,
    ) -> Result<Self, DbError> {
        pool.sessions().update(id, |session| {
            session.status = GenerationStatus::Completed;
            session.effect_id = Some(effect_id);
            session.error_message = None;
            session.elapsed_ms = Some(elapsed_ms);
        })
    }

    pub async fn mark_failed(
        pool: &MemoryPool,
        id: Uuid,
        error_message: &str,
        elapsed_ms: u64,
    ) -> Result<Self, DbError> {
        pool.sessions().update(id, |session| {
            session.status = GenerationStatus::Failed;
            session.effect_id = None;
            session.error_message = Some(error_message.to_string());
            session.elapsed_ms = Some(elapsed_ms);
        })
    }

    /// Sessions that have not reached a terminal status
    pub async fn count_running(pool: &MemoryPool) -> Result<usize, DbError> {
        Ok(pool
            .sessions()
            .count(|session| !session.status.is_terminal()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateGenerationSession {
        CreateGenerationSession {
            source: SessionSource::Prompt,
            prompt: "glowing plasma".to_string(),
            file_id: None,
            options: GenerationOptions::default(),
        }
    }

    #[tokio::test]
    async fn new_session_is_pending_and_running() {
        let pool = MemoryPool::new();
        let session = GenerationSession::create(&pool, Uuid::new_v4(), &request())
            .await
            .unwrap();
        assert_eq!(session.status, GenerationStatus::Pending);
        assert_eq!(GenerationSession::count_running(&pool).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn failed_session_records_message_and_elapsed() {
        let pool = MemoryPool::new();
        let session = GenerationSession::create(&pool, Uuid::new_v4(), &request())
            .await
            .unwrap();

        let failed = GenerationSession::mark_failed(&pool, session.id, "boom", 12)
            .await
            .unwrap();

        assert_eq!(failed.status, GenerationStatus::Failed);
        assert_eq!(failed.error_message.as_deref(), Some("boom"));
        assert_eq!(failed.elapsed_ms, Some(12));
        assert!(failed.effect_id.is_none());
        assert_eq!(GenerationSession::count_running(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn find_all_filters_by_status() {
        let pool = MemoryPool::new();
        let first = GenerationSession::create(&pool, Uuid::new_v4(), &request())
            .await
            .unwrap();
        GenerationSession::create(&pool, Uuid::new_v4(), &request())
            .await
            .unwrap();
        GenerationSession::mark_completed(&pool, first.id, Uuid::new_v4(), 3)
            .await
            .unwrap();

        let completed = GenerationSession::find_all(&pool, Some(GenerationStatus::Completed))
            .await
            .unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, first.id);
        assert_eq!(GenerationSession::find_all(&pool, None).await.unwrap().len(), 2);
    }

    #[test]
    fn status_display_is_lowercase() {
        assert_eq!(GenerationStatus::Optimizing.to_string(), "optimizing");
        assert!(GenerationStatus::Failed.is_terminal());
        assert!(!GenerationStatus::Scoring.is_terminal());
    }
}
