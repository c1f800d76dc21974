//! In-memory persistence for effects, uploaded files and generation sessions.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

pub mod models;
pub mod store;

use models::{effect::Effect, file::FileRecord, generation_session::GenerationSession};
use store::Table;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DbError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: Uuid },
    #[error("{kind} {id} already exists")]
    Duplicate { kind: &'static str, id: Uuid },
}

impl DbError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound { .. })
    }
}

#[derive(Debug, Default)]
struct Tables {
    effects: Table<Effect>,
    files: Table<FileRecord>,
    sessions: Table<GenerationSession>,
}

/// Shared handle to the record tables. Cloning is cheap.
#[derive(Debug, Clone, Default)]
pub struct MemoryPool {
    tables: Arc<Tables>,
}

impl MemoryPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn effects(&self) -> &Table<Effect> {
        &self.tables.effects
    }

    pub fn files(&self) -> &Table<FileRecord> {
        &self.tables.files
    }

    pub fn sessions(&self) -> &Table<GenerationSession> {
        &self.tables.sessions
    }
}

#[derive(Debug, Clone, Default)]
pub struct DBService {
    pub pool: MemoryPool,
}

impl DBService {
    pub fn new() -> Self {
        Self {
            pool: MemoryPool::new(),
        }
    }
}
