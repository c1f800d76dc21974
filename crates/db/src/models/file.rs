use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::{DbError, MemoryPool, store::Record};

/// An uploaded document and the text extracted from it
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct FileRecord {
    pub id: Uuid,
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub extracted_text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for FileRecord {
    const KIND: &'static str = "file";

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
pub struct CreateFileRecord {
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub extracted_text: String,
}

impl FileRecord {
    pub async fn create(
        pool: &MemoryPool,
        id: Uuid,
        data: &CreateFileRecord,
    ) -> Result<Self, DbError> {
        let now = Utc::now();
        pool.files().insert(FileRecord {
            id,
            original_name: data.original_name.clone(),
            mime_type: data.mime_type.clone(),
            size_bytes: data.size_bytes,
            extracted_text: data.extracted_text.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn find_by_id(pool: &MemoryPool, id: Uuid) -> Result<Option<Self>, DbError> {
        Ok(pool.files().get(id))
    }

    pub async fn find_all(pool: &MemoryPool) -> Result<Vec<Self>, DbError> {
        Ok(pool.files().list(|_| true))
    }

    pub async fn delete(pool: &MemoryPool, id: Uuid) -> Result<u64, DbError> {
        Ok(pool.files().remove(id))
    }
}
