//! Video metadata records
//!
//! The upload path only needs `get` and `update`; `create` backs the draft
//! endpoint of the HTTP shell.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum RepoError {
    #[error("Video {0} not found")]
    NotFound(Uuid),

    #[error("Repository error: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
}

/// Fields supplied by the owner when drafting a video
#[derive(Debug, Clone, Deserialize)]
pub struct NewVideo {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[async_trait]
pub trait VideoRepository: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<VideoRecord, RepoError>;

    /// Replace the stored record with `record`
    async fn update(&self, record: VideoRecord) -> Result<(), RepoError>;

    async fn create(&self, owner_id: Uuid, video: NewVideo) -> Result<VideoRecord, RepoError>;
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryVideoRepository {
    records: DashMap<Uuid, VideoRecord>,
}

impl MemoryVideoRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record as-is
    pub fn insert(&self, record: VideoRecord) {
        self.records.insert(record.id, record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl VideoRepository for MemoryVideoRepository {
    async fn get(&self, id: Uuid) -> Result<VideoRecord, RepoError> {
        self.records
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(RepoError::NotFound(id))
    }

    async fn update(&self, mut record: VideoRecord) -> Result<(), RepoError> {
        let mut entry = self
            .records
            .get_mut(&record.id)
            .ok_or(RepoError::NotFound(record.id))?;
        record.updated_at = Utc::now();
        *entry = record;
        Ok(())
    }

    async fn create(&self, owner_id: Uuid, video: NewVideo) -> Result<VideoRecord, RepoError> {
        let now = Utc::now();
        let record = VideoRecord {
            id: Uuid::new_v4(),
            owner_id,
            title: video.title,
            description: video.description,
            created_at: now,
            updated_at: now,
            thumbnail_url: None,
            video_url: None,
        };
        self.records.insert(record.id, record.clone());
        tracing::debug!(video_id = %record.id, %owner_id, "Created video record");
        Ok(record)
    }
}
