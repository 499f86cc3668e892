//! Video record store
//!
//! The pipeline reads the owner of a video and writes back its locator; the
//! store itself is a narrow interface. [`InMemoryVideoStore`] backs the
//! binary and the test suite; the binary fills it from a JSON seed file.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

/// Record store errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Video {0} not found")]
    NotFound(Uuid),

    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Invalid seed file: {0}")]
    Seed(String),
}

/// Video metadata record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub title: String,
    pub description: String,
    pub user_id: Uuid,
    pub thumbnail_url: Option<String>,
    /// Persisted locator, or a presigned URL once signed for a response
    pub video_url: Option<String>,
}

impl Video {
    /// New record without any uploaded file
    pub fn new(user_id: Uuid, title: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            title: title.into(),
            description: description.into(),
            user_id,
            thumbnail_url: None,
            video_url: None,
        }
    }
}

/// Seed file entry; timestamps are set at load time
#[derive(Debug, Deserialize)]
pub struct SeedVideo {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
}

impl From<SeedVideo> for Video {
    fn from(seed: SeedVideo) -> Self {
        let mut video = Video::new(seed.user_id, seed.title, seed.description);
        video.id = seed.id;
        video.thumbnail_url = seed.thumbnail_url;
        video.video_url = seed.video_url;
        video
    }
}

/// Video record persistence
#[async_trait]
pub trait VideoStore: Send + Sync {
    async fn get_video(&self, id: Uuid) -> Result<Video, StoreError>;

    /// Replace an existing record, bumping `updated_at`
    async fn update_video(&self, video: &Video) -> Result<(), StoreError>;

    async fn insert_video(&self, video: Video) -> Result<(), StoreError>;
}

/// Process-local store keyed by video id
#[derive(Debug, Default)]
pub struct InMemoryVideoStore {
    videos: DashMap<Uuid, Video>,
}

impl InMemoryVideoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled from a JSON array of [`SeedVideo`] entries.
    ///
    /// Duplicate ids are rejected.
    pub fn from_seed_file<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Seed(format!("{}: {}", path.display(), e)))?;
        Self::from_seed_json(&content)
    }

    /// Store pre-filled from seed JSON text
    pub fn from_seed_json(content: &str) -> Result<Self, StoreError> {
        let seeds: Vec<SeedVideo> =
            serde_json::from_str(content).map_err(|e| StoreError::Seed(e.to_string()))?;

        let store = Self::new();
        for seed in seeds {
            let video = Video::from(seed);
            match store.videos.entry(video.id) {
                Entry::Occupied(_) => {
                    return Err(StoreError::Seed(format!("duplicate video id {}", video.id)))
                }
                Entry::Vacant(slot) => {
                    slot.insert(video);
                }
            }
        }

        tracing::info!(videos = store.len(), "Seeded video store");
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }
}

#[async_trait]
impl VideoStore for InMemoryVideoStore {
    async fn get_video(&self, id: Uuid) -> Result<Video, StoreError> {
        self.videos
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::NotFound(id))
    }

    async fn update_video(&self, video: &Video) -> Result<(), StoreError> {
        let mut entry = self
            .videos
            .get_mut(&video.id)
            .ok_or(StoreError::NotFound(video.id))?;

        let mut updated = video.clone();
        updated.created_at = entry.created_at;
        updated.updated_at = Utc::now();
        *entry = updated;
        Ok(())
    }

    async fn insert_video(&self, video: Video) -> Result<(), StoreError> {
        match self.videos.entry(video.id) {
            Entry::Occupied(_) => Err(StoreError::Backend(format!(
                "video {} already exists",
                video.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(video);
                Ok(())
            }
        }
    }
}
