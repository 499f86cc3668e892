//! Tubely Ingest Library
//!
//! Video ingestion service: accepts an MP4 upload, remuxes it for fast start,
//! classifies its aspect ratio, stores it in S3 and hands back time-limited
//! presigned URLs.
//!
//! # Features
//!
//! - **Streaming Uploads**: Bodies go straight to a size-capped temp file
//! - **Fast Start**: `ffmpeg` moves the `moov` atom to the front
//! - **Aspect Buckets**: `ffprobe` dimensions pick the key prefix
//! - **Presigned Reads**: Stored locators are signed for five minutes
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tubely_ingest::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Arc::new(Config::load("config.yaml")?);
//!     let state = Arc::new(tubely_ingest::build_state(config).await?);
//!     tubely_ingest::server::Server::bind(state).await?.run().await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod media;
pub mod metrics;
pub mod pipeline;
pub mod s3;
pub mod server;
pub mod store;
pub mod upload;

use std::sync::Arc;
use thiserror::Error;

// Re-export commonly used types
pub use config::Config;
pub use error::ApiError;
pub use server::{AppState, Server};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Startup wiring errors
#[derive(Error, Debug)]
pub enum StateError {
    #[error("Object store: {0}")]
    Storage(#[from] s3::StorageError),

    #[error("Video store: {0}")]
    Store(#[from] store::StoreError),
}

/// Wire the production collaborators: `ffmpeg`/`ffprobe`, the S3 gateway,
/// HS256 JWT auth and an in-memory record store, seeded from
/// `store.seed_file` when one is configured.
pub async fn build_state(config: Arc<Config>) -> Result<AppState, StateError> {
    let objects = s3::S3Gateway::new(&config.storage).await?;

    let videos = match &config.store.seed_file {
        Some(path) => store::InMemoryVideoStore::from_seed_file(path)?,
        None => {
            tracing::warn!("No store.seed_file configured; the video store starts empty");
            store::InMemoryVideoStore::new()
        }
    };

    let pipeline = pipeline::UploadPipeline::new(
        Arc::clone(&config),
        Arc::new(media::FfmpegRemuxer::from_config(&config.media)),
        Arc::new(media::FfprobeProber::from_config(&config.media)),
        Arc::new(objects),
    );

    Ok(AppState {
        auth: Arc::new(auth::jwt::JwtAuthenticator::from_config(&config.auth)),
        videos: Arc::new(videos),
        pipeline,
        config,
    })
}
