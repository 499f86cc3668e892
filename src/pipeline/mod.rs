//! Video ingestion pipeline
//!
//! Runs the stages of an upload strictly in order, failing fast:
//!
//! 1. find the `video` form field and validate its declared media type
//! 2. stream it to a temporary file
//! 3. remux to fast-start into a second temporary file
//! 4. probe the processed file and classify its aspect ratio
//! 5. derive the object key and upload the processed file
//!
//! Both temporary files are guards owned by [`UploadPipeline::ingest`], so
//! they are removed whichever stage fails. The read side
//! ([`UploadPipeline::sign_video`]) turns a persisted locator into a
//! presigned URL.

use crate::config::Config;
use crate::error::ApiError;
use crate::media::{require_supported, Remuxer, StreamProber};
use crate::metrics;
use crate::s3::{Locator, ObjectStore, PRESIGN_EXPIRY};
use crate::store::{Video, VideoStore};
use crate::upload::{buffer_to_temp_file, generate_asset_key, next_file_field, TempFile};
use bytes::Bytes;
use futures::Stream;
use hyper::header::CONTENT_TYPE;
use multer::{Constraints, Multipart, SizeLimit};
use std::sync::Arc;
use std::time::Instant;

/// Form field carrying the uploaded video
pub const VIDEO_FIELD: &str = "video";

const TEMP_SUFFIX: &str = ".mp4";

/// Upload stages wired to their collaborators
#[derive(Clone)]
pub struct UploadPipeline {
    config: Arc<Config>,
    remuxer: Arc<dyn Remuxer>,
    prober: Arc<dyn StreamProber>,
    objects: Arc<dyn ObjectStore>,
}

impl UploadPipeline {
    pub fn new(
        config: Arc<Config>,
        remuxer: Arc<dyn Remuxer>,
        prober: Arc<dyn StreamProber>,
        objects: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            config,
            remuxer,
            prober,
            objects,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Wrap a request body stream as a multipart form.
    ///
    /// The whole-stream limit mirrors the transport limit so an oversized
    /// body is rejected while it is being read.
    pub fn open_form<S, O, E>(&self, stream: S, boundary: impl Into<String>) -> Multipart<'static>
    where
        S: Stream<Item = Result<O, E>> + Send + 'static,
        O: Into<Bytes> + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
    {
        let constraints = Constraints::new()
            .size_limit(SizeLimit::new().whole_stream(self.config.upload.max_body_bytes));
        Multipart::with_constraints(stream, boundary, constraints)
    }

    /// Process the uploaded video and store it, returning where it lives.
    #[tracing::instrument(name = "pipeline.ingest", skip_all, err)]
    pub async fn ingest(&self, multipart: Multipart<'static>) -> Result<Locator, ApiError> {
        let result = self.run_stages(multipart).await;
        match &result {
            Ok(locator) => tracing::info!(key = %locator.key, "Video ingested"),
            Err(_) => metrics::record_upload_failure(),
        }
        result
    }

    async fn run_stages(&self, mut multipart: Multipart<'static>) -> Result<Locator, ApiError> {
        let field = next_file_field(&mut multipart, VIDEO_FIELD).await?;

        let declared = field
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        let media_type = require_supported(declared)?;

        let temp_dir = self.config.upload.temp_dir();

        let started = Instant::now();
        let upload = buffer_to_temp_file(field, &temp_dir, TEMP_SUFFIX).await?;
        record_stage("buffer", started);

        let processed = TempFile::reserve(&temp_dir, TEMP_SUFFIX);
        let started = Instant::now();
        self.remuxer
            .remux_fast_start(upload.temp.path(), processed.path())
            .await
            .map_err(|e| ApiError::processing("Error processing video", e))?;
        record_stage("faststart", started);

        let started = Instant::now();
        let aspect = self
            .prober
            .classify(processed.path())
            .await
            .map_err(|e| ApiError::processing("Error determining aspect ratio", e))?;
        record_stage("probe", started);

        let key = generate_asset_key(&media_type, aspect);
        let bucket = &self.config.storage.bucket;

        let started = Instant::now();
        let uploaded = self
            .objects
            .put_object(bucket, &key, processed.path(), &media_type)
            .await
            .map_err(|e| ApiError::storage("Error saving file", e))?;
        record_stage("store", started);

        metrics::record_upload_success(uploaded.bytes);
        tracing::debug!(
            received_bytes = upload.size,
            stored_bytes = uploaded.bytes,
            aspect = %aspect,
            "Upload stages complete"
        );

        Ok(Locator::new(bucket.clone(), key))
    }

    /// Replace the persisted locator with a presigned GET URL.
    ///
    /// A video without a locator is returned unchanged.
    pub async fn sign_video(&self, mut video: Video) -> Result<Video, ApiError> {
        let Some(value) = video.video_url.as_deref() else {
            return Ok(video);
        };
        let locator = Locator::decode(value)?;

        let url = self
            .objects
            .presign_get(&locator.bucket, &locator.key, PRESIGN_EXPIRY)
            .await
            .map_err(|e| ApiError::storage("Could not generate presigned URL", e))?;

        video.video_url = Some(url);
        Ok(video)
    }
}

/// Rewrite a legacy URL locator in canonical form and persist it.
///
/// Canonical and undecodable values are returned untouched.
pub async fn normalize_locator(
    videos: &dyn VideoStore,
    mut video: Video,
) -> Result<Video, ApiError> {
    let Some(value) = video.video_url.as_deref() else {
        return Ok(video);
    };

    match Locator::decode_any(value) {
        Ok((locator, true)) => {
            tracing::info!(
                video_id = %video.id,
                locator = %locator,
                "Migrating legacy video locator"
            );
            video.video_url = Some(locator.encode());
            videos
                .update_video(&video)
                .await
                .map_err(|e| ApiError::persistence("Couldn't update video", e))?;
            Ok(video)
        }
        Ok((_, false)) => Ok(video),
        Err(e) => {
            tracing::warn!(video_id = %video.id, error = %e, "Undecodable video locator");
            Ok(video)
        }
    }
}

fn record_stage(stage: &str, started: Instant) {
    metrics::record_stage_duration(stage, started.elapsed().as_secs_f64());
}
