//! Shared test infrastructure
//!
//! Deterministic stand-ins for the external collaborators (remux tool, probe
//! tool, object store) plus helpers for tokens and multipart bodies.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use hyper::{Method, Request};
use jsonwebtoken::{encode, EncodingKey, Header};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tubely_ingest::auth::jwt::{Claims, JwtAuthenticator};
use tubely_ingest::config::{Config, ConfigLoader};
use tubely_ingest::media::{ProcessingError, Remuxer, StreamDimensions, StreamProber};
use tubely_ingest::pipeline::UploadPipeline;
use tubely_ingest::s3::{ObjectStore, StorageError, UploadResult};
use tubely_ingest::server::AppState;
use tubely_ingest::store::{InMemoryVideoStore, Video, VideoStore};
use uuid::Uuid;

pub const JWT_SECRET: &str = "tubely-test-secret";
pub const TEST_BUCKET: &str = "tubely-test-bucket";
pub const BOUNDARY: &str = "X-TUBELY-TEST-BOUNDARY";

/// Remuxer that copies the input, recording each call
#[derive(Default)]
pub struct FakeRemuxer {
    pub calls: Mutex<Vec<(PathBuf, PathBuf)>>,
}

#[async_trait]
impl Remuxer for FakeRemuxer {
    async fn remux_fast_start(&self, input: &Path, output: &Path) -> Result<(), ProcessingError> {
        self.calls
            .lock()
            .unwrap()
            .push((input.to_path_buf(), output.to_path_buf()));
        tokio::fs::copy(input, output).await?;
        Ok(())
    }
}

/// Prober reporting fixed dimensions
pub struct FakeProber {
    pub dimensions: StreamDimensions,
}

#[async_trait]
impl StreamProber for FakeProber {
    async fn probe_dimensions(&self, path: &Path) -> Result<StreamDimensions, ProcessingError> {
        assert!(path.exists(), "probe target must exist");
        Ok(self.dimensions)
    }
}

/// A stored object as seen by [`RecordingObjectStore`]
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bucket: String,
    pub key: String,
    pub content_type: String,
    pub body: Vec<u8>,
}

/// Object store that keeps puts in memory and signs with a fake host
#[derive(Default)]
pub struct RecordingObjectStore {
    pub objects: Mutex<Vec<StoredObject>>,
    pub presigned: Mutex<Vec<(String, String, Duration)>>,
}

impl RecordingObjectStore {
    pub fn put_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectStore for RecordingObjectStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> Result<UploadResult, StorageError> {
        let body = tokio::fs::read(path)
            .await
            .map_err(|e| StorageError::SourceError(e.to_string()))?;
        let bytes = body.len() as u64;
        self.objects.lock().unwrap().push(StoredObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            content_type: content_type.to_string(),
            body,
        });
        Ok(UploadResult { etag: None, bytes })
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        self.presigned
            .lock()
            .unwrap()
            .push((bucket.to_string(), key.to_string(), expires_in));
        Ok(format!(
            "https://{}.s3.test/{}?X-Amz-Expires={}",
            bucket,
            key,
            expires_in.as_secs()
        ))
    }
}

/// Everything a handler test needs, with fakes reachable for assertions
pub struct TestEnv {
    pub state: Arc<AppState>,
    pub videos: Arc<InMemoryVideoStore>,
    pub objects: Arc<RecordingObjectStore>,
    pub remuxer: Arc<FakeRemuxer>,
    pub temp_dir: TempDir,
}

impl TestEnv {
    /// Environment whose prober reports `width`x`height`
    pub fn new(width: u32, height: u32) -> Self {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = Arc::new(test_config(temp_dir.path(), "127.0.0.1:0"));

        let videos = Arc::new(InMemoryVideoStore::new());
        let objects = Arc::new(RecordingObjectStore::default());
        let remuxer = Arc::new(FakeRemuxer::default());
        let prober = Arc::new(FakeProber {
            dimensions: StreamDimensions { width, height },
        });

        let pipeline = UploadPipeline::new(
            Arc::clone(&config),
            remuxer.clone(),
            prober,
            objects.clone(),
        );

        let state = Arc::new(AppState {
            auth: Arc::new(JwtAuthenticator::from_config(&config.auth)),
            videos: videos.clone(),
            pipeline,
            config,
        });

        Self {
            state,
            videos,
            objects,
            remuxer,
            temp_dir,
        }
    }

    /// Insert a video owned by `owner`
    pub async fn create_video(&self, owner: Uuid) -> Video {
        let video = Video::new(owner, "Boots", "Boots of the ancient gods");
        self.videos.insert_video(video.clone()).await.unwrap();
        video
    }

    /// Files currently in the request temp dir
    pub fn temp_files(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.temp_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect()
    }
}

pub fn test_config(temp_dir: &Path, address: &str) -> Config {
    let yaml = format!(
        r#"
server:
  address: "{address}"
storage:
  bucket: {bucket}
  region: us-east-1
auth:
  jwt_secret: {secret}
upload:
  temp_dir: "{temp_dir}"
metrics:
  enabled: false
"#,
        address = address,
        bucket = TEST_BUCKET,
        secret = JWT_SECRET,
        temp_dir = temp_dir.display(),
    );
    ConfigLoader::parse(&yaml).unwrap()
}

/// HS256 token for `user_id`, valid for an hour
pub fn mint_token(user_id: Uuid) -> String {
    mint_token_with(JWT_SECRET, &user_id.to_string(), 3600)
}

pub fn mint_token_with(secret: &str, sub: &str, exp_offset_secs: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: sub.to_string(),
        exp: (now + exp_offset_secs) as usize,
        iat: Some(now as usize),
        iss: None,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

/// Multipart body with a single file field
pub fn multipart_body(field: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"boots.mp4\"\r\n",
            field
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// `POST /api/video_upload/{id}` carrying one `video` part
pub fn upload_request(
    video_id: &str,
    token: Option<&str>,
    content_type: &str,
    data: &[u8],
) -> Request<Full<Bytes>> {
    let body = multipart_body("video", content_type, data);
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/video_upload/{}", video_id))
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .header(CONTENT_LENGTH, body.len());
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Full::new(Bytes::from(body))).unwrap()
}

/// `GET` request with an optional bearer token
pub fn get_request(uri: &str, token: Option<&str>) -> Request<Full<Bytes>> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Full::new(Bytes::new())).unwrap()
}

/// Bytes standing in for an MP4 file
pub fn sample_video() -> Vec<u8> {
    let mut data = b"\x00\x00\x00\x18ftypmp42".to_vec();
    data.extend(std::iter::repeat(0xAB).take(4096));
    data
}
