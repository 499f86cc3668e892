//! Upload and read handler integration tests
//!
//! Drives `handle_request` directly with in-memory bodies and fake
//! collaborators, so neither ffmpeg nor S3 is needed.

mod common;

use common::*;
use http_body_util::BodyExt;
use hyper::{Response, StatusCode};
use std::time::Duration;
use tubely_ingest::server::handle_request;
use tubely_ingest::store::{Video, VideoStore};
use uuid::Uuid;

async fn json_body(response: Response<http_body_util::Full<bytes::Bytes>>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ============================================================================
// Upload path
// ============================================================================

#[tokio::test]
async fn test_owner_upload_of_landscape_video() {
    let env = TestEnv::new(1920, 1080);
    let owner = Uuid::new_v4();
    let video = env.create_video(owner).await;
    let data = sample_video();

    let response = handle_request(
        upload_request(
            &video.id.to_string(),
            Some(&mint_token(owner)),
            "video/mp4",
            &data,
        ),
        env.state.clone(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Video = serde_json::from_value(json_body(response).await).unwrap();

    let objects = env.objects.objects.lock().unwrap().clone();
    assert_eq!(objects.len(), 1);
    let stored = &objects[0];
    assert_eq!(stored.bucket, TEST_BUCKET);
    assert!(stored.key.starts_with("landscape/"));
    assert!(stored.key.ends_with(".mp4"));
    assert_eq!(stored.content_type, "video/mp4");
    assert_eq!(stored.body, data, "processed file is what gets stored");

    let url = body.video_url.expect("response carries a signed URL");
    assert!(url.contains(&stored.key));
    assert!(url.contains("X-Amz-Expires=300"));

    let persisted = env.videos.get_video(video.id).await.unwrap();
    assert_eq!(
        persisted.video_url,
        Some(format!("{},{}", TEST_BUCKET, stored.key))
    );

    let presigned = env.objects.presigned.lock().unwrap().clone();
    assert_eq!(presigned.len(), 1);
    assert_eq!(presigned[0].2, Duration::from_secs(300));

    assert!(env.temp_files().is_empty(), "temp files must be removed");
}

#[tokio::test]
async fn test_portrait_video_gets_portrait_prefix() {
    let env = TestEnv::new(1080, 1920);
    let owner = Uuid::new_v4();
    let video = env.create_video(owner).await;

    let response = handle_request(
        upload_request(
            &video.id.to_string(),
            Some(&mint_token(owner)),
            "video/mp4",
            &sample_video(),
        ),
        env.state.clone(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let objects = env.objects.objects.lock().unwrap().clone();
    assert!(objects[0].key.starts_with("portrait/"));
}

#[tokio::test]
async fn test_non_owner_is_rejected_without_side_effects() {
    let env = TestEnv::new(1920, 1080);
    let video = env.create_video(Uuid::new_v4()).await;
    let intruder = Uuid::new_v4();

    let response = handle_request(
        upload_request(
            &video.id.to_string(),
            Some(&mint_token(intruder)),
            "video/mp4",
            &sample_video(),
        ),
        env.state.clone(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Not authorized to update this video");

    assert_eq!(env.objects.put_count(), 0, "no object store write");
    assert!(env.remuxer.calls.lock().unwrap().is_empty());
    assert!(env.temp_files().is_empty());
    assert_eq!(env.videos.get_video(video.id).await.unwrap().video_url, None);
}

#[tokio::test]
async fn test_wrong_media_type_rejected_before_temp_file() {
    let env = TestEnv::new(1920, 1080);
    let owner = Uuid::new_v4();
    let video = env.create_video(owner).await;

    let response = handle_request(
        upload_request(
            &video.id.to_string(),
            Some(&mint_token(owner)),
            "video/avi",
            &sample_video(),
        ),
        env.state.clone(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("video/mp4"));

    assert!(env.temp_files().is_empty());
    assert!(env.remuxer.calls.lock().unwrap().is_empty());
    assert_eq!(env.objects.put_count(), 0);
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let env = TestEnv::new(1920, 1080);
    let video = env.create_video(Uuid::new_v4()).await;

    let response = handle_request(
        upload_request(&video.id.to_string(), None, "video/mp4", &sample_video()),
        env.state.clone(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"], "Couldn't find JWT");
}

#[tokio::test]
async fn test_bad_signature_is_unauthorized() {
    let env = TestEnv::new(1920, 1080);
    let owner = Uuid::new_v4();
    let video = env.create_video(owner).await;
    let forged = mint_token_with("some-other-secret", &owner.to_string(), 3600);

    let response = handle_request(
        upload_request(
            &video.id.to_string(),
            Some(&forged),
            "video/mp4",
            &sample_video(),
        ),
        env.state.clone(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(env.objects.put_count(), 0);
}

#[tokio::test]
async fn test_invalid_video_id_is_bad_request() {
    let env = TestEnv::new(1920, 1080);

    let response = handle_request(
        upload_request(
            "not-a-uuid",
            Some(&mint_token(Uuid::new_v4())),
            "video/mp4",
            &sample_video(),
        ),
        env.state.clone(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Invalid ID");
}

#[tokio::test]
async fn test_unknown_video_is_persistence_error() {
    let env = TestEnv::new(1920, 1080);
    let owner = Uuid::new_v4();

    let response = handle_request(
        upload_request(
            &Uuid::new_v4().to_string(),
            Some(&mint_token(owner)),
            "video/mp4",
            &sample_video(),
        ),
        env.state.clone(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["error"], "Couldn't find video");
}

#[tokio::test]
async fn test_missing_video_field_is_bad_request() {
    let env = TestEnv::new(1920, 1080);
    let owner = Uuid::new_v4();
    let video = env.create_video(owner).await;

    let mut request = upload_request(
        &video.id.to_string(),
        Some(&mint_token(owner)),
        "video/mp4",
        b"",
    );
    let body = multipart_body("thumbnail", "image/png", b"png");
    request
        .headers_mut()
        .insert(hyper::header::CONTENT_LENGTH, body.len().into());
    *request.body_mut() = http_body_util::Full::new(bytes::Bytes::from(body));

    let response = handle_request(request, env.state.clone()).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Unable to parse form file");
    assert!(env.temp_files().is_empty());
}

// ============================================================================
// Read path
// ============================================================================

#[tokio::test]
async fn test_get_video_signs_locator() {
    let env = TestEnv::new(1920, 1080);
    let owner = Uuid::new_v4();
    let mut video = Video::new(owner, "t", "d");
    video.video_url = Some(format!("{},other/abc.mp4", TEST_BUCKET));
    env.videos.insert_video(video.clone()).await.unwrap();

    let response = handle_request(
        get_request(&format!("/api/videos/{}", video.id), Some(&mint_token(owner))),
        env.state.clone(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(
        body["video_url"],
        format!(
            "https://{}.s3.test/other/abc.mp4?X-Amz-Expires=300",
            TEST_BUCKET
        )
    );
}

#[tokio::test]
async fn test_get_video_without_file_is_unchanged() {
    let env = TestEnv::new(1920, 1080);
    let owner = Uuid::new_v4();
    let video = env.create_video(owner).await;

    let response = handle_request(
        get_request(&format!("/api/videos/{}", video.id), Some(&mint_token(owner))),
        env.state.clone(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Video = serde_json::from_value(json_body(response).await).unwrap();
    assert_eq!(body, video);
    assert!(env.objects.presigned.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_get_video_migrates_legacy_locator() {
    let env = TestEnv::new(1920, 1080);
    let owner = Uuid::new_v4();
    let mut video = Video::new(owner, "t", "d");
    video.video_url = Some(format!(
        "https://{}.s3.us-east-1.amazonaws.com/landscape/legacy.mp4",
        TEST_BUCKET
    ));
    env.videos.insert_video(video.clone()).await.unwrap();

    let response = handle_request(
        get_request(&format!("/api/videos/{}", video.id), Some(&mint_token(owner))),
        env.state.clone(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);

    let presigned = env.objects.presigned.lock().unwrap().clone();
    assert_eq!(presigned.len(), 1);
    assert_eq!(presigned[0].0, TEST_BUCKET);
    assert_eq!(presigned[0].1, "landscape/legacy.mp4");

    let persisted = env.videos.get_video(video.id).await.unwrap();
    assert_eq!(
        persisted.video_url,
        Some(format!("{},landscape/legacy.mp4", TEST_BUCKET))
    );
}

#[tokio::test]
async fn test_get_video_migrates_percent_encoded_legacy_key() {
    let env = TestEnv::new(1920, 1080);
    let owner = Uuid::new_v4();
    let mut video = Video::new(owner, "t", "d");
    video.video_url = Some(format!(
        "https://{}.s3.us-east-1.amazonaws.com/other/my%20clip%2Cv2.mp4",
        TEST_BUCKET
    ));
    env.videos.insert_video(video.clone()).await.unwrap();

    let response = handle_request(
        get_request(&format!("/api/videos/{}", video.id), Some(&mint_token(owner))),
        env.state.clone(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);

    let presigned = env.objects.presigned.lock().unwrap().clone();
    assert_eq!(presigned[0].1, "other/my clip,v2.mp4");

    let persisted = env.videos.get_video(video.id).await.unwrap();
    assert_eq!(
        persisted.video_url,
        Some(format!("{},other/my clip,v2.mp4", TEST_BUCKET))
    );
}

#[tokio::test]
async fn test_get_unknown_video_is_not_found() {
    let env = TestEnv::new(1920, 1080);

    let response = handle_request(
        get_request(
            &format!("/api/videos/{}", Uuid::new_v4()),
            Some(&mint_token(Uuid::new_v4())),
        ),
        env.state.clone(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Dispatch
// ============================================================================

#[tokio::test]
async fn test_health_and_unknown_routes() {
    let env = TestEnv::new(1920, 1080);

    let response = handle_request(get_request("/health", None), env.state.clone()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");

    let response = handle_request(get_request("/api/nothing", None), env.state.clone()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"], "Not Found");

    let response = handle_request(
        get_request(&format!("/api/video_upload/{}", Uuid::new_v4()), None),
        env.state.clone(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND, "upload is POST only");
}
