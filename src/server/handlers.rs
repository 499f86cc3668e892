//! Request handlers

use super::AppState;
use crate::error::{ApiError, ErrorKind};
use crate::pipeline::normalize_locator;
use crate::store::StoreError;
use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Body;
use hyper::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use hyper::{HeaderMap, Request, Response, StatusCode};
use serde::Serialize;
use uuid::Uuid;

/// `GET /health`
pub fn health() -> Response<Full<Bytes>> {
    json_bytes(StatusCode::OK, Bytes::from_static(br#"{"status":"ok"}"#))
}

/// `POST /api/video_upload/{videoID}`
///
/// Checks run in this order: video id, bearer token, record lookup,
/// ownership, then the pipeline. Nothing touches local disk before the
/// ownership check passes.
#[tracing::instrument(name = "handler.upload_video", skip(state, req), err)]
pub async fn upload_video<B>(
    state: &AppState,
    req: Request<B>,
    video_id: &str,
) -> Result<Response<Full<Bytes>>, ApiError>
where
    B: Body<Data = Bytes> + Send + Unpin + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let id = parse_video_id(video_id)?;
    let auth = state.auth.authenticate(req.headers()).await?;

    let mut video = state
        .videos
        .get_video(id)
        .await
        .map_err(|e| ApiError::persistence("Couldn't find video", e))?;

    if video.user_id != auth.user_id {
        return Err(ApiError::auth("Not authorized to update this video")
            .with_detail(format!("user {} does not own video {}", auth.user_id, id)));
    }

    let limit = state.config.upload.max_body_bytes;
    if declared_length(req.headers()).is_some_and(|length| length > limit) {
        return Err(ApiError::validation("Request body exceeds the upload limit"));
    }

    let boundary = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::validation("Unable to parse form file"))
        .and_then(|content_type| {
            multer::parse_boundary(content_type).map_err(|e| {
                ApiError::validation("Unable to parse form file").with_detail(e)
            })
        })?;

    let body = Limited::new(req.into_body(), usize::try_from(limit).unwrap_or(usize::MAX));
    let multipart = state.pipeline.open_form(body.into_data_stream(), boundary);

    let locator = state.pipeline.ingest(multipart).await?;

    video.video_url = Some(locator.encode());
    state
        .videos
        .update_video(&video)
        .await
        .map_err(|e| ApiError::persistence("Couldn't update video", e))?;

    let signed = state.pipeline.sign_video(video).await?;
    json_response(StatusCode::OK, &signed)
}

/// `GET /api/videos/{videoID}`
///
/// Legacy URL locators are rewritten to the canonical form before signing.
#[tracing::instrument(name = "handler.get_video", skip(state, headers), err)]
pub async fn get_video(
    state: &AppState,
    headers: &HeaderMap,
    video_id: &str,
) -> Result<Response<Full<Bytes>>, ApiError> {
    let id = parse_video_id(video_id)?;
    state.auth.authenticate(headers).await?;

    let video = match state.videos.get_video(id).await {
        Ok(video) => video,
        Err(StoreError::NotFound(_)) => return Err(ApiError::not_found("Couldn't get video")),
        Err(e) => return Err(ApiError::persistence("Couldn't get video", e)),
    };

    let video = normalize_locator(state.videos.as_ref(), video).await?;
    let signed = state.pipeline.sign_video(video).await?;
    json_response(StatusCode::OK, &signed)
}

fn parse_video_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|e| ApiError::validation("Invalid ID").with_detail(e))
}

fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

/// Serialize `value` as a JSON response
pub fn json_response<T: Serialize>(
    status: StatusCode,
    value: &T,
) -> Result<Response<Full<Bytes>>, ApiError> {
    let body = serde_json::to_vec(value).map_err(|e| {
        ApiError::new(ErrorKind::Processing, "Couldn't encode response").with_detail(e)
    })?;
    Ok(json_bytes(status, Bytes::from(body)))
}

fn json_bytes(status: StatusCode, body: Bytes) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}
