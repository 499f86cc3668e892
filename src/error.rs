//! Request-level error taxonomy
//!
//! Every failure a request can hit is reduced to an [`ApiError`], which owns
//! the HTTP status and the JSON body `{"error": "..."}`. The public message is
//! what the client sees; the detail (the underlying error) is only logged.

use crate::auth::AuthError;
use crate::media::{MediaTypeError, ProcessingError};
use crate::metrics;
use crate::s3::{LocatorError, StorageError};
use crate::store::StoreError;
use crate::upload::UploadError;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use std::fmt;
use thiserror::Error;

/// Error category, fixing the response status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid credential, or not the owner (401)
    Auth,
    /// Bad identifier, form, or media type (400)
    Validation,
    /// Temp-file I/O or external tool failure (500)
    Processing,
    /// Object store upload or presign failure (500)
    Storage,
    /// Record lookup or update failure (500)
    Persistence,
    /// No such route (404)
    NotFound,
}

impl ErrorKind {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorKind::Auth => StatusCode::UNAUTHORIZED,
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Processing | ErrorKind::Storage | ErrorKind::Persistence => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Auth => "auth",
            ErrorKind::Validation => "validation",
            ErrorKind::Processing => "processing",
            ErrorKind::Storage => "storage",
            ErrorKind::Persistence => "persistence",
            ErrorKind::NotFound => "not_found",
        }
    }
}

/// Error returned to the HTTP client
#[derive(Error, Debug)]
#[error("{message}")]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
    detail: Option<String>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
        }
    }

    /// Attach the underlying cause, logged but never sent to the client
    pub fn with_detail(mut self, detail: impl fmt::Display) -> Self {
        self.detail = Some(detail.to_string());
        self
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Auth, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn processing(message: impl Into<String>, detail: impl fmt::Display) -> Self {
        Self::new(ErrorKind::Processing, message).with_detail(detail)
    }

    pub fn storage(message: impl Into<String>, detail: impl fmt::Display) -> Self {
        Self::new(ErrorKind::Storage, message).with_detail(detail)
    }

    pub fn persistence(message: impl Into<String>, detail: impl fmt::Display) -> Self {
        Self::new(ErrorKind::Persistence, message).with_detail(detail)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Log, count, and render as a JSON response
    pub fn into_response(self) -> Response<Full<Bytes>> {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(
                kind = self.kind.as_str(),
                status = status.as_u16(),
                detail = ?self.detail,
                "{}",
                self.message
            );
        } else {
            tracing::warn!(
                kind = self.kind.as_str(),
                status = status.as_u16(),
                detail = ?self.detail,
                "{}",
                self.message
            );
        }
        metrics::record_error(self.kind.as_str());

        let body = serde_json::json!({ "error": self.message }).to_string();
        let mut response = Response::new(Full::new(Bytes::from(body)));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if self.kind == ErrorKind::Auth {
            response
                .headers_mut()
                .insert("WWW-Authenticate", HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let message = match err {
            AuthError::MissingAuth | AuthError::MalformedHeader => "Couldn't find JWT",
            _ => "Couldn't validate JWT",
        };
        ApiError::auth(message).with_detail(err)
    }
}

impl From<MediaTypeError> for ApiError {
    fn from(err: MediaTypeError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::MissingField(_) | UploadError::Multipart(_) => {
                ApiError::validation("Unable to parse form file").with_detail(err)
            }
            UploadError::TooLarge => ApiError::validation(err.to_string()),
            UploadError::IoError(_) => ApiError::processing("Error saving file", err),
        }
    }
}

impl From<ProcessingError> for ApiError {
    fn from(err: ProcessingError) -> Self {
        ApiError::processing("Error processing video", err)
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::storage("Error saving file", err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::persistence("Couldn't find video", err)
    }
}

impl From<LocatorError> for ApiError {
    fn from(err: LocatorError) -> Self {
        ApiError::persistence("Stored video locator is invalid", err)
    }
}
