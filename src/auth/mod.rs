//! Authentication module
//!
//! Bearer-token extraction and JWT validation. The upload handler only needs
//! the authenticated user's identity; ownership checks happen in the handler.

use async_trait::async_trait;
use hyper::HeaderMap;
use thiserror::Error;
use uuid::Uuid;

pub mod jwt;

/// Authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Malformed authorization header")]
    MalformedHeader,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid signature")]
    InvalidSignature,
}

/// Authentication result
#[derive(Debug, Clone)]
pub struct AuthResult {
    pub user_id: Uuid,
    pub claims: std::collections::HashMap<String, serde_json::Value>,
}

/// Authenticator trait
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Authenticate a request from its headers
    async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthResult, AuthError>;
}

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(hyper::header::AUTHORIZATION)
        .ok_or(AuthError::MissingAuth)?
        .to_str()
        .map_err(|_| AuthError::MalformedHeader)?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AuthError::MalformedHeader),
    }
}
