//! JWT Authentication
//!
//! HS256 tokens signed with the shared secret from configuration. The `sub`
//! claim carries the user's UUID.

use super::{bearer_token, AuthError, AuthResult, Authenticator};
use crate::metrics;
use async_trait::async_trait;
use hyper::HeaderMap;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT Claims
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    #[serde(default)]
    pub iat: Option<usize>,
    #[serde(default)]
    pub iss: Option<String>,
}

/// JWT Authenticator
///
/// # Example
///
/// ```
/// use tubely_ingest::auth::jwt::JwtAuthenticator;
///
/// let auth = JwtAuthenticator::new_hs256("my-secret").with_issuer("tubely-access");
/// ```
pub struct JwtAuthenticator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtAuthenticator {
    /// Create a new JWT authenticator with a secret key (HS256)
    pub fn new_hs256(secret: &str) -> Self {
        let decoding_key = DecodingKey::from_secret(secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_aud = false;

        Self {
            decoding_key,
            validation,
        }
    }

    /// Build from the auth section of the configuration
    pub fn from_config(config: &crate::config::AuthConfig) -> Self {
        let auth = Self::new_hs256(&config.jwt_secret);
        match &config.issuer {
            Some(issuer) => auth.with_issuer(issuer),
            None => auth,
        }
    }

    /// Set the required issuer (`iss` claim)
    #[must_use]
    pub fn with_issuer(mut self, issuer: &str) -> Self {
        self.validation.set_issuer(&[issuer]);
        self
    }

    fn validate(&self, token: &str) -> Result<AuthResult, AuthError> {
        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| match e
                .kind()
            {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::InvalidToken(e.to_string()),
            })?;

        let user_id = Uuid::parse_str(&token_data.claims.sub)
            .map_err(|e| AuthError::InvalidToken(format!("subject is not a UUID: {}", e)))?;

        let mut claims_map = std::collections::HashMap::new();
        if let Some(iss) = &token_data.claims.iss {
            claims_map.insert("iss".into(), serde_json::Value::String(iss.clone()));
        }

        Ok(AuthResult {
            user_id,
            claims: claims_map,
        })
    }
}

#[async_trait]
impl Authenticator for JwtAuthenticator {
    #[tracing::instrument(name = "auth.jwt", skip_all, err)]
    async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthResult, AuthError> {
        let result = bearer_token(headers).and_then(|token| self.validate(token));
        metrics::record_auth_attempt("jwt", result.is_ok());

        if let Ok(auth) = &result {
            tracing::debug!(user_id = %auth.user_id, "JWT authentication successful");
        }
        result
    }
}
