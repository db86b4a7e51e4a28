//! Bearer-token authentication.
//!
//! Tokens are issued elsewhere; this module only verifies HS256 JWTs and
//! exposes the caller as an [`AuthUser`] extractor.

use crate::errors::ErrorResponse;
use async_trait::async_trait;
use axum::{
    extract::FromRef,
    extract::FromRequestParts,
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Claim structure for JWT tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,              // Subject (user ID)
    #[serde(default)]
    pub role: Option<String>,     // Caller's role
    pub exp: i64,                 // Expiration time
}

/// Authenticated caller extracted from the bearer token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: String,
    pub role: Option<String>,
}

/// Verifies HS256 tokens signed with the configured secret
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 30;
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => {
                    debug!(error = %e, "rejected bearer token");
                    AuthError::InvalidToken
                }
            })
    }
}

/// Authentication error types
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("No bearer token provided")]
    MissingToken,

    #[error("Invalid bearer token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = ErrorResponse::new(StatusCode::UNAUTHORIZED, self.to_string());
        (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, "Bearer")],
            Json(body),
        )
            .into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<TokenVerifier>: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let verifier = Arc::<TokenVerifier>::from_ref(state);

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingToken)?;

        let claims = verifier.verify(token)?;
        Ok(AuthUser {
            user_id: claims.sub,
            role: claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "unit-test-secret-that-is-long-enough-123";

    fn token(secret: &str, exp: i64) -> String {
        let claims = Claims {
            sub: "user-7".into(),
            role: Some("dispatcher".into()),
            exp,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn accepts_valid_token() {
        let verifier = TokenVerifier::new(SECRET);
        let exp = chrono::Utc::now().timestamp() + 600;
        let claims = verifier.verify(&token(SECRET, exp)).unwrap();
        assert_eq!(claims.sub, "user-7");
        assert_eq!(claims.role.as_deref(), Some("dispatcher"));
    }

    #[test]
    fn rejects_wrong_secret_and_expiry() {
        let verifier = TokenVerifier::new(SECRET);
        let exp = chrono::Utc::now().timestamp() + 600;
        assert_eq!(
            verifier.verify(&token("another-secret-entirely-0000000000000", exp)),
            Err(AuthError::InvalidToken)
        );

        let expired = chrono::Utc::now().timestamp() - 3600;
        assert_eq!(
            verifier.verify(&token(SECRET, expired)),
            Err(AuthError::TokenExpired)
        );
        assert_eq!(verifier.verify("garbage"), Err(AuthError::InvalidToken));
    }
}
