//! Bearer-token authentication.
//!
//! Tokens are HMAC-signed JWTs whose `sub` claim is the user id. The server
//! only verifies them; issuing is exposed for the CLI and tests.

use std::str::FromStr;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use horizon_core::config::AuthConfig;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing Authorization header")]
    MissingHeader,
    #[error("expected `Authorization: Bearer <token>`")]
    MalformedHeader,
    #[error("invalid or expired token")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),
    #[error("token has no subject")]
    MissingSubject,
    #[error("unsupported jwt algorithm `{0}` (expected HS256, HS384 or HS512)")]
    UnsupportedAlgorithm(String),
    #[error("could not sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    expiration: Duration,
}

impl JwtKeys {
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        let algorithm = Algorithm::from_str(config.jwt_algorithm.trim())
            .ok()
            .filter(|algorithm| {
                matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)
            })
            .ok_or_else(|| AuthError::UnsupportedAlgorithm(config.jwt_algorithm.clone()))?;
        let secret = config.jwt_secret.expose_secret().as_bytes();

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            algorithm,
            expiration: Duration::hours(config.jwt_expiration_hours),
        })
    }

    pub fn issue(&self, user_id: &str) -> Result<String, AuthError> {
        self.issue_expiring(user_id, Utc::now() + self.expiration)
    }

    pub fn issue_expiring(
        &self,
        user_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let claims = Claims {
            sub: user_id.to_string(),
            exp: expires_at.timestamp(),
            iat: Utc::now().timestamp(),
        };
        encode(&Header::new(self.algorithm), &claims, &self.encoding).map_err(AuthError::Signing)
    }

    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::new(self.algorithm);
        let claims = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(AuthError::InvalidToken)?
            .claims;
        if claims.sub.trim().is_empty() {
            return Err(AuthError::MissingSubject);
        }
        Ok(claims)
    }
}

/// The caller, taken from a valid bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingHeader)?
            .to_str()
            .map_err(|_| AuthError::MalformedHeader)?;
        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MalformedHeader)?;

        let claims = state.jwt.validate(token)?;
        Ok(Self { user_id: claims.sub })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use horizon_core::config::AuthConfig;

    use super::{AuthError, JwtKeys};

    fn config(secret: &str, algorithm: &str) -> AuthConfig {
        AuthConfig {
            jwt_secret: secret.to_string().into(),
            jwt_algorithm: algorithm.to_string(),
            jwt_expiration_hours: 24,
        }
    }

    #[test]
    fn issued_tokens_validate_to_the_same_subject() {
        let keys = JwtKeys::from_config(&config("secret", "HS256")).expect("keys");
        let token = keys.issue("user-1").expect("issue");
        assert_eq!(keys.validate(&token).expect("validate").sub, "user-1");
    }

    #[test]
    fn expired_and_foreign_tokens_are_rejected() {
        let keys = JwtKeys::from_config(&config("secret", "HS256")).expect("keys");
        let expired = keys.issue_expiring("user-1", Utc::now() - Duration::hours(2)).expect("issue");
        assert!(matches!(keys.validate(&expired), Err(AuthError::InvalidToken(_))));

        let other = JwtKeys::from_config(&config("other-secret", "HS256")).expect("keys");
        let forged = other.issue("user-1").expect("issue");
        assert!(matches!(keys.validate(&forged), Err(AuthError::InvalidToken(_))));
        assert!(keys.validate("not-a-jwt").is_err());
    }

    #[test]
    fn asymmetric_algorithms_are_not_accepted() {
        assert!(matches!(
            JwtKeys::from_config(&config("secret", "RS256")),
            Err(AuthError::UnsupportedAlgorithm(_))
        ));
        assert!(JwtKeys::from_config(&config("secret", "HS512")).is_ok());
    }
}
