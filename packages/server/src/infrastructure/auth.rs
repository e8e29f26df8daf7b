//! JWT 認証
//!
//! Access tokens are HS256-signed JWTs whose `sub` is the marketplace user
//! id. Token issuance belongs to the excluded auth service; `issue` exists
//! for the CLI client and the tests.

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::UserId;

/// Default lifetime of tokens produced by [`JwtAuthenticator::issue`].
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 60 * 60 * 24;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("invalid subject: {0}")]
    InvalidSubject(String),
}

/// Verifies (and, for tooling, issues) access tokens with a shared secret.
#[derive(Clone)]
pub struct JwtAuthenticator {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtAuthenticator {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn issue(&self, user_id: &UserId, ttl_secs: i64) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: now + ttl_secs,
            iat: now,
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    /// Validate signature and expiry, returning the user the token speaks for.
    pub fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())?;
        UserId::new(data.claims.sub).map_err(|e| AuthError::InvalidSubject(e.to_string()))
    }
}

impl std::fmt::Debug for JwtAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAuthenticator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(raw: &str) -> UserId {
        UserId::new(raw.to_string()).unwrap()
    }

    #[test]
    fn test_issue_then_verify_returns_subject() {
        // テスト項目: 発行したトークンを検証すると sub のユーザー ID が得られる
        // given (前提条件):
        let auth = JwtAuthenticator::new("test-secret-that-is-long-enough");
        let token = auth.issue(&user("worker-1"), DEFAULT_TOKEN_TTL_SECS).unwrap();

        // when (操作):
        let verified = auth.verify(&token);

        // then (期待する結果):
        assert_eq!(verified.unwrap(), user("worker-1"));
    }

    #[test]
    fn test_verify_rejects_foreign_secret() {
        // テスト項目: 別のシークレットで署名されたトークンは拒否される
        // given (前提条件):
        let token = JwtAuthenticator::new("secret-a")
            .issue(&user("u1"), DEFAULT_TOKEN_TTL_SECS)
            .unwrap();

        // when (操作):
        let result = JwtAuthenticator::new("secret-b").verify(&token);

        // then (期待する結果):
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_verify_rejects_expired_token() {
        // given (前提条件):
        let auth = JwtAuthenticator::new("secret");
        let token = auth.issue(&user("u1"), -3_600).unwrap();

        // then (期待する結果):
        assert!(auth.verify(&token).is_err());
    }

    #[test]
    fn test_verify_rejects_garbage() {
        // then (期待する結果):
        assert!(JwtAuthenticator::new("secret").verify("not-a-jwt").is_err());
    }
}
