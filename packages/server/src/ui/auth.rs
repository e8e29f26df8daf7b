//! Bearer token extractor for the REST handlers.

use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::domain::UserId;

use super::{error::ApiError, state::AppState};

/// Authenticated caller taken from `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: UserId,
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;

        let token = header.strip_prefix("Bearer ").ok_or_else(|| {
            ApiError::Unauthorized("Expected: Bearer <token>".to_string())
        })?;

        let user_id = state.authenticator.verify(token).map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            ApiError::Unauthorized("Invalid or expired token".to_string())
        })?;

        Ok(AuthUser { user_id })
    }
}
