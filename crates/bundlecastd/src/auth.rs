//! Bearer-token gate for push and delete.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, HeaderMap};

use crate::error::ApiError;
use crate::routes::AppState;

/// Whether `headers` carry `Authorization: Bearer <expected>`.
pub fn is_authorized(headers: &HeaderMap, expected: &str) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .is_some_and(|token| token == expected)
}

/// Extractor that only succeeds for requests bearing the API token.
///
/// Place it before any body extractor so unauthenticated uploads are
/// refused before the body is read.
#[derive(Debug, Clone, Copy)]
pub struct Authorized;

#[async_trait]
impl FromRequestParts<AppState> for Authorized {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if is_authorized(&parts.headers, &state.api_token) {
            Ok(Authorized)
        } else {
            tracing::warn!(path = %parts.uri.path(), "rejected request with bad credentials");
            Err(ApiError::Unauthorized)
        }
    }
}
