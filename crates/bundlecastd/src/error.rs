//! HTTP error mapping.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bundlecast_core::{UpdateError, ValidationError};
use serde::Serialize;

/// Request-level failures.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Update(#[from] UpdateError),

    #[error("Invalid API token. Do you have permission to push updates?")]
    Unauthorized,

    /// The multipart body could not be decoded at all.
    #[error("failed to parse form data: {0}")]
    Form(String),
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Update(err.into())
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Update(UpdateError::Validation(_) | UpdateError::Payload(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Update(UpdateError::DuplicateCommit(_)) => StatusCode::CONFLICT,
            ApiError::Update(UpdateError::Upstream(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Form(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            ApiError::Update(err) => err.tag(),
            ApiError::Unauthorized => "UNAUTHORIZED",
            ApiError::Form(_) => "BAD_REQUEST",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, tag = self.tag(), "request failed");
        } else {
            tracing::debug!(error = %self, tag = self.tag(), "request rejected");
        }

        let body = Json(ErrorBody {
            kind: self.tag(),
            message: self.to_string(),
        });
        match self {
            ApiError::Unauthorized => {
                (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
            }
            _ => (status, body).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bundlecast_core::PayloadError;
    use bundlecast_state::StorageError;

    #[test]
    fn statuses_follow_error_class() {
        let cases: Vec<(ApiError, StatusCode, &str)> = vec![
            (
                ValidationError::MissingField { field: "platform" }.into(),
                StatusCode::BAD_REQUEST,
                "VALIDATOR_ERROR",
            ),
            (
                ValidationError::InvalidUpdateBits { value: "x".into() }.into(),
                StatusCode::BAD_REQUEST,
                "UPDATE_BITS_ERROR",
            ),
            (
                UpdateError::from(PayloadError::MissingPart { part: "main.js".into() }).into(),
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
            ),
            (
                UpdateError::DuplicateCommit("c1".into()).into(),
                StatusCode::CONFLICT,
                "CONFLICT",
            ),
            (
                UpdateError::from(StorageError::Backend("down".into())).into(),
                StatusCode::BAD_GATEWAY,
                "UPSTREAM_ERROR",
            ),
            (ApiError::Unauthorized, StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            (ApiError::Form("eof".into()), StatusCode::BAD_REQUEST, "BAD_REQUEST"),
        ];

        for (err, status, tag) in cases {
            assert_eq!(err.status(), status, "{err}");
            assert_eq!(err.tag(), tag, "{err}");
        }
    }

    #[test]
    fn unauthorized_carries_challenge_header() {
        let response = ApiError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }
}
