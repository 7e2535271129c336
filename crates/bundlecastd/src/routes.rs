//! API router and handlers.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{
        multipart::MultipartRejection, rejection::QueryRejection, DefaultBodyLimit, Multipart,
        Path, Query, State,
    },
    http::{Request, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use bundlecast_core::{
    ClientState, PollResponse, PublishRequest, UpdateError, UpdateService, ValidationError,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::auth::Authorized;
use crate::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub service: UpdateService,
    pub api_token: Arc<str>,
}

impl AppState {
    pub fn new(service: UpdateService, api_token: impl Into<Arc<str>>) -> Self {
        Self {
            service,
            api_token: api_token.into(),
        }
    }
}

/// Create the API router.
pub fn create_router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/v1/updates/poll", get(poll).fallback(not_found))
        .route("/v1/updates/push", post(push).fallback(not_found))
        .route(
            "/v1/updates/delete/:commit_hash",
            delete(retract).fallback(not_found),
        )
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
            tracing::info_span!(
                "http",
                method = %req.method(),
                path = %req.uri().path(),
                request_id = %Uuid::new_v4(),
            )
        }))
        .with_state(state)
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not Found.")
}

async fn poll(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<PollResponse>, ApiError> {
    let Query(pairs) = query.map_err(|e| ValidationError::MalformedQuery {
        reason: e.body_text(),
    })?;
    let client = ClientState::from_query_pairs(pairs)?;
    let response = state.service.poll(&client).await?;
    Ok(Json(response))
}

async fn push(
    _auth: Authorized,
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<StatusCode, ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::Form(e.body_text()))?;

    let mut parts = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Form(e.body_text()))?
    {
        let name = field
            .name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::Form("form part without a name".to_string()))?;
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::Form(e.body_text()))?;
        parts.push((name, data.to_vec()));
    }

    let request = PublishRequest::from_parts(parts).map_err(UpdateError::from)?;
    state.service.publish(request).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn retract(
    _auth: Authorized,
    State(state): State<AppState>,
    Path(commit_hash): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.service.retract(&commit_hash).await?;
    Ok(StatusCode::NO_CONTENT)
}
