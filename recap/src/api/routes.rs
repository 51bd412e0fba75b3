//! API routes for the recap server

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use recap_store::{CacheStats, ChatMessage};
use serde::Serialize;
use std::sync::Arc;

use crate::error::RecapError;
use crate::registry::{ChatRequest, Job, JobRequest, SummarizeRequest};
use crate::services::Services;

/// Application state
pub type AppState = Arc<Services>;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub job_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextResponse {
    pub session_key: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionKeysResponse {
    pub session_keys: Vec<String>,
}

#[derive(Serialize)]
pub struct ClearedResponse {
    pub cleared: usize,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Error reply carrying a `{ "error": ... }` body
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<RecapError> for ApiError {
    fn from(e: RecapError) -> Self {
        match e {
            RecapError::JobNotFound(_) => Self::not_found(e.to_string()),
            RecapError::Config(_) => Self::bad_request(e.to_string()),
            other => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: other.job_message(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn submit(state: &Services, request: JobRequest) -> Result<Json<SubmitResponse>, ApiError> {
    request.validate().map_err(ApiError::bad_request)?;

    // The ticket is dropped; the job keeps running
    let ticket = state.registry.submit(request).await;
    Ok(Json(SubmitResponse { job_id: ticket.id }))
}

pub async fn submit_summarize(
    State(state): State<AppState>,
    Json(payload): Json<SummarizeRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    submit(&state, JobRequest::Summarize(payload)).await
}

pub async fn submit_chat(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    submit(&state, JobRequest::Chat(payload)).await
}

pub async fn poll_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    Ok(Json(state.registry.get_status(&job_id).await?))
}

pub async fn cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.cache.stats().await)
}

pub async fn clear_cache(State(state): State<AppState>) -> StatusCode {
    state.cache.clear().await;
    StatusCode::NO_CONTENT
}

pub async fn get_context(
    State(state): State<AppState>,
    Path(session_key): Path<String>,
) -> Result<Json<ContextResponse>, ApiError> {
    let messages = state
        .contexts
        .get(&session_key)
        .await
        .ok_or_else(|| ApiError::not_found(format!("No context for session {}", session_key)))?;

    Ok(Json(ContextResponse {
        session_key,
        messages,
    }))
}

pub async fn list_contexts(State(state): State<AppState>) -> Json<SessionKeysResponse> {
    Json(SessionKeysResponse {
        session_keys: state.contexts.session_keys().await,
    })
}

pub async fn clear_context(
    State(state): State<AppState>,
    Path(session_key): Path<String>,
) -> Json<ClearedResponse> {
    let cleared = usize::from(state.contexts.clear(&session_key).await);
    Json(ClearedResponse { cleared })
}

pub async fn clear_all_contexts(State(state): State<AppState>) -> Json<ClearedResponse> {
    Json(ClearedResponse {
        cleared: state.contexts.clear_all().await,
    })
}
