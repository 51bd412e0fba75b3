//! API server for recap

use anyhow::{Context, Result};
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

use super::routes::{
    cache_stats, clear_all_contexts, clear_cache, clear_context, get_context, health_check,
    list_contexts, poll_job, submit_chat, submit_summarize, AppState,
};
use crate::config::ServerSettings;
use crate::services::Services;

/// Build the router over shared services
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/jobs/summarize", post(submit_summarize))
        .route("/api/jobs/chat", post(submit_chat))
        .route("/api/jobs/:job_id", get(poll_job))
        .route("/api/cache/stats", get(cache_stats))
        .route("/api/cache", delete(clear_cache))
        .route("/api/contexts", get(list_contexts).delete(clear_all_contexts))
        .route(
            "/api/contexts/:session_key",
            get(get_context).delete(clear_context),
        )
        .with_state(state)
        // Browser extensions call from their own origin
        .layer(CorsLayer::permissive())
}

/// API server
pub struct ApiServer {
    config: ServerSettings,
    services: Arc<Services>,
}

impl ApiServer {
    pub fn new(config: ServerSettings, services: Arc<Services>) -> Self {
        Self { config, services }
    }

    /// Bind the configured address and serve until the process exits
    pub async fn start(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        self.serve(listener).await
    }

    /// Serve on an already-bound listener
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let sweeper = self.services.registry.spawn_sweeper();
        let app = router(self.services);

        info!("Starting API server on {}", listener.local_addr()?);
        let served = axum::serve(listener, app).await.context("API server failed");

        sweeper.abort();
        served
    }
}
