//! `review-api`: the thin axum HTTP host over the review engine (spec §6).
//!
//! Assembles `AppState` from the environment, wires up the five endpoints,
//! and serves them. All engine logic (`provider-gateway`, `rlm-controller`,
//! `review-pipeline`) lives in its own crate; this one only translates HTTP
//! in and out.

pub mod core;
pub mod error_handler;
pub mod middleware_layer;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tracing::info;

use crate::core::app_state::{AppConfig, AppState};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/github/load_pr", post(routes::load_pr::load_pr_route))
        .route("/api/github/file", get(routes::file::file_route))
        .route("/api/diff/review", post(routes::review::review_route))
        .route("/api/diff/ask/stream", post(routes::ask_stream::ask_stream_route))
        .route("/api/suggestions", post(routes::suggestions::suggestions_route))
        .layer(middleware::from_fn(middleware_layer::json_extractor::json_error_mapper))
        .with_state(state)
}

/// Builds `AppState` from the environment and serves the router until the
/// process is killed.
pub async fn start(addr: SocketAddr) -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    let state = Arc::new(AppState::build(config)?);
    let app = router(state);

    info!(%addr, "review-api listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
