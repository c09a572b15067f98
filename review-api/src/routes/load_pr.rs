//! `POST /api/github/load_pr` (spec §6).

use std::sync::Arc;

use axum::{extract::State, Json};
use provider_gateway::PRInfo;
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use crate::core::app_state::AppState;
use crate::error_handler::AppResult;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadPrRequest {
    pub pr_url: String,
}

#[instrument(name = "load_pr_route", skip(state))]
pub async fn load_pr_route(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoadPrRequest>,
) -> AppResult<Json<PRInfo>> {
    let parsed = state.gateway.parse_url(&body.pr_url)?;
    let review_id = Uuid::new_v4().to_string();
    let pr_info = state.gateway.load_pr(review_id.clone(), &parsed).await?;

    state.sessions.write().await.insert(review_id, pr_info.clone());

    Ok(Json(pr_info))
}
