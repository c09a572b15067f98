//! `POST /api/diff/review?reviewId` (spec §6, C5).

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use review_pipeline::ReviewReport;
use serde::Deserialize;
use tracing::instrument;

use crate::core::app_state::AppState;
use crate::error_handler::{AppError, AppResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewQuery {
    pub review_id: String,
}

#[instrument(name = "review_route", skip(state))]
pub async fn review_route(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReviewQuery>,
) -> AppResult<Json<ReviewReport>> {
    let pr_info = state
        .sessions
        .read()
        .await
        .get(&query.review_id)
        .cloned()
        .ok_or(AppError::NotFound)?;

    let report = review_pipeline::review_pr(
        Arc::clone(&state.controller),
        query.review_id,
        pr_info,
        state.config.rlm_deadline,
    )
    .await?;

    Ok(Json(report))
}
