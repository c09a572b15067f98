//! `GET /api/github/file?reviewId&path` (spec §6).

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::core::app_state::AppState;
use crate::error_handler::{AppError, AppResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileQuery {
    pub review_id: String,
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct FileSide {
    pub name: String,
    pub contents: String,
    pub cache_key: String,
}

#[derive(Debug, Serialize)]
pub struct FileResponse {
    pub old_file: Option<FileSide>,
    pub new_file: Option<FileSide>,
}

/// Fetches both diff sides of `path` for a loaded session: `old_file` at
/// `base_sha`, `new_file` at `head_sha`. A side is `null` when the path
/// doesn't exist there (e.g. `added`/`removed` files).
#[instrument(name = "file_route", skip(state))]
pub async fn file_route(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FileQuery>,
) -> AppResult<Json<FileResponse>> {
    let sessions = state.sessions.read().await;
    let pr = sessions.get(&query.review_id).ok_or(AppError::NotFound)?.clone();
    drop(sessions);

    let old_file = state
        .gateway
        .fetch_file(&pr, &query.path, Some(&pr.base_sha))
        .await
        .ok()
        .map(|(contents, cache_key)| FileSide {
            name: query.path.clone(),
            contents,
            cache_key,
        });

    let new_file = state
        .gateway
        .fetch_file(&pr, &query.path, Some(&pr.head_sha))
        .await
        .ok()
        .map(|(contents, cache_key)| FileSide {
            name: query.path.clone(),
            contents,
            cache_key,
        });

    Ok(Json(FileResponse { old_file, new_file }))
}
