//! `POST /api/suggestions` (spec §6).

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::core::app_state::AppState;
use crate::error_handler::{AppError, AppResult};
use crate::routes::ask_stream::AskConversationMessage;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionsRequest {
    pub review_id: String,
    #[serde(default)]
    pub conversation: Vec<AskConversationMessage>,
    #[serde(default)]
    pub last_answer: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<String>,
}

const SUGGESTIONS_SYSTEM_PROMPT: &str = "Given a code review conversation, propose 3 short, \
concrete follow-up questions the reviewer might ask next. Respond with one question per line, \
nothing else.";

/// A single `llm_query`-style call (spec §9 "single-shot, no tool access")
/// that proposes follow-up questions, not a full RLM session.
#[instrument(name = "suggestions_route", skip(state))]
pub async fn suggestions_route(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SuggestionsRequest>,
) -> AppResult<Json<SuggestionsResponse>> {
    if !state.sessions.read().await.contains_key(&body.review_id) {
        return Err(AppError::NotFound);
    }

    let mut prompt = String::new();
    for msg in &body.conversation {
        prompt.push_str(&format!("{}: {}\n", msg.role, msg.content));
    }
    if let Some(last_answer) = &body.last_answer {
        prompt.push_str(&format!("Last answer: {last_answer}\n"));
    }

    let raw = state
        .llm
        .single_shot(&prompt, Some(SUGGESTIONS_SYSTEM_PROMPT))
        .await?;

    let suggestions = raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| l.trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == '-' || c == ' ').to_string())
        .take(3)
        .collect();

    Ok(Json(SuggestionsResponse { suggestions }))
}
