//! `POST /api/diff/ask/stream` (spec §6 streaming wire format, P5).

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::Json;
use futures::stream::{Stream, StreamExt};
use rlm_controller::{CancelToken, ReviewSession, Selection};
use serde::Deserialize;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::instrument;

use crate::core::app_state::AppState;
use crate::error_handler::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct AskConversationMessage {
    pub role: String,
    pub content: String,
}

impl From<AskConversationMessage> for rlm_controller::ConversationMessage {
    fn from(m: AskConversationMessage) -> Self {
        rlm_controller::ConversationMessage {
            role: m.role,
            content: m.content,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AskSide {
    Additions,
    Deletions,
    Unified,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskSelection {
    pub path: String,
    pub side: AskSide,
    pub start_line: u32,
    pub end_line: u32,
}

impl From<AskSelection> for Selection {
    fn from(s: AskSelection) -> Self {
        Selection {
            path: s.path,
            side: match s.side {
                AskSide::Additions => rlm_controller::Side::Additions,
                AskSide::Deletions => rlm_controller::Side::Deletions,
                AskSide::Unified => rlm_controller::Side::Unified,
            },
            start_line: s.start_line,
            end_line: s.end_line,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskRequest {
    pub review_id: String,
    pub question: String,
    #[serde(default)]
    pub conversation: Vec<AskConversationMessage>,
    #[serde(default)]
    pub selection: Option<AskSelection>,
}

/// Streams `{type, data}` frames over SSE: `start`, one `iteration` per RLM
/// iteration, one `block` per terminal answer block, an `error` frame if the
/// session ends badly, and always a final `end` (spec P5).
#[instrument(name = "ask_stream_route", skip(state, body))]
pub async fn ask_stream_route(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AskRequest>,
) -> AppResult<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>> {
    let pr_info = state
        .sessions
        .read()
        .await
        .get(&body.review_id)
        .cloned()
        .ok_or(AppError::NotFound)?;

    let session = ReviewSession::new(body.review_id, pr_info, state.config.rlm_max_iterations);
    let conversation = body.conversation.into_iter().map(Into::into).collect();
    let selection = body.selection.map(Into::into);

    let rx = state.controller.ask(
        session,
        body.question,
        conversation,
        selection,
        CancelToken::new(),
        state.config.rlm_deadline,
    );

    let stream = UnboundedReceiverStream::new(rx).map(|event| {
        let payload = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
        Ok(SseEvent::default().data(payload))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
