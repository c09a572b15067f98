//! Session/iteration/event data model (spec §3, §4.4).

use provider_gateway::PRInfo;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Running,
    Answered,
    Failed,
    Aborted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Additions,
    Deletions,
    Unified,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Selection {
    pub path: String,
    pub side: Side,
    pub start_line: u32,
    pub end_line: u32,
}

/// One `{reasoning, code, observation}` triple in a session transcript
/// (spec §3 `Iteration`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Iteration {
    pub index: u32,
    pub max: u32,
    pub reasoning: String,
    pub code: String,
    pub output: Option<String>,
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// One `(pr_url, question)` session (spec §3 `ReviewSession`).
///
/// The transcript is append-only and strictly increasing in `index`
/// (invariant 1); owned by a single logical caller, so no internal locking.
pub struct ReviewSession {
    pub review_id: String,
    pub pr_info: PRInfo,
    pub transcript: Vec<Iteration>,
    pub iteration_budget: u32,
    pub status: SessionStatus,
}

impl ReviewSession {
    pub fn new(review_id: String, pr_info: PRInfo, iteration_budget: u32) -> Self {
        Self {
            review_id,
            pr_info,
            transcript: Vec::new(),
            iteration_budget,
            status: SessionStatus::Running,
        }
    }

    pub fn push_iteration(&mut self, iteration: Iteration) {
        debug_assert_eq!(iteration.index as usize, self.transcript.len() + 1);
        self.transcript.push(iteration);
    }
}

/// One SSE frame as specified in §6: `{type, data}`. `data` is `null` for
/// `start`/`end`.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: &'static str,
    pub data: serde_json::Value,
}

impl Event {
    pub fn start() -> Self {
        Self {
            event_type: "start",
            data: serde_json::Value::Null,
        }
    }

    pub fn iteration(data: &Iteration) -> Self {
        Self {
            event_type: "iteration",
            data: serde_json::to_value(data).unwrap_or(serde_json::Value::Null),
        }
    }

    pub fn block(data: &AnswerBlock) -> Self {
        Self {
            event_type: "block",
            data: serde_json::to_value(data).unwrap_or(serde_json::Value::Null),
        }
    }

    pub fn error(code: &str, message: &str) -> Self {
        Self {
            event_type: "error",
            data: serde_json::json!({ "error": code, "message": message }),
        }
    }

    pub fn end() -> Self {
        Self {
            event_type: "end",
            data: serde_json::Value::Null,
        }
    }
}
