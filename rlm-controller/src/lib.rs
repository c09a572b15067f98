//! RLM Controller (C4): the reasoning/code/execute/observe loop.
//!
//! Ties together `provider-gateway` (C1, through the capability handler),
//! `ai-llm-service` (the model backend), and `sandbox-executor` (C3) into
//! the iteration loop described by spec §4.4.

pub mod capability_handler;
pub mod controller;
pub mod errors;
pub mod llm_client;
pub mod prompt;
pub mod types;

pub use controller::{CancelToken, Controller, DEFAULT_DEADLINE, DEFAULT_ITERATION_BUDGET, HARD_ITERATION_CAP};
pub use errors::{ControllerError, ControllerResult};
pub use llm_client::{IterationOutput, LlmClient};
pub use prompt::ConversationMessage;
pub use types::{AnswerBlock, Event, Iteration, ReviewSession, Selection, SessionStatus, Side};
