//! Error taxonomy for the RLM controller (spec §7, C4 portion).

use thiserror::Error;

pub type ControllerResult<T> = Result<T, ControllerError>;

#[derive(Debug, Error)]
pub enum ControllerError {
    /// Model output could not be parsed as `{reasoning, code}` after one retry.
    #[error("failed to parse model output as {{reasoning, code}}")]
    Parse,

    /// Iteration budget was exceeded without the controller being able to
    /// recover via forced synthesis.
    #[error("iteration budget exceeded")]
    BudgetExceeded,

    /// The caller cancelled the session at a suspension point.
    #[error("session cancelled")]
    Cancelled,

    /// The session-wide deadline elapsed.
    #[error("session deadline exceeded")]
    Deadline,

    #[error("llm error: {0}")]
    Llm(#[from] ai_llm_service::AiLlmError),

    #[error("sandbox error: {0}")]
    Sandbox(#[from] sandbox_executor::SandboxError),

    #[error("gateway error: {0}")]
    Gateway(#[from] provider_gateway::GatewayError),
}

impl ControllerError {
    /// Stable string surfaced on SSE `error` frames (spec §6, §7).
    pub fn code(&self) -> &'static str {
        match self {
            ControllerError::Parse => "ParseError",
            ControllerError::BudgetExceeded => "BudgetExceeded",
            ControllerError::Cancelled => "Cancelled",
            ControllerError::Deadline => "Deadline",
            ControllerError::Llm(_) => "Transport",
            ControllerError::Sandbox(_) => "SandboxExecError",
            ControllerError::Gateway(_) => "Transport",
        }
    }
}
