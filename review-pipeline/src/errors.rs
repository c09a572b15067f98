//! Error taxonomy for the one-shot review pipeline (spec §7, C5 portion).

use thiserror::Error;

pub type ReviewPipelineResult<T> = Result<T, ReviewPipelineError>;

#[derive(Debug, Error)]
pub enum ReviewPipelineError {
    #[error("gateway error: {0}")]
    Gateway(#[from] provider_gateway::GatewayError),

    #[error("controller error: {0}")]
    Controller(#[from] rlm_controller::ControllerError),

    /// The terminal answer contained no block that parsed as the expected
    /// `{issues: [...]}` JSON payload (spec §4.5 step 4).
    #[error("model answer did not contain a parseable review payload")]
    UnparseableAnswer,
}

impl ReviewPipelineError {
    /// Stable string surfaced by `review-api`/`review-cli` (spec §6, §7).
    pub fn code(&self) -> &'static str {
        match self {
            ReviewPipelineError::Gateway(e) => e.code(),
            ReviewPipelineError::Controller(e) => e.code(),
            ReviewPipelineError::UnparseableAnswer => "UnparseableAnswer",
        }
    }
}
