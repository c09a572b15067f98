use thiserror::Error;

pub type SandboxResult<T> = Result<T, SandboxError>;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("failed to spawn guest process: {0}")]
    Spawn(String),

    #[error("guest protocol violation: {0}")]
    Protocol(String),

    #[error("sandbox execution timed out")]
    Timeout,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
