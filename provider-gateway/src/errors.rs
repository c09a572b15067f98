//! Error taxonomy for the provider gateway.
//!
//! Mirrors the closed set the public answer schema commits to: `UrlInvalid`,
//! `NotFound`, `Unauthorized`, `RateLimited`, `Transport`. Every variant maps
//! to a stable string via [`GatewayError::code`].

use thiserror::Error;

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid PR/MR url: {0}")]
    UrlInvalid(String),

    #[error("resource not found")]
    NotFound,

    #[error("unauthorized")]
    Unauthorized,

    #[error("rate limited, retry after {retry_after_secs:?}s")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),

    #[error("unsupported provider operation")]
    Unsupported,
}

impl GatewayError {
    /// Stable string surfaced in the public answer schema (§7 error taxonomy).
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::UrlInvalid(_) => "UrlInvalid",
            GatewayError::NotFound => "NotFound",
            GatewayError::Unauthorized => "Unauthorized",
            GatewayError::RateLimited { .. } => "RateLimited",
            GatewayError::Transport(_) => "Transport",
            GatewayError::Serde(_) => "Transport",
            GatewayError::Unsupported => "Transport",
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return GatewayError::Transport("request timed out".into());
        }
        match e.status() {
            Some(status) if status.as_u16() == 401 => GatewayError::Unauthorized,
            // 403 and 429 both mean "back off and retry" per spec §4.1; this
            // branch only ever sees them by way of `.error_for_status()`,
            // which discards the `Retry-After` header, so prefer
            // `check_status` (below) at new call sites.
            Some(status) if status.as_u16() == 403 || status.as_u16() == 429 => GatewayError::RateLimited {
                retry_after_secs: None,
            },
            Some(status) if status.as_u16() == 404 => GatewayError::NotFound,
            Some(status) => GatewayError::Transport(format!("http status {status}")),
            None => GatewayError::Transport(e.to_string()),
        }
    }
}

/// Checks a response's status before consuming its body, mapping non-2xx
/// responses to `GatewayError` the same way `From<reqwest::Error>` does but
/// reading `Retry-After` off the still-available headers first (spec §4.1:
/// "surface `RateLimited` with the retry-after hint" — `.error_for_status()`
/// discards headers, so that hint can never be populated through it).
pub async fn check_status(resp: reqwest::Response) -> GatewayResult<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let retry_after_secs = resp
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    match status.as_u16() {
        401 => Err(GatewayError::Unauthorized),
        403 | 429 => Err(GatewayError::RateLimited { retry_after_secs }),
        404 => Err(GatewayError::NotFound),
        _ => Err(GatewayError::Transport(format!("http status {status}"))),
    }
}
