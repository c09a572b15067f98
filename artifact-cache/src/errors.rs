use thiserror::Error;

pub type CacheResult<T> = Result<T, CacheError>;

/// `CacheMiss` never crosses the crate boundary (spec §7): a miss simply
/// triggers the caller-supplied fetch. `Upstream` wraps whatever the fetch
/// closure failed with, preserving the caller's own error type as a string.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("upstream fetch failed: {0}")]
    Upstream(String),
}
