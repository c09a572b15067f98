//! The capability interceptor contract. `sandbox-executor` owns process
//! management and the wire protocol; `rlm-controller` implements this trait
//! to route `fetch_file`/`search`/`llm_query` into the provider gateway and a
//! single-shot LLM call, keeping C3 itself free of any knowledge of C1/C4.

use futures::future::BoxFuture;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct SearchHitWire {
    pub path: String,
    pub line: u32,
    pub snippet: String,
}

/// A capability error raised into the guest as a same-named exception
/// (spec §4.3 failure semantics).
#[derive(Debug, Clone)]
pub struct CapabilityError {
    /// Exception name surfaced to guest code, e.g. `"NotFound"`.
    pub kind: String,
    pub message: String,
}

impl CapabilityError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: "NotFound".into(),
            message: message.into(),
        }
    }

    pub fn budget_exceeded(message: impl Into<String>) -> Self {
        Self {
            kind: "BudgetExceeded".into(),
            message: message.into(),
        }
    }

    pub fn denied(message: impl Into<String>) -> Self {
        Self {
            kind: "CapabilityDenied".into(),
            message: message.into(),
        }
    }
}

pub trait CapabilityHandler: Send + Sync {
    fn fetch_file(&self, path: String, sha: Option<String>) -> BoxFuture<'_, Result<String, CapabilityError>>;

    fn search(&self, query: String, sha: Option<String>) -> BoxFuture<'_, Result<Vec<SearchHitWire>, CapabilityError>>;

    /// Single-shot LLM call with no capability access of its own (spec §9:
    /// "the controller depth is statically 1"). Call-count quota enforcement
    /// against `ResourceLimits::max_llm_calls` happens in `executor.rs`, not here.
    fn llm_query(&self, prompt: String, system: Option<String>) -> BoxFuture<'_, Result<String, CapabilityError>>;
}

pub(crate) fn value_as_search_hits(v: Vec<SearchHitWire>) -> Value {
    serde_json::json!(
        v.into_iter()
            .map(|h| serde_json::json!({"path": h.path, "line": h.line, "snippet": h.snippet}))
            .collect::<Vec<_>>()
    )
}
