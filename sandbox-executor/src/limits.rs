//! Per-execution resource limits (spec §4.3).

#[derive(Debug, Clone, Copy)]
pub struct ResourceLimits {
    /// Wall-clock budget for one `execute` call. Default 30s (configurable
    /// via `SANDBOX_TIMEOUT_SEC`).
    pub wall_clock: std::time::Duration,
    /// Captured stdout is truncated at this many bytes, with a trailing
    /// `…[truncated]` marker (spec B2).
    pub stdout_cap_bytes: usize,
    /// Maximum `llm_query` calls allowed within one iteration.
    pub max_llm_calls: u32,
    /// Best-effort address-space cap for the guest process (unix only).
    pub max_memory_bytes: Option<u64>,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            wall_clock: std::time::Duration::from_secs(30),
            stdout_cap_bytes: 32 * 1024,
            max_llm_calls: 4,
            max_memory_bytes: Some(512 * 1024 * 1024),
        }
    }
}

pub const TRUNCATION_MARKER: &str = "…[truncated]";

/// Truncates `s` to at most `cap` bytes (on a char boundary), appending the
/// spec-mandated marker when truncation occurred (B2).
pub fn truncate_stdout(s: &str, cap: usize) -> (String, bool) {
    if s.len() <= cap {
        return (s.to_string(), false);
    }
    let mut end = cap;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = s[..end].to_string();
    out.push_str(TRUNCATION_MARKER);
    (out, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_with_marker() {
        let long = "a".repeat(100);
        let (out, truncated) = truncate_stdout(&long, 10);
        assert!(truncated);
        assert!(out.ends_with(TRUNCATION_MARKER));
        assert_eq!(&out[..10], &"a".repeat(10));
    }

    #[test]
    fn leaves_short_output_untouched() {
        let (out, truncated) = truncate_stdout("hi", 10);
        assert!(!truncated);
        assert_eq!(out, "hi");
    }
}
