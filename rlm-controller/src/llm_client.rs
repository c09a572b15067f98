//! Thin wrapper over `ai_llm_service::LlmServiceProfiles` that turns a free-form
//! model response into the `{reasoning, code}` tagged shape (spec §4.4 step 2,
//! §9 "Dynamic message shapes").

use std::sync::Arc;

use ai_llm_service::LlmServiceProfiles;
use serde::Deserialize;

use crate::errors::{ControllerError, ControllerResult};
use crate::prompt::strict_retry_suffix;

#[derive(Debug, Clone, Deserialize)]
pub struct IterationOutput {
    pub reasoning: String,
    pub code: String,
}

pub struct LlmClient {
    profiles: Arc<LlmServiceProfiles>,
}

impl LlmClient {
    pub fn new(profiles: Arc<LlmServiceProfiles>) -> Self {
        Self { profiles }
    }

    /// Main per-iteration call (uses the `slow`/quality profile). Retries once
    /// with a stricter instruction on parse failure; a second failure maps to
    /// [`ControllerError::Parse`].
    pub async fn complete_iteration(&self, prompt: &str) -> ControllerResult<IterationOutput> {
        let raw = self.profiles.generate_slow(prompt, None).await?;
        if let Some(parsed) = parse_iteration_output(&raw) {
            return Ok(parsed);
        }

        let retry_prompt = format!("{prompt}{}", strict_retry_suffix());
        let raw_retry = self.profiles.generate_slow(&retry_prompt, None).await?;
        parse_iteration_output(&raw_retry).ok_or(ControllerError::Parse)
    }

    /// Single-shot nested `llm_query` call (uses the `fast` profile, no tool
    /// access, no parsing — the guest gets the raw text back).
    pub async fn single_shot(&self, prompt: &str, system: Option<&str>) -> ControllerResult<String> {
        Ok(self.profiles.generate_fast(prompt, system).await?)
    }
}

/// Extracts `{reasoning, code}` from a model response that may wrap the JSON
/// in markdown fences or surrounding prose.
fn parse_iteration_output(raw: &str) -> Option<IterationOutput> {
    if let Ok(out) = serde_json::from_str::<IterationOutput>(raw.trim()) {
        return Some(out);
    }

    let candidate = extract_json_object(raw)?;
    serde_json::from_str::<IterationOutput>(&candidate).ok()
}

/// Finds the first balanced `{...}` span in `text`, tolerant of content inside
/// string literals (so `"code": "{not json}"` doesn't break brace counting).
fn extract_json_object(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    let start = text.find('{')?;
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        let c = b as char;
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(text[start..=i].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_json() {
        let out = parse_iteration_output(r#"{"reasoning": "check readme", "code": "answer([])"}"#);
        assert!(out.is_some());
    }

    #[test]
    fn parses_json_wrapped_in_fences_and_prose() {
        let raw = "Sure, here you go:\n```json\n{\"reasoning\": \"r\", \"code\": \"pass\"}\n```\nDone.";
        let out = parse_iteration_output(raw).unwrap();
        assert_eq!(out.reasoning, "r");
        assert_eq!(out.code, "pass");
    }

    #[test]
    fn rejects_non_json_garbage() {
        assert!(parse_iteration_output("not json at all").is_none());
    }
}
