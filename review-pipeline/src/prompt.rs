//! Canonical review instructions (spec §4.5 step 2).

/// Appended to the RLM controller's own system prompt as the `question` for
/// the one-shot review entry point. Mandates a single fenced `json` code
/// block whose payload is `{issues: [...]}`, with the closed enum sets and
/// per-issue requirements spelled out so parsing in `validate.rs` can stay
/// strict.
pub fn canonical_review_prompt() -> String {
    r#"Perform a thorough code review of this pull request.

Investigate the diff using fetch_file and search as needed to understand the
context around each change before judging it. When you are done, call
answer(...) with exactly one block: {"type": "code", "language": "json", "content": "<JSON>"}
where <JSON> is a single JSON object of the exact shape:

{"issues": [
  {
    "title": "short summary",
    "severity": "low" | "medium" | "high" | "critical",
    "category": "bug" | "investigation" | "informational",
    "explanation_markdown": "markdown explanation, at most 2048 bytes",
    "citations": [
      {"path": "relative/file/path", "side": "additions" | "deletions" | "unified",
       "start_line": 1, "end_line": 1, "label": "optional", "reason": "optional"}
    ],
    "fix_suggestions": ["optional strings"],
    "tests_to_add": ["optional strings"]
  }
]}

Rules:
- Every issue MUST have at least one citation pointing at a file that is actually
  part of this pull request's diff.
- `severity` and `category` must be one of the listed values.
- If you find no issues worth raising, answer with {"issues": []}.
- Do not include any text outside the single JSON code block inside the answer call."#
        .to_string()
}
