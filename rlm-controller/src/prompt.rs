//! Prompt assembly (spec §4.4 step 1).

use crate::types::{Iteration, Selection, Side};
use provider_gateway::PRInfo;

/// One turn of a prior conversation, supplied by the caller of `ask`.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ConversationMessage {
    pub role: String,
    pub content: String,
}

const SYSTEM_PROMPT: &str = r#"You are a code-review assistant with access to a sandboxed Python interpreter.
The sandbox exposes four functions as globals; call them directly, do not import anything to get them:

- fetch_file(path: str, sha: str | None = None) -> str
- search(query: str, sha: str | None = None) -> list[{"path": str, "line": int, "snippet": str}]
- llm_query(prompt: str, system: str | None = None) -> str   (single-shot, no tool access)
- answer(blocks: list[{"type": "markdown" | "code", "content": str, "language": str | None}]) -> NoReturn

`answer(...)` ends the session: call it only once you are ready to give your final response.
Respond with exactly one JSON object and nothing else: {"reasoning": "<your reasoning>", "code": "<python to run this iteration>"}."#;

/// Truncates a unified diff so a single file never dominates the prompt.
const MAX_DIFF_BYTES_PER_FILE: usize = 4000;

fn truncate_diff(diff: &str) -> String {
    let mut out = String::new();
    let mut current_file_bytes = 0usize;
    for line in diff.lines() {
        if line.starts_with("diff --git ") || line.starts_with("--- ") {
            current_file_bytes = 0;
        }
        if current_file_bytes >= MAX_DIFF_BYTES_PER_FILE {
            if current_file_bytes == MAX_DIFF_BYTES_PER_FILE {
                out.push_str("... [diff truncated for this file]\n");
                current_file_bytes += 1;
            }
            continue;
        }
        out.push_str(line);
        out.push('\n');
        current_file_bytes += line.len() + 1;
    }
    out
}

fn render_selection(selection: &Selection) -> String {
    let side = match selection.side {
        Side::Additions => "additions",
        Side::Deletions => "deletions",
        Side::Unified => "unified",
    };
    format!(
        "Selected range: {} [{side}] lines {}-{}",
        selection.path, selection.start_line, selection.end_line
    )
}

fn render_transcript(transcript: &[Iteration]) -> String {
    let mut out = String::new();
    for it in transcript {
        out.push_str(&format!("[iter {}: reasoning]\n{}\n", it.index, it.reasoning));
        out.push_str(&format!("[iter {}: code]\n{}\n", it.index, it.code));
        if let Some(output) = &it.output {
            out.push_str(&format!("[iter {}: output]\n{}\n", it.index, output));
        }
        if let Some(err) = &it.error {
            out.push_str(&format!("[iter {}: error]\n{}\n", it.index, err));
        }
    }
    out
}

/// Assembles the full prompt for one iteration (spec §4.4 step 1, parts i-v).
pub fn assemble_iteration_prompt(
    pr: &PRInfo,
    conversation: &[ConversationMessage],
    transcript: &[Iteration],
    question: &str,
    selection: Option<&Selection>,
) -> String {
    let mut out = String::new();
    out.push_str(SYSTEM_PROMPT);
    out.push_str("\n\n");

    out.push_str(&format!(
        "## Pull request\n{} #{} — {}\n{}\nbase {} -> head {}\nfiles changed: {} (+{} -{})\n\n",
        pr.repo.owner,
        pr.number,
        pr.title,
        pr.body,
        pr.base_sha,
        pr.head_sha,
        pr.files.len(),
        pr.additions,
        pr.deletions,
    ));
    out.push_str("## Diff\n");
    out.push_str(&truncate_diff(&pr.diff_text));
    out.push('\n');

    if !conversation.is_empty() {
        out.push_str("## Prior conversation\n");
        for msg in conversation {
            out.push_str(&format!("{}: {}\n", msg.role, msg.content));
        }
        out.push('\n');
    }

    if !transcript.is_empty() {
        out.push_str("## Prior iterations\n");
        out.push_str(&render_transcript(transcript));
        out.push('\n');
    }

    out.push_str("## Question\n");
    out.push_str(question);
    out.push('\n');

    if let Some(sel) = selection {
        out.push_str(&render_selection(sel));
        out.push('\n');
    }

    out
}

/// Stricter re-prompt appended after a parse failure (spec §4.4 step 2).
pub fn strict_retry_suffix() -> &'static str {
    "\n\nYour previous response was not valid JSON of the exact shape \
     {\"reasoning\": string, \"code\": string}. Respond again with ONLY that JSON object, \
     no markdown fences, no prose before or after it."
}

/// Forced-synthesis prompt when the iteration budget is exhausted (spec §4.4 step 4b).
pub fn forced_synthesis_prompt(
    pr: &PRInfo,
    conversation: &[ConversationMessage],
    transcript: &[Iteration],
    question: &str,
) -> String {
    let mut out = assemble_iteration_prompt(pr, conversation, transcript, question, None);
    out.push_str(
        "\n\nYou have exhausted your iteration budget. You must answer now: respond with \
         {\"reasoning\": string, \"code\": string} where `code` calls answer(...) with your \
         best current understanding, explicitly noting that the investigation was truncated.",
    );
    out
}
