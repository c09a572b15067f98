//! Review Pipeline (C5): one-shot orchestration that runs the RLM controller
//! with the canonical review prompt and turns its terminal answer into a
//! validated `ReviewReport` (spec §4.5).

pub mod errors;
pub mod prompt;
pub mod types;
pub mod validate;

pub use errors::{ReviewPipelineError, ReviewPipelineResult};
pub use types::{Category, CitationSide, DiffCitation, ReviewIssue, ReviewReport, Severity};

use std::sync::Arc;
use std::time::Duration;

use provider_gateway::{Gateway, PRInfo};
use rlm_controller::{Controller, ReviewSession};

use crate::types::RawReviewPayload;

/// Default iteration budget for a one-shot review session, distinct from an
/// interactive `ask` session's (spec §4.5 step 1 notes the pipeline may use
/// a larger budget since there is no caller waiting on each iteration).
pub const REVIEW_ITERATION_BUDGET: u32 = 15;

/// Runs the canonical review over `pr_url` end to end: resolve the PR,
/// drive the RLM controller to completion with the fixed review prompt, and
/// validate/repair the resulting issue citations.
///
/// Returns the resolved `PRInfo` alongside the report so callers don't need
/// a second gateway round trip to render file paths, title, etc.
pub async fn review(
    gateway: Arc<Gateway>,
    controller: Arc<Controller>,
    review_id: String,
    pr_url: &str,
    deadline: Duration,
) -> ReviewPipelineResult<(PRInfo, ReviewReport)> {
    let parsed = gateway.parse_url(pr_url)?;
    let pr_info = gateway.load_pr(review_id.clone(), &parsed).await?;
    let report = review_pr(controller, review_id, pr_info.clone(), deadline).await?;
    Ok((pr_info, report))
}

/// Same as `review`, but for a `PRInfo` the caller already resolved (used by
/// `review-api`'s `/api/diff/review`, which loads the PR once via
/// `/api/github/load_pr` and reuses it for every later call on that session).
pub async fn review_pr(
    controller: Arc<Controller>,
    review_id: String,
    pr_info: PRInfo,
    deadline: Duration,
) -> ReviewPipelineResult<ReviewReport> {
    let session = ReviewSession::new(review_id, pr_info.clone(), REVIEW_ITERATION_BUDGET);
    let (_, result) = controller
        .ask_to_completion(session, prompt::canonical_review_prompt(), deadline)
        .await;
    let blocks = result?;

    let payload = extract_payload(&blocks).ok_or(ReviewPipelineError::UnparseableAnswer)?;
    let (issues, dropped_count) = validate::validate_issues(&pr_info, payload.issues);

    Ok(ReviewReport { issues, dropped_count })
}

/// Finds the first answer block that parses as `{issues: [...]}`. The
/// canonical prompt asks for exactly one `code`/`json` block, but models
/// occasionally wrap it in extra prose blocks, so every block is tried.
fn extract_payload(blocks: &[rlm_controller::AnswerBlock]) -> Option<RawReviewPayload> {
    blocks.iter().find_map(|b| serde_json::from_str::<RawReviewPayload>(&b.content).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rlm_controller::AnswerBlock;

    #[test]
    fn extract_payload_finds_first_parseable_block() {
        let blocks = vec![
            AnswerBlock {
                block_type: "markdown".to_string(),
                content: "not json".to_string(),
                language: None,
            },
            AnswerBlock {
                block_type: "code".to_string(),
                content: r#"{"issues": []}"#.to_string(),
                language: Some("json".to_string()),
            },
        ];
        let payload = extract_payload(&blocks).expect("payload found");
        assert!(payload.issues.is_empty());
    }

    #[test]
    fn extract_payload_none_when_no_block_parses() {
        let blocks = vec![AnswerBlock {
            block_type: "markdown".to_string(),
            content: "no issues here".to_string(),
            language: None,
        }];
        assert!(extract_payload(&blocks).is_none());
    }
}
