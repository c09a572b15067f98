//! Citation validation and the single repair pass (spec §3 `DiffCitation`,
//! §4.5 step 3, §9 "Citation unified ambiguity").

use provider_gateway::diff::{max_new_line, max_old_line, parse_unified_diff};
use provider_gateway::PRInfo;

use crate::types::{Category, CitationSide, DiffCitation, RawCitation, RawReviewIssue, ReviewIssue, Severity};

const MAX_EXPLANATION_BYTES: usize = 2048;

/// Finds the per-file patch segment within the PR's concatenated unified
/// diff (spec §9 "Cross-provider PR schema": `PRInfo.diff_text` is the only
/// thing `review-pipeline` consumes, never provider wire shapes). Looks for
/// the `b/{path}` side of a `diff --git` header rather than reconstructing
/// both sides, since renames mean the `a/` side may differ from `path`.
fn file_diff_segment<'a>(diff_text: &'a str, path: &str) -> Option<&'a str> {
    let needle = format!(" b/{path}\n");
    let header_at = diff_text.find(&needle)?;
    let body_start = diff_text[header_at..].find('\n').map(|i| header_at + i + 1)?;
    let rest = &diff_text[body_start..];
    let end = rest.find("\ndiff --git ").map(|i| i + 1).unwrap_or(rest.len());
    Some(&rest[..end])
}

fn parse_severity(raw: Option<&str>) -> Severity {
    match raw.map(str::to_ascii_lowercase).as_deref() {
        Some("low") => Severity::Low,
        Some("medium") => Severity::Medium,
        Some("high") => Severity::High,
        Some("critical") => Severity::Critical,
        _ => Severity::Low,
    }
}

/// Spec §9: "the source uses investigation vs informational ... interchangeably
/// in places; the spec fixes the closed sets ... and treats other strings as
/// informational on ingest."
fn parse_category(raw: Option<&str>) -> Category {
    match raw.map(str::to_ascii_lowercase).as_deref() {
        Some("bug") => Category::Bug,
        Some("investigation") => Category::Investigation,
        _ => Category::Informational,
    }
}

fn parse_side(raw: Option<&str>) -> CitationSide {
    match raw.map(str::to_ascii_lowercase).as_deref() {
        Some("additions") => CitationSide::Additions,
        Some("deletions") => CitationSide::Deletions,
        _ => CitationSide::Unified,
    }
}

fn truncate_explanation(s: String) -> String {
    if s.len() <= MAX_EXPLANATION_BYTES {
        return s;
    }
    let mut end = MAX_EXPLANATION_BYTES;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

/// Repairs or drops one citation against `pr` (spec §4.5 step 3, B3).
///
/// - `side == unified` is inferred from line ranges: `additions` if
///   `start_line <= max_new_line`, else `deletions` if `start_line <=
///   max_old_line`, else the citation is dropped.
/// - `start_line`/`end_line` are normalized so `start_line <= end_line`.
/// - The citation is dropped outright if `path` is not part of the PR, or if
///   after repair the line range still doesn't exist on the indicated side.
fn repair_citation(pr: &PRInfo, mut c: RawCitation) -> Option<DiffCitation> {
    pr.file(&c.path)?;

    if c.start_line > c.end_line {
        std::mem::swap(&mut c.start_line, &mut c.end_line);
    }

    let segment = file_diff_segment(&pr.diff_text, &c.path).unwrap_or_default();
    let hunks = parse_unified_diff(segment);
    let new_max = max_new_line(&hunks);
    let old_max = max_old_line(&hunks);

    let side = parse_side(c.side.as_deref());
    let resolved_side = match side {
        CitationSide::Additions | CitationSide::Deletions => side,
        CitationSide::Unified => {
            if c.start_line <= new_max {
                CitationSide::Additions
            } else if c.start_line <= old_max {
                CitationSide::Deletions
            } else {
                return None;
            }
        }
    };

    let bound = match resolved_side {
        CitationSide::Additions => new_max,
        CitationSide::Deletions => old_max,
        CitationSide::Unified => unreachable!("resolved above"),
    };
    if bound == 0 || c.start_line > bound {
        return None;
    }

    Some(DiffCitation {
        path: c.path,
        side: resolved_side,
        start_line: c.start_line,
        end_line: c.end_line.min(bound),
        label: c.label,
        reason: c.reason,
    })
}

/// Validates one raw issue, repairing its citations (spec §4.5 step 3).
/// Returns `None` if no citation survives repair — every `ReviewIssue` the
/// pipeline returns has at least one valid citation (spec §3 invariant,
/// testable property P2).
fn validate_issue(pr: &PRInfo, raw: RawReviewIssue) -> Option<ReviewIssue> {
    let citations: Vec<DiffCitation> = raw
        .citations
        .into_iter()
        .filter_map(|c| repair_citation(pr, c))
        .collect();
    if citations.is_empty() {
        return None;
    }

    Some(ReviewIssue {
        title: raw.title,
        severity: parse_severity(raw.severity.as_deref()),
        category: parse_category(raw.category.as_deref()),
        explanation_markdown: truncate_explanation(raw.explanation_markdown),
        citations,
        fix_suggestions: raw.fix_suggestions,
        tests_to_add: raw.tests_to_add,
    })
}

/// Validates every issue in a raw payload, returning the survivors plus the
/// count dropped (spec §4.5 step 4: "partial success ... is not an error").
pub fn validate_issues(pr: &PRInfo, raw_issues: Vec<RawReviewIssue>) -> (Vec<ReviewIssue>, usize) {
    let total = raw_issues.len();
    let issues: Vec<ReviewIssue> = raw_issues.into_iter().filter_map(|r| validate_issue(pr, r)).collect();
    let dropped = total - issues.len();
    (issues, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use provider_gateway::{Comment, Commit, FileStatus, PRFile, ProviderKind, RepoRef};

    fn sample_pr() -> PRInfo {
        PRInfo {
            review_id: "r1".into(),
            provider: ProviderKind::GitHub,
            repo: RepoRef {
                owner: "octocat".into(),
                name: "Hello-World".into(),
            },
            number: 1,
            title: "t".into(),
            body: "b".into(),
            base_sha: "base".into(),
            head_sha: "head".into(),
            base_ref: "main".into(),
            head_ref: "feature".into(),
            state: "open".into(),
            draft: false,
            files: vec![PRFile {
                path: "src/lib.rs".into(),
                status: FileStatus::Modified,
                additions: 3,
                deletions: 1,
            }],
            commits: Vec::<Commit>::new(),
            comments: Vec::<Comment>::new(),
            additions: 3,
            deletions: 1,
            diff_text: "diff --git a/src/lib.rs b/src/lib.rs\n@@ -1,2 +1,3 @@\n-old\n+new one\n+new two\n"
                .to_string(),
        }
    }

    fn raw_issue(citations: Vec<RawCitation>) -> RawReviewIssue {
        RawReviewIssue {
            title: "issue".into(),
            severity: Some("High".into()),
            category: Some("bug".into()),
            explanation_markdown: "because".into(),
            citations,
            fix_suggestions: None,
            tests_to_add: None,
        }
    }

    #[test]
    fn drops_citation_for_unknown_path() {
        let pr = sample_pr();
        let raw = raw_issue(vec![RawCitation {
            path: "does/not/exist.rs".into(),
            side: Some("additions".into()),
            start_line: 1,
            end_line: 1,
            label: None,
            reason: None,
        }]);
        let (issues, dropped) = validate_issues(&pr, vec![raw]);
        assert!(issues.is_empty());
        assert_eq!(dropped, 1);
    }

    #[test]
    fn unified_side_resolves_to_additions_within_new_line_count() {
        let pr = sample_pr();
        let raw = raw_issue(vec![RawCitation {
            path: "src/lib.rs".into(),
            side: Some("unified".into()),
            start_line: 2,
            end_line: 2,
            label: None,
            reason: None,
        }]);
        let (issues, dropped) = validate_issues(&pr, vec![raw]);
        assert_eq!(dropped, 0);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].citations[0].side, CitationSide::Additions);
    }

    #[test]
    fn unified_side_beyond_both_bounds_is_dropped() {
        let pr = sample_pr();
        let raw = raw_issue(vec![RawCitation {
            path: "src/lib.rs".into(),
            side: Some("unified".into()),
            start_line: 999,
            end_line: 999,
            label: None,
            reason: None,
        }]);
        let (issues, dropped) = validate_issues(&pr, vec![raw]);
        assert!(issues.is_empty());
        assert_eq!(dropped, 1);
    }

    #[test]
    fn normalizes_inverted_line_range() {
        let pr = sample_pr();
        let raw = raw_issue(vec![RawCitation {
            path: "src/lib.rs".into(),
            side: Some("additions".into()),
            start_line: 3,
            end_line: 2,
            label: None,
            reason: None,
        }]);
        let (issues, _) = validate_issues(&pr, vec![raw]);
        assert_eq!(issues[0].citations[0].start_line, 2);
        assert_eq!(issues[0].citations[0].end_line, 3);
    }

    #[test]
    fn unknown_category_string_falls_back_to_informational() {
        assert_eq!(parse_category(Some("weird")), Category::Informational);
        assert_eq!(parse_category(None), Category::Informational);
    }
}
