//! `DiffCitation` / `ReviewIssue` / `ReviewReport` (spec §3, §4.5).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Bug,
    Investigation,
    Informational,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CitationSide {
    Additions,
    Deletions,
    Unified,
}

/// A diff-anchored pointer (spec §3 `DiffCitation`). `start_line`/`end_line`
/// are 1-based and inclusive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffCitation {
    pub path: String,
    pub side: CitationSide,
    pub start_line: u32,
    pub end_line: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewIssue {
    pub title: String,
    pub severity: Severity,
    pub category: Category,
    pub explanation_markdown: String,
    pub citations: Vec<DiffCitation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix_suggestions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tests_to_add: Option<Vec<String>>,
}

/// Final output of `review(pr_url)` (spec §4.5). `dropped_count` is metadata
/// attached to a partial success, not an error (§4.5 step 4).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReviewReport {
    pub issues: Vec<ReviewIssue>,
    pub dropped_count: usize,
}

/// Loose, pre-validation shape the model's JSON is first deserialized into.
/// Fields that don't match the closed sets in spec §3 are not rejected here;
/// `crate::validate` maps unknown strings onto the closed sets (spec §9:
/// "the spec fixes the closed sets ... and treats other strings as
/// `informational` on ingest").
#[derive(Debug, Clone, Deserialize)]
pub struct RawReviewIssue {
    pub title: String,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub explanation_markdown: String,
    #[serde(default)]
    pub citations: Vec<RawCitation>,
    #[serde(default)]
    pub fix_suggestions: Option<Vec<String>>,
    #[serde(default)]
    pub tests_to_add: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCitation {
    pub path: String,
    #[serde(default)]
    pub side: Option<String>,
    pub start_line: u32,
    pub end_line: u32,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawReviewPayload {
    #[serde(default)]
    pub issues: Vec<RawReviewIssue>,
}
