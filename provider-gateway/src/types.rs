//! Canonical, provider-neutral data model (spec §3).
//!
//! Every adapter (`providers::github`, `providers::gitlab`) lowers its wire
//! shapes into these types. Nothing downstream of this crate ever sees a
//! provider-specific field name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    GitHub,
    GitHubEnterprise,
    GitLab,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::GitHub => "github",
            ProviderKind::GitHubEnterprise => "github_enterprise",
            ProviderKind::GitLab => "gitlab",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    Pr,
    Issue,
}

/// Output of `parse_url`. Carries enough to address the same ref on any
/// provider, including an enterprise base host when one is configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedRef {
    pub provider: ProviderKind,
    pub host: String,
    pub owner: String,
    pub repo: String,
    pub kind: RefKind,
    pub number: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Added,
    Modified,
    Removed,
    Renamed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PRFile {
    pub path: String,
    pub status: FileStatus,
    pub additions: u32,
    pub deletions: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    pub message: String,
    pub author_name: String,
    pub authored_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Immutable snapshot of a pull/merge request (spec §3 `PRInfo`).
///
/// Created once per session and never mutated; `review_id` is the opaque
/// session key handed back to callers for the `reviewId`-addressed endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PRInfo {
    pub review_id: String,
    pub provider: ProviderKind,
    pub repo: RepoRef,
    pub number: u64,
    pub title: String,
    pub body: String,
    pub base_sha: String,
    pub head_sha: String,
    pub base_ref: String,
    pub head_ref: String,
    pub state: String,
    pub draft: bool,
    pub files: Vec<PRFile>,
    pub commits: Vec<Commit>,
    pub comments: Vec<Comment>,
    pub additions: u32,
    pub deletions: u32,
    /// Full unified diff text, one concatenated stream over all files.
    /// Not part of spec §3's `PRInfo` field list verbatim, but required to
    /// seed the controller's prompt (spec §4.4 step 1); kept alongside
    /// `files` rather than re-fetched per iteration.
    #[serde(skip)]
    pub diff_text: String,
}

impl PRInfo {
    /// Lines added/removed in `path`, used by the citation repair pass (§4.5)
    /// and by sandbox `fetch_file` bounds checks.
    pub fn file(&self, path: &str) -> Option<&PRFile> {
        self.files.iter().find(|f| f.path == path)
    }
}
