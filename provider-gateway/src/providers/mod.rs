//! Enum-dispatched provider clients (no `dyn Trait`, no `async-trait`),
//! following the teacher's `ProviderClient` pattern.

pub mod github;
pub mod gitlab;

use crate::errors::GatewayResult;
use crate::types::{PRInfo, ProviderKind};
use reqwest::Client;

/// Static configuration for reaching a provider: base API URL + bearer token.
/// One `ProviderConfig` per configured provider (GitHub, GitHub Enterprise,
/// GitLab); `review-api`'s `AppConfig` builds these from environment
/// variables listed in spec §6.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub base_api: String,
    pub token: Option<String>,
}

/// A single file entry as seen when walking a repository tree at a commit.
#[derive(Debug, Clone)]
pub struct TreeEntry {
    pub path: String,
    pub is_dir: bool,
}

#[derive(Debug, Clone)]
pub enum ProviderClient {
    GitHub(github::GitHubClient),
    GitLab(gitlab::GitLabClient),
}

impl ProviderClient {
    pub fn from_config(http: Client, cfg: &ProviderConfig) -> Self {
        match cfg.kind {
            ProviderKind::GitHub | ProviderKind::GitHubEnterprise => ProviderClient::GitHub(
                github::GitHubClient::new(http, cfg.base_api.clone(), cfg.token.clone()),
            ),
            ProviderKind::GitLab => ProviderClient::GitLab(gitlab::GitLabClient::new(
                http,
                cfg.base_api.clone(),
                cfg.token.clone(),
            )),
        }
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            ProviderClient::GitHub(c) => c.kind,
            ProviderClient::GitLab(_) => ProviderKind::GitLab,
        }
    }

    /// Loads a full `PRInfo` in one logical transaction (meta + files + commits + comments).
    pub async fn load_pr(
        &self,
        review_id: String,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> GatewayResult<PRInfo> {
        match self {
            ProviderClient::GitHub(c) => c.load_pr(review_id, owner, repo, number).await,
            ProviderClient::GitLab(c) => c.load_pr(review_id, owner, repo, number).await,
        }
    }

    pub async fn fetch_file_raw(&self, owner: &str, repo: &str, path: &str, sha: &str) -> GatewayResult<Vec<u8>> {
        match self {
            ProviderClient::GitHub(c) => c.fetch_file_raw(owner, repo, path, sha).await,
            ProviderClient::GitLab(c) => c.fetch_file_raw(owner, repo, path, sha).await,
        }
    }

    pub async fn list_tree(&self, owner: &str, repo: &str, sha: &str) -> GatewayResult<Vec<TreeEntry>> {
        match self {
            ProviderClient::GitHub(c) => c.list_tree(owner, repo, sha).await,
            ProviderClient::GitLab(c) => c.list_tree(owner, repo, sha).await,
        }
    }
}

