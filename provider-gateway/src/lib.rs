//! Provider Gateway (C1): normalizes PR/MR metadata and artifacts across
//! GitHub, GitHub Enterprise and GitLab behind one API, with a shared
//! content-addressed cache and jittered-backoff retries.

pub mod backoff;
pub mod diff;
pub mod errors;
pub mod providers;
pub mod search;
pub mod types;
pub mod url;

pub use errors::{GatewayError, GatewayResult};
pub use providers::{ProviderClient, ProviderConfig};
pub use search::SearchHit;
pub use types::{ParsedRef, PRInfo, ProviderKind, RefKind};

use artifact_cache::{ArtifactCache, CacheError};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Files larger than this are rejected rather than fetched whole (spec §4.1:
/// "Binary files are rejected above a size cap").
pub const FETCH_FILE_MAX_BYTES: usize = 1_000_000;

pub struct Gateway {
    clients: HashMap<ProviderKind, ProviderClient>,
    enterprise_hosts: Vec<String>,
    cache: Arc<ArtifactCache>,
}

impl Gateway {
    pub fn new(
        configs: Vec<ProviderConfig>,
        enterprise_hosts: Vec<String>,
        cache: Arc<ArtifactCache>,
    ) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .gzip(true)
            .build()
            .unwrap_or_default();

        let clients = configs
            .into_iter()
            .map(|cfg| (cfg.kind, ProviderClient::from_config(http.clone(), &cfg)))
            .collect();

        Self {
            clients,
            enterprise_hosts,
            cache,
        }
    }

    pub fn parse_url(&self, u: &str) -> GatewayResult<ParsedRef> {
        url::parse_url(u, &self.enterprise_hosts)
    }

    fn client_for(&self, kind: ProviderKind) -> GatewayResult<&ProviderClient> {
        self.clients
            .get(&kind)
            .ok_or(GatewayError::Unsupported)
    }

    /// Loads a `PRInfo` in one logical transaction. Retried with full-jitter
    /// backoff on rate limiting or transient transport errors (spec §4.1).
    pub async fn load_pr(&self, review_id: String, r: &ParsedRef) -> GatewayResult<PRInfo> {
        let client = self.client_for(r.provider)?;
        backoff::retry_with_backoff(|| {
            client.load_pr(review_id.clone(), &r.owner, &r.repo, r.number)
        })
        .await
    }

    /// Fetches a text file at `sha` (defaulting to `pr.head_sha`), tagging the
    /// result with a stable `cacheKey`. Returns `(contents, cache_key)`.
    pub async fn fetch_file(
        &self,
        pr: &PRInfo,
        path: &str,
        sha: Option<&str>,
    ) -> GatewayResult<(String, String)> {
        let sha = sha.unwrap_or(&pr.head_sha);
        let cache_key = ArtifactCache::cache_key(pr.provider.as_str(), sha, path);

        let client = self.client_for(pr.provider)?;
        let owner = pr.repo.owner.clone();
        let repo = pr.repo.name.clone();
        let path_owned = path.to_string();
        let sha_owned = sha.to_string();

        let entry = self
            .cache
            .get_or_fetch(cache_key.clone(), || async move {
                let bytes = backoff::retry_with_backoff(|| {
                    client.fetch_file_raw(&owner, &repo, &path_owned, &sha_owned)
                })
                .await
                .map_err(|e| CacheError::Upstream(e.to_string()))?;
                if bytes.len() > FETCH_FILE_MAX_BYTES {
                    return Err(CacheError::Upstream(format!(
                        "file exceeds {FETCH_FILE_MAX_BYTES} byte cap"
                    )));
                }
                Ok(bytes)
            })
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let text = String::from_utf8_lossy(entry.bytes.as_slice()).into_owned();
        Ok((text, cache_key))
    }

    /// Ranked local search over the repository tree at `sha` (spec §4.1).
    /// Materializes (and caches) the full tree's text files lazily, scanning
    /// the PR's own changed files first since those are almost always what a
    /// review question is about.
    pub async fn search(
        &self,
        pr: &PRInfo,
        query: &str,
        sha: Option<&str>,
    ) -> GatewayResult<Vec<SearchHit>> {
        let sha = sha.unwrap_or(&pr.head_sha).to_string();
        let client = self.client_for(pr.provider)?;

        let mut candidate_paths: Vec<String> = pr.files.iter().map(|f| f.path.clone()).collect();
        if let Ok(tree) = client.list_tree(&pr.repo.owner, &pr.repo.name, &sha).await {
            for entry in tree {
                if !entry.is_dir && !candidate_paths.contains(&entry.path) {
                    candidate_paths.push(entry.path);
                }
            }
        }

        let mut files = Vec::with_capacity(candidate_paths.len());
        for path in candidate_paths {
            if let Ok((text, _)) = self.fetch_file(pr, &path, Some(&sha)).await {
                files.push((path, text));
            }
        }

        Ok(search::search_in_files(query, &files))
    }
}
