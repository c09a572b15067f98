//! GitHub / GitHub Enterprise provider (REST v3).
//!
//! Endpoints used:
//! - GET /repos/{owner}/{repo}/pulls/{number}
//! - GET /repos/{owner}/{repo}/pulls/{number}/commits
//! - GET /repos/{owner}/{repo}/pulls/{number}/files      (field "patch" is a unified diff)
//! - GET /repos/{owner}/{repo}/issues/{number}/comments
//! - GET /repos/{owner}/{repo}/contents/{path}?ref={sha} (base64 blob)
//! - GET /repos/{owner}/{repo}/git/trees/{sha}?recursive=1

use crate::diff::{count_additions_deletions, looks_like_binary_patch, parse_unified_diff};
use crate::errors::{check_status, GatewayError, GatewayResult};
use crate::providers::TreeEntry;
use crate::types::{Comment, Commit, FileStatus, PRFile, PRInfo, ProviderKind, RepoRef};
use base64::Engine;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    base_api: String,
    token: Option<String>,
    pub(crate) kind: ProviderKind,
}

impl GitHubClient {
    pub fn new(http: Client, base_api: String, token: Option<String>) -> Self {
        Self {
            http,
            base_api,
            token,
            kind: ProviderKind::GitHub,
        }
    }

    fn request(&self, url: String) -> reqwest::RequestBuilder {
        let mut req = self
            .http
            .get(url)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "provider-gateway");
        if let Some(tok) = &self.token {
            req = req.header("Authorization", format!("Bearer {tok}"));
        }
        req
    }

    pub async fn load_pr(
        &self,
        review_id: String,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> GatewayResult<PRInfo> {
        let pr: GhPull = check_status(
            self.request(format!("{}/repos/{owner}/{repo}/pulls/{number}", self.base_api))
                .send()
                .await?,
        )
        .await?
        .json()
        .await?;

        let commits: Vec<GhCommit> = check_status(
            self.request(format!(
                "{}/repos/{owner}/{repo}/pulls/{number}/commits",
                self.base_api
            ))
            .send()
            .await?,
        )
        .await?
        .json()
        .await?;

        let files: Vec<GhFile> = check_status(
            self.request(format!(
                "{}/repos/{owner}/{repo}/pulls/{number}/files",
                self.base_api
            ))
            .send()
            .await?,
        )
        .await?
        .json()
        .await?;

        let comments: Vec<GhIssueComment> = check_status(
            self.request(format!(
                "{}/repos/{owner}/{repo}/issues/{number}/comments",
                self.base_api
            ))
            .send()
            .await?,
        )
        .await?
        .json()
        .await?;

        let mut pr_files = Vec::with_capacity(files.len());
        let mut diff_text = String::new();
        let mut total_add = 0u32;
        let mut total_del = 0u32;
        for f in &files {
            let status = match f.status.as_str() {
                "added" => FileStatus::Added,
                "removed" => FileStatus::Removed,
                "renamed" => FileStatus::Renamed,
                _ => FileStatus::Modified,
            };
            let (add, del) = if let Some(patch) = &f.patch {
                if looks_like_binary_patch(patch) {
                    (0, 0)
                } else {
                    diff_text.push_str(&format!("diff --git a/{0} b/{0}\n", f.filename));
                    diff_text.push_str(patch);
                    diff_text.push('\n');
                    count_additions_deletions(&parse_unified_diff(patch))
                }
            } else {
                (f.additions, f.deletions)
            };
            total_add += add.max(f.additions);
            total_del += del.max(f.deletions);
            pr_files.push(PRFile {
                path: f.filename.clone(),
                status,
                additions: f.additions,
                deletions: f.deletions,
            });
        }

        Ok(PRInfo {
            review_id,
            provider: self.kind,
            repo: RepoRef {
                owner: owner.to_string(),
                name: repo.to_string(),
            },
            number,
            title: pr.title,
            body: pr.body.unwrap_or_default(),
            base_sha: pr.base.sha,
            head_sha: pr.head.sha,
            base_ref: pr.base.r#ref,
            head_ref: pr.head.r#ref,
            state: pr.state,
            draft: pr.draft,
            files: pr_files,
            commits: commits
                .into_iter()
                .map(|c| Commit {
                    sha: c.sha,
                    message: c.commit.message,
                    author_name: c.commit.author.name,
                    authored_at: Some(c.commit.author.date),
                })
                .collect(),
            comments: comments
                .into_iter()
                .map(|c| Comment {
                    author: c.user.login,
                    body: c.body,
                    created_at: c.created_at,
                })
                .collect(),
            additions: total_add,
            deletions: total_del,
            diff_text,
        })
    }

    pub async fn fetch_file_raw(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        sha: &str,
    ) -> GatewayResult<Vec<u8>> {
        let resp: GhContent = check_status(
            self.request(format!(
                "{}/repos/{owner}/{repo}/contents/{path}?ref={sha}",
                self.base_api
            ))
            .send()
            .await?,
        )
        .await?
        .json()
        .await?;

        if resp.encoding != "base64" {
            return Err(GatewayError::Unsupported);
        }
        let cleaned: String = resp.content.chars().filter(|c| !c.is_whitespace()).collect();
        base64::engine::general_purpose::STANDARD
            .decode(cleaned)
            .map_err(|e| GatewayError::Transport(e.to_string()))
    }

    pub async fn list_tree(&self, owner: &str, repo: &str, sha: &str) -> GatewayResult<Vec<TreeEntry>> {
        let resp: GhTree = check_status(
            self.request(format!(
                "{}/repos/{owner}/{repo}/git/trees/{sha}?recursive=1",
                self.base_api
            ))
            .send()
            .await?,
        )
        .await?
        .json()
        .await?;

        Ok(resp
            .tree
            .into_iter()
            .map(|e| TreeEntry {
                is_dir: e.r#type == "tree",
                path: e.path,
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct GhPull {
    title: String,
    #[serde(default)]
    body: Option<String>,
    state: String,
    #[serde(default)]
    draft: bool,
    base: GhRef,
    head: GhRef,
}

#[derive(Debug, Deserialize)]
struct GhRef {
    sha: String,
    r#ref: String,
}

#[derive(Debug, Deserialize)]
struct GhCommit {
    sha: String,
    commit: GhCommitDetail,
}

#[derive(Debug, Deserialize)]
struct GhCommitDetail {
    message: String,
    author: GhCommitAuthor,
}

#[derive(Debug, Deserialize)]
struct GhCommitAuthor {
    name: String,
    date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct GhFile {
    filename: String,
    status: String,
    additions: u32,
    deletions: u32,
    #[serde(default)]
    patch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GhIssueComment {
    user: GhUser,
    body: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct GhUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct GhContent {
    encoding: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct GhTree {
    tree: Vec<GhTreeEntry>,
}

#[derive(Debug, Deserialize)]
struct GhTreeEntry {
    path: String,
    r#type: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn client(base: String) -> GitHubClient {
        GitHubClient::new(Client::new(), base, None)
    }

    #[tokio::test]
    async fn load_pr_maps_github_schema_to_canonical_pr_info() {
        let mut server = Server::new_async().await;
        let pr_mock = server
            .mock("GET", "/repos/octocat/Hello-World/pulls/1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"title":"Fix bug","body":"does the thing","state":"open","draft":false,
                "base":{"sha":"base123","ref":"main"},"head":{"sha":"head456","ref":"feature"}}"#,
            )
            .create_async()
            .await;
        let commits_mock = server
            .mock("GET", "/repos/octocat/Hello-World/pulls/1/commits")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{"sha":"c1","commit":{"message":"fix","author":{"name":"Octo Cat","date":"2024-01-01T00:00:00Z"}}}]"#,
            )
            .create_async()
            .await;
        let files_mock = server
            .mock("GET", "/repos/octocat/Hello-World/pulls/1/files")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{"filename":"README","status":"modified","additions":2,"deletions":1,
                "patch":"@@ -1,1 +1,2 @@\n-old\n+new\n+line"}]"#,
            )
            .create_async()
            .await;
        let comments_mock = server
            .mock("GET", "/repos/octocat/Hello-World/issues/1/comments")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"user":{"login":"reviewer"},"body":"lgtm","created_at":"2024-01-02T00:00:00Z"}]"#)
            .create_async()
            .await;

        let c = client(server.url());
        let pr = c.load_pr("r1".to_string(), "octocat", "Hello-World", 1).await.unwrap();

        assert_eq!(pr.title, "Fix bug");
        assert_eq!(pr.base_sha, "base123");
        assert_eq!(pr.head_sha, "head456");
        assert_eq!(pr.base_ref, "main");
        assert_eq!(pr.head_ref, "feature");
        assert!(!pr.draft);
        assert_eq!(pr.files.len(), 1);
        assert_eq!(pr.files[0].path, "README");
        assert_eq!(pr.files[0].status, FileStatus::Modified);
        assert_eq!(pr.commits.len(), 1);
        assert_eq!(pr.commits[0].sha, "c1");
        assert_eq!(pr.comments.len(), 1);
        assert_eq!(pr.comments[0].author, "reviewer");
        assert!(pr.diff_text.contains("diff --git a/README b/README"));

        pr_mock.assert_async().await;
        commits_mock.assert_async().await;
        files_mock.assert_async().await;
        comments_mock.assert_async().await;
    }

    #[tokio::test]
    async fn fetch_file_raw_decodes_base64_content() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/octocat/Hello-World/contents/README")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"encoding":"base64","content":"aGVsbG8gd29ybGQ="}"#)
            .create_async()
            .await;

        let c = client(server.url());
        let bytes = c
            .fetch_file_raw("octocat", "Hello-World", "README", "head456")
            .await
            .unwrap();

        assert_eq!(bytes, b"hello world");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn list_tree_maps_tree_entries() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/octocat/Hello-World/git/trees/head456")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"tree":[{"path":"src","type":"tree"},{"path":"src/lib.rs","type":"blob"}]}"#)
            .create_async()
            .await;

        let c = client(server.url());
        let entries = c.list_tree("octocat", "Hello-World", "head456").await.unwrap();

        assert_eq!(entries.len(), 2);
        assert!(entries.iter().any(|e| e.path == "src" && e.is_dir));
        assert!(entries.iter().any(|e| e.path == "src/lib.rs" && !e.is_dir));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn load_pr_on_403_surfaces_rate_limited_with_retry_after() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/octocat/Hello-World/pulls/1")
            .with_status(403)
            .with_header("retry-after", "12")
            .with_body("rate limited")
            .create_async()
            .await;

        let c = client(server.url());
        let err = c.load_pr("r1".to_string(), "octocat", "Hello-World", 1).await.unwrap_err();

        match err {
            GatewayError::RateLimited { retry_after_secs } => assert_eq!(retry_after_secs, Some(12)),
            other => panic!("expected RateLimited, got {other:?}"),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn load_pr_on_401_surfaces_unauthorized() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/octocat/Hello-World/pulls/1")
            .with_status(401)
            .with_body("nope")
            .create_async()
            .await;

        let c = client(server.url());
        let err = c.load_pr("r1".to_string(), "octocat", "Hello-World", 1).await.unwrap_err();

        assert!(matches!(err, GatewayError::Unauthorized));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn load_pr_on_404_surfaces_not_found() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/octocat/Hello-World/pulls/1")
            .with_status(404)
            .with_body("nope")
            .create_async()
            .await;

        let c = client(server.url());
        let err = c.load_pr("r1".to_string(), "octocat", "Hello-World", 1).await.unwrap_err();

        assert!(matches!(err, GatewayError::NotFound));
        mock.assert_async().await;
    }
}
