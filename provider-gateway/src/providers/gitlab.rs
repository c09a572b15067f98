//! GitLab provider (REST v4) for MR metadata/commits/diffs/comments.
//!
//! Endpoints used:
//! - GET /projects/:id/merge_requests/:iid
//! - GET /projects/:id/merge_requests/:iid/commits
//! - GET /projects/:id/merge_requests/:iid/diffs
//! - GET /projects/:id/merge_requests/:iid/notes
//! - GET /projects/:id/repository/files/:path/raw?ref=sha
//! - GET /projects/:id/repository/tree?ref=sha&recursive=true&per_page=100

use crate::diff::{count_additions_deletions, looks_like_binary_patch, parse_unified_diff};
use crate::errors::{check_status, GatewayResult};
use crate::types::{Comment, Commit, FileStatus, PRFile, PRInfo, ProviderKind, RepoRef};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use super::TreeEntry;

#[derive(Debug, Clone)]
pub struct GitLabClient {
    http: Client,
    base_api: String,
    token: Option<String>,
}

impl GitLabClient {
    pub fn new(http: Client, base_api: String, token: Option<String>) -> Self {
        Self {
            http,
            base_api,
            token,
        }
    }

    fn project_id(owner: &str, repo: &str) -> String {
        urlencoding::encode(&format!("{owner}/{repo}")).into_owned()
    }

    fn request(&self, url: String) -> reqwest::RequestBuilder {
        let mut req = self.http.get(url);
        if let Some(tok) = &self.token {
            req = req.header("PRIVATE-TOKEN", tok);
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
        let pid = Self::project_id(owner, repo);

        let meta: GlMr = check_status(
            self.request(format!(
                "{}/projects/{pid}/merge_requests/{number}",
                self.base_api
            ))
            .send()
            .await?,
        )
        .await?
        .json()
        .await?;

        let commits: Vec<GlCommit> = check_status(
            self.request(format!(
                "{}/projects/{pid}/merge_requests/{number}/commits",
                self.base_api
            ))
            .send()
            .await?,
        )
        .await?
        .json()
        .await?;

        let diff_files: Vec<GlDiffFile> = check_status(
            self.request(format!(
                "{}/projects/{pid}/merge_requests/{number}/diffs",
                self.base_api
            ))
            .send()
            .await?,
        )
        .await?
        .json()
        .await?;

        let notes: Vec<GlNote> = check_status(
            self.request(format!(
                "{}/projects/{pid}/merge_requests/{number}/notes",
                self.base_api
            ))
            .send()
            .await?,
        )
        .await?
        .json()
        .await?;

        let mut pr_files = Vec::with_capacity(diff_files.len());
        let mut diff_text = String::new();
        let mut total_add = 0u32;
        let mut total_del = 0u32;
        for f in &diff_files {
            let status = if f.new_file {
                FileStatus::Added
            } else if f.deleted_file {
                FileStatus::Removed
            } else if f.renamed_file {
                FileStatus::Renamed
            } else {
                FileStatus::Modified
            };

            let is_binary = f.diff.as_deref().map(looks_like_binary_patch).unwrap_or(true);
            let (add, del) = match &f.diff {
                Some(d) if !is_binary => {
                    diff_text.push_str(&format!("diff --git a/{} b/{}\n", f.old_path, f.new_path));
                    diff_text.push_str(d);
                    diff_text.push('\n');
                    count_additions_deletions(&parse_unified_diff(d))
                }
                _ => (0, 0),
            };
            total_add += add;
            total_del += del;

            pr_files.push(PRFile {
                path: f.new_path.clone(),
                status,
                additions: add,
                deletions: del,
            });
        }

        Ok(PRInfo {
            review_id,
            provider: ProviderKind::GitLab,
            repo: RepoRef {
                owner: owner.to_string(),
                name: repo.to_string(),
            },
            number,
            title: meta.title,
            body: meta.description.unwrap_or_default(),
            base_sha: meta.diff_refs.base_sha,
            head_sha: meta.diff_refs.head_sha,
            base_ref: meta.target_branch,
            head_ref: meta.source_branch,
            state: meta.state,
            draft: meta.draft.unwrap_or(false),
            files: pr_files,
            commits: commits
                .into_iter()
                .map(|c| Commit {
                    sha: c.id,
                    message: c.message,
                    author_name: c.author_name,
                    authored_at: c.created_at,
                })
                .collect(),
            comments: notes
                .into_iter()
                .filter(|n| !n.system)
                .map(|n| Comment {
                    author: n.author.username,
                    body: n.body,
                    created_at: n.created_at,
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
        let pid = Self::project_id(owner, repo);
        let enc_path = urlencoding::encode(path);
        let bytes = check_status(
            self.request(format!(
                "{}/projects/{pid}/repository/files/{enc_path}/raw?ref={sha}",
                self.base_api
            ))
            .send()
            .await?,
        )
        .await?
        .bytes()
        .await?;
        Ok(bytes.to_vec())
    }

    pub async fn list_tree(&self, owner: &str, repo: &str, sha: &str) -> GatewayResult<Vec<TreeEntry>> {
        let pid = Self::project_id(owner, repo);
        let mut out = Vec::new();
        let mut page = 1u32;
        loop {
            let entries: Vec<GlTreeEntry> = check_status(
                self.request(format!(
                    "{}/projects/{pid}/repository/tree?ref={sha}&recursive=true&per_page=100&page={page}",
                    self.base_api
                ))
                .send()
                .await?,
            )
            .await?
            .json()
            .await?;
            if entries.is_empty() {
                break;
            }
            let got = entries.len();
            out.extend(entries.into_iter().map(|e| TreeEntry {
                is_dir: e.r#type == "tree",
                path: e.path,
            }));
            if got < 100 {
                break;
            }
            page += 1;
        }
        Ok(out)
    }
}

#[derive(Debug, Deserialize)]
struct GlMr {
    title: String,
    #[serde(default)]
    description: Option<String>,
    state: String,
    #[serde(default)]
    draft: Option<bool>,
    source_branch: String,
    target_branch: String,
    diff_refs: GlDiffRefs,
}

#[derive(Debug, Deserialize)]
struct GlDiffRefs {
    base_sha: String,
    head_sha: String,
}

#[derive(Debug, Deserialize)]
struct GlCommit {
    id: String,
    message: String,
    author_name: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct GlDiffFile {
    old_path: String,
    new_path: String,
    new_file: bool,
    renamed_file: bool,
    deleted_file: bool,
    #[serde(default)]
    diff: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GlNote {
    body: String,
    author: GlUser,
    created_at: DateTime<Utc>,
    #[serde(default)]
    system: bool,
}

#[derive(Debug, Deserialize)]
struct GlUser {
    username: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn client(base: String) -> GitLabClient {
        GitLabClient::new(Client::new(), base, None)
    }

    #[tokio::test]
    async fn load_pr_maps_gitlab_schema_to_canonical_pr_info() {
        let mut server = Server::new_async().await;
        let meta_mock = server
            .mock("GET", "/projects/octocat%2FHello-World/merge_requests/1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"title":"Fix bug","description":"does the thing","state":"opened","draft":false,
                "source_branch":"feature","target_branch":"main",
                "diff_refs":{"base_sha":"base123","head_sha":"head456"}}"#,
            )
            .create_async()
            .await;
        let commits_mock = server
            .mock("GET", "/projects/octocat%2FHello-World/merge_requests/1/commits")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"id":"c1","message":"fix","author_name":"Octo Cat","created_at":"2024-01-01T00:00:00Z"}]"#)
            .create_async()
            .await;
        let diffs_mock = server
            .mock("GET", "/projects/octocat%2FHello-World/merge_requests/1/diffs")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{"old_path":"README","new_path":"README","new_file":false,"renamed_file":false,
                "deleted_file":false,"diff":"@@ -1,1 +1,2 @@\n-old\n+new\n+line"}]"#,
            )
            .create_async()
            .await;
        let notes_mock = server
            .mock("GET", "/projects/octocat%2FHello-World/merge_requests/1/notes")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"body":"lgtm","author":{"username":"reviewer"},"created_at":"2024-01-02T00:00:00Z","system":false}]"#)
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

        meta_mock.assert_async().await;
        commits_mock.assert_async().await;
        diffs_mock.assert_async().await;
        notes_mock.assert_async().await;
    }

    #[tokio::test]
    async fn load_pr_drops_system_notes() {
        let mut server = Server::new_async().await;
        let _meta = server
            .mock("GET", "/projects/octocat%2FHello-World/merge_requests/1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"title":"t","description":null,"state":"opened","draft":null,
                "source_branch":"feature","target_branch":"main",
                "diff_refs":{"base_sha":"b","head_sha":"h"}}"#,
            )
            .create_async()
            .await;
        let _commits = server
            .mock("GET", "/projects/octocat%2FHello-World/merge_requests/1/commits")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;
        let _diffs = server
            .mock("GET", "/projects/octocat%2FHello-World/merge_requests/1/diffs")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;
        let _notes = server
            .mock("GET", "/projects/octocat%2FHello-World/merge_requests/1/notes")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{"body":"created merge request","author":{"username":"bot"},
                "created_at":"2024-01-02T00:00:00Z","system":true}]"#,
            )
            .create_async()
            .await;

        let c = client(server.url());
        let pr = c.load_pr("r1".to_string(), "octocat", "Hello-World", 1).await.unwrap();

        assert!(pr.comments.is_empty());
    }

    #[tokio::test]
    async fn fetch_file_raw_returns_body_bytes() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/projects/octocat%2FHello-World/repository/files/README/raw")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("hello world")
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
    async fn list_tree_paginates_until_short_page() {
        let mut server = Server::new_async().await;
        let page1: Vec<String> = (0..100)
            .map(|i| format!(r#"{{"path":"f{i}.rs","type":"blob"}}"#))
            .collect();
        let page1_body = format!("[{}]", page1.join(","));
        let mock1 = server
            .mock("GET", "/projects/octocat%2FHello-World/repository/tree")
            .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(page1_body)
            .create_async()
            .await;
        let mock2 = server
            .mock("GET", "/projects/octocat%2FHello-World/repository/tree")
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"path":"last.rs","type":"blob"}]"#)
            .create_async()
            .await;

        let c = client(server.url());
        let entries = c.list_tree("octocat", "Hello-World", "head456").await.unwrap();

        assert_eq!(entries.len(), 101);
        assert!(entries.iter().any(|e| e.path == "last.rs"));
        mock1.assert_async().await;
        mock2.assert_async().await;
    }

    #[tokio::test]
    async fn load_pr_on_403_surfaces_rate_limited_with_retry_after() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/projects/octocat%2FHello-World/merge_requests/1")
            .with_status(403)
            .with_header("retry-after", "7")
            .with_body("rate limited")
            .create_async()
            .await;

        let c = client(server.url());
        let err = c.load_pr("r1".to_string(), "octocat", "Hello-World", 1).await.unwrap_err();

        match err {
            crate::errors::GatewayError::RateLimited { retry_after_secs } => {
                assert_eq!(retry_after_secs, Some(7))
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
        mock.assert_async().await;
    }
}

#[derive(Debug, Deserialize)]
struct GlTreeEntry {
    path: String,
    r#type: String,
}
