//! PR/MR URL parsing (spec §4.1 `parse_url`) and the inverse `build_url`
//! used by the R1 round-trip property.

use crate::errors::GatewayError;
use crate::types::{ParsedRef, ProviderKind, RefKind};

/// Parses a PR/MR URL into a provider-neutral reference.
///
/// GitHub pattern: `https://{host}/{owner}/{repo}/pull/{n}` (issues: `/issues/{n}`).
/// GitLab pattern: `https://{host}/{owner}/{repo}/-/merge_requests/{n}`.
///
/// `enterprise_hosts` lists configured GitHub Enterprise base hosts; any host
/// not equal to `github.com`/`gitlab.com` and not in this list fails with
/// `UrlInvalid` rather than being silently guessed at.
pub fn parse_url(u: &str, enterprise_hosts: &[String]) -> Result<ParsedRef, GatewayError> {
    let trimmed = u.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .ok_or_else(|| GatewayError::UrlInvalid(u.to_string()))?;

    let mut parts = without_scheme.splitn(2, '/');
    let host = parts
        .next()
        .ok_or_else(|| GatewayError::UrlInvalid(u.to_string()))?
        .to_string();
    let rest = parts
        .next()
        .ok_or_else(|| GatewayError::UrlInvalid(u.to_string()))?;

    if host == "gitlab.com" {
        return parse_gitlab_path(host, rest).ok_or_else(|| GatewayError::UrlInvalid(u.to_string()));
    }
    if host == "github.com" {
        return parse_github_path(ProviderKind::GitHub, host, rest)
            .ok_or_else(|| GatewayError::UrlInvalid(u.to_string()));
    }
    if enterprise_hosts.iter().any(|h| h == &host) {
        return parse_github_path(ProviderKind::GitHubEnterprise, host, rest)
            .ok_or_else(|| GatewayError::UrlInvalid(u.to_string()));
    }

    Err(GatewayError::UrlInvalid(u.to_string()))
}

fn parse_github_path(provider: ProviderKind, host: String, rest: &str) -> Option<ParsedRef> {
    let segs: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
    if segs.len() != 4 {
        return None;
    }
    let owner = segs[0].to_string();
    let repo = segs[1].to_string();
    let kind = match segs[2] {
        "pull" => RefKind::Pr,
        "issues" => RefKind::Issue,
        _ => return None,
    };
    let number: u64 = segs[3].parse().ok()?;
    Some(ParsedRef {
        provider,
        host,
        owner,
        repo,
        kind,
        number,
    })
}

fn parse_gitlab_path(host: String, rest: &str) -> Option<ParsedRef> {
    let segs: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
    // owner/repo/-/merge_requests/N  (owner may itself contain '/': group/subgroup).
    let dash_pos = segs.iter().position(|s| *s == "-")?;
    if dash_pos < 2 || segs.len() != dash_pos + 3 {
        return None;
    }
    let kind = match segs[dash_pos + 1] {
        "merge_requests" => RefKind::Pr,
        "issues" => RefKind::Issue,
        _ => return None,
    };
    let number: u64 = segs[dash_pos + 2].parse().ok()?;
    let repo = segs[dash_pos - 1].to_string();
    let owner = segs[..dash_pos - 1].join("/");
    let owner = if owner.is_empty() {
        segs[0].to_string()
    } else {
        owner
    };
    Some(ParsedRef {
        provider: ProviderKind::GitLab,
        host,
        owner,
        repo,
        kind,
        number,
    })
}

/// Inverse of `parse_url`; used only by round-trip tests (R1).
pub fn build_url(r: &ParsedRef) -> String {
    match r.provider {
        ProviderKind::GitHub | ProviderKind::GitHubEnterprise => {
            let seg = match r.kind {
                RefKind::Pr => "pull",
                RefKind::Issue => "issues",
            };
            format!(
                "https://{}/{}/{}/{}/{}",
                r.host, r.owner, r.repo, seg, r.number
            )
        }
        ProviderKind::GitLab => {
            let seg = match r.kind {
                RefKind::Pr => "merge_requests",
                RefKind::Issue => "issues",
            };
            format!(
                "https://{}/{}/{}/-/{}/{}",
                r.host, r.owner, r.repo, seg, r.number
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_github_pull_url() {
        let r = parse_url("https://github.com/octocat/Hello-World/pull/1", &[]).unwrap();
        assert_eq!(r.provider, ProviderKind::GitHub);
        assert_eq!(r.owner, "octocat");
        assert_eq!(r.repo, "Hello-World");
        assert_eq!(r.kind, RefKind::Pr);
        assert_eq!(r.number, 1);
    }

    #[test]
    fn parses_gitlab_mr_url() {
        let r = parse_url("https://gitlab.com/group/project/-/merge_requests/42", &[]).unwrap();
        assert_eq!(r.provider, ProviderKind::GitLab);
        assert_eq!(r.owner, "group");
        assert_eq!(r.repo, "project");
        assert_eq!(r.number, 42);
    }

    #[test]
    fn parses_gitlab_nested_group_url() {
        let r =
            parse_url("https://gitlab.com/group/subgroup/project/-/merge_requests/7", &[])
                .unwrap();
        assert_eq!(r.owner, "group/subgroup");
        assert_eq!(r.repo, "project");
    }

    #[test]
    fn rejects_unknown_host() {
        assert!(parse_url("https://example.com/a/b/pull/1", &[]).is_err());
    }

    #[test]
    fn accepts_configured_enterprise_host() {
        let hosts = vec!["git.corp.example".to_string()];
        let r = parse_url("https://git.corp.example/a/b/pull/9", &hosts).unwrap();
        assert_eq!(r.provider, ProviderKind::GitHubEnterprise);
    }

    #[test]
    fn round_trips_github_and_gitlab() {
        for url in [
            "https://github.com/octocat/Hello-World/pull/1",
            "https://github.com/octocat/Hello-World/issues/2",
            "https://gitlab.com/group/project/-/merge_requests/42",
        ] {
            let parsed = parse_url(url, &[]).unwrap();
            assert_eq!(build_url(&parsed), url);
        }
    }
}
