//! Local ranked text search over a lazily materialized repository tree
//! (spec §4.1 `search`: "MAY delegate to the provider's code-search endpoint
//! or perform a local grep over a lazily materialized tree"). This crate
//! takes the local-grep option.

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SearchHit {
    pub path: String,
    pub line: u32,
    pub snippet: String,
}

const MAX_FILES_SCANNED: usize = 500;
const MAX_FILE_BYTES: usize = 1_000_000;
const MAX_HITS: usize = 50;

/// Ranks hits by (descending) number of query-term occurrences on the line,
/// then by path for stable ordering. `files` is `(path, content)` pairs for
/// already-fetched text files; callers materialize only what's cheap to pull
/// (e.g. the PR's changed files first, falling back to the full tree).
pub fn search_in_files(query: &str, files: &[(String, String)]) -> Vec<SearchHit> {
    let q = query.to_lowercase();
    if q.trim().is_empty() {
        return Vec::new();
    }

    let mut hits: Vec<(usize, SearchHit)> = Vec::new();
    for (path, content) in files.iter().take(MAX_FILES_SCANNED) {
        if content.len() > MAX_FILE_BYTES {
            continue;
        }
        for (idx, line) in content.lines().enumerate() {
            let lower = line.to_lowercase();
            let score = lower.matches(&q).count();
            if score == 0 {
                continue;
            }
            hits.push((
                score,
                SearchHit {
                    path: path.clone(),
                    line: (idx + 1) as u32,
                    snippet: truncate_snippet(line),
                },
            ));
        }
    }

    hits.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.path.cmp(&b.1.path)));
    hits.into_iter().take(MAX_HITS).map(|(_, h)| h).collect()
}

fn truncate_snippet(line: &str) -> String {
    let trimmed = line.trim();
    if trimmed.chars().count() > 200 {
        trimmed.chars().take(200).collect::<String>() + "…"
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_by_occurrence_count() {
        let files = vec![
            ("a.rs".to_string(), "foo bar\nfoo foo bar\n".to_string()),
            ("b.rs".to_string(), "nothing here\n".to_string()),
        ];
        let hits = search_in_files("foo", &files);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].path, "a.rs");
        assert_eq!(hits[0].line, 2);
    }

    #[test]
    fn empty_query_yields_no_hits() {
        let files = vec![("a.rs".to_string(), "foo".to_string())];
        assert!(search_in_files("  ", &files).is_empty());
    }
}
