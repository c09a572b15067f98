//! Unified-diff parsing, generalized from a GitLab-diff-format parser to a
//! provider-agnostic representation shared by GitHub's `patch` field and
//! GitLab's `diff` field.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffLine {
    Added { new_line: u32, content: String },
    Removed { old_line: u32, content: String },
    Context { old_line: u32, new_line: u32, content: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiffHunk {
    pub old_start: u32,
    pub old_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
    pub lines: Vec<DiffLine>,
}

/// Parses a unified diff string into hunks/lines. Tolerant of missing
/// `---`/`+++` file headers; only `@@` hunk headers are required.
pub fn parse_unified_diff(s: &str) -> Vec<DiffHunk> {
    let mut hunks = Vec::new();
    let mut cur = DiffHunk::default();
    let mut old_line = 0u32;
    let mut new_line = 0u32;
    let mut in_hunk = false;

    for line in s.lines() {
        if line.starts_with("@@") {
            if in_hunk && !cur.lines.is_empty() {
                hunks.push(std::mem::take(&mut cur));
            }
            if let Some((left, right)) = line
                .trim_start_matches('@')
                .trim_end_matches('@')
                .trim()
                .split_once('+')
            {
                let (o_start, o_len) = split_nums(left.trim().trim_start_matches('-'));
                let (n_start, n_len) = split_nums(right.trim());
                cur.old_start = o_start;
                cur.old_lines = o_len;
                cur.new_start = n_start;
                cur.new_lines = n_len;
                old_line = o_start;
                new_line = n_start;
                in_hunk = true;
            }
            continue;
        }

        if line.starts_with("\\ ") {
            continue;
        }
        if !in_hunk {
            continue;
        }

        if let Some(rest) = line.strip_prefix('+') {
            cur.lines.push(DiffLine::Added {
                new_line,
                content: rest.to_string(),
            });
            new_line += 1;
        } else if let Some(rest) = line.strip_prefix('-') {
            cur.lines.push(DiffLine::Removed {
                old_line,
                content: rest.to_string(),
            });
            old_line += 1;
        } else {
            let rest = line.strip_prefix(' ').unwrap_or(line);
            cur.lines.push(DiffLine::Context {
                old_line,
                new_line,
                content: rest.to_string(),
            });
            old_line += 1;
            new_line += 1;
        }
    }

    if in_hunk && !cur.lines.is_empty() {
        hunks.push(cur);
    }
    hunks
}

fn split_nums(s: &str) -> (u32, u32) {
    let s = s.trim();
    if let Some((a, b)) = s.split_once(',') {
        (a.parse().unwrap_or(0), b.parse().unwrap_or(0))
    } else {
        (s.parse().unwrap_or(0), 1)
    }
}

pub fn looks_like_binary_patch(s: &str) -> bool {
    s.contains("GIT binary patch")
        || s.starts_with("Binary files ")
        || (s.starts_with("Files ") && s.contains(" differ"))
}

/// Counts added/removed lines across all hunks, used to fill `PRFile.additions/deletions`
/// when a provider doesn't report them directly (GitLab's diff endpoint doesn't).
pub fn count_additions_deletions(hunks: &[DiffHunk]) -> (u32, u32) {
    let mut add = 0u32;
    let mut del = 0u32;
    for h in hunks {
        for l in &h.lines {
            match l {
                DiffLine::Added { .. } => add += 1,
                DiffLine::Removed { .. } => del += 1,
                DiffLine::Context { .. } => {}
            }
        }
    }
    (add, del)
}

/// Highest 1-based new-file line number touched by any hunk, used by the
/// citation repair pass (spec §4.5 / B3) to bound `side="unified"` inference.
pub fn max_new_line(hunks: &[DiffHunk]) -> u32 {
    hunks
        .iter()
        .flat_map(|h| h.lines.iter())
        .filter_map(|l| match l {
            DiffLine::Added { new_line, .. } => Some(*new_line),
            DiffLine::Context { new_line, .. } => Some(*new_line),
            _ => None,
        })
        .max()
        .unwrap_or(0)
}

/// Highest 1-based old-file line number touched by any hunk.
pub fn max_old_line(hunks: &[DiffHunk]) -> u32 {
    hunks
        .iter()
        .flat_map(|h| h.lines.iter())
        .filter_map(|l| match l {
            DiffLine::Removed { old_line, .. } => Some(*old_line),
            DiffLine::Context { old_line, .. } => Some(*old_line),
            _ => None,
        })
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "@@ -1,3 +1,4 @@\n line one\n-line two\n+line two edited\n+line three\n line four\n";

    #[test]
    fn parses_hunk_header_and_lines() {
        let hunks = parse_unified_diff(SAMPLE);
        assert_eq!(hunks.len(), 1);
        let h = &hunks[0];
        assert_eq!(h.old_start, 1);
        assert_eq!(h.new_start, 1);
        let (add, del) = count_additions_deletions(&hunks);
        assert_eq!(add, 2);
        assert_eq!(del, 1);
    }

    #[test]
    fn detects_binary_patch() {
        assert!(looks_like_binary_patch("Binary files a/x.png and b/x.png differ"));
        assert!(!looks_like_binary_patch(SAMPLE));
    }
}
