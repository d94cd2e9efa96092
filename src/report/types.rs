use crate::compare::types::{ComparisonStatus, Status};

/// One row of the file table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLine {
    pub filename: String,
    /// Set for renames
    pub previous_filename: Option<String>,
    pub status: Status,
    pub additions: u64,
    pub deletions: u64,
    pub changes: u64,
    pub patch: PatchSummary,
}

/// What the report can say about a file's patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchSummary {
    /// GitHub sent no patch (binary or too large)
    Missing,
    /// A patch was sent but its hunk headers don't parse
    Unreadable,
    Hunks(usize),
}

impl std::fmt::Display for PatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatchSummary::Missing => write!(f, "binary"),
            PatchSummary::Unreadable => write!(f, "unreadable"),
            PatchSummary::Hunks(n) => write!(f, "{}", n),
        }
    }
}

impl FileLine {
    pub fn display_name(&self) -> String {
        match &self.previous_filename {
            Some(previous) => format!("{} → {}", previous, self.filename),
            None => self.filename.clone(),
        }
    }
}

/// Everything printed for one comparison.
#[derive(Debug)]
pub struct Report {
    /// owner/repo
    pub repo: String,
    pub base: String,
    pub head: String,
    /// Shortened sha of `base_commit`, when it carries one
    pub base_sha: Option<String>,
    pub status: Option<ComparisonStatus>,
    pub ahead_by: Option<u64>,
    pub behind_by: Option<u64>,
    /// GitHub's count, which can exceed `commits.len()` on large comparisons
    pub total_commits: u64,
    pub html_url: Option<String>,
    /// Shortened shas of the commits between base and head
    pub commits: Vec<String>,
    pub files: Vec<FileLine>,
    /// Sum of per-file additions
    pub additions: u64,
    /// Sum of per-file deletions
    pub deletions: u64,
}
