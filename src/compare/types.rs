use serde_json::{Map, Value};
use std::fmt;
use std::iter::Enumerate;
use std::slice;
use std::str::FromStr;
use thiserror::Error;

use super::patch::{self, Hunk};
use super::CompareError;

/// Owner and name of a GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coordinates {
    pub owner: String,
    pub repo: String,
}

impl Coordinates {
    pub fn new(owner: &str, repo: &str) -> Self {
        Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
        }
    }
}

impl FromStr for Coordinates {
    type Err = CompareError;

    /// Parses `owner/repo`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_matches('/');
        match trimmed.split_once('/') {
            Some((owner, repo))
                if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') =>
            {
                Ok(Coordinates::new(owner, repo))
            }
            _ => Err(CompareError::InvalidRepo(s.to_string())),
        }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown status {0:?}")]
pub struct UnknownStatus(pub String);

/// What happened to a file between base and head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Added,
    Removed,
    Modified,
    Renamed,
    Copied,
    Changed,
    Unchanged,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Added => "added",
            Status::Removed => "removed",
            Status::Modified => "modified",
            Status::Renamed => "renamed",
            Status::Copied => "copied",
            Status::Changed => "changed",
            Status::Unchanged => "unchanged",
        }
    }

    /// One-letter marker in the style of `git diff --name-status`.
    pub fn symbol(&self) -> char {
        match self {
            Status::Added => 'A',
            Status::Removed => 'D',
            Status::Modified => 'M',
            Status::Renamed => 'R',
            Status::Copied => 'C',
            Status::Changed => 'T',
            Status::Unchanged => ' ',
        }
    }
}

impl FromStr for Status {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "added" => Ok(Status::Added),
            "removed" => Ok(Status::Removed),
            "modified" => Ok(Status::Modified),
            "renamed" => Ok(Status::Renamed),
            "copied" => Ok(Status::Copied),
            "changed" => Ok(Status::Changed),
            "unchanged" => Ok(Status::Unchanged),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How head relates to base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonStatus {
    Ahead,
    Behind,
    Identical,
    Diverged,
}

impl FromStr for ComparisonStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ahead" => Ok(ComparisonStatus::Ahead),
            "behind" => Ok(ComparisonStatus::Behind),
            "identical" => Ok(ComparisonStatus::Identical),
            "diverged" => Ok(ComparisonStatus::Diverged),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl fmt::Display for ComparisonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ComparisonStatus::Ahead => "ahead",
            ComparisonStatus::Behind => "behind",
            ComparisonStatus::Identical => "identical",
            ComparisonStatus::Diverged => "diverged",
        };
        f.write_str(label)
    }
}

/// Top-level comparison counters. GitHub always sends these, but the
/// mapping only needs `base_commit`, `commits` and `files`, so every field
/// here may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComparisonSummary {
    pub status: Option<ComparisonStatus>,
    pub ahead_by: Option<u64>,
    pub behind_by: Option<u64>,
    pub total_commits: Option<u64>,
    pub html_url: Option<String>,
}

impl ComparisonSummary {
    pub(crate) fn from_json(doc: &Map<String, Value>) -> Result<Self, CompareError> {
        let status = match optional_str(doc, "", "status")? {
            Some(raw) => Some(
                raw.parse::<ComparisonStatus>()
                    .map_err(|e| CompareError::structural("status", e.to_string()))?,
            ),
            None => None,
        };
        Ok(ComparisonSummary {
            status,
            ahead_by: optional_u64(doc, "", "ahead_by")?,
            behind_by: optional_u64(doc, "", "behind_by")?,
            total_commits: optional_u64(doc, "", "total_commits")?,
            html_url: optional_str(doc, "", "html_url")?,
        })
    }
}

/// One file's diff summary within a comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(dead_code)] // Locator fields are mapped for callers; the CLI report doesn't print them
pub struct FileChange {
    /// Position in the `files` array
    pub index: usize,
    /// Blob sha of the file at head
    pub sha: String,
    /// Repository-relative path
    pub filename: String,
    pub status: Status,
    pub additions: u64,
    pub deletions: u64,
    /// Taken verbatim from the payload; not recomputed from additions and deletions
    pub changes: u64,
    /// Hunk-only unified diff. `None` for binary files or when GitHub omits it.
    pub patch: Option<String>,
    pub blob_url: String,
    pub raw_url: String,
    pub contents_url: String,
    /// Path before the rename, only sent for renamed files
    pub previous_filename: Option<String>,
}

impl FileChange {
    /// Map one element of the `files` array found at `index`.
    pub(crate) fn from_json(index: usize, value: &Value) -> Result<Self, CompareError> {
        let prefix = format!("files[{}]", index);
        let entry = value
            .as_object()
            .ok_or_else(|| CompareError::structural(&prefix, "expected an object"))?;

        let raw_status = required_str(entry, &prefix, "status")?;
        let status = raw_status.parse::<Status>().map_err(|e| {
            CompareError::structural(format!("{}.status", prefix), e.to_string())
        })?;

        Ok(FileChange {
            index,
            sha: required_str(entry, &prefix, "sha")?,
            filename: required_str(entry, &prefix, "filename")?,
            status,
            additions: required_u64(entry, &prefix, "additions")?,
            deletions: required_u64(entry, &prefix, "deletions")?,
            changes: required_u64(entry, &prefix, "changes")?,
            patch: optional_str(entry, &prefix, "patch")?,
            blob_url: required_str(entry, &prefix, "blob_url")?,
            raw_url: required_str(entry, &prefix, "raw_url")?,
            contents_url: required_str(entry, &prefix, "contents_url")?,
            previous_filename: optional_str(entry, &prefix, "previous_filename")?,
        })
    }

    /// Hunks of the patch; empty when there is no patch. A patch that
    /// doesn't parse fails at `files[{index}].patch`.
    pub fn hunks(&self) -> Result<Vec<Hunk>, CompareError> {
        match &self.patch {
            Some(text) => patch::parse_patch(text).map_err(|e| {
                CompareError::structural(format!("files[{}].patch", self.index), e.to_string())
            }),
            None => Ok(Vec::new()),
        }
    }
}

/// Lazy view over the `files` array of a fetched comparison.
///
/// Nothing is mapped until iterated, and every call to `iter()` starts
/// again from the first entry.
#[derive(Debug, Clone, Copy)]
pub struct FileChanges<'a> {
    entries: &'a [Value],
}

impl<'a> FileChanges<'a> {
    pub(crate) fn new(entries: &'a [Value]) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> FileChangeIter<'a> {
        FileChangeIter {
            inner: self.entries.iter().enumerate(),
        }
    }

    /// Map every entry, failing on the first malformed one.
    pub fn to_vec(&self) -> Result<Vec<FileChange>, CompareError> {
        self.iter().collect()
    }
}

impl<'a> IntoIterator for FileChanges<'a> {
    type Item = Result<FileChange, CompareError>;
    type IntoIter = FileChangeIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone)]
pub struct FileChangeIter<'a> {
    inner: Enumerate<slice::Iter<'a, Value>>,
}

impl Iterator for FileChangeIter<'_> {
    type Item = Result<FileChange, CompareError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|(index, value)| FileChange::from_json(index, value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for FileChangeIter<'_> {}

fn field_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", prefix, field)
    }
}

fn required_str(
    obj: &Map<String, Value>,
    prefix: &str,
    field: &str,
) -> Result<String, CompareError> {
    optional_str(obj, prefix, field)?.ok_or_else(|| {
        CompareError::structural(field_path(prefix, field), "missing required field")
    })
}

fn required_u64(obj: &Map<String, Value>, prefix: &str, field: &str) -> Result<u64, CompareError> {
    optional_u64(obj, prefix, field)?.ok_or_else(|| {
        CompareError::structural(field_path(prefix, field), "missing required field")
    })
}

/// Absent and `null` both read as `None`.
fn optional_str(
    obj: &Map<String, Value>,
    prefix: &str,
    field: &str,
) -> Result<Option<String>, CompareError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(CompareError::structural(
            field_path(prefix, field),
            "expected a string",
        )),
    }
}

fn optional_u64(
    obj: &Map<String, Value>,
    prefix: &str,
    field: &str,
) -> Result<Option<u64>, CompareError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_u64().map(Some).ok_or_else(|| {
            CompareError::structural(field_path(prefix, field), "expected a non-negative integer")
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry() -> Value {
        json!({
            "sha": "fffffffffffffffffffffffffffffffffffffffe",
            "filename": "bar/quux.txt",
            "status": "added",
            "additions": 7,
            "deletions": 2,
            "changes": 9,
            "patch": "some diff here",
            "blob_url": "https://github.invalid/blob",
            "raw_url": "https://github.invalid/raw",
            "contents_url": "https://api.github.invalid/contents"
        })
    }

    fn expect_structural(err: CompareError, expected_path: &str) {
        match err {
            CompareError::Structural { path, .. } => assert_eq!(path, expected_path),
            other => panic!("expected structural error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_coordinates() {
        let coords: Coordinates = "johndoe/my-repo".parse().unwrap();
        assert_eq!(coords, Coordinates::new("johndoe", "my-repo"));
        assert_eq!(coords.to_string(), "johndoe/my-repo");
    }

    #[test]
    fn test_parse_invalid_coordinates() {
        assert!("johndoe".parse::<Coordinates>().is_err());
        assert!("/my-repo".parse::<Coordinates>().is_err());
        assert!("a/b/c".parse::<Coordinates>().is_err());
        assert!("".parse::<Coordinates>().is_err());
    }

    #[test]
    fn test_status_is_case_sensitive() {
        assert_eq!("added".parse::<Status>(), Ok(Status::Added));
        assert_eq!("removed".parse::<Status>(), Ok(Status::Removed));
        assert!("Added".parse::<Status>().is_err());
        assert!("ADDED".parse::<Status>().is_err());
    }

    #[test]
    fn test_status_display_matches_wire_value() {
        for raw in ["added", "removed", "modified", "renamed", "copied", "changed", "unchanged"] {
            let status: Status = raw.parse().unwrap();
            assert_eq!(status.to_string(), raw);
        }
    }

    #[test]
    fn test_map_complete_entry() {
        let file = FileChange::from_json(0, &entry()).unwrap();
        assert_eq!(file.sha, "fffffffffffffffffffffffffffffffffffffffe");
        assert_eq!(file.filename, "bar/quux.txt");
        assert_eq!(file.status, Status::Added);
        assert_eq!(file.additions, 7);
        assert_eq!(file.deletions, 2);
        assert_eq!(file.changes, 9);
        assert_eq!(file.patch.as_deref(), Some("some diff here"));
        assert_eq!(file.previous_filename, None);
    }

    #[test]
    fn test_changes_passed_through_verbatim() {
        let mut value = entry();
        value["changes"] = json!(100);
        let file = FileChange::from_json(0, &value).unwrap();
        assert_eq!(file.changes, 100);
    }

    #[test]
    fn test_patch_absent_null_and_empty() {
        let mut value = entry();
        value.as_object_mut().unwrap().remove("patch");
        assert_eq!(FileChange::from_json(0, &value).unwrap().patch, None);

        value["patch"] = Value::Null;
        assert_eq!(FileChange::from_json(0, &value).unwrap().patch, None);

        value["patch"] = json!("");
        assert_eq!(FileChange::from_json(0, &value).unwrap().patch, Some(String::new()));
    }

    #[test]
    fn test_missing_required_fields() {
        for field in [
            "sha",
            "filename",
            "status",
            "additions",
            "deletions",
            "changes",
            "blob_url",
            "raw_url",
            "contents_url",
        ] {
            let mut value = entry();
            value.as_object_mut().unwrap().remove(field);
            let err = FileChange::from_json(3, &value).unwrap_err();
            expect_structural(err, &format!("files[3].{}", field));
        }
    }

    #[test]
    fn test_wrong_types_are_structural() {
        let mut value = entry();
        value["additions"] = json!(-1);
        expect_structural(FileChange::from_json(0, &value).unwrap_err(), "files[0].additions");

        let mut value = entry();
        value["sha"] = json!(42);
        expect_structural(FileChange::from_json(0, &value).unwrap_err(), "files[0].sha");

        let mut value = entry();
        value["patch"] = json!(["not", "text"]);
        expect_structural(FileChange::from_json(0, &value).unwrap_err(), "files[0].patch");

        expect_structural(FileChange::from_json(1, &json!("oops")).unwrap_err(), "files[1]");
    }

    #[test]
    fn test_unknown_status_is_structural() {
        let mut value = entry();
        value["status"] = json!("teleported");
        let err = FileChange::from_json(0, &value).unwrap_err();
        assert!(err.to_string().contains("teleported"));
        expect_structural(err, "files[0].status");
    }

    #[test]
    fn test_renamed_entry_keeps_previous_filename() {
        let mut value = entry();
        value["status"] = json!("renamed");
        value["previous_filename"] = json!("bar/old.txt");
        let file = FileChange::from_json(0, &value).unwrap();
        assert_eq!(file.status, Status::Renamed);
        assert_eq!(file.previous_filename.as_deref(), Some("bar/old.txt"));
    }

    #[test]
    fn test_unreadable_patch_names_its_file() {
        let mut value = entry();
        value["patch"] = json!("@@ truncated");
        let file = FileChange::from_json(4, &value).unwrap();
        assert_eq!(file.index, 4);
        assert_eq!(file.patch.as_deref(), Some("@@ truncated"));

        let err = file.hunks().unwrap_err();
        assert!(err.to_string().contains("unterminated hunk header"));
        expect_structural(err, "files[4].patch");
    }

    #[test]
    fn test_hunks_without_patch_is_empty() {
        let mut value = entry();
        value.as_object_mut().unwrap().remove("patch");
        let file = FileChange::from_json(0, &value).unwrap();
        assert!(file.hunks().unwrap().is_empty());
    }

    #[test]
    fn test_file_changes_view_is_restartable() {
        let mut second = entry();
        second["filename"] = json!("foo.txt");
        let entries = vec![entry(), second];
        let view = FileChanges::new(&entries);

        let first_pass: Vec<String> = view.iter().map(|f| f.unwrap().filename).collect();
        let second_pass: Vec<String> = view.iter().map(|f| f.unwrap().filename).collect();
        assert_eq!(first_pass, vec!["bar/quux.txt", "foo.txt"]);
        assert_eq!(first_pass, second_pass);
        assert_eq!(view.len(), 2);
        assert_eq!(view.iter().len(), 2);
    }

    #[test]
    fn test_to_vec_fails_on_any_malformed_entry() {
        let mut broken = entry();
        broken.as_object_mut().unwrap().remove("sha");
        let entries = vec![entry(), broken];
        let err = FileChanges::new(&entries).to_vec().unwrap_err();
        expect_structural(err, "files[1].sha");
    }

    #[test]
    fn test_summary_fields_are_optional() {
        let doc = json!({});
        let summary = ComparisonSummary::from_json(doc.as_object().unwrap()).unwrap();
        assert_eq!(summary, ComparisonSummary::default());
    }

    #[test]
    fn test_summary_reads_counters() {
        let doc = json!({
            "status": "diverged",
            "ahead_by": 3,
            "behind_by": 1,
            "total_commits": 3,
            "html_url": "https://github.com/o/r/compare/a...b"
        });
        let summary = ComparisonSummary::from_json(doc.as_object().unwrap()).unwrap();
        assert_eq!(summary.status, Some(ComparisonStatus::Diverged));
        assert_eq!(summary.ahead_by, Some(3));
        assert_eq!(summary.behind_by, Some(1));
        assert_eq!(summary.total_commits, Some(3));
    }

    #[test]
    fn test_summary_unknown_status() {
        let doc = json!({ "status": "sideways" });
        let err = ComparisonSummary::from_json(doc.as_object().unwrap()).unwrap_err();
        expect_structural(err, "status");
    }
}
