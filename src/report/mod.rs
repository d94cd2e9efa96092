pub mod types;

pub use types::{FileLine, PatchSummary, Report};

use crate::compare::{CommitsComparison, CompareError, Request, Status};
use colored::Colorize;
use serde_json::Value;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, instrument, warn};

const SHORT_SHA_LEN: usize = 7;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report file: {0}")]
    FileWrite(#[from] std::io::Error),
}

/// Build a Report from a comparison, fetching it if that hasn't happened yet.
///
/// Any malformed file entry fails the whole report. The patch text itself is
/// opaque to the comparison, so a patch whose hunks don't parse is reported
/// as unreadable instead.
pub async fn build<R: Request>(comparison: &CommitsComparison<R>) -> Result<Report, CompareError> {
    let summary = comparison.summary().await?;
    let base_sha = comparison
        .base_commit()
        .await?
        .get("sha")
        .and_then(Value::as_str)
        .map(shorten);
    let commits: Vec<String> = comparison
        .commits()
        .await?
        .iter()
        .map(short_sha)
        .collect();

    let mut files = Vec::new();
    for change in comparison.files().await? {
        let change = change?;
        let patch = match (&change.patch, change.hunks()) {
            (None, _) => PatchSummary::Missing,
            (Some(_), Ok(hunks)) => PatchSummary::Hunks(hunks.len()),
            (Some(_), Err(err)) => {
                warn!(file = %change.filename, error = %err, "patch does not parse");
                PatchSummary::Unreadable
            }
        };
        files.push(FileLine {
            filename: change.filename,
            previous_filename: change.previous_filename,
            status: change.status,
            additions: change.additions,
            deletions: change.deletions,
            changes: change.changes,
            patch,
        });
    }

    Ok(Report {
        repo: comparison.coordinates().to_string(),
        base: comparison.base().to_string(),
        head: comparison.head().to_string(),
        base_sha,
        status: summary.status,
        ahead_by: summary.ahead_by,
        behind_by: summary.behind_by,
        total_commits: summary
            .total_commits
            .unwrap_or(commits.len() as u64),
        html_url: summary.html_url,
        commits,
        additions: files.iter().map(|f| f.additions).sum(),
        deletions: files.iter().map(|f| f.deletions).sum(),
        files,
    })
}

/// Commits are opaque to the comparison; only `sha` is read here, and a
/// commit without one is shown as `?`.
fn short_sha(commit: &Value) -> String {
    commit
        .get("sha")
        .and_then(Value::as_str)
        .map(shorten)
        .unwrap_or_else(|| "?".to_string())
}

fn shorten(sha: &str) -> String {
    sha.chars().take(SHORT_SHA_LEN).collect()
}

/// `main` or `main (6dcb09b)` when the base commit's sha is known.
fn base_label(report: &Report) -> String {
    match &report.base_sha {
        Some(sha) => format!("{} ({})", report.base, sha),
        None => report.base.clone(),
    }
}

/// Output the report to terminal (default) or to a markdown file.
#[instrument(skip(report), fields(repo = %report.repo, files = report.files.len()))]
pub fn output(report: &Report, output_path: Option<&Path>) -> Result<(), ReportError> {
    match output_path {
        None => {
            debug!("writing report to terminal");
            print_terminal_report(report);
            Ok(())
        }
        Some(path) => {
            debug!(path = %path.display(), "writing report to file");
            write_markdown_report(report, path)
        }
    }
}

fn relation(report: &Report) -> String {
    let mut parts = Vec::new();
    if let Some(status) = report.status {
        parts.push(status.to_string());
    }
    if let Some(ahead) = report.ahead_by {
        parts.push(format!("ahead by {}", ahead));
    }
    if let Some(behind) = report.behind_by {
        parts.push(format!("behind by {}", behind));
    }
    parts.join(", ")
}

/// Format and print the report to the terminal with colors.
///
/// johndoe/my-repo: main (6dcb09b)...feature [ahead, ahead by 1]
/// Commits: 1 | Files changed: 1 | +7 -2
///
///   A bar/quux.txt  +7 -2 (9 changes, 1 hunk)
fn print_terminal_report(report: &Report) {
    println!();
    let relation = relation(report);
    let base = base_label(report);
    if relation.is_empty() {
        println!("{}: {}...{}", report.repo.bold(), base, report.head);
    } else {
        println!(
            "{}: {}...{} [{}]",
            report.repo.bold(),
            base,
            report.head,
            relation
        );
    }
    println!(
        "Commits: {} | Files changed: {} | {} {}",
        report.total_commits,
        report.files.len(),
        format!("+{}", report.additions).green(),
        format!("-{}", report.deletions).red()
    );
    println!();

    if report.files.is_empty() {
        println!("  No file changes.");
    }
    for file in &report.files {
        println!(
            "  {} {}  {} {} ({})",
            colorize_status(file.status),
            file.display_name(),
            format!("+{}", file.additions).green(),
            format!("-{}", file.deletions).red(),
            detail(file)
        );
    }
    println!();
}

/// Write the report as a markdown file.
fn write_markdown_report(report: &Report, path: &Path) -> Result<(), ReportError> {
    let mut md = String::new();
    md.push_str(&format!(
        "# {}: `{}...{}`\n\n",
        report.repo, report.base, report.head
    ));
    if let Some(sha) = &report.base_sha {
        md.push_str(&format!("**Base commit:** `{}`\n\n", sha));
    }
    let relation = relation(report);
    if !relation.is_empty() {
        md.push_str(&format!("**Status:** {}\n\n", relation));
    }
    md.push_str(&format!(
        "**Commits:** {} | **Files changed:** {} | **+{} -{}**\n\n",
        report.total_commits,
        report.files.len(),
        report.additions,
        report.deletions
    ));

    if let Some(url) = &report.html_url {
        md.push_str(&format!("[View on GitHub]({})\n\n", url));
    }

    if !report.commits.is_empty() {
        md.push_str("## Commits\n\n");
        for sha in &report.commits {
            md.push_str(&format!("- `{}`\n", sha));
        }
        md.push('\n');
    }

    md.push_str("## Files\n\n");
    if report.files.is_empty() {
        md.push_str("No file changes.\n");
    } else {
        md.push_str("| Status | File | + | - | Changes | Hunks |\n");
        md.push_str("|---|---|---|---|---|---|\n");
        for file in &report.files {
            md.push_str(&format!(
                "| {} | `{}` | {} | {} | {} | {} |\n",
                file.status,
                file.display_name(),
                file.additions,
                file.deletions,
                file.changes,
                file.patch
            ));
        }
    }

    std::fs::write(path, md)?;
    Ok(())
}

fn detail(file: &FileLine) -> String {
    match file.patch {
        PatchSummary::Hunks(1) => format!("{} changes, 1 hunk", file.changes),
        PatchSummary::Hunks(n) => format!("{} changes, {} hunks", file.changes, n),
        PatchSummary::Missing => format!("{} changes, no patch", file.changes),
        PatchSummary::Unreadable => format!("{} changes, unreadable patch", file.changes),
    }
}

fn colorize_status(status: Status) -> colored::ColoredString {
    let symbol = status.symbol().to_string();
    match status {
        Status::Added | Status::Copied => symbol.green().bold(),
        Status::Removed => symbol.red().bold(),
        Status::Modified | Status::Changed => symbol.yellow().bold(),
        Status::Renamed => symbol.cyan().bold(),
        Status::Unchanged => symbol.normal(),
    }
}
