use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}: {line:?}")]
pub struct PatchError {
    pub reason: &'static str,
    /// The offending hunk header
    pub line: String,
}

/// A contiguous region of changes within a file patch.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(dead_code)] // Ranges and lines are parsed in full; the report only counts hunks
pub struct Hunk {
    /// Starting line number in the base file
    pub old_start: usize,
    /// Number of lines in the base file
    pub old_count: usize,
    /// Starting line number in the head file
    pub new_start: usize,
    /// Number of lines in the head file
    pub new_count: usize,
    /// Raw lines of the hunk (prefixed with +, -, or space)
    pub lines: Vec<String>,
}

/// Parse the `patch` text GitHub attaches to a file change.
///
/// Unlike a full unified diff there are no `diff --git` or `---`/`+++`
/// headers; the text starts directly with a hunk header:
///   @@ -{old_start},{old_count} +{new_start},{new_count} @@ optional context
///
/// Lines are prefixed with '+', '-' or ' '. `\ No newline at end of file`
/// markers are skipped.
pub fn parse_patch(patch: &str) -> Result<Vec<Hunk>, PatchError> {
    let mut hunks: Vec<Hunk> = Vec::new();

    for line in patch.lines() {
        if line.starts_with("@@") {
            hunks.push(parse_hunk_header(line)?);
        } else if line.starts_with(['+', '-', ' ']) {
            // Text before the first header has no hunk to land in.
            if let Some(hunk) = hunks.last_mut() {
                hunk.lines.push(line.to_string());
            }
        }
    }

    Ok(hunks)
}

/// `@@ -12,3 +12,4 @@ context` → an empty hunk with both ranges set.
/// A range without a count (`-20`) covers a single line.
fn parse_hunk_header(line: &str) -> Result<Hunk, PatchError> {
    let fail = |reason| PatchError {
        reason,
        line: line.to_string(),
    };

    let inner = line
        .strip_prefix("@@")
        .and_then(|rest| rest.split_once("@@"))
        .map(|(ranges, _context)| ranges)
        .ok_or_else(|| fail("unterminated hunk header"))?;

    let mut ranges = [(0usize, 0usize); 2];
    let mut parts = inner.split_whitespace();
    for (slot, sign) in ranges.iter_mut().zip(['-', '+']) {
        let spec = parts
            .next()
            .and_then(|part| part.strip_prefix(sign))
            .ok_or_else(|| fail("missing hunk range"))?;
        let (start, count) = spec.split_once(',').unwrap_or((spec, "1"));
        *slot = match (start.parse::<usize>(), count.parse::<usize>()) {
            (Ok(start), Ok(count)) => (start, count),
            _ => return Err(fail("non-numeric hunk range")),
        };
    }
    let [(old_start, old_count), (new_start, new_count)] = ranges;

    Ok(Hunk {
        old_start,
        old_count,
        new_start,
        new_count,
        lines: Vec::new(),
    })
}
