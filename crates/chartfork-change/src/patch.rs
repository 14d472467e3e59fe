//! Unified diffs for a single file
//!
//! Diffs are produced with `similar` and replayed by a small applier that
//! understands the subset of the unified format `similar` emits, including
//! `\ No newline at end of file` markers.

use similar::TextDiff;

use crate::error::{ChangeError, Result};

/// Lines of context around each change
pub const CONTEXT_LINES: usize = 3;

/// Marker following a line that has no trailing newline
const MISSING_NEWLINE_MARKER: char = '\\';

/// Render the unified diff turning `old` into `new`
///
/// Returns an empty string when the contents are identical.
pub fn unified_diff(old: &str, new: &str, path: &str) -> String {
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(CONTEXT_LINES)
        .header(&format!("a/{}", path), &format!("b/{}", path))
        .to_string()
}

/// A line of a hunk, with its line terminator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HunkLine {
    Context(String),
    Removed(String),
    Added(String),
}

impl HunkLine {
    fn content_mut(&mut self) -> &mut String {
        match self {
            HunkLine::Context(s) | HunkLine::Removed(s) | HunkLine::Added(s) => s,
        }
    }
}

/// A contiguous group of changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub old_start: usize,
    pub old_len: usize,
    pub new_start: usize,
    pub new_len: usize,
    pub lines: Vec<HunkLine>,
}

impl Hunk {
    /// Lines the original file must contain
    fn old_lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(|line| match line {
            HunkLine::Context(s) | HunkLine::Removed(s) => Some(s.as_str()),
            HunkLine::Added(_) => None,
        })
    }

    /// Lines replacing them
    fn new_lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(|line| match line {
            HunkLine::Context(s) | HunkLine::Added(s) => Some(s.as_str()),
            HunkLine::Removed(_) => None,
        })
    }

    /// Zero-based line index the hunk is recorded at
    fn anchor(&self) -> usize {
        if self.old_len == 0 {
            self.old_start
        } else {
            self.old_start.saturating_sub(1)
        }
    }
}

/// A parsed unified diff for one file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilePatch {
    pub old_path: Option<String>,
    pub new_path: Option<String>,
    pub hunks: Vec<Hunk>,
}

impl FilePatch {
    /// Parse a unified diff; `path` is only used in error messages
    pub fn parse(text: &str, path: &str) -> Result<Self> {
        let parse_error = |message: String| ChangeError::PatchParse {
            path: path.to_string(),
            message,
        };

        let mut patch = FilePatch::default();
        let mut lines = text.split_inclusive('\n').peekable();

        while let Some(line) = lines.next() {
            if let Some(rest) = line.strip_prefix("--- ") {
                patch.old_path = Some(rest.trim_end().to_string());
                continue;
            }
            if let Some(rest) = line.strip_prefix("+++ ") {
                patch.new_path = Some(rest.trim_end().to_string());
                continue;
            }
            if !line.starts_with("@@ ") {
                continue;
            }

            let mut hunk = parse_hunk_header(line).map_err(parse_error)?;
            let mut old_left = hunk.old_len;
            let mut new_left = hunk.new_len;

            while old_left > 0 || new_left > 0 {
                let Some(body) = lines.next() else {
                    return Err(parse_error(format!(
                        "hunk {} ends early",
                        line.trim_end()
                    )));
                };
                if body.starts_with(MISSING_NEWLINE_MARKER) {
                    strip_newline(&mut hunk);
                    continue;
                }

                // Some editors strip the space of empty context lines
                let (tag, content) = if body == "\n" {
                    (' ', "\n")
                } else {
                    let mut chars = body.chars();
                    let tag = chars.next().unwrap_or(' ');
                    (tag, chars.as_str())
                };

                let counts = match tag {
                    ' ' => {
                        hunk.lines.push(HunkLine::Context(content.to_string()));
                        (1, 1)
                    }
                    '-' => {
                        hunk.lines.push(HunkLine::Removed(content.to_string()));
                        (1, 0)
                    }
                    '+' => {
                        hunk.lines.push(HunkLine::Added(content.to_string()));
                        (0, 1)
                    }
                    other => {
                        return Err(parse_error(format!(
                            "unexpected line prefix '{}' in hunk",
                            other
                        )));
                    }
                };

                old_left = old_left
                    .checked_sub(counts.0)
                    .ok_or_else(|| parse_error("hunk has more lines than its header".into()))?;
                new_left = new_left
                    .checked_sub(counts.1)
                    .ok_or_else(|| parse_error("hunk has more lines than its header".into()))?;
            }

            while lines
                .peek()
                .is_some_and(|next| next.starts_with(MISSING_NEWLINE_MARKER))
            {
                lines.next();
                strip_newline(&mut hunk);
            }

            patch.hunks.push(hunk);
        }

        Ok(patch)
    }

    /// Apply the patch to `original`; `path` is only used in error messages
    ///
    /// Each hunk is looked up at its recorded line first, then at growing
    /// distances from it, never before the end of the previous hunk.
    pub fn apply(&self, original: &str, path: &str) -> Result<String> {
        let old_lines: Vec<&str> = original.split_inclusive('\n').collect();
        let mut result = String::with_capacity(original.len());
        let mut cursor = 0usize;
        let mut offset = 0isize;

        for (index, hunk) in self.hunks.iter().enumerate() {
            let expected: Vec<&str> = hunk.old_lines().collect();
            let anchor = (hunk.anchor() as isize + offset).max(cursor as isize) as usize;

            let position = find_hunk(&old_lines, &expected, anchor, cursor).ok_or_else(|| {
                ChangeError::PatchConflict {
                    path: path.to_string(),
                    hunk: index + 1,
                }
            })?;

            for line in &old_lines[cursor..position] {
                result.push_str(line);
            }
            for line in hunk.new_lines() {
                result.push_str(line);
            }

            cursor = position + expected.len();
            offset = position as isize - hunk.anchor() as isize;
        }

        for line in &old_lines[cursor..] {
            result.push_str(line);
        }

        Ok(result)
    }
}

fn strip_newline(hunk: &mut Hunk) {
    if let Some(last) = hunk.lines.last_mut() {
        let content = last.content_mut();
        if content.ends_with('\n') {
            content.pop();
        }
    }
}

fn parse_hunk_header(line: &str) -> std::result::Result<Hunk, String> {
    let invalid = || format!("invalid hunk header: {}", line.trim_end());

    let rest = line.strip_prefix("@@ ").ok_or_else(invalid)?;
    let mut parts = rest.split_whitespace();
    let old = parts
        .next()
        .and_then(|p| p.strip_prefix('-'))
        .ok_or_else(invalid)?;
    let new = parts
        .next()
        .and_then(|p| p.strip_prefix('+'))
        .ok_or_else(invalid)?;

    let (old_start, old_len) = parse_range(old).ok_or_else(invalid)?;
    let (new_start, new_len) = parse_range(new).ok_or_else(invalid)?;

    Ok(Hunk {
        old_start,
        old_len,
        new_start,
        new_len,
        lines: Vec::new(),
    })
}

fn parse_range(range: &str) -> Option<(usize, usize)> {
    match range.split_once(',') {
        Some((start, len)) => Some((start.parse().ok()?, len.parse().ok()?)),
        None => Some((range.parse().ok()?, 1)),
    }
}

fn find_hunk(lines: &[&str], expected: &[&str], anchor: usize, min: usize) -> Option<usize> {
    let max_start = lines.len().checked_sub(expected.len())?;
    let matches_at =
        |pos: usize| pos >= min && pos <= max_start && lines[pos..pos + expected.len()] == *expected;

    if matches_at(anchor) {
        return Some(anchor);
    }
    for delta in 1..=lines.len() {
        if anchor >= delta && matches_at(anchor - delta) {
            return Some(anchor - delta);
        }
        if matches_at(anchor + delta) {
            return Some(anchor + delta);
        }
    }

    None
}
