//! Unified diff parsing.
//!
//! Converts unified-diff text into per-file records holding the reconstructed
//! old and new content covered by the diff's hunks. Hunk boundaries are not
//! preserved: every body line is appended to the buffers of the file record
//! that is current when the line is read.

use serde::{Deserialize, Serialize};

const OLD_FILE_HEADER: &str = "--- ";
const NEW_FILE_HEADER: &str = "+++ ";
const HUNK_HEADER: &str = "@@";
const DELETION_SENTINEL: &str = "/dev/null";

/// Before/after content for one file touched by a unified diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiff {
    filename: String,
    old_content: String,
    new_content: String,
    is_new_file: bool,
    is_deleted_file: bool,
}

impl FileDiff {
    fn from_old_header(path: &str) -> Self {
        let is_new_file = path == DELETION_SENTINEL;
        Self {
            filename: strip_side_prefix(path, "a/").to_owned(),
            old_content: String::new(),
            new_content: String::new(),
            is_new_file,
            is_deleted_file: false,
        }
    }

    /// Returns the repository-relative path of the file.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Returns the old content reconstructed from context and removed lines.
    #[must_use]
    pub fn old_content(&self) -> &str {
        &self.old_content
    }

    /// Returns the new content reconstructed from context and added lines.
    #[must_use]
    pub fn new_content(&self) -> &str {
        &self.new_content
    }

    /// Returns `true` when the diff creates the file (`--- /dev/null`).
    #[must_use]
    pub const fn is_new_file(&self) -> bool {
        self.is_new_file
    }

    /// Returns `true` when the diff deletes the file (`+++ /dev/null`).
    #[must_use]
    pub const fn is_deleted_file(&self) -> bool {
        self.is_deleted_file
    }

    fn refine_target(&mut self, path: &str) {
        if path == DELETION_SENTINEL {
            self.is_deleted_file = true;
            return;
        }
        self.filename = strip_side_prefix(path, "b/").to_owned();
    }

    fn push_old(&mut self, line: &str) {
        self.old_content.push_str(line);
        self.old_content.push('\n');
    }

    fn push_new(&mut self, line: &str) {
        self.new_content.push_str(line);
        self.new_content.push('\n');
    }
}

/// Parses unified-diff text into ordered per-file records.
///
/// A `--- ` header starts a new record and flushes the previous one. A
/// `+++ ` header refines the filename unless it names `/dev/null`. Hunk
/// headers carry no content. Body lines starting with `+`, `-`, or a space
/// are appended (without the marker) to the new buffer, the old buffer, or
/// both; every other line is ignored.
///
/// Text without any `--- ` header yields an empty list, in which case the
/// caller should treat the diff as opaque.
///
/// # Examples
///
///     use autodev::diff::parse_unified_diff;
///
///     let diff = "--- a/src/lib.rs\n+++ b/src/lib.rs\n@@ -1 +1 @@\n-old\n+new\n";
///     let files = parse_unified_diff(diff);
///     assert_eq!(files.len(), 1);
///     assert_eq!(files[0].filename(), "src/lib.rs");
///     assert_eq!(files[0].new_content(), "new\n");
#[must_use]
pub fn parse_unified_diff(diff_text: &str) -> Vec<FileDiff> {
    let mut files = Vec::new();
    let mut current: Option<FileDiff> = None;

    for line in diff_text.lines() {
        if let Some(path) = line.strip_prefix(OLD_FILE_HEADER) {
            if let Some(finished) = current.take() {
                files.push(finished);
            }
            current = Some(FileDiff::from_old_header(header_path(path)));
            continue;
        }

        let Some(file) = current.as_mut() else {
            continue;
        };

        if let Some(path) = line.strip_prefix(NEW_FILE_HEADER) {
            file.refine_target(header_path(path));
        } else if line.starts_with(HUNK_HEADER) {
            // Hunk ranges are not needed to rebuild content.
        } else if let Some(added) = line.strip_prefix('+') {
            file.push_new(added);
        } else if let Some(removed) = line.strip_prefix('-') {
            file.push_old(removed);
        } else if let Some(context) = line.strip_prefix(' ') {
            file.push_old(context);
            file.push_new(context);
        }
    }

    if let Some(finished) = current {
        files.push(finished);
    }
    files
}

/// Counts added and removed body lines, excluding file headers.
///
/// # Examples
///
///     use autodev::diff::count_changed_lines;
///
///     let diff = "--- a/a.txt\n+++ b/a.txt\n@@ -1 +1,2 @@\n-x\n+y\n+z\n";
///     assert_eq!(count_changed_lines(diff), 3);
#[must_use]
pub fn count_changed_lines(diff_text: &str) -> usize {
    diff_text
        .lines()
        .filter(|line| {
            let is_header = line.starts_with(OLD_FILE_HEADER) || line.starts_with(NEW_FILE_HEADER);
            !is_header && (line.starts_with('+') || line.starts_with('-'))
        })
        .count()
}

/// Drops any tab-separated timestamp that some tools append to header paths.
fn header_path(raw: &str) -> &str {
    raw.split('\t').next().unwrap_or(raw).trim_end()
}

fn strip_side_prefix<'a>(path: &'a str, prefix: &str) -> &'a str {
    path.strip_prefix(prefix).unwrap_or(path)
}
