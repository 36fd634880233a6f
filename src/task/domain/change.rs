//! Typed payloads exchanged with the planning and coding collaborators.

use super::{IssueRef, IssueSnapshot, RepositoryFullName};
use serde::{Deserialize, Serialize};

const FENCE: &str = "```";
const DIFF_FENCE: &str = "```diff";

/// Repository snapshot handed to planning and coding collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoContext {
    repository: RepositoryFullName,
    default_branch: String,
    files: Vec<String>,
}

impl RepoContext {
    /// Creates a context for the repository's default branch.
    #[must_use]
    pub fn new(repository: RepositoryFullName, default_branch: impl Into<String>) -> Self {
        Self {
            repository,
            default_branch: default_branch.into(),
            files: Vec::new(),
        }
    }

    /// Sets the repository-relative file listing.
    #[must_use]
    pub fn with_files(mut self, files: impl IntoIterator<Item = String>) -> Self {
        self.files = files.into_iter().collect();
        self
    }

    /// Returns the repository identifier.
    #[must_use]
    pub const fn repository(&self) -> &RepositoryFullName {
        &self.repository
    }

    /// Returns the default branch name.
    #[must_use]
    pub fn default_branch(&self) -> &str {
        &self.default_branch
    }

    /// Returns the repository-relative file listing.
    #[must_use]
    pub fn files(&self) -> &[String] {
        &self.files
    }
}

/// Issue content submitted to the planning collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueContent {
    /// Issue being planned.
    pub issue_ref: IssueRef,
    /// Issue title and body.
    pub snapshot: IssueSnapshot,
    /// Repository the change targets.
    pub repo_context: RepoContext,
}

/// Diff and commit message produced by the coding collaborator.
///
/// Markdown code fences wrapped around the diff are removed on construction,
/// so downstream stages only ever see raw unified-diff text.
///
/// # Examples
///
///     use autodev::task::domain::CodeChange;
///
///     let change = CodeChange::new("```diff\n--- a/x\n+++ b/x\n```", "Fix x", vec![]);
///     assert_eq!(change.diff(), "--- a/x\n+++ b/x");
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeChange {
    diff: String,
    commit_message: String,
    files_modified: Vec<String>,
}

impl CodeChange {
    /// Creates a normalized code change.
    #[must_use]
    pub fn new(
        diff: impl Into<String>,
        commit_message: impl Into<String>,
        files_modified: Vec<String>,
    ) -> Self {
        Self {
            diff: strip_code_fences(&diff.into()),
            commit_message: commit_message.into().trim().to_owned(),
            files_modified,
        }
    }

    /// Returns the unified diff text.
    #[must_use]
    pub fn diff(&self) -> &str {
        &self.diff
    }

    /// Returns the commit message, possibly empty.
    #[must_use]
    pub fn commit_message(&self) -> &str {
        &self.commit_message
    }

    /// Returns the files the collaborator reports as modified.
    #[must_use]
    pub fn files_modified(&self) -> &[String] {
        &self.files_modified
    }

    /// Splits the change into its diff and commit message.
    #[must_use]
    pub fn into_parts(self) -> (String, String) {
        (self.diff, self.commit_message)
    }
}

fn strip_code_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_opening = trimmed
        .strip_prefix(DIFF_FENCE)
        .or_else(|| trimmed.strip_prefix(FENCE))
        .unwrap_or(trimmed);
    let without_closing = without_opening
        .strip_suffix(FENCE)
        .unwrap_or(without_opening);
    without_closing.trim().to_owned()
}
