//! Pull request value objects exchanged with the GitHub collaborator.

use super::{BranchName, RepositoryFullName, Task, TaskDomainError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Web URL of an opened pull request.
///
/// # Examples
///
///     use autodev::task::domain::PullRequestUrl;
///
///     let url = PullRequestUrl::new("https://github.com/owner/repo/pull/7").expect("valid");
///     assert_eq!(url.as_str(), "https://github.com/owner/repo/pull/7");
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PullRequestUrl(String);

impl PullRequestUrl {
    /// Creates a validated pull request URL.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidPullRequestUrl`] unless the value is
    /// an `http` or `https` URL with a non-empty remainder.
    pub fn new(value: impl Into<String>) -> Result<Self, TaskDomainError> {
        let raw = value.into();
        let normalized = raw.trim();
        let remainder = normalized
            .strip_prefix("https://")
            .or_else(|| normalized.strip_prefix("http://"));
        let is_valid = remainder.is_some_and(|rest| {
            !rest.is_empty() && !rest.chars().any(char::is_whitespace)
        });

        if !is_valid {
            return Err(TaskDomainError::InvalidPullRequestUrl(raw));
        }
        Ok(Self(normalized.to_owned()))
    }

    /// Returns the URL as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PullRequestUrl {
    type Error = TaskDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PullRequestUrl> for String {
    fn from(value: PullRequestUrl) -> Self {
        value.0
    }
}

impl fmt::Display for PullRequestUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything the GitHub collaborator needs to open a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestDraft {
    /// Target repository.
    pub repository: RepositoryFullName,
    /// Head branch that will carry the change.
    pub head_branch: BranchName,
    /// Pull request title.
    pub title: String,
    /// Markdown pull request body.
    pub body: String,
    /// Unified diff to commit on the head branch.
    pub diff: String,
    /// Commit message for the change.
    pub commit_message: String,
}

impl PullRequestDraft {
    /// Builds a draft from a task's latest diff.
    ///
    /// Returns `None` when the task has no diff yet. A missing commit message
    /// falls back to one derived from the issue.
    #[must_use]
    pub fn for_task(task: &Task, head_branch: BranchName) -> Option<Self> {
        let diff = task.current_diff()?.to_owned();
        let issue_number = task.issue_ref().issue_number();
        let title = task.issue().title();
        let commit_message = task
            .commit_message()
            .filter(|message| !message.is_empty())
            .map_or_else(|| format!("Resolve #{issue_number}: {title}"), str::to_owned);

        Some(Self {
            repository: task.issue_ref().repository().clone(),
            head_branch,
            title: format!("[autodev] {title}"),
            body: task_body(task, &commit_message),
            diff,
            commit_message,
        })
    }
}

fn task_body(task: &Task, commit_message: &str) -> String {
    let issue_number = task.issue_ref().issue_number();
    let mut lines = vec![
        "## Summary".to_owned(),
        String::new(),
        format!("Automated change for #{issue_number}: {}", task.issue().title()),
        String::new(),
        format!("Closes #{issue_number}"),
    ];

    if let Some(plan) = task.plan() {
        if !plan.definition_of_done().is_empty() {
            lines.extend([String::new(), "### Definition of done".to_owned()]);
            lines.extend(
                plan.definition_of_done()
                    .iter()
                    .map(|criterion| format!("- [ ] {criterion}")),
            );
        }
        if !plan.target_files().is_empty() {
            lines.extend([String::new(), "### Files".to_owned()]);
            lines.extend(plan.target_files().iter().map(|file| format!("- `{file}`")));
        }
    }

    lines.extend([
        String::new(),
        "### Commit".to_owned(),
        String::new(),
        commit_message.to_owned(),
    ]);
    lines.join("\n")
}

/// Pull request opened by the GitHub collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedPullRequest {
    /// Pull request web URL.
    pub url: PullRequestUrl,
    /// Branch the pull request was opened from.
    pub branch_name: BranchName,
}
