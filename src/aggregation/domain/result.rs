//! Per-sub-task results fed into aggregation.

use crate::task::domain::{IssueNumber, Task, TaskId, TaskStatus};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of one sub-task as seen by the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubTaskStatus {
    /// The sub-task produced a diff that passed its guardrails.
    Completed,
    /// The sub-task did not produce a usable diff.
    Failed,
}

impl SubTaskStatus {
    /// Returns the lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SubTaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of one sub-task's contribution to a batch.
///
/// # Examples
///
/// ```
/// use autodev::aggregation::domain::{SubTaskResult, SubTaskStatus};
/// use autodev::task::domain::{IssueNumber, TaskId};
///
/// let issue = IssueNumber::new(12).expect("valid issue number");
/// let result = SubTaskResult::completed(TaskId::new(), issue, "Add header", "+x\n")
///     .with_commit_message("Add header")
///     .with_target_files(vec!["src/http.rs".to_owned()]);
///
/// assert_eq!(result.status(), SubTaskStatus::Completed);
/// assert_eq!(result.target_files(), ["src/http.rs"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubTaskResult {
    task_id: TaskId,
    issue_number: IssueNumber,
    issue_title: String,
    diff: String,
    commit_message: String,
    target_files: Vec<String>,
    status: SubTaskStatus,
    error: Option<String>,
}

impl SubTaskResult {
    /// Creates a completed result carrying `diff`.
    #[must_use]
    pub fn completed(
        task_id: TaskId,
        issue_number: IssueNumber,
        issue_title: impl Into<String>,
        diff: impl Into<String>,
    ) -> Self {
        Self {
            task_id,
            issue_number,
            issue_title: issue_title.into(),
            diff: diff.into(),
            commit_message: String::new(),
            target_files: Vec::new(),
            status: SubTaskStatus::Completed,
            error: None,
        }
    }

    /// Creates a failed result with its error text.
    #[must_use]
    pub fn failed(
        task_id: TaskId,
        issue_number: IssueNumber,
        issue_title: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            task_id,
            issue_number,
            issue_title: issue_title.into(),
            diff: String::new(),
            commit_message: String::new(),
            target_files: Vec::new(),
            status: SubTaskStatus::Failed,
            error: Some(error.into()),
        }
    }

    /// Converts a driven sub-task into a result.
    ///
    /// `Completed` and `PrCreated` tasks count as completed. Every other
    /// status counts as failed; a task that never reached a terminal status
    /// is reported as such.
    #[must_use]
    pub fn from_task(task: &Task) -> Self {
        let issue_number = task.issue_ref().issue_number();
        let title = task.issue().title();
        let status = task.status();

        let result = if matches!(status, TaskStatus::Completed | TaskStatus::PrCreated) {
            Self::completed(
                task.id(),
                issue_number,
                title,
                task.current_diff().unwrap_or_default(),
            )
            .with_commit_message(task.commit_message().unwrap_or_default())
        } else if status.is_terminal() {
            let error = task
                .last_error()
                .map_or_else(|| format!("task ended in status {status}"), str::to_owned);
            Self::failed(task.id(), issue_number, title, error)
        } else {
            let error = task.last_error().map_or_else(
                || format!("task did not reach a terminal state (last status {status})"),
                |last| {
                    format!("task did not reach a terminal state (last status {status}): {last}")
                },
            );
            Self::failed(task.id(), issue_number, title, error)
        };

        match task.plan() {
            Some(plan) => result.with_target_files(plan.target_files().iter().cloned()),
            None => result,
        }
    }

    /// Sets the commit message.
    #[must_use]
    pub fn with_commit_message(mut self, commit_message: impl Into<String>) -> Self {
        self.commit_message = commit_message.into();
        self
    }

    /// Sets the files the sub-task's plan targeted, in plan order.
    #[must_use]
    pub fn with_target_files(mut self, target_files: impl IntoIterator<Item = String>) -> Self {
        self.target_files = target_files.into_iter().collect();
        self
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the sub-task's issue number.
    #[must_use]
    pub const fn issue_number(&self) -> IssueNumber {
        self.issue_number
    }

    /// Returns the sub-task's issue title.
    #[must_use]
    pub fn issue_title(&self) -> &str {
        &self.issue_title
    }

    /// Returns the diff text; empty for failed sub-tasks.
    #[must_use]
    pub fn diff(&self) -> &str {
        &self.diff
    }

    /// Returns the commit message.
    #[must_use]
    pub fn commit_message(&self) -> &str {
        &self.commit_message
    }

    /// Returns the planned target files.
    #[must_use]
    pub fn target_files(&self) -> &[String] {
        &self.target_files
    }

    /// Returns the outcome.
    #[must_use]
    pub const fn status(&self) -> SubTaskStatus {
        self.status
    }

    /// Returns `true` for completed results.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == SubTaskStatus::Completed
    }

    /// Returns the error text of a failed result.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
