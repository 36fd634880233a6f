//! Error types for task domain validation and parsing.

use super::{TaskId, TaskStatus};
use thiserror::Error;

/// Errors returned while constructing or mutating domain task values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// The repository name does not follow `owner/repo` format.
    #[error("invalid repository name '{0}', expected owner/repo")]
    InvalidRepository(String),

    /// The issue number is invalid.
    #[error("invalid issue number {0}, expected a positive integer")]
    InvalidIssueNumber(u64),

    /// The issue title is empty after trimming.
    #[error("issue title must not be empty")]
    EmptyIssueTitle,

    /// The branch name violates naming constraints.
    #[error("invalid branch name: '{0}'")]
    InvalidBranchName(String),

    /// The pull request URL is not an `http(s)` URL.
    #[error("invalid pull request URL: '{0}'")]
    InvalidPullRequestUrl(String),

    /// The complexity label is unknown.
    #[error("unknown complexity '{0}', expected low, medium, or high")]
    InvalidComplexity(String),

    /// The confidence exceeds 100 percent.
    #[error("invalid confidence {0}, expected a percentage between 0 and 100")]
    InvalidConfidence(u8),

    /// The attempt budget is zero.
    #[error("max attempts must be at least 1")]
    InvalidAttemptBudget,

    /// The requested status change is not a legal transition.
    #[error("task {task_id} cannot transition from {from} to {to}")]
    InvalidStateTransition {
        /// Task being transitioned.
        task_id: TaskId,
        /// Current status.
        from: TaskStatus,
        /// Requested status.
        to: TaskStatus,
    },
}

/// Error returned while parsing task statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task status: {0}")]
pub struct ParseTaskStatusError(pub String);
