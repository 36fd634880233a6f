//! Domain model for automated ticket resolution.
//!
//! The task domain models the issue-origin task record, its pipeline status
//! and attempt budget, and the typed payloads exchanged with collaborators,
//! keeping all infrastructure concerns outside of the domain boundary.

mod branch;
mod change;
mod error;
mod ids;
mod issue;
mod plan;
mod pull_request;
mod task;

pub use branch::BranchName;
pub use change::{CodeChange, IssueContent, RepoContext};
pub use error::{ParseTaskStatusError, TaskDomainError};
pub use ids::{IssueNumber, RepositoryFullName, TaskId};
pub use issue::{ExternalIssue, IssueRef, IssueSnapshot};
pub use plan::{Complexity, Confidence, Plan};
pub use pull_request::{OpenedPullRequest, PullRequestDraft, PullRequestUrl};
pub use task::{AttemptBudget, FailureOutcome, PersistedTaskData, Task, TaskStatus};
