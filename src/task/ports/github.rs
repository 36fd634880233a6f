//! GitHub collaborator port.

use super::CollaboratorError;
use crate::task::domain::{
    IssueRef, IssueSnapshot, OpenedPullRequest, PullRequestDraft, RepoContext, RepositoryFullName,
};
use async_trait::async_trait;

/// The subset of GitHub the pipeline relies on.
#[async_trait]
pub trait GitHubClient: Send + Sync {
    /// Fetches the title, body, and labels of an issue.
    ///
    /// # Errors
    ///
    /// Returns [`CollaboratorError`] when the issue cannot be fetched.
    async fn get_issue(&self, issue_ref: &IssueRef) -> Result<IssueSnapshot, CollaboratorError>;

    /// Fetches the repository context handed to planner and coder.
    ///
    /// # Errors
    ///
    /// Returns [`CollaboratorError`] when the repository cannot be read.
    async fn get_repo_context(
        &self,
        repository: &RepositoryFullName,
    ) -> Result<RepoContext, CollaboratorError>;

    /// Pushes the draft's diff to its head branch and opens a pull request.
    ///
    /// # Errors
    ///
    /// Returns [`CollaboratorError`] when the branch or pull request cannot
    /// be created.
    async fn open_pull_request(
        &self,
        draft: &PullRequestDraft,
    ) -> Result<OpenedPullRequest, CollaboratorError>;
}
