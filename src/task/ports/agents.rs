//! Planning and coding collaborator ports.
//!
//! Both collaborators are external agents. Every error they return is
//! treated as retryable by the orchestrator and charged against the task's
//! attempt budget.

use crate::task::domain::{CodeChange, IssueContent, Plan, RepoContext};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by, or while talking to, an external collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollaboratorError {
    /// The collaborator could not be reached.
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    /// The collaborator refused or failed the request.
    #[error("collaborator rejected request: {0}")]
    Rejected(String),

    /// The collaborator answered with a payload that does not fit the contract.
    #[error("invalid collaborator response: {0}")]
    InvalidResponse(String),

    /// The collaborator did not answer in time.
    #[error("collaborator call timed out after {0:?}")]
    Timeout(Duration),
}

/// Produces an implementation plan from issue content.
#[async_trait]
pub trait Planner: Send + Sync {
    /// Analyzes the issue and returns a plan.
    ///
    /// # Errors
    ///
    /// Returns [`CollaboratorError`] when planning fails.
    async fn analyze(&self, issue: &IssueContent) -> Result<Plan, CollaboratorError>;
}

/// Produces a unified diff that implements a plan.
#[async_trait]
pub trait Coder: Send + Sync {
    /// Implements the plan against the repository.
    ///
    /// # Errors
    ///
    /// Returns [`CollaboratorError`] when no usable change was produced.
    async fn run(
        &self,
        plan: &Plan,
        repo_context: &RepoContext,
    ) -> Result<CodeChange, CollaboratorError>;
}
