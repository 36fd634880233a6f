//! Service layer for issue-to-task creation, lookup, and re-enqueueing.

use crate::task::{
    domain::{
        AttemptBudget, ExternalIssue, IssueNumber, IssueRef, IssueSnapshot, Task,
        TaskDomainError, TaskId,
    },
    ports::{CollaboratorError, GitHubClient, TaskRepository, TaskRepositoryError},
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Request payload for creating a task from external issue data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTaskFromIssueRequest {
    repository: String,
    issue_number: u64,
    title: String,
    body: Option<String>,
    labels: Vec<String>,
    parent_issue: Option<u64>,
    max_attempts: Option<u32>,
}

impl CreateTaskFromIssueRequest {
    /// Creates a request with required issue fields.
    #[must_use]
    pub fn new(repository: impl Into<String>, issue_number: u64, title: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            issue_number,
            title: title.into(),
            body: None,
            labels: Vec::new(),
            parent_issue: None,
            max_attempts: None,
        }
    }

    /// Sets the issue body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets issue labels.
    #[must_use]
    pub fn with_labels(mut self, labels: impl IntoIterator<Item = String>) -> Self {
        self.labels = labels.into_iter().collect();
        self
    }

    /// Marks the task as a sub-task of `parent_issue`.
    #[must_use]
    pub const fn with_parent_issue(mut self, parent_issue: u64) -> Self {
        self.parent_issue = Some(parent_issue);
        self
    }

    /// Overrides the service's default attempt budget for this task.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

/// Service-level errors for task lifecycle operations.
#[derive(Debug, Error)]
pub enum TaskLifecycleError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] TaskRepositoryError),
    /// Fetching issue data from GitHub failed.
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
}

/// Result type for task lifecycle service operations.
pub type TaskLifecycleResult<T> = Result<T, TaskLifecycleError>;

/// Task lifecycle service.
#[derive(Clone)]
pub struct TaskLifecycleService<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
    default_budget: AttemptBudget,
}

impl<R, C> TaskLifecycleService<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    /// Creates a new task lifecycle service with the default attempt budget.
    #[must_use]
    pub fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        Self {
            repository,
            clock,
            default_budget: AttemptBudget::default(),
        }
    }

    /// Sets the attempt budget given to tasks that do not override it.
    #[must_use]
    pub const fn with_default_budget(mut self, budget: AttemptBudget) -> Self {
        self.default_budget = budget;
        self
    }

    /// Creates a new `New` task from issue data.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Domain`] when input validation fails or
    /// [`TaskLifecycleError::Repository`] when the repository rejects the
    /// task, including when the issue already has a task.
    pub async fn create_from_issue(
        &self,
        request: CreateTaskFromIssueRequest,
    ) -> TaskLifecycleResult<Task> {
        let issue_ref = IssueRef::from_parts(&request.repository, request.issue_number)?;

        let mut snapshot = IssueSnapshot::new(request.title)?;
        if let Some(body) = request.body {
            snapshot = snapshot.with_body(body);
        }
        snapshot = snapshot.with_labels(request.labels);

        let budget = request
            .max_attempts
            .map(AttemptBudget::new)
            .transpose()?
            .unwrap_or(self.default_budget);
        let parent_issue = request.parent_issue.map(IssueNumber::new).transpose()?;

        let external_issue = ExternalIssue::new(issue_ref, snapshot);
        let task = match parent_issue {
            Some(parent) => Task::new_sub_task(&external_issue, parent, budget, &*self.clock),
            None => Task::new_from_issue(&external_issue, budget, &*self.clock),
        };
        self.repository.store(&task).await?;
        info!(
            task_id = %task.id(),
            issue = %task.issue_ref(),
            parent_issue = ?task.parent_issue().map(IssueNumber::value),
            max_attempts = task.max_attempts(),
            "task created from issue"
        );
        Ok(task)
    }

    /// Fetches an issue from GitHub and creates a task from it.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Collaborator`] when the issue cannot be
    /// fetched, otherwise the errors of [`Self::create_from_issue`].
    pub async fn create_from_github(
        &self,
        github: &dyn GitHubClient,
        repository: &str,
        issue_number: u64,
    ) -> TaskLifecycleResult<Task> {
        let issue_ref = IssueRef::from_parts(repository, issue_number)?;
        let snapshot = github.get_issue(&issue_ref).await?;

        let mut request = CreateTaskFromIssueRequest::new(repository, issue_number, snapshot.title())
            .with_labels(snapshot.labels().iter().cloned());
        if let Some(body) = snapshot.body() {
            request = request.with_body(body);
        }
        self.create_from_issue(request).await
    }

    /// Retrieves a task by its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Repository`] when the lookup fails.
    pub async fn find_by_id(&self, id: TaskId) -> TaskLifecycleResult<Option<Task>> {
        Ok(self.repository.find_by_id(id).await?)
    }

    /// Retrieves a task by issue reference.
    ///
    /// Returns `Ok(None)` when no task has been created from the issue.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Repository`] when the lookup fails.
    pub async fn find_by_issue_ref(
        &self,
        issue_ref: &IssueRef,
    ) -> TaskLifecycleResult<Option<Task>> {
        Ok(self.repository.find_by_issue_ref(issue_ref).await?)
    }

    /// Re-enqueues a `WaitingHuman` or `Failed` task with a fresh budget.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`] when the task does not exist
    /// and [`TaskDomainError::InvalidStateTransition`] when the task is in
    /// any other status.
    pub async fn requeue(&self, id: TaskId) -> TaskLifecycleResult<Task> {
        let mut task = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(TaskRepositoryError::NotFound(id))?;
        let previous = task.status();
        task.requeue(&*self.clock)?;
        self.repository.update(&task).await?;
        info!(
            task_id = %task.id(),
            from = %previous,
            to = %task.status(),
            "task re-enqueued"
        );
        Ok(task)
    }
}
