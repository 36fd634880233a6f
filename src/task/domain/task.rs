//! Task aggregate root and its lifecycle status.

use super::{
    BranchName, ExternalIssue, IssueNumber, IssueRef, IssueSnapshot, OpenedPullRequest,
    ParseTaskStatusError, Plan, PullRequestUrl, TaskDomainError, TaskId,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Task has been created from an issue and awaits planning.
    New,
    /// Task was re-enqueued for a fresh plan.
    Planning,
    /// Task has a plan and awaits a code change.
    Coding,
    /// Task has a diff awaiting guardrail checks.
    Testing,
    /// A pull request has been opened for the task.
    PrCreated,
    /// Task needs a human decision before work can continue.
    WaitingHuman,
    /// Task exhausted its attempt budget.
    Failed,
    /// Task finished without its own pull request, or its PR was merged.
    Completed,
}

impl TaskStatus {
    /// Every status, in pipeline order.
    pub const ALL: [Self; 8] = [
        Self::New,
        Self::Planning,
        Self::Coding,
        Self::Testing,
        Self::PrCreated,
        Self::WaitingHuman,
        Self::Failed,
        Self::Completed,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Planning => "PLANNING",
            Self::Coding => "CODING",
            Self::Testing => "TESTING",
            Self::PrCreated => "PR_CREATED",
            Self::WaitingHuman => "WAITING_HUMAN",
            Self::Failed => "FAILED",
            Self::Completed => "COMPLETED",
        }
    }

    /// Returns `true` when the orchestrator takes no further automatic action.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::PrCreated | Self::WaitingHuman | Self::Failed | Self::Completed
        )
    }

    /// Returns `true` when moving from `self` to `target` is legal.
    ///
    /// Automatic transitions only leave non-terminal statuses. The edges out
    /// of `WaitingHuman`, `Failed`, and `PrCreated` are reserved for external
    /// re-triggers: re-enqueueing and merge confirmation.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::New, Self::Planning | Self::Coding | Self::Failed)
                | (Self::Planning, Self::Coding | Self::Failed)
                | (Self::Coding, Self::New | Self::Testing | Self::Failed)
                | (
                    Self::Testing,
                    Self::Coding
                        | Self::PrCreated
                        | Self::Completed
                        | Self::WaitingHuman
                        | Self::Failed
                )
                | (Self::WaitingHuman | Self::Failed, Self::Planning | Self::Coding)
                | (Self::PrCreated, Self::Completed)
        )
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseTaskStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| ParseTaskStatusError(value.to_owned()))
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maximum number of failed attempts a task may consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct AttemptBudget(u32);

impl AttemptBudget {
    /// Creates a validated attempt budget.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidAttemptBudget`] for zero.
    pub const fn new(max_attempts: u32) -> Result<Self, TaskDomainError> {
        if max_attempts == 0 {
            return Err(TaskDomainError::InvalidAttemptBudget);
        }
        Ok(Self(max_attempts))
    }

    /// Returns the maximum number of attempts.
    #[must_use]
    pub const fn max_attempts(self) -> u32 {
        self.0
    }
}

impl Default for AttemptBudget {
    fn default() -> Self {
        Self(3)
    }
}

impl TryFrom<u32> for AttemptBudget {
    type Error = TaskDomainError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AttemptBudget> for u32 {
    fn from(value: AttemptBudget) -> Self {
        value.0
    }
}

/// Result of charging a failure against the attempt budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Budget remains; the stage will be retried.
    WillRetry {
        /// Attempts left before the task is failed.
        remaining: u32,
    },
    /// Budget is spent and the task is now `Failed`.
    Exhausted,
}

/// Task aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    issue_ref: IssueRef,
    issue: IssueSnapshot,
    parent_issue: Option<IssueNumber>,
    status: TaskStatus,
    attempt_count: u32,
    max_attempts: u32,
    plan: Option<Plan>,
    branch_name: Option<BranchName>,
    pr_url: Option<PullRequestUrl>,
    current_diff: Option<String>,
    commit_message: Option<String>,
    last_error: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted task aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Originating issue.
    pub issue_ref: IssueRef,
    /// Issue content captured at creation time.
    pub issue: IssueSnapshot,
    /// Parent issue when the task is a sub-task of a batch.
    pub parent_issue: Option<IssueNumber>,
    /// Persisted status.
    pub status: TaskStatus,
    /// Failed attempts consumed so far.
    pub attempt_count: u32,
    /// Attempt budget.
    pub max_attempts: u32,
    /// Attached plan, if planning succeeded.
    pub plan: Option<Plan>,
    /// Head branch of the opened pull request.
    pub branch_name: Option<BranchName>,
    /// URL of the opened pull request.
    pub pr_url: Option<PullRequestUrl>,
    /// Latest diff produced by the coder.
    pub current_diff: Option<String>,
    /// Commit message accompanying the latest diff.
    pub commit_message: Option<String>,
    /// Most recent failure or escalation reason.
    pub last_error: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Latest update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a `New` task from issue data.
    #[must_use]
    pub fn new_from_issue(issue: &ExternalIssue, budget: AttemptBudget, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id: TaskId::new(),
            issue_ref: issue.issue_ref().clone(),
            issue: issue.snapshot().clone(),
            parent_issue: None,
            status: TaskStatus::New,
            attempt_count: 0,
            max_attempts: budget.max_attempts(),
            plan: None,
            branch_name: None,
            pr_url: None,
            current_diff: None,
            commit_message: None,
            last_error: None,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Creates a `New` sub-task whose result feeds the parent issue's batch.
    #[must_use]
    pub fn new_sub_task(
        issue: &ExternalIssue,
        parent_issue: IssueNumber,
        budget: AttemptBudget,
        clock: &impl Clock,
    ) -> Self {
        let mut task = Self::new_from_issue(issue, budget, clock);
        task.parent_issue = Some(parent_issue);
        task
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            issue_ref: data.issue_ref,
            issue: data.issue,
            parent_issue: data.parent_issue,
            status: data.status,
            attempt_count: data.attempt_count,
            max_attempts: data.max_attempts,
            plan: data.plan,
            branch_name: data.branch_name,
            pr_url: data.pr_url,
            current_diff: data.current_diff,
            commit_message: data.commit_message,
            last_error: data.last_error,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the originating issue reference.
    #[must_use]
    pub const fn issue_ref(&self) -> &IssueRef {
        &self.issue_ref
    }

    /// Returns the issue content captured at creation.
    #[must_use]
    pub const fn issue(&self) -> &IssueSnapshot {
        &self.issue
    }

    /// Returns the parent issue for batch sub-tasks.
    #[must_use]
    pub const fn parent_issue(&self) -> Option<IssueNumber> {
        self.parent_issue
    }

    /// Returns `true` when the task contributes to a parent batch.
    #[must_use]
    pub const fn is_sub_task(&self) -> bool {
        self.parent_issue.is_some()
    }

    /// Returns the current status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the failed attempts consumed so far.
    #[must_use]
    pub const fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    /// Returns the attempt budget.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the attached plan, if any.
    #[must_use]
    pub const fn plan(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }

    /// Returns the pull request head branch, if any.
    #[must_use]
    pub const fn branch_name(&self) -> Option<&BranchName> {
        self.branch_name.as_ref()
    }

    /// Returns the pull request URL, if any.
    #[must_use]
    pub const fn pr_url(&self) -> Option<&PullRequestUrl> {
        self.pr_url.as_ref()
    }

    /// Returns the latest diff, if any.
    #[must_use]
    pub fn current_diff(&self) -> Option<&str> {
        self.current_diff.as_deref()
    }

    /// Returns the commit message for the latest diff, if any.
    #[must_use]
    pub fn commit_message(&self) -> Option<&str> {
        self.commit_message.as_deref()
    }

    /// Returns the most recent failure or escalation reason.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Moves the task to `target` after checking the transition table.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStateTransition`] and leaves the
    /// task untouched when the transition is illegal.
    pub fn transition_to(
        &mut self,
        target: TaskStatus,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        self.ensure_transition(target)?;
        self.status = target;
        self.touch(clock);
        Ok(())
    }

    /// Attaches a plan and moves the task to `Coding`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStateTransition`] unless the task is
    /// `New` or `Planning`.
    pub fn attach_plan(&mut self, plan: Plan, clock: &impl Clock) -> Result<(), TaskDomainError> {
        self.ensure_transition(TaskStatus::Coding)?;
        if !matches!(self.status, TaskStatus::New | TaskStatus::Planning) {
            return Err(self.invalid_transition(TaskStatus::Coding));
        }
        self.plan = Some(plan);
        self.last_error = None;
        self.status = TaskStatus::Coding;
        self.touch(clock);
        Ok(())
    }

    /// Records the coder's diff and moves the task to `Testing`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStateTransition`] unless the task is
    /// `Coding`.
    pub fn attach_change(
        &mut self,
        diff: String,
        commit_message: String,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        self.ensure_transition(TaskStatus::Testing)?;
        self.current_diff = Some(diff);
        self.commit_message = Some(commit_message);
        self.last_error = None;
        self.status = TaskStatus::Testing;
        self.touch(clock);
        Ok(())
    }

    /// Records the opened pull request and moves the task to `PrCreated`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStateTransition`] unless the task is
    /// `Testing`.
    pub fn record_pull_request(
        &mut self,
        pull_request: OpenedPullRequest,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        self.ensure_transition(TaskStatus::PrCreated)?;
        self.pr_url = Some(pull_request.url);
        self.branch_name = Some(pull_request.branch_name);
        self.status = TaskStatus::PrCreated;
        self.touch(clock);
        Ok(())
    }

    /// Hands the task to a human, bypassing the attempt budget.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStateTransition`] unless the task is
    /// `Testing`.
    pub fn escalate(
        &mut self,
        reason: impl Into<String>,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        self.ensure_transition(TaskStatus::WaitingHuman)?;
        self.last_error = Some(reason.into());
        self.status = TaskStatus::WaitingHuman;
        self.touch(clock);
        Ok(())
    }

    /// Charges one failed attempt against the budget.
    ///
    /// The task stays in its current status while budget remains. The
    /// failure that spends the last attempt moves the task to `Failed`, so
    /// `attempt_count` never exceeds `max_attempts`. Terminal tasks are left
    /// untouched and report [`FailureOutcome::Exhausted`].
    ///
    /// The budget is inclusive: the task fails once `attempt_count` reaches
    /// `max_attempts`, so a budget of three allows exactly three failed
    /// attempts and a budget of one fails on the first.
    pub fn record_failure(&mut self, reason: impl Into<String>, clock: &impl Clock) -> FailureOutcome {
        if self.status.is_terminal() {
            return FailureOutcome::Exhausted;
        }

        self.attempt_count = self.attempt_count.saturating_add(1).min(self.max_attempts);
        self.last_error = Some(reason.into());
        self.touch(clock);

        if self.attempt_count >= self.max_attempts {
            self.status = TaskStatus::Failed;
            return FailureOutcome::Exhausted;
        }
        FailureOutcome::WillRetry {
            remaining: self.max_attempts.saturating_sub(self.attempt_count),
        }
    }

    /// Charges one failed attempt and, if budget remains, moves the task back
    /// to `retry_status`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStateTransition`] when the retry
    /// target is not reachable from the current status; nothing is charged.
    pub fn record_failure_and_retry_from(
        &mut self,
        retry_status: TaskStatus,
        reason: impl Into<String>,
        clock: &impl Clock,
    ) -> Result<FailureOutcome, TaskDomainError> {
        self.ensure_transition(retry_status)?;
        let outcome = self.record_failure(reason, clock);
        if matches!(outcome, FailureOutcome::WillRetry { .. }) {
            self.status = retry_status;
        }
        Ok(outcome)
    }

    /// Fails the task immediately, regardless of remaining budget.
    ///
    /// Used when the task record itself is inconsistent and retrying cannot
    /// help. Terminal tasks are left untouched.
    pub fn force_fail(&mut self, reason: impl Into<String>, clock: &impl Clock) {
        if self.status.is_terminal() {
            return;
        }
        self.last_error = Some(reason.into());
        self.status = TaskStatus::Failed;
        self.touch(clock);
    }

    /// Re-enqueues a `WaitingHuman` or `Failed` task with a fresh budget.
    ///
    /// Tasks that already hold a plan resume at `Coding`; others go back to
    /// `Planning`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStateTransition`] for any other
    /// status.
    pub fn requeue(&mut self, clock: &impl Clock) -> Result<(), TaskDomainError> {
        let target = if self.plan.is_some() {
            TaskStatus::Coding
        } else {
            TaskStatus::Planning
        };
        if !matches!(self.status, TaskStatus::WaitingHuman | TaskStatus::Failed) {
            return Err(self.invalid_transition(target));
        }
        self.transition_to(target, clock)?;
        self.attempt_count = 0;
        self.last_error = None;
        Ok(())
    }

    fn ensure_transition(&self, target: TaskStatus) -> Result<(), TaskDomainError> {
        if self.status.can_transition_to(target) {
            Ok(())
        } else {
            Err(self.invalid_transition(target))
        }
    }

    const fn invalid_transition(&self, target: TaskStatus) -> TaskDomainError {
        TaskDomainError::InvalidStateTransition {
            task_id: self.id,
            from: self.status,
            to: target,
        }
    }

    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}
