//! Concurrent execution of sibling sub-tasks and their single pull request.

use super::{DiffAggregator, PrBodyError};
use crate::aggregation::domain::{AggregationInput, AggregationOutput, SubTaskResult};
use crate::task::{
    domain::{
        BranchName, ExternalIssue, IssueRef, OpenedPullRequest, PullRequestDraft, Task, TaskId,
    },
    ports::{CollaboratorError, TaskRepository},
    services::{DriveError, TaskDriver, bounded_call},
};
use mockable::Clock;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{info, instrument, warn};

/// Errors that abort a batch.
#[derive(Debug, Error)]
pub enum BatchError {
    /// A task handed to the batch is not a sub-task of the parent issue.
    #[error("task {task_id} is not a sub-task of {parent}")]
    ForeignSubTask {
        /// Offending task.
        task_id: TaskId,
        /// Parent issue of the batch.
        parent: IssueRef,
    },
    /// Driving a sub-task failed to persist its progress.
    #[error(transparent)]
    Drive(#[from] DriveError),
    /// A sub-task worker panicked or was aborted.
    #[error("sub-task worker did not complete: {0}")]
    Worker(String),
    /// The aggregated pull request body could not be rendered.
    #[error(transparent)]
    Render(#[from] PrBodyError),
}

/// Final state of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Sub-tasks as last persisted, in input order.
    pub tasks: Vec<Task>,
    /// Aggregation inputs derived from the sub-tasks.
    pub results: Vec<SubTaskResult>,
    /// Number of completed sub-tasks.
    pub completed: usize,
    /// Number of failed sub-tasks.
    pub failed: usize,
    /// Reasons the batch was not aggregated; empty when it was.
    pub validation_errors: Vec<String>,
    /// Aggregated changeset when two or more sub-tasks completed.
    pub aggregation: Option<AggregationOutput>,
    /// Pull request opened for the batch.
    pub pull_request: Option<OpenedPullRequest>,
    /// Why opening the pull request failed, if it did.
    pub pull_request_error: Option<CollaboratorError>,
}

impl BatchOutcome {
    /// Returns `true` when every sub-task completed and a pull request was
    /// opened.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.failed == 0 && self.pull_request.is_some()
    }
}

/// Drives a parent issue's sub-tasks and opens one pull request for them.
pub struct BatchService<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    driver: TaskDriver<R, C>,
    aggregator: DiffAggregator,
}

impl<R, C> BatchService<R, C>
where
    R: TaskRepository + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a batch service.
    #[must_use]
    pub const fn new(driver: TaskDriver<R, C>, aggregator: DiffAggregator) -> Self {
        Self { driver, aggregator }
    }

    /// Runs every sub-task to completion and opens the batch pull request.
    ///
    /// Sub-tasks run concurrently, each owned by its own tokio task. The
    /// batch is aggregated only after every driver has returned. A sub-task
    /// left non-terminal by its driver counts as failed and blocks the batch:
    /// it is reported in `validation_errors` and no pull request is opened.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::ForeignSubTask`] before any work starts when a
    /// task belongs to another parent, and [`BatchError::Drive`],
    /// [`BatchError::Worker`], or [`BatchError::Render`] when the batch
    /// cannot be carried through. Every worker is joined before a drive or
    /// worker error is returned.
    #[instrument(skip_all, fields(parent = %parent.issue_ref(), sub_tasks = sub_tasks.len()))]
    pub async fn run_batch(
        &self,
        parent: &ExternalIssue,
        sub_tasks: Vec<Task>,
    ) -> Result<BatchOutcome, BatchError> {
        ensure_sub_tasks_of(parent.issue_ref(), &sub_tasks)?;

        let tasks = self.drive_all(sub_tasks).await?;
        let results: Vec<SubTaskResult> = tasks.iter().map(SubTaskResult::from_task).collect();
        let completed = results.iter().filter(|result| result.is_completed()).count();
        let mut outcome = BatchOutcome {
            failed: results.len() - completed,
            completed,
            tasks,
            results,
            validation_errors: Vec::new(),
            aggregation: None,
            pull_request: None,
            pull_request_error: None,
        };

        let unfinished: Vec<String> = outcome
            .tasks
            .iter()
            .filter(|task| !task.status().is_terminal())
            .map(|task| {
                format!(
                    "Sub-task #{} did not reach a terminal state",
                    task.issue_ref().issue_number()
                )
            })
            .collect();
        if !unfinished.is_empty() {
            warn!(errors = ?unfinished, "batch has unfinished sub-tasks, nothing aggregated");
            outcome.validation_errors = unfinished;
            return Ok(outcome);
        }

        let report = DiffAggregator::validate(&outcome.results);
        if !report.is_valid() {
            warn!(errors = ?report.errors(), "batch failed validation, nothing aggregated");
            outcome.validation_errors = report.into_errors();
            return Ok(outcome);
        }

        let head_branch = BranchName::for_batch(parent.issue_ref().issue_number());
        let draft = if DiffAggregator::should_aggregate(&outcome.results) {
            let aggregation = self.aggregator.aggregate(&AggregationInput {
                parent_issue_number: parent.issue_ref().issue_number(),
                parent_issue_title: parent.snapshot().title().to_owned(),
                repository: parent.issue_ref().repository().clone(),
                sub_tasks: outcome.results.clone(),
            })?;
            let aggregated_draft = PullRequestDraft {
                repository: parent.issue_ref().repository().clone(),
                head_branch,
                title: aggregation.pr_title().to_owned(),
                body: aggregation.pr_body().to_owned(),
                diff: DiffAggregator::combined_diff(&outcome.results),
                commit_message: format!(
                    "Resolve #{}: {}",
                    parent.issue_ref().issue_number(),
                    aggregation.pr_title()
                ),
            };
            outcome.aggregation = Some(aggregation);
            Some(aggregated_draft)
        } else {
            outcome
                .tasks
                .iter()
                .zip(&outcome.results)
                .find(|(_, result)| result.is_completed())
                .and_then(|(task, _)| PullRequestDraft::for_task(task, head_branch))
        };

        let Some(pull_request_draft) = draft else {
            outcome
                .validation_errors
                .push("No diff available for the batch pull request".to_owned());
            return Ok(outcome);
        };
        self.open_pull_request(&pull_request_draft, &mut outcome).await;
        Ok(outcome)
    }

    async fn drive_all(&self, sub_tasks: Vec<Task>) -> Result<Vec<Task>, BatchError> {
        let total = sub_tasks.len();
        let mut join_set = JoinSet::new();
        for (index, task) in sub_tasks.into_iter().enumerate() {
            let driver = self.driver.clone();
            join_set.spawn(async move { (index, driver.drive(task).await) });
        }

        // Every worker is joined, even after a failure, so no sibling is
        // aborted between a step and its update.
        let mut slots: Vec<Option<Task>> = vec![None; total];
        let mut first_error: Option<BatchError> = None;
        while let Some(joined) = join_set.join_next().await {
            let settled = match joined {
                Ok((index, Ok(drive))) => Ok((index, drive.task)),
                Ok((_, Err(err))) => Err(BatchError::Drive(err)),
                Err(err) => Err(BatchError::Worker(err.to_string())),
            };
            match settled {
                Ok((index, task)) => {
                    if let Some(slot) = slots.get_mut(index) {
                        *slot = Some(task);
                    }
                }
                Err(err) => {
                    warn!(error = %err, "sub-task worker failed");
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }
        if let Some(err) = first_error {
            return Err(err);
        }

        slots
            .into_iter()
            .map(|slot| slot.ok_or_else(|| BatchError::Worker("sub-task result missing".to_owned())))
            .collect()
    }

    async fn open_pull_request(&self, draft: &PullRequestDraft, outcome: &mut BatchOutcome) {
        let orchestrator = self.driver.orchestrator();
        let result = bounded_call(
            orchestrator.settings().collaborator_timeout,
            orchestrator.collaborators().github.open_pull_request(draft),
        )
        .await;

        match result {
            Ok(pull_request) => {
                info!(
                    url = %pull_request.url,
                    branch = %pull_request.branch_name,
                    completed = outcome.completed,
                    failed = outcome.failed,
                    "batch pull request opened"
                );
                outcome.pull_request = Some(pull_request);
            }
            Err(err) => {
                warn!(error = %err, "failed to open batch pull request");
                outcome.pull_request_error = Some(err);
            }
        }
    }
}

fn ensure_sub_tasks_of(parent: &IssueRef, sub_tasks: &[Task]) -> Result<(), BatchError> {
    let foreign = sub_tasks.iter().find(|task| {
        task.parent_issue() != Some(parent.issue_number())
            || task.issue_ref().repository() != parent.repository()
    });
    match foreign {
        Some(task) => Err(BatchError::ForeignSubTask {
            task_id: task.id(),
            parent: parent.clone(),
        }),
        None => Ok(()),
    }
}
