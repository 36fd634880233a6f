//! Retry-until-terminal loop around [`TaskOrchestrator::process`].

use super::TaskOrchestrator;
use crate::task::{
    domain::{Task, TaskStatus},
    ports::{TaskRepository, TaskRepositoryError},
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Default ceiling on `process` calls per drive.
pub const DEFAULT_MAX_ITERATIONS: usize = 20;

/// Why a drive stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The task reached a terminal status.
    Terminal,
    /// The iteration ceiling was reached first.
    IterationLimit,
    /// The cancellation token fired.
    Cancelled,
}

/// Result of driving a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveOutcome {
    /// Task as last persisted.
    pub task: Task,
    /// Number of `process` calls made.
    pub iterations: usize,
    /// Why the drive stopped.
    pub stop_reason: StopReason,
}

/// Errors raised while driving a task.
#[derive(Debug, Error)]
pub enum DriveError {
    /// Persisting the task after a step failed.
    #[error("failed to persist task after step {iteration}: {source}")]
    Persistence {
        /// Step whose result could not be stored.
        iteration: usize,
        /// Underlying repository error.
        #[source]
        source: TaskRepositoryError,
    },
}

/// Repeatedly processes a task, persisting it after every step.
pub struct TaskDriver<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    orchestrator: TaskOrchestrator<C>,
    repository: Arc<R>,
    max_iterations: usize,
    cancellation: CancellationToken,
}

impl<R, C> Clone for TaskDriver<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            orchestrator: self.orchestrator.clone(),
            repository: Arc::clone(&self.repository),
            max_iterations: self.max_iterations,
            cancellation: self.cancellation.clone(),
        }
    }
}

impl<R, C> TaskDriver<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    /// Creates a driver with the default iteration ceiling and a token that
    /// never fires unless cancelled through [`Self::cancellation_token`].
    #[must_use]
    pub fn new(orchestrator: TaskOrchestrator<C>, repository: Arc<R>) -> Self {
        Self {
            orchestrator,
            repository,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            cancellation: CancellationToken::new(),
        }
    }

    /// Sets the iteration ceiling.
    #[must_use]
    pub const fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Replaces the cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Returns the token that stops this driver.
    #[must_use]
    pub const fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Returns the orchestrator used for each step.
    #[must_use]
    pub const fn orchestrator(&self) -> &TaskOrchestrator<C> {
        &self.orchestrator
    }

    /// Processes `task` until it is terminal, the ceiling is reached, or the
    /// token fires.
    ///
    /// A step in flight when the token fires is abandoned and the task keeps
    /// its last persisted state.
    ///
    /// # Errors
    ///
    /// Returns [`DriveError::Persistence`] when the task cannot be updated in
    /// the repository.
    #[instrument(skip_all, fields(task_id = %task.id()))]
    pub async fn drive(&self, task: Task) -> Result<DriveOutcome, DriveError> {
        let mut current = task;
        let mut iterations = 0;

        let stop_reason = loop {
            if current.status().is_terminal() {
                break StopReason::Terminal;
            }
            if self.cancellation.is_cancelled() {
                break StopReason::Cancelled;
            }
            if iterations >= self.max_iterations {
                break StopReason::IterationLimit;
            }

            let next = tokio::select! {
                biased;
                () = self.cancellation.cancelled() => break StopReason::Cancelled,
                next = self.orchestrator.process(current.clone()) => next,
            };
            iterations += 1;

            self.repository
                .update(&next)
                .await
                .map_err(|source| DriveError::Persistence {
                    iteration: iterations,
                    source,
                })?;
            current = next;
        };

        log_stop(&current, iterations, stop_reason);
        Ok(DriveOutcome {
            task: current,
            iterations,
            stop_reason,
        })
    }
}

fn log_stop(task: &Task, iterations: usize, stop_reason: StopReason) {
    let status = task.status();
    match stop_reason {
        StopReason::Terminal if status == TaskStatus::Failed => warn!(
            %status,
            iterations,
            attempts = task.attempt_count(),
            last_error = task.last_error().unwrap_or_default(),
            "task failed"
        ),
        StopReason::Terminal => info!(%status, iterations, "task reached terminal status"),
        StopReason::IterationLimit => warn!(
            %status,
            iterations,
            "iteration ceiling reached before a terminal status"
        ),
        StopReason::Cancelled => info!(%status, iterations, "task drive cancelled"),
    }
}
