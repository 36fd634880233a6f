//! Single-step task state machine.
//!
//! [`TaskOrchestrator::process`] advances a task by exactly one stage, or
//! charges one failed attempt against its budget, and hands the task back
//! for persistence. It never loops and never returns an error: collaborator
//! failures are recorded on the task itself.

use crate::task::{
    domain::{
        BranchName, CodeChange, FailureOutcome, IssueContent, Plan, PullRequestDraft, RepoContext,
        Task, TaskDomainError, TaskStatus,
    },
    ports::{
        Coder, CollaboratorError, GitHubClient, GuardrailChecker, GuardrailPolicy,
        GuardrailSubject, GuardrailVerdict, Planner,
    },
};
use mockable::Clock;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Default upper bound for a single collaborator call.
pub const DEFAULT_COLLABORATOR_TIMEOUT: Duration = Duration::from_secs(120);

/// External collaborators consulted while processing a task.
#[derive(Clone)]
pub struct Collaborators {
    /// Produces plans from issue content.
    pub planner: Arc<dyn Planner>,
    /// Produces diffs from plans.
    pub coder: Arc<dyn Coder>,
    /// Reads repository context and opens pull requests.
    pub github: Arc<dyn GitHubClient>,
    /// Gates diffs before a pull request is opened.
    pub guardrail: Arc<dyn GuardrailChecker>,
}

/// Tunable limits applied by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorSettings {
    /// Policy handed to the guardrail checker.
    pub policy: GuardrailPolicy,
    /// Upper bound for each collaborator call.
    pub collaborator_timeout: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            policy: GuardrailPolicy::default(),
            collaborator_timeout: DEFAULT_COLLABORATOR_TIMEOUT,
        }
    }
}

/// Drives one task through one pipeline stage per call.
pub struct TaskOrchestrator<C>
where
    C: Clock + Send + Sync,
{
    collaborators: Collaborators,
    settings: OrchestratorSettings,
    clock: Arc<C>,
}

impl<C> Clone for TaskOrchestrator<C>
where
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            collaborators: self.collaborators.clone(),
            settings: self.settings.clone(),
            clock: Arc::clone(&self.clock),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Stage {
    Planning,
    Coding,
    Testing,
}

impl Stage {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Coding => "coding",
            Self::Testing => "testing",
        }
    }
}

impl<C> TaskOrchestrator<C>
where
    C: Clock + Send + Sync,
{
    /// Creates an orchestrator over the given collaborators.
    #[must_use]
    pub const fn new(
        collaborators: Collaborators,
        settings: OrchestratorSettings,
        clock: Arc<C>,
    ) -> Self {
        Self {
            collaborators,
            settings,
            clock,
        }
    }

    /// Returns the collaborators used by this orchestrator.
    #[must_use]
    pub const fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Returns the active settings.
    #[must_use]
    pub const fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Advances the task by one stage and returns it.
    ///
    /// Terminal tasks are returned unchanged. If the task record turns out to
    /// be inconsistent with the transition table, the task is failed.
    #[instrument(skip_all, fields(task_id = %task.id(), issue = %task.issue_ref()))]
    pub async fn process(&self, mut task: Task) -> Task {
        let status = task.status();
        let result = match status {
            TaskStatus::New | TaskStatus::Planning => self.plan(&mut task).await,
            TaskStatus::Coding => self.code(&mut task).await,
            TaskStatus::Testing => self.test(&mut task).await,
            TaskStatus::PrCreated
            | TaskStatus::WaitingHuman
            | TaskStatus::Failed
            | TaskStatus::Completed => {
                debug!(%status, "terminal task left unchanged");
                Ok(())
            }
        };

        if let Err(err) = result {
            warn!(error = %err, %status, "inconsistent task record, failing task");
            task.force_fail(err.to_string(), &*self.clock);
        }
        task
    }

    async fn plan(&self, task: &mut Task) -> Result<(), TaskDomainError> {
        match self.request_plan(task).await {
            Ok(plan) => {
                let complexity = plan.complexity();
                task.attach_plan(plan, &*self.clock)?;
                info!(%complexity, "plan attached, task moved to CODING");
            }
            Err(err) => self.charge_failure(task, Stage::Planning, &err),
        }
        Ok(())
    }

    async fn code(&self, task: &mut Task) -> Result<(), TaskDomainError> {
        let Some(plan) = task.plan().cloned() else {
            let outcome = task.record_failure_and_retry_from(
                TaskStatus::New,
                "task reached coding without a plan",
                &*self.clock,
            )?;
            warn!(?outcome, "missing plan, task returned to NEW");
            return Ok(());
        };

        match self.request_change(task, &plan).await {
            Ok(change) => {
                let files = change.files_modified().len();
                let (diff, commit_message) = change.into_parts();
                task.attach_change(diff, commit_message, &*self.clock)?;
                info!(files, "change attached, task moved to TESTING");
            }
            Err(err) => self.charge_failure(task, Stage::Coding, &err),
        }
        Ok(())
    }

    async fn test(&self, task: &mut Task) -> Result<(), TaskDomainError> {
        let verdict = self.collaborators.guardrail.check(
            &GuardrailSubject {
                diff: task.current_diff().unwrap_or_default(),
                plan: task.plan(),
            },
            &self.settings.policy,
        );

        match verdict {
            GuardrailVerdict::Pass if task.is_sub_task() => {
                task.transition_to(TaskStatus::Completed, &*self.clock)?;
                info!("guardrails passed, sub-task COMPLETED for batch aggregation");
            }
            GuardrailVerdict::Pass => self.open_pull_request(task).await?,
            GuardrailVerdict::Recoverable(reason) => {
                let outcome = task.record_failure_and_retry_from(
                    TaskStatus::Coding,
                    format!("guardrail violation: {reason}"),
                    &*self.clock,
                )?;
                log_failure(Stage::Testing, &reason, outcome);
            }
            GuardrailVerdict::NonRecoverable(reason) => {
                warn!(%reason, "guardrail requires a human, task moved to WAITING_HUMAN");
                task.escalate(reason, &*self.clock)?;
            }
        }
        Ok(())
    }

    async fn open_pull_request(&self, task: &mut Task) -> Result<(), TaskDomainError> {
        let head_branch = BranchName::for_issue(task.issue_ref().issue_number());
        let Some(draft) = PullRequestDraft::for_task(task, head_branch) else {
            let outcome = task.record_failure_and_retry_from(
                TaskStatus::Coding,
                "task reached testing without a diff",
                &*self.clock,
            )?;
            log_failure(Stage::Testing, "missing diff", outcome);
            return Ok(());
        };

        match self
            .bounded(self.collaborators.github.open_pull_request(&draft))
            .await
        {
            Ok(pull_request) => {
                info!(
                    url = %pull_request.url,
                    branch = %pull_request.branch_name,
                    "pull request opened, task moved to PR_CREATED"
                );
                task.record_pull_request(pull_request, &*self.clock)?;
            }
            Err(err) => self.charge_failure(task, Stage::Testing, &err),
        }
        Ok(())
    }

    async fn request_plan(&self, task: &Task) -> Result<Plan, CollaboratorError> {
        let repo_context = self.repo_context(task).await?;
        let content = IssueContent {
            issue_ref: task.issue_ref().clone(),
            snapshot: task.issue().clone(),
            repo_context,
        };
        self.bounded(self.collaborators.planner.analyze(&content))
            .await
    }

    async fn request_change(
        &self,
        task: &Task,
        plan: &Plan,
    ) -> Result<CodeChange, CollaboratorError> {
        let repo_context = self.repo_context(task).await?;
        self.bounded(self.collaborators.coder.run(plan, &repo_context))
            .await
    }

    async fn repo_context(&self, task: &Task) -> Result<RepoContext, CollaboratorError> {
        self.bounded(
            self.collaborators
                .github
                .get_repo_context(task.issue_ref().repository()),
        )
        .await
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, CollaboratorError>> + Send,
    ) -> Result<T, CollaboratorError> {
        bounded_call(self.settings.collaborator_timeout, call).await
    }

    fn charge_failure(&self, task: &mut Task, stage: Stage, err: &CollaboratorError) {
        let reason = format!("{} failed: {err}", stage.as_str());
        let outcome = task.record_failure(reason, &*self.clock);
        log_failure(stage, &err.to_string(), outcome);
    }
}

/// Awaits a collaborator call, converting an overrun into
/// [`CollaboratorError::Timeout`].
pub(crate) async fn bounded_call<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, CollaboratorError>> + Send,
) -> Result<T, CollaboratorError> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_elapsed) => Err(CollaboratorError::Timeout(limit)),
    }
}

fn log_failure(stage: Stage, reason: &str, outcome: FailureOutcome) {
    match outcome {
        FailureOutcome::WillRetry { remaining } => {
            warn!(stage = stage.as_str(), %reason, remaining, "attempt failed, will retry");
        }
        FailureOutcome::Exhausted => {
            warn!(stage = stage.as_str(), %reason, "attempt budget exhausted, task FAILED");
        }
    }
}
