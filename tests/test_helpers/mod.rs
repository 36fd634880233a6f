//! Scripted collaborators and pipeline wiring shared by integration tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use autodev::config::AutodevConfig;
use autodev::task::{
    adapters::{PolicyGuardrail, memory::InMemoryTaskRepository},
    domain::{
        CodeChange, Complexity, IssueContent, IssueRef, IssueSnapshot, OpenedPullRequest, Plan,
        PullRequestDraft, PullRequestUrl, RepoContext, RepositoryFullName,
    },
    ports::{Coder, CollaboratorError, GitHubClient, Planner},
    services::{Collaborators, TaskDriver, TaskLifecycleService, TaskOrchestrator},
};
use mockable::DefaultClock;

/// Repository used by every integration scenario.
pub const REPOSITORY: &str = "octo/widgets";

/// File a task for `issue_number` is planned to change.
pub fn planned_file(issue_number: u64) -> String {
    format!("src/issue_{issue_number}.rs")
}

fn consume_failure(failures: &AtomicU32) -> bool {
    failures
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
        .is_ok()
}

/// Planner that fails a fixed number of times, then plans one file per issue.
pub struct ScriptedPlanner {
    complexity: Complexity,
    failures: AtomicU32,
    rejected_issues: Vec<u64>,
}

impl ScriptedPlanner {
    /// Creates a planner that always succeeds with a low-complexity plan.
    pub fn new() -> Self {
        Self {
            complexity: Complexity::Low,
            failures: AtomicU32::new(0),
            rejected_issues: Vec::new(),
        }
    }

    /// Fails the first `failures` calls.
    pub fn failing_first(failures: u32) -> Self {
        Self {
            failures: AtomicU32::new(failures),
            ..Self::new()
        }
    }

    /// Always rejects the listed issues.
    pub fn rejecting(issues: impl IntoIterator<Item = u64>) -> Self {
        Self {
            rejected_issues: issues.into_iter().collect(),
            ..Self::new()
        }
    }

    /// Sets the complexity of every plan.
    pub fn with_complexity(mut self, complexity: Complexity) -> Self {
        self.complexity = complexity;
        self
    }
}

#[async_trait]
impl Planner for ScriptedPlanner {
    async fn analyze(&self, issue: &IssueContent) -> Result<Plan, CollaboratorError> {
        let number = issue.issue_ref.issue_number().value();
        if self.rejected_issues.contains(&number) {
            return Err(CollaboratorError::Rejected(format!(
                "issue #{number} is too vague to plan"
            )));
        }
        if consume_failure(&self.failures) {
            return Err(CollaboratorError::Unavailable("planner offline".to_owned()));
        }
        Ok(Plan::new(self.complexity)
            .with_definition_of_done(vec![format!("{} is resolved", issue.snapshot.title())])
            .with_steps(vec!["Apply the fix".to_owned()])
            .with_target_files(vec![planned_file(number)]))
    }
}

/// Coder that edits the planned files plus any extra paths.
pub struct ScriptedCoder {
    failures: AtomicU32,
    extra_paths: Vec<String>,
}

impl ScriptedCoder {
    /// Creates a coder that always succeeds.
    pub fn new() -> Self {
        Self {
            failures: AtomicU32::new(0),
            extra_paths: Vec::new(),
        }
    }

    /// Fails the first `failures` calls.
    pub fn failing_first(failures: u32) -> Self {
        Self {
            failures: AtomicU32::new(failures),
            ..Self::new()
        }
    }

    /// Also edits `paths` in every change.
    pub fn also_touching(paths: impl IntoIterator<Item = String>) -> Self {
        Self {
            extra_paths: paths.into_iter().collect(),
            ..Self::new()
        }
    }
}

#[async_trait]
impl Coder for ScriptedCoder {
    async fn run(
        &self,
        plan: &Plan,
        _repo_context: &RepoContext,
    ) -> Result<CodeChange, CollaboratorError> {
        if consume_failure(&self.failures) {
            return Err(CollaboratorError::InvalidResponse(
                "response carried no diff".to_owned(),
            ));
        }
        let paths: Vec<String> = plan
            .target_files()
            .iter()
            .chain(&self.extra_paths)
            .cloned()
            .collect();
        let diff: String = paths
            .iter()
            .map(|path| format!("--- a/{path}\n+++ b/{path}\n@@ -1 +1 @@\n-old\n+new\n"))
            .collect();
        Ok(CodeChange::new(
            format!("```diff\n{diff}```"),
            format!("Update {}", paths.join(", ")),
            paths,
        ))
    }
}

/// GitHub double that serves known issues and records opened pull requests.
#[derive(Default)]
pub struct RecordingGitHub {
    issues: Mutex<HashMap<u64, IssueSnapshot>>,
    opened: Mutex<Vec<PullRequestDraft>>,
    reject_pull_requests: bool,
}

impl RecordingGitHub {
    /// Creates a client with no issues.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a client whose pull request calls always fail.
    pub fn rejecting_pull_requests() -> Self {
        Self {
            reject_pull_requests: true,
            ..Self::default()
        }
    }

    /// Registers an issue that `get_issue` will return.
    pub fn add_issue(&self, number: u64, snapshot: IssueSnapshot) {
        self.issues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(number, snapshot);
    }

    /// Returns every draft submitted so far.
    pub fn opened(&self) -> Vec<PullRequestDraft> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl GitHubClient for RecordingGitHub {
    async fn get_issue(&self, issue_ref: &IssueRef) -> Result<IssueSnapshot, CollaboratorError> {
        let number = issue_ref.issue_number().value();
        self.issues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&number)
            .cloned()
            .ok_or_else(|| CollaboratorError::Rejected(format!("issue #{number} not found")))
    }

    async fn get_repo_context(
        &self,
        repository: &RepositoryFullName,
    ) -> Result<RepoContext, CollaboratorError> {
        Ok(RepoContext::new(repository.clone(), "main"))
    }

    async fn open_pull_request(
        &self,
        draft: &PullRequestDraft,
    ) -> Result<OpenedPullRequest, CollaboratorError> {
        if self.reject_pull_requests {
            return Err(CollaboratorError::Unavailable(
                "pull request API returned 502".to_owned(),
            ));
        }
        let mut opened = self.opened.lock().unwrap_or_else(PoisonError::into_inner);
        opened.push(draft.clone());
        let url = PullRequestUrl::new(format!(
            "https://github.com/{}/pull/{}",
            draft.repository,
            opened.len()
        ))
        .map_err(|err| CollaboratorError::InvalidResponse(err.to_string()))?;
        Ok(OpenedPullRequest {
            url,
            branch_name: draft.head_branch.clone(),
        })
    }
}

/// Lifecycle service type used by integration tests.
pub type TestLifecycle = TaskLifecycleService<InMemoryTaskRepository, DefaultClock>;

/// Driver type used by integration tests.
pub type TestDriver = TaskDriver<InMemoryTaskRepository, DefaultClock>;

/// Fully wired in-memory pipeline.
pub struct Pipeline {
    /// Shared task store.
    pub repository: Arc<InMemoryTaskRepository>,
    /// Creates and re-enqueues tasks.
    pub lifecycle: TestLifecycle,
    /// Drives tasks to a terminal status.
    pub driver: TestDriver,
    /// GitHub double, for inspecting opened pull requests.
    pub github: Arc<RecordingGitHub>,
}

impl Pipeline {
    /// Wires the collaborators according to `config`.
    pub fn new(
        planner: ScriptedPlanner,
        coder: ScriptedCoder,
        github: RecordingGitHub,
        config: &AutodevConfig,
    ) -> Result<Self, eyre::Report> {
        let repository = Arc::new(InMemoryTaskRepository::new());
        let clock = Arc::new(DefaultClock);
        let github = Arc::new(github);
        let orchestrator = TaskOrchestrator::new(
            Collaborators {
                planner: Arc::new(planner),
                coder: Arc::new(coder),
                github: Arc::clone(&github) as Arc<dyn GitHubClient>,
                guardrail: Arc::new(PolicyGuardrail::new()),
            },
            config.orchestrator_settings(),
            Arc::clone(&clock),
        );
        let lifecycle = TaskLifecycleService::new(Arc::clone(&repository), clock)
            .with_default_budget(config.attempt_budget()?);
        let driver = TaskDriver::new(orchestrator, Arc::clone(&repository))
            .with_max_iterations(config.max_iterations);

        Ok(Self {
            repository,
            lifecycle,
            driver,
            github,
        })
    }

    /// Wires the default collaborators with the default configuration.
    pub fn happy_path() -> Result<Self, eyre::Report> {
        Self::new(
            ScriptedPlanner::new(),
            ScriptedCoder::new(),
            RecordingGitHub::new(),
            &AutodevConfig::default(),
        )
    }
}
