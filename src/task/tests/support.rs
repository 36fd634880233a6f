//! Shared fixtures and collaborator doubles for task unit tests.

use crate::task::{
    adapters::PolicyGuardrail,
    domain::{
        AttemptBudget, BranchName, CodeChange, Complexity, ExternalIssue, IssueContent,
        IssueNumber, IssueRef, IssueSnapshot, OpenedPullRequest, PersistedTaskData, Plan,
        PullRequestDraft, PullRequestUrl, RepoContext, RepositoryFullName, Task, TaskId,
        TaskStatus,
    },
    ports::{
        Coder, CollaboratorError, GitHubClient, GuardrailChecker, GuardrailPolicy,
        GuardrailSubject, GuardrailVerdict, Planner,
    },
    services::{Collaborators, OrchestratorSettings, TaskOrchestrator},
};
use async_trait::async_trait;
use mockable::DefaultClock;
use mockall::mock;
use std::sync::Arc;
use std::time::Duration;

pub const REPOSITORY: &str = "octo/widgets";

pub const SMALL_DIFF: &str = concat!(
    "--- a/src/http.rs\n",
    "+++ b/src/http.rs\n",
    "@@ -1,2 +1,2 @@\n",
    " fn headers() {\n",
    "-    vec![]\n",
    "+    vec![\"Retry-After\"]\n",
);

mock! {
    pub Planner {}

    #[async_trait]
    impl Planner for Planner {
        async fn analyze(&self, issue: &IssueContent) -> Result<Plan, CollaboratorError>;
    }
}

mock! {
    pub Coder {}

    #[async_trait]
    impl Coder for Coder {
        async fn run(
            &self,
            plan: &Plan,
            repo_context: &RepoContext,
        ) -> Result<CodeChange, CollaboratorError>;
    }
}

mock! {
    pub GitHub {}

    #[async_trait]
    impl GitHubClient for GitHub {
        async fn get_issue(&self, issue_ref: &IssueRef) -> Result<IssueSnapshot, CollaboratorError>;

        async fn get_repo_context(
            &self,
            repository: &RepositoryFullName,
        ) -> Result<RepoContext, CollaboratorError>;

        async fn open_pull_request(
            &self,
            draft: &PullRequestDraft,
        ) -> Result<OpenedPullRequest, CollaboratorError>;
    }
}

/// Guardrail double that always returns the same verdict.
pub struct FixedGuardrail(pub GuardrailVerdict);

impl GuardrailChecker for FixedGuardrail {
    fn check(&self, _subject: &GuardrailSubject<'_>, _policy: &GuardrailPolicy) -> GuardrailVerdict {
        self.0.clone()
    }
}

pub fn issue_ref(number: u64) -> IssueRef {
    IssueRef::from_parts(REPOSITORY, number).expect("valid issue reference")
}

pub fn external_issue(number: u64) -> ExternalIssue {
    let snapshot = IssueSnapshot::new(format!("Issue {number}"))
        .expect("valid title")
        .with_body("Add a Retry-After header to throttled responses.");
    ExternalIssue::new(issue_ref(number), snapshot)
}

pub fn new_task(number: u64) -> Task {
    Task::new_from_issue(&external_issue(number), AttemptBudget::default(), &DefaultClock)
}

pub fn new_sub_task(number: u64, parent: u64) -> Task {
    Task::new_sub_task(
        &external_issue(number),
        IssueNumber::new(parent).expect("valid parent"),
        AttemptBudget::default(),
        &DefaultClock,
    )
}

pub fn sample_plan() -> Plan {
    Plan::new(Complexity::Low)
        .with_definition_of_done(vec!["Throttled responses carry Retry-After".to_owned()])
        .with_steps(vec!["Add the header".to_owned()])
        .with_target_files(vec!["src/http.rs".to_owned()])
}

/// Builds a task in an arbitrary status, bypassing the transition table.
pub fn task_in(status: TaskStatus, plan: Option<Plan>, diff: Option<&str>) -> Task {
    let base = new_task(42);
    Task::from_persisted(PersistedTaskData {
        id: TaskId::new(),
        issue_ref: base.issue_ref().clone(),
        issue: base.issue().clone(),
        parent_issue: None,
        status,
        attempt_count: 0,
        max_attempts: 3,
        plan,
        branch_name: None,
        pr_url: None,
        current_diff: diff.map(str::to_owned),
        commit_message: diff.map(|_| "Add Retry-After header".to_owned()),
        last_error: None,
        created_at: base.created_at(),
        updated_at: base.updated_at(),
    })
}

pub fn repo_context_github() -> MockGitHub {
    let mut github = MockGitHub::new();
    github
        .expect_get_repo_context()
        .returning(|repository| Ok(RepoContext::new(repository.clone(), "main")));
    github
}

pub fn opened_pull_request(number: u64) -> OpenedPullRequest {
    OpenedPullRequest {
        url: PullRequestUrl::new(format!("https://github.com/{REPOSITORY}/pull/{number}"))
            .expect("valid url"),
        branch_name: BranchName::for_issue(IssueNumber::new(number).expect("valid number")),
    }
}

pub fn orchestrator(
    planner: MockPlanner,
    coder: MockCoder,
    github: MockGitHub,
) -> TaskOrchestrator<DefaultClock> {
    orchestrator_with(planner, coder, github, Arc::new(PolicyGuardrail::new()))
}

pub fn orchestrator_with(
    planner: MockPlanner,
    coder: MockCoder,
    github: MockGitHub,
    guardrail: Arc<dyn GuardrailChecker>,
) -> TaskOrchestrator<DefaultClock> {
    TaskOrchestrator::new(
        Collaborators {
            planner: Arc::new(planner),
            coder: Arc::new(coder),
            github: Arc::new(github),
            guardrail,
        },
        OrchestratorSettings {
            collaborator_timeout: Duration::from_secs(5),
            ..OrchestratorSettings::default()
        },
        Arc::new(DefaultClock),
    )
}
