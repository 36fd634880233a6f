//! End-to-end runs of single issues through the in-memory pipeline.

use crate::test_helpers::{
    Pipeline, REPOSITORY, RecordingGitHub, ScriptedCoder, ScriptedPlanner, planned_file,
};
use autodev::config::AutodevConfig;
use autodev::task::{
    domain::{Complexity, IssueRef, IssueSnapshot, TaskStatus},
    ports::TaskRepository,
    services::{CreateTaskFromIssueRequest, StopReason},
};
use eyre::{ensure, eyre};
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn issue_is_resolved_with_a_pull_request() -> eyre::Result<()> {
    let pipeline = Pipeline::happy_path()?;
    let task = pipeline
        .lifecycle
        .create_from_issue(
            CreateTaskFromIssueRequest::new(REPOSITORY, 7, "Handle empty config files")
                .with_body("Loading an empty file panics"),
        )
        .await?;

    let outcome = pipeline.driver.drive(task).await?;

    ensure!(outcome.stop_reason == StopReason::Terminal);
    ensure!(outcome.iterations == 3, "expected 3 steps, got {}", outcome.iterations);
    ensure!(outcome.task.status() == TaskStatus::PrCreated);
    ensure!(
        outcome
            .task
            .branch_name()
            .is_some_and(|branch| branch.as_str() == "autodev/issue-7")
    );

    let opened = pipeline.github.opened();
    let draft = opened.first().ok_or_else(|| eyre!("no pull request opened"))?;
    ensure!(opened.len() == 1);
    ensure!(draft.title == "[autodev] Handle empty config files");
    ensure!(draft.body.contains("Closes #7"));
    ensure!(draft.body.contains("- [ ] Handle empty config files is resolved"));
    ensure!(
        !draft.diff.contains("```"),
        "code fences must be stripped before the diff reaches GitHub"
    );
    ensure!(draft.diff.contains(&format!("+++ b/{}", planned_file(7))));

    let stored = pipeline
        .lifecycle
        .find_by_issue_ref(&IssueRef::from_parts(REPOSITORY, 7)?)
        .await?;
    ensure!(stored == Some(outcome.task), "repository should hold the final task");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn transient_failures_are_retried_within_budget() -> eyre::Result<()> {
    let pipeline = Pipeline::new(
        ScriptedPlanner::failing_first(1),
        ScriptedCoder::failing_first(1),
        RecordingGitHub::new(),
        &AutodevConfig::default(),
    )?;
    let task = pipeline
        .lifecycle
        .create_from_issue(CreateTaskFromIssueRequest::new(REPOSITORY, 8, "Flaky"))
        .await?;

    let outcome = pipeline.driver.drive(task).await?;

    ensure!(outcome.task.status() == TaskStatus::PrCreated);
    ensure!(outcome.task.attempt_count() == 2, "two retries should be charged");
    ensure!(outcome.iterations == 5);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn configured_budget_fails_task_sooner() -> eyre::Result<()> {
    let config = AutodevConfig::from_json_str(r#"{ "max_attempts": 2 }"#)?;
    let pipeline = Pipeline::new(
        ScriptedPlanner::new(),
        ScriptedCoder::failing_first(10),
        RecordingGitHub::new(),
        &config,
    )?;
    let task = pipeline
        .lifecycle
        .create_from_issue(CreateTaskFromIssueRequest::new(REPOSITORY, 9, "Hopeless"))
        .await?;

    let outcome = pipeline.driver.drive(task).await?;

    ensure!(outcome.task.status() == TaskStatus::Failed);
    ensure!(outcome.task.attempt_count() == 2);
    ensure!(
        outcome
            .task
            .last_error()
            .is_some_and(|error| error.contains("response carried no diff"))
    );
    ensure!(pipeline.github.opened().is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn protected_paths_escalate_and_can_be_requeued() -> eyre::Result<()> {
    let pipeline = Pipeline::new(
        ScriptedPlanner::new(),
        ScriptedCoder::also_touching([".github/workflows/ci.yml".to_owned()]),
        RecordingGitHub::new(),
        &AutodevConfig::default(),
    )?;
    let task = pipeline
        .lifecycle
        .create_from_issue(CreateTaskFromIssueRequest::new(REPOSITORY, 10, "Speed up CI"))
        .await?;

    let outcome = pipeline.driver.drive(task).await?;

    ensure!(outcome.task.status() == TaskStatus::WaitingHuman);
    ensure!(outcome.task.attempt_count() == 0, "escalation must bypass the budget");
    ensure!(
        outcome
            .task
            .last_error()
            .is_some_and(|error| error.contains(".github/workflows/ci.yml"))
    );
    ensure!(pipeline.github.opened().is_empty());

    let requeued = pipeline.lifecycle.requeue(outcome.task.id()).await?;
    ensure!(requeued.status() == TaskStatus::Coding, "plan should be kept");
    ensure!(requeued.last_error().is_none());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn strict_configuration_escalates_complex_plans() -> eyre::Result<()> {
    let pipeline = Pipeline::new(
        ScriptedPlanner::new().with_complexity(Complexity::High),
        ScriptedCoder::new(),
        RecordingGitHub::new(),
        &AutodevConfig::strict(),
    )?;
    let task = pipeline
        .lifecycle
        .create_from_issue(CreateTaskFromIssueRequest::new(REPOSITORY, 11, "Rewrite parser"))
        .await?;

    let outcome = pipeline.driver.drive(task).await?;

    ensure!(outcome.task.status() == TaskStatus::WaitingHuman);
    ensure!(outcome.task.max_attempts() == 2, "strict preset uses two attempts");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn pull_request_failures_keep_task_in_testing_until_budget_is_spent() -> eyre::Result<()> {
    let pipeline = Pipeline::new(
        ScriptedPlanner::new(),
        ScriptedCoder::new(),
        RecordingGitHub::rejecting_pull_requests(),
        &AutodevConfig::default(),
    )?;
    let task = pipeline
        .lifecycle
        .create_from_issue(CreateTaskFromIssueRequest::new(REPOSITORY, 12, "Small fix"))
        .await?;

    let outcome = pipeline.driver.drive(task).await?;

    ensure!(outcome.task.status() == TaskStatus::Failed);
    ensure!(outcome.task.attempt_count() == 3);
    ensure!(outcome.iterations == 5, "plan, code, then three PR attempts");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn issues_can_be_imported_from_github() -> eyre::Result<()> {
    let github = RecordingGitHub::new();
    github.add_issue(
        13,
        IssueSnapshot::new("Imported issue")?.with_labels(vec!["bug".to_owned()]),
    );
    let pipeline = Pipeline::new(
        ScriptedPlanner::new(),
        ScriptedCoder::new(),
        github,
        &AutodevConfig::default(),
    )?;

    let task = pipeline
        .lifecycle
        .create_from_github(pipeline.github.as_ref(), REPOSITORY, 13)
        .await?;
    let missing = pipeline
        .lifecycle
        .create_from_github(pipeline.github.as_ref(), REPOSITORY, 14)
        .await;

    ensure!(task.issue().title() == "Imported issue");
    ensure!(missing.is_err(), "unknown issues must not create tasks");
    ensure!(
        pipeline.repository.find_by_id(task.id()).await?.is_some(),
        "imported task should be stored"
    );
    Ok(())
}
