//! Then steps for task pipeline BDD scenarios.

use super::world::PipelineWorld;
use autodev::task::domain::TaskStatus;
use rstest_bdd_macros::then;

#[then(r#"the task status is "{status}""#)]
fn task_status_is(world: &PipelineWorld, status: String) -> Result<(), eyre::Report> {
    let expected = TaskStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid expected status in scenario: {err}"))?;
    let task = world.task()?;

    if task.status() != expected {
        return Err(eyre::eyre!(
            "expected status {expected}, found {} (last error: {:?})",
            task.status(),
            task.last_error()
        ));
    }
    Ok(())
}

#[then("the task used {attempts:u32} attempts")]
fn task_used_attempts(world: &PipelineWorld, attempts: u32) -> Result<(), eyre::Report> {
    let used = world.task()?.attempt_count();
    if used != attempts {
        return Err(eyre::eyre!("expected {attempts} attempts, found {used}"));
    }
    Ok(())
}

#[then(r#"a pull request was opened from branch "{branch}""#)]
fn pull_request_opened(world: &PipelineWorld, branch: String) -> Result<(), eyre::Report> {
    let pipeline = world
        .pipeline
        .as_ref()
        .ok_or_else(|| eyre::eyre!("pipeline was never wired"))?;
    let opened = pipeline.github.opened();

    match opened.as_slice() {
        [draft] if draft.head_branch.as_str() == branch => Ok(()),
        other => Err(eyre::eyre!(
            "expected one pull request from {branch}, found {:?}",
            other
                .iter()
                .map(|draft| draft.head_branch.as_str())
                .collect::<Vec<_>>()
        )),
    }
}

#[then("no pull request was opened")]
fn no_pull_request_opened(world: &PipelineWorld) -> Result<(), eyre::Report> {
    let opened = world
        .pipeline
        .as_ref()
        .map(|pipeline| pipeline.github.opened())
        .unwrap_or_default();
    if !opened.is_empty() {
        return Err(eyre::eyre!("expected no pull requests, found {}", opened.len()));
    }
    Ok(())
}
