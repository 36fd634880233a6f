//! Then steps for diff aggregation BDD scenarios.

use super::world::AggregationWorld;
use autodev::task::domain::IssueNumber;
use rstest_bdd_macros::then;

#[then("{count:usize} sub-tasks are reported as successful")]
fn successful_count(world: &AggregationWorld, count: usize) -> Result<(), eyre::Report> {
    let successful = world.output()?.summary().successful_tasks;
    if successful != count {
        return Err(eyre::eyre!(
            "expected {count} successful sub-tasks, found {successful}"
        ));
    }
    Ok(())
}

#[then(r#""{path}" is reported as a conflict between #{first:u64} and #{second:u64}"#)]
fn conflict_reported(
    world: &AggregationWorld,
    path: String,
    first: u64,
    second: u64,
) -> Result<(), eyre::Report> {
    let output = world.output()?;
    let conflict = output
        .conflicts()
        .iter()
        .find(|conflict| conflict.path == path)
        .ok_or_else(|| eyre::eyre!("no conflict reported for {path}"))?;
    let tasks: Vec<u64> = conflict.tasks.iter().copied().map(IssueNumber::value).collect();

    if tasks != [first, second] {
        return Err(eyre::eyre!(
            "expected {path} to conflict between #{first} and #{second}, found {tasks:?}"
        ));
    }
    if !output.pr_body().contains(&format!("`{path}`")) {
        return Err(eyre::eyre!("conflict on {path} missing from the body"));
    }
    Ok(())
}

#[then("no conflicts are reported")]
fn no_conflicts(world: &AggregationWorld) -> Result<(), eyre::Report> {
    let conflicts = world.output()?.conflicts();
    if !conflicts.is_empty() {
        return Err(eyre::eyre!("expected no conflicts, found {conflicts:?}"));
    }
    Ok(())
}

#[then(r#"the pull request title is "{title}""#)]
fn pull_request_title(world: &AggregationWorld, title: String) -> Result<(), eyre::Report> {
    let actual = world.output()?.pr_title();
    if actual != title {
        return Err(eyre::eyre!("expected title {title:?}, found {actual:?}"));
    }
    Ok(())
}

#[then("the pull request body requires human review")]
fn body_requires_review(world: &AggregationWorld) -> Result<(), eyre::Report> {
    let output = world.output()?;
    if !output.needs_human_review() || !output.pr_body().contains("Human Review Required") {
        return Err(eyre::eyre!(
            "expected a human review section in:\n{}",
            output.pr_body()
        ));
    }
    Ok(())
}

#[then("the pull request body does not require human review")]
fn body_needs_no_review(world: &AggregationWorld) -> Result<(), eyre::Report> {
    let output = world.output()?;
    if output.needs_human_review() || output.pr_body().contains("Human Review Required") {
        return Err(eyre::eyre!(
            "expected no human review section in:\n{}",
            output.pr_body()
        ));
    }
    Ok(())
}

#[then("the pull request body closes #{number:u64}")]
fn body_closes(world: &AggregationWorld, number: u64) -> Result<(), eyre::Report> {
    let body = world.output()?.pr_body();
    if !body.contains(&format!("Closes #{number}")) {
        return Err(eyre::eyre!("body does not close #{number}:\n{body}"));
    }
    Ok(())
}

#[then(r#"the pull request body lists the failure "{error}""#)]
fn body_lists_failure(world: &AggregationWorld, error: String) -> Result<(), eyre::Report> {
    let body = world.output()?.pr_body();
    if !body.contains("## Failed sub-tasks") || !body.contains(&error) {
        return Err(eyre::eyre!("body does not list failure {error:?}:\n{body}"));
    }
    Ok(())
}

#[then(r#"validation fails with "{message}""#)]
fn validation_fails_with(world: &AggregationWorld, message: String) -> Result<(), eyre::Report> {
    let report = world
        .report
        .as_ref()
        .ok_or_else(|| eyre::eyre!("sub-tasks were not validated"))?;
    if report.is_valid() || !report.errors().contains(&message) {
        return Err(eyre::eyre!(
            "expected validation error {message:?}, found {:?}",
            report.errors()
        ));
    }
    Ok(())
}
