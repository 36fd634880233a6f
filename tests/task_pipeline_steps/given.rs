//! Given steps for task pipeline BDD scenarios.

use super::world::PipelineWorld;
use autodev::task::services::CreateTaskFromIssueRequest;
use rstest_bdd_macros::given;

#[given(r#"an issue "{repository}" #{issue_number:u64} titled "{title}""#)]
fn issue_titled(world: &mut PipelineWorld, repository: String, issue_number: u64, title: String) {
    world.pending_request = Some(CreateTaskFromIssueRequest::new(
        repository,
        issue_number,
        title,
    ));
}

#[given("a planner that fails {failures:u32} times")]
fn planner_fails(world: &mut PipelineWorld, failures: u32) {
    world.planner_failures = failures;
}

#[given(r#"a coder that also edits "{path}""#)]
fn coder_also_edits(world: &mut PipelineWorld, path: String) {
    world.extra_paths.push(path);
}

#[given("the task has been driven to completion")]
fn task_has_been_driven(world: &mut PipelineWorld) -> Result<(), eyre::Report> {
    world.drive_pending_issue()
}
