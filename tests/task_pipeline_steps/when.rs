//! When steps for task pipeline BDD scenarios.

use super::world::{PipelineWorld, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::when;

#[when("the task is driven to completion")]
fn drive_task(world: &mut PipelineWorld) -> Result<(), eyre::Report> {
    world.drive_pending_issue()
}

#[when("the task is requeued")]
fn requeue_task(world: &mut PipelineWorld) -> Result<(), eyre::Report> {
    let task_id = world.task()?.id();
    let pipeline = world.pipeline()?;
    let requeued = run_async(pipeline.lifecycle.requeue(task_id)).wrap_err("requeue task")?;
    world.task = Some(requeued);
    Ok(())
}
