//! Application services for the ticket pipeline.

mod driver;
mod lifecycle;
mod orchestrator;

pub use driver::{DEFAULT_MAX_ITERATIONS, DriveError, DriveOutcome, StopReason, TaskDriver};
pub use lifecycle::{
    CreateTaskFromIssueRequest, TaskLifecycleError, TaskLifecycleResult, TaskLifecycleService,
};
pub(crate) use orchestrator::bounded_call;
pub use orchestrator::{
    Collaborators, DEFAULT_COLLABORATOR_TIMEOUT, OrchestratorSettings, TaskOrchestrator,
};
