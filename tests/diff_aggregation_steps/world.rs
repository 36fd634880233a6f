//! Shared world state for diff aggregation BDD scenarios.

use autodev::aggregation::{
    domain::{AggregationInput, AggregationOutput, SubTaskResult, ValidationReport},
    services::DiffAggregator,
};
use autodev::task::domain::{IssueNumber, RepositoryFullName};
use rstest::fixture;

/// Scenario world for aggregation behaviour tests.
#[derive(Default)]
pub struct AggregationWorld {
    pub aggregator: DiffAggregator,
    pub parent: Option<(IssueNumber, String)>,
    pub sub_tasks: Vec<SubTaskResult>,
    pub output: Option<AggregationOutput>,
    pub report: Option<ValidationReport>,
}

impl AggregationWorld {
    /// Builds the aggregation input from the parent issue and sub-tasks.
    pub fn input(&self) -> Result<AggregationInput, eyre::Report> {
        let (parent_issue_number, parent_issue_title) = self
            .parent
            .clone()
            .ok_or_else(|| eyre::eyre!("missing parent issue in scenario world"))?;
        Ok(AggregationInput {
            parent_issue_number,
            parent_issue_title,
            repository: RepositoryFullName::new("octo/widgets")?,
            sub_tasks: self.sub_tasks.clone(),
        })
    }

    /// Returns the aggregation output.
    pub fn output(&self) -> Result<&AggregationOutput, eyre::Report> {
        self.output
            .as_ref()
            .ok_or_else(|| eyre::eyre!("sub-tasks were not aggregated"))
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> AggregationWorld {
    AggregationWorld::default()
}
