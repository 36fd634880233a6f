//! Reconciles sibling sub-task diffs into one changeset.

use super::pr_body::{PrBodyContext, PrBodyError, PrBodyRenderer};
use crate::aggregation::domain::{
    AggregationInput, AggregationOutput, AggregationSummary, FileConflict, SubTaskResult,
    ValidationReport,
};
use crate::diff::parse_unified_diff;
use crate::task::domain::IssueNumber;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

/// Merges the outputs of sibling sub-tasks and drafts their pull request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffAggregator {
    renderer: PrBodyRenderer,
}

impl DiffAggregator {
    /// Creates an aggregator with the default pull request body template.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an aggregator with a custom body renderer.
    #[must_use]
    pub const fn with_renderer(renderer: PrBodyRenderer) -> Self {
        Self { renderer }
    }

    /// Returns `true` when at least two sub-tasks completed.
    ///
    /// A lone success needs no merging and is used as-is.
    #[must_use]
    pub fn should_aggregate(results: &[SubTaskResult]) -> bool {
        results.iter().filter(|result| result.is_completed()).count() >= 2
    }

    /// Checks a batch before aggregation, collecting every problem found.
    #[must_use]
    pub fn validate(results: &[SubTaskResult]) -> ValidationReport {
        let mut errors = Vec::new();

        if results.is_empty() {
            errors.push("No sub-tasks provided".to_owned());
        }

        if !results.iter().any(SubTaskResult::is_completed) {
            errors.push("No successful sub-tasks to aggregate".to_owned());
        }

        errors.extend(
            results
                .iter()
                .filter(|result| result.is_completed() && result.diff().trim().is_empty())
                .map(|result| {
                    format!(
                        "Sub-task #{} completed with an empty diff",
                        result.issue_number()
                    )
                }),
        );

        ValidationReport::from_errors(errors)
    }

    /// Concatenates completed diffs in batch order.
    #[must_use]
    pub fn combined_diff(results: &[SubTaskResult]) -> String {
        let mut combined = String::new();
        for diff in results
            .iter()
            .filter(|result| result.is_completed())
            .map(SubTaskResult::diff)
            .filter(|diff| !diff.trim().is_empty())
        {
            combined.push_str(diff);
            if !diff.ends_with('\n') {
                combined.push('\n');
            }
        }
        combined
    }

    /// Aggregates a batch into file changes, conflicts, and pull request
    /// text.
    ///
    /// The input is not re-validated; call [`Self::validate`] first.
    ///
    /// # Errors
    ///
    /// Returns [`PrBodyError`] when the body template fails to render.
    pub fn aggregate(&self, input: &AggregationInput) -> Result<AggregationOutput, PrBodyError> {
        let (successful, failed): (Vec<&SubTaskResult>, Vec<&SubTaskResult>) = input
            .sub_tasks
            .iter()
            .partition(|result| result.is_completed());

        let (file_changes, conflicts) = collect_file_changes(&successful);
        let summary = AggregationSummary {
            total_tasks: input.sub_tasks.len(),
            successful_tasks: successful.len(),
            failed_tasks: failed.len(),
            conflicts_detected: conflicts.len(),
        };

        for conflict in &conflicts {
            debug!(path = %conflict.path, tasks = ?conflict.tasks, "file changed by several sub-tasks");
        }

        let pr_title = format!(
            "{} ({} sub-tasks)",
            input.parent_issue_title, summary.successful_tasks
        );
        let needs_review = summary.failed_tasks > 0 || summary.conflicts_detected > 0;
        let pr_body = self.renderer.render(&PrBodyContext {
            parent_issue_number: input.parent_issue_number,
            parent_issue_title: &input.parent_issue_title,
            summary,
            successful,
            failed,
            conflicts: &conflicts,
            needs_review,
        })?;

        info!(
            parent_issue = %input.parent_issue_number,
            repository = %input.repository,
            total = summary.total_tasks,
            successful = summary.successful_tasks,
            failed = summary.failed_tasks,
            conflicts = summary.conflicts_detected,
            "sub-task diffs aggregated"
        );

        Ok(AggregationOutput::new(
            summary,
            file_changes,
            conflicts,
            pr_title,
            pr_body,
        ))
    }
}

fn collect_file_changes(successful: &[&SubTaskResult]) -> (Vec<String>, Vec<FileConflict>) {
    let mut file_changes: Vec<String> = Vec::new();
    let mut contributors: HashMap<String, BTreeSet<IssueNumber>> = HashMap::new();

    for result in successful {
        for file in parse_unified_diff(result.diff()) {
            let path = file.filename().to_owned();
            let tasks = contributors.entry(path.clone()).or_default();
            if tasks.is_empty() {
                file_changes.push(path);
            }
            tasks.insert(result.issue_number());
        }
    }

    let conflicts = file_changes
        .iter()
        .filter_map(|path| {
            let tasks = contributors.get(path)?;
            (tasks.len() >= 2).then(|| FileConflict {
                path: path.clone(),
                tasks: tasks.iter().copied().collect(),
            })
        })
        .collect();

    (file_changes, conflicts)
}
