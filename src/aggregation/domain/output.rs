//! Aggregation inputs, outputs, and validation reports.

use super::SubTaskResult;
use crate::task::domain::{IssueNumber, RepositoryFullName};
use serde::Serialize;

/// Everything needed to aggregate a batch of sibling sub-tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationInput {
    /// Issue the sub-tasks were split from.
    pub parent_issue_number: IssueNumber,
    /// Title of the parent issue.
    pub parent_issue_title: String,
    /// Repository the batch targets.
    pub repository: RepositoryFullName,
    /// Sub-task results in batch order.
    pub sub_tasks: Vec<SubTaskResult>,
}

/// Counts describing an aggregated batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AggregationSummary {
    /// Number of sub-tasks in the batch.
    pub total_tasks: usize,
    /// Number of completed sub-tasks.
    pub successful_tasks: usize,
    /// Number of failed sub-tasks.
    pub failed_tasks: usize,
    /// Number of files touched by more than one completed sub-task.
    pub conflicts_detected: usize,
}

/// File touched by two or more completed sub-tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileConflict {
    /// Path of the file.
    pub path: String,
    /// Issue numbers of the contributing sub-tasks, ascending.
    pub tasks: Vec<IssueNumber>,
}

/// Aggregated changeset and pull request text for a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregationOutput {
    summary: AggregationSummary,
    file_changes: Vec<String>,
    conflicts: Vec<FileConflict>,
    pr_title: String,
    pr_body: String,
}

impl AggregationOutput {
    /// Assembles an output from its parts.
    #[must_use]
    pub const fn new(
        summary: AggregationSummary,
        file_changes: Vec<String>,
        conflicts: Vec<FileConflict>,
        pr_title: String,
        pr_body: String,
    ) -> Self {
        Self {
            summary,
            file_changes,
            conflicts,
            pr_title,
            pr_body,
        }
    }

    /// Returns the batch counts.
    #[must_use]
    pub const fn summary(&self) -> AggregationSummary {
        self.summary
    }

    /// Returns changed paths in order of first appearance.
    #[must_use]
    pub fn file_changes(&self) -> &[String] {
        &self.file_changes
    }

    /// Returns files touched by more than one completed sub-task.
    #[must_use]
    pub fn conflicts(&self) -> &[FileConflict] {
        &self.conflicts
    }

    /// Returns `true` when a human must review the pull request.
    #[must_use]
    pub const fn needs_human_review(&self) -> bool {
        self.summary.failed_tasks > 0 || self.summary.conflicts_detected > 0
    }

    /// Returns the pull request title.
    #[must_use]
    pub fn pr_title(&self) -> &str {
        &self.pr_title
    }

    /// Returns the markdown pull request body.
    #[must_use]
    pub fn pr_body(&self) -> &str {
        &self.pr_body
    }
}

/// Result of checking a batch before aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationReport {
    errors: Vec<String>,
}

impl ValidationReport {
    /// Builds a report from collected error messages.
    #[must_use]
    pub const fn from_errors(errors: Vec<String>) -> Self {
        Self { errors }
    }

    /// Returns `true` when no errors were found.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns every error found, in check order.
    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Consumes the report, returning its errors.
    #[must_use]
    pub fn into_errors(self) -> Vec<String> {
        self.errors
    }
}
