//! Markdown pull request body rendering for aggregated batches.

use crate::aggregation::domain::{AggregationSummary, FileConflict, SubTaskResult};
use crate::task::domain::IssueNumber;
use minijinja::Environment;
use serde::Serialize;
use std::borrow::Cow;
use thiserror::Error;

/// Template used when no override is configured.
pub const DEFAULT_PR_BODY_TEMPLATE: &str = include_str!("../templates/pr_body.md.j2");

/// Errors raised while rendering a pull request body.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PrBodyError {
    /// The template could not be parsed or evaluated.
    #[error("failed to render pull request body: {reason}")]
    Render {
        /// Template engine error message.
        reason: String,
    },
}

/// Values exposed to the pull request body template.
#[derive(Debug, Serialize)]
pub struct PrBodyContext<'a> {
    /// Parent issue number.
    pub parent_issue_number: IssueNumber,
    /// Parent issue title.
    pub parent_issue_title: &'a str,
    /// Batch counts.
    pub summary: AggregationSummary,
    /// Completed sub-tasks in batch order.
    pub successful: Vec<&'a SubTaskResult>,
    /// Failed sub-tasks in batch order.
    pub failed: Vec<&'a SubTaskResult>,
    /// Files changed by more than one completed sub-task.
    pub conflicts: &'a [FileConflict],
    /// Whether the body must carry the human review notice.
    pub needs_review: bool,
}

/// Renders pull request bodies from a `minijinja` template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrBodyRenderer {
    template: Cow<'static, str>,
}

impl Default for PrBodyRenderer {
    fn default() -> Self {
        Self {
            template: Cow::Borrowed(DEFAULT_PR_BODY_TEMPLATE),
        }
    }
}

impl PrBodyRenderer {
    /// Creates a renderer using the embedded default template.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a renderer using a custom template.
    #[must_use]
    pub fn with_template(template: impl Into<String>) -> Self {
        Self {
            template: Cow::Owned(template.into()),
        }
    }

    /// Returns the template source.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Renders the body for `context`.
    ///
    /// # Errors
    ///
    /// Returns [`PrBodyError::Render`] when the template is malformed or
    /// fails during evaluation.
    pub fn render(&self, context: &PrBodyContext<'_>) -> Result<String, PrBodyError> {
        let mut environment = Environment::new();
        environment.set_trim_blocks(true);
        environment.set_lstrip_blocks(true);
        environment
            .render_str(&self.template, context)
            .map_err(|error| PrBodyError::Render {
                reason: error.to_string(),
            })
    }
}
