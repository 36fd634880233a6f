//! Issue-origin value objects for task creation.

use super::{IssueNumber, RepositoryFullName, TaskDomainError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical GitHub issue reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IssueRef {
    repository: RepositoryFullName,
    issue_number: IssueNumber,
}

impl IssueRef {
    /// Creates an issue reference from validated components.
    #[must_use]
    pub const fn new(repository: RepositoryFullName, issue_number: IssueNumber) -> Self {
        Self {
            repository,
            issue_number,
        }
    }

    /// Creates an issue reference from raw values.
    ///
    /// # Errors
    ///
    /// Returns a [`TaskDomainError`] when the repository or number is invalid.
    pub fn from_parts(repository: &str, issue_number: u64) -> Result<Self, TaskDomainError> {
        Ok(Self::new(
            RepositoryFullName::new(repository)?,
            IssueNumber::new(issue_number)?,
        ))
    }

    /// Returns the repository identifier.
    #[must_use]
    pub const fn repository(&self) -> &RepositoryFullName {
        &self.repository
    }

    /// Returns the issue number.
    #[must_use]
    pub const fn issue_number(&self) -> IssueNumber {
        self.issue_number
    }
}

impl fmt::Display for IssueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.repository, self.issue_number)
    }
}

/// Issue content captured when the task was created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueSnapshot {
    title: String,
    body: Option<String>,
    labels: Vec<String>,
}

impl IssueSnapshot {
    /// Creates a snapshot with a required title.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyIssueTitle`] if the title is blank.
    pub fn new(title: impl Into<String>) -> Result<Self, TaskDomainError> {
        let raw_title = title.into();
        let normalized_title = raw_title.trim();
        if normalized_title.is_empty() {
            return Err(TaskDomainError::EmptyIssueTitle);
        }

        Ok(Self {
            title: normalized_title.to_owned(),
            body: None,
            labels: Vec::new(),
        })
    }

    /// Sets the issue body. Blank bodies are stored as absent.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        let value = body.into();
        let normalized = value.trim();
        self.body = (!normalized.is_empty()).then(|| normalized.to_owned());
        self
    }

    /// Sets the issue labels, dropping blank entries.
    #[must_use]
    pub fn with_labels(mut self, labels: impl IntoIterator<Item = String>) -> Self {
        self.labels = labels
            .into_iter()
            .map(|label| label.trim().to_owned())
            .filter(|label| !label.is_empty())
            .collect();
        self
    }

    /// Returns the issue title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the issue body, if any.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Returns the issue labels.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

/// Issue payload used to create a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIssue {
    issue_ref: IssueRef,
    snapshot: IssueSnapshot,
}

impl ExternalIssue {
    /// Creates an issue payload from validated values.
    #[must_use]
    pub const fn new(issue_ref: IssueRef, snapshot: IssueSnapshot) -> Self {
        Self {
            issue_ref,
            snapshot,
        }
    }

    /// Returns the issue reference.
    #[must_use]
    pub const fn issue_ref(&self) -> &IssueRef {
        &self.issue_ref
    }

    /// Returns the captured issue content.
    #[must_use]
    pub const fn snapshot(&self) -> &IssueSnapshot {
        &self.snapshot
    }
}
