//! Branch-name value object for pull request heads.

use super::{IssueNumber, TaskDomainError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length for a validated branch name.
const MAX_BRANCH_NAME_LENGTH: usize = 200;

/// Prefix applied to branches created for automated changes.
const BRANCH_PREFIX: &str = "autodev";

/// Validated Git branch name.
///
/// Branch names must be non-empty after trimming, must not contain
/// whitespace, `..`, or `:`, and must not exceed `MAX_BRANCH_NAME_LENGTH`
/// characters.
///
/// # Examples
///
///     use autodev::task::domain::{BranchName, IssueNumber};
///
///     let issue = IssueNumber::new(42).expect("valid");
///     assert_eq!(BranchName::for_issue(issue).as_str(), "autodev/issue-42");
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Creates a validated branch name.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidBranchName`] when the value breaks
    /// any naming constraint.
    pub fn new(value: impl Into<String>) -> Result<Self, TaskDomainError> {
        let raw = value.into();
        let normalized = raw.trim();

        if Self::is_invalid_branch_name(normalized) {
            return Err(TaskDomainError::InvalidBranchName(raw));
        }

        Ok(Self(normalized.to_owned()))
    }

    /// Returns the conventional head branch for a single issue.
    #[must_use]
    pub fn for_issue(issue_number: IssueNumber) -> Self {
        Self(format!("{BRANCH_PREFIX}/issue-{issue_number}"))
    }

    /// Returns the conventional head branch for an aggregated sub-task batch.
    #[must_use]
    pub fn for_batch(parent_issue_number: IssueNumber) -> Self {
        Self(format!("{BRANCH_PREFIX}/issue-{parent_issue_number}-batch"))
    }

    fn is_invalid_branch_name(name: &str) -> bool {
        name.is_empty()
            || name.len() > MAX_BRANCH_NAME_LENGTH
            || name.contains("..")
            || name.contains(':')
            || name.chars().any(char::is_whitespace)
    }

    /// Returns the branch name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BranchName {
    type Error = TaskDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BranchName> for String {
    fn from(value: BranchName) -> Self {
        value.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
