//! Implementation plans produced by the planning collaborator.

use super::TaskDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Estimated implementation complexity, ordered from lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    /// Small, localized change.
    Low,
    /// Change spanning a few files or concepts.
    Medium,
    /// Broad or risky change.
    High,
}

impl Complexity {
    /// Returns the canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl TryFrom<&str> for Complexity {
    type Error = TaskDomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(TaskDomainError::InvalidComplexity(value.to_owned())),
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Planner confidence as a whole percentage in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Confidence(u8);

impl Confidence {
    /// Full confidence.
    pub const CERTAIN: Self = Self(100);

    /// Creates a validated confidence value.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidConfidence`] above 100.
    pub const fn new(percent: u8) -> Result<Self, TaskDomainError> {
        if percent > 100 {
            return Err(TaskDomainError::InvalidConfidence(percent));
        }
        Ok(Self(percent))
    }

    /// Returns the percentage.
    #[must_use]
    pub const fn percent(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Confidence {
    type Error = TaskDomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Confidence> for u8 {
    fn from(value: Confidence) -> Self {
        value.0
    }
}

/// Implementation plan attached to a task once planning succeeds.
///
/// # Examples
///
///     use autodev::task::domain::{Complexity, Plan};
///
///     let plan = Plan::new(Complexity::Low)
///         .with_steps(vec!["Add a guard clause".to_owned()])
///         .with_target_files(vec!["src/lib.rs".to_owned()]);
///     assert_eq!(plan.target_files(), ["src/lib.rs".to_owned()]);
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    definition_of_done: Vec<String>,
    steps: Vec<String>,
    target_files: Vec<String>,
    complexity: Complexity,
    confidence: Confidence,
}

impl Plan {
    /// Creates an empty plan with the given complexity and full confidence.
    #[must_use]
    pub const fn new(complexity: Complexity) -> Self {
        Self {
            definition_of_done: Vec::new(),
            steps: Vec::new(),
            target_files: Vec::new(),
            complexity,
            confidence: Confidence::CERTAIN,
        }
    }

    /// Sets the acceptance criteria.
    #[must_use]
    pub fn with_definition_of_done(mut self, criteria: impl IntoIterator<Item = String>) -> Self {
        self.definition_of_done = non_blank(criteria);
        self
    }

    /// Sets the implementation steps.
    #[must_use]
    pub fn with_steps(mut self, steps: impl IntoIterator<Item = String>) -> Self {
        self.steps = non_blank(steps);
        self
    }

    /// Sets the files the plan expects to touch, keeping first occurrences.
    #[must_use]
    pub fn with_target_files(mut self, files: impl IntoIterator<Item = String>) -> Self {
        let mut unique: Vec<String> = Vec::new();
        for file in non_blank(files) {
            if !unique.contains(&file) {
                unique.push(file);
            }
        }
        self.target_files = unique;
        self
    }

    /// Sets the planner confidence.
    #[must_use]
    pub const fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = confidence;
        self
    }

    /// Returns the acceptance criteria.
    #[must_use]
    pub fn definition_of_done(&self) -> &[String] {
        &self.definition_of_done
    }

    /// Returns the implementation steps.
    #[must_use]
    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    /// Returns the files the plan expects to touch.
    #[must_use]
    pub fn target_files(&self) -> &[String] {
        &self.target_files
    }

    /// Returns the estimated complexity.
    #[must_use]
    pub const fn complexity(&self) -> Complexity {
        self.complexity
    }

    /// Returns the planner confidence.
    #[must_use]
    pub const fn confidence(&self) -> Confidence {
        self.confidence
    }
}

fn non_blank(values: impl IntoIterator<Item = String>) -> Vec<String> {
    values
        .into_iter()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .collect()
}
