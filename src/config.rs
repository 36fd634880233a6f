//! Typed pipeline configuration.
//!
//! [`AutodevConfig`] gathers the limits shared by the orchestrator, the
//! driver, and the batch service. Every field has a default, so partial JSON
//! documents are accepted.

use crate::task::domain::{AttemptBudget, TaskDomainError};
use crate::task::ports::GuardrailPolicy;
use crate::task::services::{DEFAULT_MAX_ITERATIONS, OrchestratorSettings};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not valid JSON for this schema.
    #[error("invalid configuration document: {0}")]
    Parse(#[from] serde_json::Error),
    /// The configured values violate a constraint.
    #[error("invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Pipeline configuration.
///
/// # Examples
///
/// ```
/// use autodev::config::AutodevConfig;
///
/// let config = AutodevConfig::from_json_str(r#"{ "max_attempts": 5 }"#)
///     .expect("valid configuration");
/// assert_eq!(config.max_attempts, 5);
/// assert_eq!(config.guardrail.max_diff_lines, 300);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutodevConfig {
    /// Failed attempts a task may consume before it is failed.
    pub max_attempts: u32,
    /// Ceiling on processing steps per task drive.
    pub max_iterations: usize,
    /// Upper bound, in seconds, for each collaborator call.
    pub collaborator_timeout_secs: u64,
    /// Guardrail policy applied in the testing stage.
    pub guardrail: GuardrailPolicy,
}

impl Default for AutodevConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            collaborator_timeout_secs: 120,
            guardrail: GuardrailPolicy::default(),
        }
    }
}

impl AutodevConfig {
    /// Creates a configuration for sensitive repositories: fewer attempts and
    /// the strict guardrail policy.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            max_attempts: 2,
            guardrail: GuardrailPolicy::strict(),
            ..Self::default()
        }
    }

    /// Parses and validates a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and
    /// [`ConfigError::Invalid`] when a value violates a constraint.
    pub fn from_json_str(document: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(document)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every constraint, reporting all violations at once.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] listing each violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        if let Err(err) = self.attempt_budget() {
            errors.push(err.to_string());
        }
        if self.max_iterations == 0 {
            errors.push("max iterations must be at least 1".to_owned());
        }
        if self.collaborator_timeout_secs == 0 {
            errors.push("collaborator timeout must be at least 1 second".to_owned());
        }
        if self.guardrail.max_diff_lines == 0 {
            errors.push("guardrail max diff lines must be at least 1".to_owned());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }

    /// Returns the validated attempt budget.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidAttemptBudget`] for zero.
    pub const fn attempt_budget(&self) -> Result<AttemptBudget, TaskDomainError> {
        AttemptBudget::new(self.max_attempts)
    }

    /// Returns the collaborator timeout.
    #[must_use]
    pub const fn collaborator_timeout(&self) -> Duration {
        Duration::from_secs(self.collaborator_timeout_secs)
    }

    /// Builds orchestrator settings from this configuration.
    #[must_use]
    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            policy: self.guardrail.clone(),
            collaborator_timeout: self.collaborator_timeout(),
        }
    }
}
