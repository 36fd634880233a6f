//! Guardrail port gating automatic pull request creation.

use crate::task::domain::{Complexity, Plan};
use serde::{Deserialize, Serialize};

/// Policy limits enforced before a diff may become a pull request.
///
/// # Examples
///
/// ```
/// use autodev::task::ports::GuardrailPolicy;
///
/// let policy = GuardrailPolicy::default();
/// assert_eq!(policy.max_diff_lines, 300);
///
/// let strict = GuardrailPolicy::strict();
/// assert!(strict.max_diff_lines < policy.max_diff_lines);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardrailPolicy {
    /// Maximum number of added plus removed lines.
    pub max_diff_lines: usize,
    /// Path prefixes the pipeline must never modify on its own.
    pub blocked_paths: Vec<String>,
    /// Highest plan complexity that may be merged without a human.
    pub max_complexity: Complexity,
}

impl Default for GuardrailPolicy {
    fn default() -> Self {
        Self {
            max_diff_lines: 300,
            blocked_paths: default_blocked_paths(),
            max_complexity: Complexity::High,
        }
    }
}

impl GuardrailPolicy {
    /// Creates a policy with tighter limits for sensitive repositories.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            max_diff_lines: 100,
            max_complexity: Complexity::Medium,
            ..Self::default()
        }
    }

    /// Returns the blocked entry matching `path`, if any.
    ///
    /// Entries ending in `/` block a directory tree. Other entries block a
    /// file of that name at any depth.
    #[must_use]
    pub fn blocked_prefix_for(&self, path: &str) -> Option<&str> {
        self.blocked_paths
            .iter()
            .map(String::as_str)
            .find(|entry| match entry.strip_suffix('/') {
                Some(directory) => path == directory || path.starts_with(entry),
                None => {
                    path == *entry
                        || path
                            .rsplit_once('/')
                            .is_some_and(|(_, file_name)| file_name == *entry)
                }
            })
    }
}

fn default_blocked_paths() -> Vec<String> {
    [".github/workflows/", ".env", "secrets/"]
        .into_iter()
        .map(str::to_owned)
        .collect()
}

/// Change under review by a guardrail check.
#[derive(Debug, Clone, Copy)]
pub struct GuardrailSubject<'a> {
    /// Unified diff text.
    pub diff: &'a str,
    /// Plan the diff implements, when known.
    pub plan: Option<&'a Plan>,
}

/// Outcome of a guardrail check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardrailVerdict {
    /// The change may proceed to a pull request.
    Pass,
    /// The coder may fix the problem on another attempt.
    Recoverable(String),
    /// Only a human can resolve the problem.
    NonRecoverable(String),
}

/// Policy checker consulted in the `Testing` stage.
pub trait GuardrailChecker: Send + Sync {
    /// Checks a change against the policy.
    fn check(&self, subject: &GuardrailSubject<'_>, policy: &GuardrailPolicy) -> GuardrailVerdict;
}
