//! Default guardrail checker driven by [`GuardrailPolicy`].

use crate::diff::{count_changed_lines, parse_unified_diff};
use crate::task::ports::{GuardrailChecker, GuardrailPolicy, GuardrailSubject, GuardrailVerdict};

/// Checks diffs against the configured policy limits.
///
/// Checks run in a fixed order and stop at the first violation:
///
/// 1. the diff must be non-empty and carry file headers (recoverable);
/// 2. no file may sit under a blocked path (non-recoverable);
/// 3. the plan complexity must not exceed the ceiling (non-recoverable);
/// 4. the number of changed lines must stay within the limit (recoverable).
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyGuardrail;

impl PolicyGuardrail {
    /// Creates the default policy checker.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl GuardrailChecker for PolicyGuardrail {
    fn check(&self, subject: &GuardrailSubject<'_>, policy: &GuardrailPolicy) -> GuardrailVerdict {
        if subject.diff.trim().is_empty() {
            return GuardrailVerdict::Recoverable("coder produced an empty diff".to_owned());
        }

        let files = parse_unified_diff(subject.diff);
        if files.is_empty() {
            return GuardrailVerdict::Recoverable(
                "diff has no file headers and cannot be applied".to_owned(),
            );
        }

        for file in &files {
            if let Some(prefix) = policy.blocked_prefix_for(file.filename()) {
                return GuardrailVerdict::NonRecoverable(format!(
                    "diff modifies protected path '{}' (blocked by '{prefix}')",
                    file.filename()
                ));
            }
        }

        if let Some(plan) = subject.plan
            && plan.complexity() > policy.max_complexity
        {
            return GuardrailVerdict::NonRecoverable(format!(
                "plan complexity {} exceeds the automatic ceiling {}",
                plan.complexity(),
                policy.max_complexity
            ));
        }

        let changed = count_changed_lines(subject.diff);
        if changed > policy.max_diff_lines {
            return GuardrailVerdict::Recoverable(format!(
                "diff changes {changed} lines, limit is {}",
                policy.max_diff_lines
            ));
        }

        GuardrailVerdict::Pass
    }
}
