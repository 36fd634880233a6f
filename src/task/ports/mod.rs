//! Port contracts for the ticket pipeline.
//!
//! Ports define infrastructure-agnostic interfaces used by task services:
//! persistence, the planning and coding agents, GitHub, and the guardrail
//! policy checker.

pub mod agents;
pub mod github;
pub mod guardrail;
pub mod repository;

pub use agents::{Coder, CollaboratorError, Planner};
pub use github::GitHubClient;
pub use guardrail::{GuardrailChecker, GuardrailPolicy, GuardrailSubject, GuardrailVerdict};
pub use repository::{TaskRepository, TaskRepositoryError, TaskRepositoryResult};
