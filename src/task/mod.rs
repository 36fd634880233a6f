//! Ticket pipeline for Autodev.
//!
//! A task is created from an external issue and advanced one stage at a
//! time by the orchestrator: planning, coding, then guardrail checks and
//! pull request creation. Failures are charged against an attempt budget,
//! and guardrail violations that automation cannot fix are handed to a
//! human. The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
