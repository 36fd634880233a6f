//! Autodev: automated resolution of development tickets.
//!
//! Tickets flow through a pipeline of analyze, plan, code, validate, and
//! open a pull request, with bounded retries and escalation to a human when
//! automation cannot proceed. Tickets split into sibling sub-tasks are
//! reconciled into one changeset before a single pull request is opened.
//!
//! # Architecture
//!
//! Autodev follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external collaborators
//! - **Adapters**: Concrete implementations of ports (database, policy)
//! - **Services**: Orchestration over ports
//!
//! # Modules
//!
//! - [`diff`]: Unified diff parsing
//! - [`task`]: Task state machine, driver, and lifecycle
//! - [`aggregation`]: Sub-task diff aggregation and batch execution
//! - [`config`]: Typed pipeline configuration

pub mod aggregation;
pub mod config;
pub mod diff;
pub mod task;
