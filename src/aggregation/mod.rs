//! Batch diff aggregation.
//!
//! When a ticket is split into independent sub-tasks, each sub-task is
//! driven through the pipeline on its own. This module reconciles their
//! outputs into a single changeset:
//!
//! - [`domain`] holds sub-task results, aggregation outputs, and conflicts
//! - [`services`] validates and aggregates batches, renders the pull request
//!   body, and runs whole batches concurrently

pub mod domain;
pub mod services;
