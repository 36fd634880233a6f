//! `PostgreSQL` adapters for task pipeline persistence.

mod models;
mod repository;
mod schema;

pub use repository::{PostgresTaskRepository, TaskPgPool};
