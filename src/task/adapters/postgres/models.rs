//! Diesel row models for task persistence.

use super::schema::tasks;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Query result row for task records.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskRow {
    /// Internal task identifier.
    pub id: uuid::Uuid,
    /// Repository in `owner/repo` form.
    pub repository: String,
    /// Originating issue number.
    pub issue_number: i64,
    /// Issue snapshot JSON payload.
    pub issue: Value,
    /// Parent issue number for sub-tasks.
    pub parent_issue_number: Option<i64>,
    /// Pipeline status.
    pub status: String,
    /// Failed attempts consumed.
    pub attempt_count: i32,
    /// Attempt budget.
    pub max_attempts: i32,
    /// Plan JSON payload.
    pub plan: Option<Value>,
    /// Pull request head branch.
    pub branch_name: Option<String>,
    /// Pull request URL.
    pub pr_url: Option<String>,
    /// Latest coder diff.
    pub current_diff: Option<String>,
    /// Commit message for the latest diff.
    pub commit_message: Option<String>,
    /// Most recent failure or escalation reason.
    pub last_error: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Insert model for task records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = tasks)]
pub struct NewTaskRow {
    /// Internal task identifier.
    pub id: uuid::Uuid,
    /// Repository in `owner/repo` form.
    pub repository: String,
    /// Originating issue number.
    pub issue_number: i64,
    /// Issue snapshot JSON payload.
    pub issue: Value,
    /// Parent issue number for sub-tasks.
    pub parent_issue_number: Option<i64>,
    /// Pipeline status.
    pub status: String,
    /// Failed attempts consumed.
    pub attempt_count: i32,
    /// Attempt budget.
    pub max_attempts: i32,
    /// Plan JSON payload.
    pub plan: Option<Value>,
    /// Pull request head branch.
    pub branch_name: Option<String>,
    /// Pull request URL.
    pub pr_url: Option<String>,
    /// Latest coder diff.
    pub current_diff: Option<String>,
    /// Commit message for the latest diff.
    pub commit_message: Option<String>,
    /// Most recent failure or escalation reason.
    pub last_error: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Pipeline columns rewritten on every update.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = tasks)]
#[diesel(treat_none_as_null = true)]
pub struct TaskProgressChangeset {
    /// Pipeline status.
    pub status: String,
    /// Failed attempts consumed.
    pub attempt_count: i32,
    /// Attempt budget.
    pub max_attempts: i32,
    /// Plan JSON payload.
    pub plan: Option<Value>,
    /// Pull request head branch.
    pub branch_name: Option<String>,
    /// Pull request URL.
    pub pr_url: Option<String>,
    /// Latest coder diff.
    pub current_diff: Option<String>,
    /// Commit message for the latest diff.
    pub commit_message: Option<String>,
    /// Most recent failure or escalation reason.
    pub last_error: Option<String>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}
