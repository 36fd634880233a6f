//! `PostgreSQL` repository implementation for task pipeline storage.

use super::{
    models::{NewTaskRow, TaskProgressChangeset, TaskRow},
    schema::tasks,
};
use crate::task::{
    domain::{
        BranchName, IssueNumber, IssueRef, IssueSnapshot, PersistedTaskData, Plan, PullRequestUrl,
        RepositoryFullName, Task, TaskId, TaskStatus,
    },
    ports::{TaskRepository, TaskRepositoryError, TaskRepositoryResult},
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind, Error as DieselError};

/// `PostgreSQL` connection pool type used by task adapters.
pub type TaskPgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed task repository.
#[derive(Debug, Clone)]
pub struct PostgresTaskRepository {
    pool: TaskPgPool,
}

impl PostgresTaskRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: TaskPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> TaskRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> TaskRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(TaskRepositoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(TaskRepositoryError::persistence)?
    }
}

#[async_trait]
impl TaskRepository for PostgresTaskRepository {
    async fn store(&self, task: &Task) -> TaskRepositoryResult<()> {
        let task_id = task.id();
        let issue_ref = task.issue_ref().clone();
        let new_row = to_new_row(task)?;

        self.run_blocking(move |connection| {
            // The unique index still guards the window between this check
            // and the insert.
            let duplicate_issue = find_task_by_issue_ref(connection, &issue_ref)?;
            if duplicate_issue.is_some() {
                return Err(TaskRepositoryError::DuplicateIssueOrigin(issue_ref.clone()));
            }

            diesel::insert_into(tasks::table)
                .values(&new_row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info)
                        if is_issue_origin_unique_violation(info.as_ref()) =>
                    {
                        TaskRepositoryError::DuplicateIssueOrigin(issue_ref.clone())
                    }
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        TaskRepositoryError::DuplicateTask(task_id)
                    }
                    _ => TaskRepositoryError::persistence(err),
                })?;

            Ok(())
        })
        .await
    }

    async fn update(&self, task: &Task) -> TaskRepositoryResult<()> {
        let task_id = task.id();
        let changeset = to_changeset(task)?;

        self.run_blocking(move |connection| {
            let updated = diesel::update(tasks::table.find(task_id.into_inner()))
                .set(&changeset)
                .execute(connection)
                .map_err(TaskRepositoryError::persistence)?;
            if updated == 0 {
                return Err(TaskRepositoryError::NotFound(task_id));
            }
            Ok(())
        })
        .await
    }

    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        self.run_blocking(move |connection| {
            let row = tasks::table
                .filter(tasks::id.eq(id.into_inner()))
                .select(TaskRow::as_select())
                .first::<TaskRow>(connection)
                .optional()
                .map_err(TaskRepositoryError::persistence)?;
            row.map(row_to_task).transpose()
        })
        .await
    }

    async fn find_by_issue_ref(&self, issue_ref: &IssueRef) -> TaskRepositoryResult<Option<Task>> {
        let lookup_issue_ref = issue_ref.clone();
        self.run_blocking(move |connection| {
            let row = find_task_by_issue_ref(connection, &lookup_issue_ref)?;
            row.map(row_to_task).transpose()
        })
        .await
    }

    async fn find_by_parent_issue(
        &self,
        repository: &RepositoryFullName,
        parent_issue: IssueNumber,
    ) -> TaskRepositoryResult<Vec<Task>> {
        let lookup_repository = repository.as_str().to_owned();
        let parent_number = issue_number_to_i64(parent_issue)?;
        self.run_blocking(move |connection| {
            let rows = tasks::table
                .filter(tasks::repository.eq(lookup_repository))
                .filter(tasks::parent_issue_number.eq(parent_number))
                .order((tasks::created_at.asc(), tasks::issue_number.asc()))
                .select(TaskRow::as_select())
                .load::<TaskRow>(connection)
                .map_err(TaskRepositoryError::persistence)?;
            rows.into_iter().map(row_to_task).collect()
        })
        .await
    }
}

fn issue_number_to_i64(issue_number: IssueNumber) -> TaskRepositoryResult<i64> {
    i64::try_from(issue_number.value()).map_err(TaskRepositoryError::persistence)
}

fn attempts_to_i32(value: u32) -> TaskRepositoryResult<i32> {
    i32::try_from(value).map_err(TaskRepositoryError::persistence)
}

fn to_changeset(task: &Task) -> TaskRepositoryResult<TaskProgressChangeset> {
    let plan = task
        .plan()
        .map(serde_json::to_value)
        .transpose()
        .map_err(TaskRepositoryError::persistence)?;

    Ok(TaskProgressChangeset {
        status: task.status().as_str().to_owned(),
        attempt_count: attempts_to_i32(task.attempt_count())?,
        max_attempts: attempts_to_i32(task.max_attempts())?,
        plan,
        branch_name: task.branch_name().map(|branch| branch.as_str().to_owned()),
        pr_url: task.pr_url().map(|url| url.as_str().to_owned()),
        current_diff: task.current_diff().map(str::to_owned),
        commit_message: task.commit_message().map(str::to_owned),
        last_error: task.last_error().map(str::to_owned),
        updated_at: task.updated_at(),
    })
}

fn to_new_row(task: &Task) -> TaskRepositoryResult<NewTaskRow> {
    let issue = serde_json::to_value(task.issue()).map_err(TaskRepositoryError::persistence)?;
    let parent_issue_number = task.parent_issue().map(issue_number_to_i64).transpose()?;
    let TaskProgressChangeset {
        status,
        attempt_count,
        max_attempts,
        plan,
        branch_name,
        pr_url,
        current_diff,
        commit_message,
        last_error,
        updated_at,
    } = to_changeset(task)?;

    Ok(NewTaskRow {
        id: task.id().into_inner(),
        repository: task.issue_ref().repository().as_str().to_owned(),
        issue_number: issue_number_to_i64(task.issue_ref().issue_number())?,
        issue,
        parent_issue_number,
        status,
        attempt_count,
        max_attempts,
        plan,
        branch_name,
        pr_url,
        current_diff,
        commit_message,
        last_error,
        created_at: task.created_at(),
        updated_at,
    })
}

fn issue_number_from_row(value: i64) -> TaskRepositoryResult<IssueNumber> {
    let unsigned = u64::try_from(value).map_err(TaskRepositoryError::persistence)?;
    IssueNumber::new(unsigned).map_err(TaskRepositoryError::persistence)
}

fn row_to_task(row: TaskRow) -> TaskRepositoryResult<Task> {
    let TaskRow {
        id,
        repository: persisted_repository,
        issue_number: persisted_issue_number,
        issue: persisted_issue,
        parent_issue_number,
        status: persisted_status,
        attempt_count,
        max_attempts,
        plan: persisted_plan,
        branch_name: persisted_branch_name,
        pr_url: persisted_pr_url,
        current_diff,
        commit_message,
        last_error,
        created_at,
        updated_at,
    } = row;

    let repository =
        RepositoryFullName::new(persisted_repository).map_err(TaskRepositoryError::persistence)?;
    let issue_ref = IssueRef::new(repository, issue_number_from_row(persisted_issue_number)?);
    let issue = serde_json::from_value::<IssueSnapshot>(persisted_issue)
        .map_err(TaskRepositoryError::persistence)?;
    let parent_issue = parent_issue_number.map(issue_number_from_row).transpose()?;
    let status = TaskStatus::try_from(persisted_status.as_str())
        .map_err(TaskRepositoryError::persistence)?;
    let plan = persisted_plan
        .map(serde_json::from_value::<Plan>)
        .transpose()
        .map_err(TaskRepositoryError::persistence)?;
    let branch_name = persisted_branch_name
        .map(BranchName::new)
        .transpose()
        .map_err(TaskRepositoryError::persistence)?;
    let pr_url = persisted_pr_url
        .map(PullRequestUrl::new)
        .transpose()
        .map_err(TaskRepositoryError::persistence)?;

    let data = PersistedTaskData {
        id: TaskId::from_uuid(id),
        issue_ref,
        issue,
        parent_issue,
        status,
        attempt_count: u32::try_from(attempt_count).map_err(TaskRepositoryError::persistence)?,
        max_attempts: u32::try_from(max_attempts).map_err(TaskRepositoryError::persistence)?,
        plan,
        branch_name,
        pr_url,
        current_diff,
        commit_message,
        last_error,
        created_at,
        updated_at,
    };
    Ok(Task::from_persisted(data))
}

fn is_issue_origin_unique_violation(info: &dyn DatabaseErrorInformation) -> bool {
    info.constraint_name()
        .is_some_and(|name| name == "idx_tasks_issue_origin_unique")
}

fn find_task_by_issue_ref(
    connection: &mut PgConnection,
    issue_ref: &IssueRef,
) -> TaskRepositoryResult<Option<TaskRow>> {
    let issue_number = issue_number_to_i64(issue_ref.issue_number())?;
    tasks::table
        .filter(tasks::repository.eq(issue_ref.repository().as_str()))
        .filter(tasks::issue_number.eq(issue_number))
        .select(TaskRow::as_select())
        .first::<TaskRow>(connection)
        .optional()
        .map_err(TaskRepositoryError::persistence)
}
