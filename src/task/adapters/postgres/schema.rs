//! Diesel schema for task pipeline persistence.

diesel::table! {
    /// Task records with issue origin and pipeline progress.
    tasks (id) {
        /// Internal task identifier.
        id -> Uuid,
        /// Repository in `owner/repo` form.
        #[max_length = 255]
        repository -> Varchar,
        /// Originating issue number.
        issue_number -> Int8,
        /// Issue title, body, and labels captured at creation.
        issue -> Jsonb,
        /// Parent issue number for batch sub-tasks.
        parent_issue_number -> Nullable<Int8>,
        /// Pipeline status.
        #[max_length = 50]
        status -> Varchar,
        /// Failed attempts consumed.
        attempt_count -> Int4,
        /// Attempt budget.
        max_attempts -> Int4,
        /// Attached plan.
        plan -> Nullable<Jsonb>,
        /// Pull request head branch.
        #[max_length = 255]
        branch_name -> Nullable<Varchar>,
        /// Pull request URL.
        pr_url -> Nullable<Text>,
        /// Latest coder diff.
        current_diff -> Nullable<Text>,
        /// Commit message for the latest diff.
        commit_message -> Nullable<Text>,
        /// Most recent failure or escalation reason.
        last_error -> Nullable<Text>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}
