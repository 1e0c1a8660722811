/// Task model and database operations
///
/// A task belongs to exactly one project, is created by its initiator, and is
/// worked on by an optional performer. Status changes are driven by
/// [`crate::lifecycle::compute_status_transition`]; this module only stores
/// the resulting [`TaskDelta`].
///
/// # State Machine
///
/// ```text
/// CREATED → IN_PROGRESS → DONE
/// ```
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('CREATED', 'IN_PROGRESS', 'DONE');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     title VARCHAR(200) NOT NULL,
///     description TEXT,
///     deadline TIMESTAMPTZ NOT NULL,
///     initiator_id UUID NOT NULL REFERENCES users(id),
///     performer_id UUID REFERENCES users(id),
///     status task_status NOT NULL DEFAULT 'CREATED',
///     begin_at TIMESTAMPTZ,
///     done_at TIMESTAMPTZ,
///     spent_time BIGINT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskclock_shared::models::task::{Task, CreateTask};
/// use taskclock_shared::db::pool::{create_pool, DatabaseConfig};
/// use chrono::{Duration, Utc};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let task = Task::create(&pool, CreateTask {
///     project_id: Uuid::new_v4(),
///     initiator_id: Uuid::new_v4(),
///     title: "Write release notes".to_string(),
///     description: None,
///     deadline: Utc::now() + Duration::days(3),
/// }).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Task lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Task exists but nobody has started it
    Created,

    /// Performer is working on the task
    InProgress,

    /// Task is finished (terminal)
    Done,
}

impl TaskStatus {
    /// Converts status to its wire/database literal
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Created => "CREATED",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Done => "DONE",
        }
    }

    /// Checks if transition to target status is valid
    pub fn can_transition_to(&self, target: TaskStatus) -> bool {
        matches!(
            (self, target),
            (TaskStatus::Created, TaskStatus::InProgress)
                | (TaskStatus::InProgress, TaskStatus::Done)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(TaskStatus::Created),
            "IN_PROGRESS" => Ok(TaskStatus::InProgress),
            "DONE" => Ok(TaskStatus::Done),
            other => Err(format!(
                "Unknown task status '{}': expected one of CREATED, IN_PROGRESS, DONE",
                other
            )),
        }
    }
}

/// Task model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// Owning project
    pub project_id: Uuid,

    /// Short title
    pub title: String,

    /// Optional free-form description
    pub description: Option<String>,

    /// When the task is due
    pub deadline: DateTime<Utc>,

    /// User who created the task
    pub initiator_id: Uuid,

    /// User assigned to execute the task
    pub performer_id: Option<Uuid>,

    /// Current lifecycle status
    pub status: TaskStatus,

    /// When work started (set once on CREATED → IN_PROGRESS)
    pub begin_at: Option<DateTime<Utc>>,

    /// When work finished (set once on IN_PROGRESS → DONE)
    pub done_at: Option<DateTime<Utc>>,

    /// Milliseconds between `begin_at` and `done_at`, frozen on completion
    pub spent_time: Option<i64>,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    /// Owning project
    pub project_id: Uuid,

    /// Creating user
    pub initiator_id: Uuid,

    /// Task title
    pub title: String,

    /// Optional description
    pub description: Option<String>,

    /// Deadline
    pub deadline: DateTime<Utc>,
}

/// Partial update produced by a status transition
///
/// `None` fields are left untouched in storage, and a field that is already
/// set keeps its value: `begin_at`, `done_at` and `spent_time` are written at
/// most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDelta {
    /// New status
    pub status: TaskStatus,

    /// Start timestamp to record
    pub begin_at: Option<DateTime<Utc>>,

    /// Completion timestamp to record
    pub done_at: Option<DateTime<Utc>>,

    /// Worked milliseconds to record
    pub spent_time: Option<i64>,
}

impl TaskDelta {
    /// Applies the delta to an in-memory task
    pub fn apply(&self, task: &mut Task, now: DateTime<Utc>) {
        task.status = self.status;
        task.begin_at = task.begin_at.or(self.begin_at);
        task.done_at = task.done_at.or(self.done_at);
        task.spent_time = task.spent_time.or(self.spent_time);
        task.updated_at = now;
    }
}

const TASK_COLUMNS: &str = "id, project_id, title, description, deadline, initiator_id, \
     performer_id, status, begin_at, done_at, spent_time, created_at, updated_at";

impl Task {
    /// Inserts a new task in CREATED status
    ///
    /// # Errors
    ///
    /// Returns an error if the project or initiator doesn't exist (foreign key
    /// violation) or the database connection fails
    pub async fn create<'e, E>(executor: E, data: CreateTask) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            r#"
            INSERT INTO tasks (project_id, initiator_id, title, description, deadline)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            TASK_COLUMNS
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(data.project_id)
            .bind(data.initiator_id)
            .bind(data.title)
            .bind(data.description)
            .bind(data.deadline)
            .fetch_one(executor)
            .await
    }

    /// Finds a task by ID
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS);

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Lists all tasks of a project, oldest first
    pub async fn list_by_project<'e, E>(
        executor: E,
        project_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {} FROM tasks WHERE project_id = $1 ORDER BY created_at ASC, id ASC",
            TASK_COLUMNS
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(project_id)
            .fetch_all(executor)
            .await
    }

    /// Lists tasks of several projects at once, grouped by project
    pub async fn list_by_projects<'e, E>(
        executor: E,
        project_ids: &[Uuid],
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {} FROM tasks WHERE project_id = ANY($1) \
             ORDER BY project_id, created_at ASC, id ASC",
            TASK_COLUMNS
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(project_ids)
            .fetch_all(executor)
            .await
    }

    /// Sets the performer of a task
    ///
    /// Returns the updated task, or `None` if it doesn't exist
    pub async fn assign_performer<'e, E>(
        executor: E,
        id: Uuid,
        performer_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            r#"
            UPDATE tasks
            SET performer_id = $2,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            TASK_COLUMNS
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(performer_id)
            .fetch_optional(executor)
            .await
    }

    /// Applies a status delta as a partial update
    ///
    /// Timestamps already present are kept (`COALESCE`), so `begin_at`,
    /// `done_at` and `spent_time` are written at most once.
    pub async fn apply_delta<'e, E>(
        executor: E,
        id: Uuid,
        delta: TaskDelta,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            r#"
            UPDATE tasks
            SET status = $2,
                begin_at = COALESCE(begin_at, $3),
                done_at = COALESCE(done_at, $4),
                spent_time = COALESCE(spent_time, $5),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            TASK_COLUMNS
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(delta.status)
            .bind(delta.begin_at)
            .bind(delta.done_at)
            .bind(delta.spent_time)
            .fetch_optional(executor)
            .await
    }

    /// Deletes a task
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes every task of a project
    ///
    /// Returns the number of deleted tasks
    pub async fn delete_by_project<'e, E>(executor: E, project_id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM tasks WHERE project_id = $1")
            .bind(project_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }
}
