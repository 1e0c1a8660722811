/// Storage collaborator
///
/// The command layer never talks to a database directly. It asks a [`Store`]
/// for a [`UnitOfWork`], runs its guards against the snapshot the unit loads,
/// issues mutations through the unit, and finally commits it. A unit that is
/// dropped without [`UnitOfWork::commit`] rolls back, so an early `?` return
/// leaves storage untouched.
///
/// # Implementations
///
/// - [`postgres::PgStore`]: one `sqlx` transaction per unit; the snapshot load
///   locks the project row (`SELECT ... FOR UPDATE`).
/// - [`memory::MemoryStore`]: whole-state mutex with a staged copy per unit.
///   Backs the test suites.
///
/// # Unit of Work Flow
///
/// ```text
/// Store::begin()
///   ├─> UnitOfWork::load_project_snapshot()   (locks the project)
///   ├─> guards (pure, over the snapshot)
///   ├─> UnitOfWork::insert_task() / update_task() / ...
///   └─> UnitOfWork::commit()                  (or drop ⇒ rollback)
/// ```
///
/// # Example
///
/// ```no_run
/// use taskclock_shared::store::{Store, memory::MemoryStore};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
///
/// let mut uow = store.begin().await?;
/// let snapshot = uow.load_project_snapshot(Uuid::new_v4()).await?;
/// assert!(snapshot.is_none());
/// drop(uow); // rolled back
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod postgres;

use crate::models::project::{CreateProject, Project, ProjectSnapshot};
use crate::models::task::{CreateTask, Task, TaskDelta};
use crate::models::user::{CreateUser, User};
use async_trait::async_trait;
use uuid::Uuid;

/// Storage error types
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store cannot be reached (pool exhausted, connection lost)
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// The transaction lost a race with a concurrent one
    #[error("Transaction aborted by a concurrent update, retry the command")]
    Conflict,

    /// A unique constraint rejected the write
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// A foreign key or check constraint rejected the write
    #[error("Integrity violation: {0}")]
    Integrity(String),

    /// Any other database failure
    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl StoreError {
    /// Whether re-running the whole command may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Conflict)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let code = match &err {
            sqlx::Error::Database(db) => db.code().map(|c| c.into_owned()),
            _ => None,
        };

        match code.as_deref() {
            // serialization_failure, deadlock_detected
            Some("40001") | Some("40P01") => return StoreError::Conflict,
            Some("23505") => return StoreError::Duplicate(err.to_string()),
            Some("23503") | Some("23514") => return StoreError::Integrity(err.to_string()),
            _ => {}
        }

        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            other => StoreError::Database(other),
        }
    }
}

/// Store result type alias
pub type StoreResult<T> = Result<T, StoreError>;

/// Entry point to storage
///
/// Read methods outside a unit of work each see one consistent state; they
/// never lock anything.
#[async_trait]
pub trait Store: Send + Sync {
    /// Opens a new atomic unit of work
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>>;

    /// Loads a project with its members and tasks
    async fn load_project_snapshot(&self, project_id: Uuid) -> StoreResult<Option<ProjectSnapshot>>;

    /// Loads every project
    async fn list_project_snapshots(&self) -> StoreResult<Vec<ProjectSnapshot>>;

    /// Loads the projects `user_id` is a member of
    ///
    /// A non-empty `project_ids` further restricts the result to those IDs;
    /// IDs of projects the user doesn't belong to are skipped.
    async fn list_member_project_snapshots(
        &self,
        user_id: Uuid,
        project_ids: &[Uuid],
    ) -> StoreResult<Vec<ProjectSnapshot>>;

    /// Looks up a user
    async fn load_user(&self, user_id: Uuid) -> StoreResult<Option<User>>;

    /// Creates a user account
    async fn insert_user(&self, data: CreateUser) -> StoreResult<User>;

    /// Looks up a user by email
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Replaces the stored refresh token; returns `false` for unknown users
    async fn update_refresh_token(&self, user_id: Uuid, token: Option<&str>) -> StoreResult<bool>;

    /// Verifies the backend answers
    async fn health_check(&self) -> StoreResult<()>;
}

/// One atomic sequence of reads and writes
///
/// Dropping the unit without calling [`UnitOfWork::commit`] discards every
/// write made through it.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Loads a project snapshot and holds the project's lock until the unit ends
    async fn load_project_snapshot(&mut self, project_id: Uuid) -> StoreResult<Option<ProjectSnapshot>>;

    /// Looks up a user
    async fn load_user(&mut self, user_id: Uuid) -> StoreResult<Option<User>>;

    /// Inserts a task in CREATED status
    async fn insert_task(&mut self, data: CreateTask) -> StoreResult<Task>;

    /// Applies a status delta; `None` if the task doesn't exist
    async fn update_task(&mut self, task_id: Uuid, delta: TaskDelta) -> StoreResult<Option<Task>>;

    /// Sets the task's performer; `None` if the task doesn't exist
    async fn assign_performer(&mut self, task_id: Uuid, performer_id: Uuid) -> StoreResult<Option<Task>>;

    /// Deletes a task; `false` if it didn't exist
    async fn delete_task(&mut self, task_id: Uuid) -> StoreResult<bool>;

    /// Deletes every task of a project and returns how many went
    async fn delete_tasks_by_project(&mut self, project_id: Uuid) -> StoreResult<u64>;

    /// Inserts a project (without memberships)
    async fn insert_project(&mut self, data: CreateProject) -> StoreResult<Project>;

    /// Deletes a project and its memberships; `false` if it didn't exist
    async fn delete_project(&mut self, project_id: Uuid) -> StoreResult<bool>;

    /// Adds a membership
    async fn add_member(&mut self, project_id: Uuid, user_id: Uuid) -> StoreResult<()>;

    /// Removes a membership; `false` if there was none
    async fn remove_member(&mut self, project_id: Uuid, user_id: Uuid) -> StoreResult<bool>;

    /// Makes every write of this unit visible at once
    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(StoreError::Conflict.is_retryable());
        assert!(StoreError::Unavailable("pool timed out".into()).is_retryable());
        assert!(!StoreError::Duplicate("email".into()).is_retryable());
        assert!(!StoreError::Integrity("fk".into()).is_retryable());
        assert!(!StoreError::Database(sqlx::Error::RowNotFound).is_retryable());
    }

    #[test]
    fn test_from_sqlx_error() {
        assert!(matches!(
            StoreError::from(sqlx::Error::PoolTimedOut),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::Database(_)
        ));
    }
}
