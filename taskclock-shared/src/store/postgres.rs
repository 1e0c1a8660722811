/// PostgreSQL-backed store
///
/// Each [`UnitOfWork`] wraps one `sqlx` transaction. Loading a snapshot
/// inside a unit takes `SELECT ... FOR UPDATE` on the project row, so a second
/// command on the same project blocks until the first commits or rolls back
/// and then sees the committed state. Serialization failures and deadlocks
/// surface as the retryable [`StoreError::Conflict`].
///
/// Read-only loads run in a `REPEATABLE READ READ ONLY` transaction so the
/// project, member and task queries agree with each other.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskclock_shared::db::pool::{create_pool, DatabaseConfig};
/// use taskclock_shared::store::{postgres::PgStore, Store};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::from_url(std::env::var("DATABASE_URL")?)).await?;
/// let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));
///
/// store.health_check().await?;
/// # Ok(())
/// # }
/// ```

use crate::db::pool;
use crate::models::membership::ProjectMember;
use crate::models::project::{CreateProject, Project, ProjectSnapshot};
use crate::models::task::{CreateTask, Task, TaskDelta};
use crate::models::user::{CreateUser, User};
use crate::store::{Store, StoreResult, UnitOfWork};
use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;
use uuid::Uuid;

/// Store over a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wraps an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn begin_read_only(&self) -> StoreResult<Transaction<'static, Postgres>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }
}

/// Loads one project with its members and tasks
async fn load_snapshot(
    conn: &mut PgConnection,
    project_id: Uuid,
    lock: bool,
) -> Result<Option<ProjectSnapshot>, sqlx::Error> {
    let project = if lock {
        Project::find_by_id_for_update(&mut *conn, project_id).await?
    } else {
        Project::find_by_id(&mut *conn, project_id).await?
    };

    let Some(project) = project else {
        return Ok(None);
    };

    let member_ids = ProjectMember::list_user_ids(&mut *conn, project.id)
        .await?
        .into_iter()
        .collect();
    let tasks = Task::list_by_project(&mut *conn, project.id).await?;

    Ok(Some(ProjectSnapshot {
        project,
        member_ids,
        tasks,
    }))
}

/// Attaches members and tasks to already loaded projects, keeping their order
async fn assemble_snapshots(
    conn: &mut PgConnection,
    projects: Vec<Project>,
) -> Result<Vec<ProjectSnapshot>, sqlx::Error> {
    if projects.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = projects.iter().map(|p| p.id).collect();

    let mut members: HashMap<Uuid, BTreeSet<Uuid>> = HashMap::new();
    for row in ProjectMember::list_by_projects(&mut *conn, &ids).await? {
        members.entry(row.project_id).or_default().insert(row.user_id);
    }

    let mut tasks: HashMap<Uuid, Vec<Task>> = HashMap::new();
    for task in Task::list_by_projects(&mut *conn, &ids).await? {
        tasks.entry(task.project_id).or_default().push(task);
    }

    Ok(projects
        .into_iter()
        .map(|project| ProjectSnapshot {
            member_ids: members.remove(&project.id).unwrap_or_default(),
            tasks: tasks.remove(&project.id).unwrap_or_default(),
            project,
        })
        .collect())
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }

    async fn load_project_snapshot(&self, project_id: Uuid) -> StoreResult<Option<ProjectSnapshot>> {
        let mut tx = self.begin_read_only().await?;
        let snapshot = load_snapshot(&mut tx, project_id, false).await?;
        tx.commit().await?;
        Ok(snapshot)
    }

    async fn list_project_snapshots(&self) -> StoreResult<Vec<ProjectSnapshot>> {
        let mut tx = self.begin_read_only().await?;
        let projects = Project::list_all(&mut *tx).await?;
        let snapshots = assemble_snapshots(&mut tx, projects).await?;
        tx.commit().await?;
        Ok(snapshots)
    }

    async fn list_member_project_snapshots(
        &self,
        user_id: Uuid,
        project_ids: &[Uuid],
    ) -> StoreResult<Vec<ProjectSnapshot>> {
        let mut tx = self.begin_read_only().await?;

        let mut ids = ProjectMember::list_project_ids_by_user(&mut *tx, user_id).await?;
        if !project_ids.is_empty() {
            ids.retain(|id| project_ids.contains(id));
        }

        let projects = Project::list_by_ids(&mut *tx, &ids).await?;
        let snapshots = assemble_snapshots(&mut tx, projects).await?;
        tx.commit().await?;

        debug!(user_id = %user_id, projects = snapshots.len(), "Loaded member projects");
        Ok(snapshots)
    }

    async fn load_user(&self, user_id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, user_id).await?)
    }

    async fn insert_user(&self, data: CreateUser) -> StoreResult<User> {
        Ok(User::create(&self.pool, data).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn update_refresh_token(&self, user_id: Uuid, token: Option<&str>) -> StoreResult<bool> {
        Ok(User::update_refresh_token(&self.pool, user_id, token).await?)
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(pool::health_check(&self.pool).await?)
    }
}

/// Unit of work over one PostgreSQL transaction
///
/// Dropping it rolls the transaction back.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn load_project_snapshot(&mut self, project_id: Uuid) -> StoreResult<Option<ProjectSnapshot>> {
        Ok(load_snapshot(&mut self.tx, project_id, true).await?)
    }

    async fn load_user(&mut self, user_id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&mut *self.tx, user_id).await?)
    }

    async fn insert_task(&mut self, data: CreateTask) -> StoreResult<Task> {
        Ok(Task::create(&mut *self.tx, data).await?)
    }

    async fn update_task(&mut self, task_id: Uuid, delta: TaskDelta) -> StoreResult<Option<Task>> {
        Ok(Task::apply_delta(&mut *self.tx, task_id, delta).await?)
    }

    async fn assign_performer(&mut self, task_id: Uuid, performer_id: Uuid) -> StoreResult<Option<Task>> {
        Ok(Task::assign_performer(&mut *self.tx, task_id, performer_id).await?)
    }

    async fn delete_task(&mut self, task_id: Uuid) -> StoreResult<bool> {
        Ok(Task::delete(&mut *self.tx, task_id).await?)
    }

    async fn delete_tasks_by_project(&mut self, project_id: Uuid) -> StoreResult<u64> {
        Ok(Task::delete_by_project(&mut *self.tx, project_id).await?)
    }

    async fn insert_project(&mut self, data: CreateProject) -> StoreResult<Project> {
        Ok(Project::create(&mut *self.tx, data).await?)
    }

    async fn delete_project(&mut self, project_id: Uuid) -> StoreResult<bool> {
        Ok(Project::delete(&mut *self.tx, project_id).await?)
    }

    async fn add_member(&mut self, project_id: Uuid, user_id: Uuid) -> StoreResult<()> {
        ProjectMember::add(&mut *self.tx, project_id, user_id).await?;
        Ok(())
    }

    async fn remove_member(&mut self, project_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        Ok(ProjectMember::remove(&mut *self.tx, project_id, user_id).await?)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
