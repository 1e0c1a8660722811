/// Database models for TaskClock
///
/// Each model carries its own `sqlx` queries. Every query function is generic
/// over [`sqlx::PgExecutor`], so the same code runs against the pool and
/// inside a unit of work's transaction.
///
/// # Models
///
/// - `user`: accounts and credentials
/// - `project`: projects and the [`project::ProjectSnapshot`] commands read
/// - `membership`: user-project relationships
/// - `task`: tasks and their status lifecycle
///
/// # Example
///
/// ```no_run
/// use taskclock_shared::models::project::{Project, CreateProject};
/// use taskclock_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let project = Project::create(&pool, CreateProject {
///     title: "Apollo".to_string(),
///     description: None,
///     author_id: Uuid::new_v4(),
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod membership;
pub mod project;
pub mod task;
pub mod user;
