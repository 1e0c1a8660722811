/// Project model, database operations and the per-command snapshot
///
/// A project is owned by its author, has a member set (see
/// [`super::membership`]) and a list of [`Task`]s. Commands never query these
/// pieces individually: they load one [`ProjectSnapshot`] up front and run
/// every guard against it.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(100) NOT NULL,
///     description TEXT,
///     author_id UUID NOT NULL REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use crate::models::task::Task;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use std::collections::BTreeSet;
use uuid::Uuid;

/// Project model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    /// Unique project ID
    pub id: Uuid,

    /// Project title
    pub title: String,

    /// Optional description
    pub description: Option<String>,

    /// User who created the project
    pub author_id: Uuid,

    /// When the project was created
    pub created_at: DateTime<Utc>,

    /// When the project was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProject {
    /// Project title
    pub title: String,

    /// Optional description
    pub description: Option<String>,

    /// Creating user
    pub author_id: Uuid,
}

/// Consistent view of a project, its members and its tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    /// The project row
    #[serde(flatten)]
    pub project: Project,

    /// IDs of every member (the author included)
    pub member_ids: BTreeSet<Uuid>,

    /// Tasks of the project, oldest first
    pub tasks: Vec<Task>,
}

impl ProjectSnapshot {
    /// Project ID
    pub fn id(&self) -> Uuid {
        self.project.id
    }

    /// Whether `user_id` belongs to the project
    pub fn is_member(&self, user_id: Uuid) -> bool {
        self.member_ids.contains(&user_id)
    }

    /// Whether `user_id` created the project
    pub fn is_author(&self, user_id: Uuid) -> bool {
        self.project.author_id == user_id
    }

    /// Looks up a task of this project
    pub fn task(&self, task_id: Uuid) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    /// Tasks whose performer is `user_id`
    pub fn tasks_performed_by(&self, user_id: Uuid) -> impl Iterator<Item = &Task> {
        self.tasks
            .iter()
            .filter(move |t| t.performer_id == Some(user_id))
    }
}

impl Project {
    /// Creates a new project
    ///
    /// Does not add the author as a member; the command layer does both in
    /// one unit of work.
    pub async fn create<'e, E>(executor: E, data: CreateProject) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (title, description, author_id)
            VALUES ($1, $2, $3)
            RETURNING id, title, description, author_id, created_at, updated_at
            "#,
        )
        .bind(data.title)
        .bind(data.description)
        .bind(data.author_id)
        .fetch_one(executor)
        .await
    }

    /// Finds a project by ID
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Project>(
            r#"
            SELECT id, title, description, author_id, created_at, updated_at
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Finds a project by ID and locks its row until the transaction ends
    ///
    /// Every command on a project goes through this lock, so commands on the
    /// same project run one after another.
    pub async fn find_by_id_for_update<'e, E>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Project>(
            r#"
            SELECT id, title, description, author_id, created_at, updated_at
            FROM projects
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Lists every project, oldest first
    pub async fn list_all<'e, E>(executor: E) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Project>(
            r#"
            SELECT id, title, description, author_id, created_at, updated_at
            FROM projects
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(executor)
        .await
    }

    /// Lists the projects with the given IDs, oldest first
    pub async fn list_by_ids<'e, E>(executor: E, ids: &[Uuid]) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Project>(
            r#"
            SELECT id, title, description, author_id, created_at, updated_at
            FROM projects
            WHERE id = ANY($1)
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(ids)
        .fetch_all(executor)
        .await
    }

    /// Deletes a project
    ///
    /// Memberships go with it (`ON DELETE CASCADE`); tasks are expected to
    /// have been deleted first.
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::TaskStatus;

    fn snapshot() -> (ProjectSnapshot, Uuid, Uuid) {
        let now = Utc::now();
        let author = Uuid::new_v4();
        let dev = Uuid::new_v4();
        let project = Project {
            id: Uuid::new_v4(),
            title: "Apollo".to_string(),
            description: None,
            author_id: author,
            created_at: now,
            updated_at: now,
        };
        let task = Task {
            id: Uuid::new_v4(),
            project_id: project.id,
            title: "Launch".to_string(),
            description: None,
            deadline: now,
            initiator_id: author,
            performer_id: Some(dev),
            status: TaskStatus::Created,
            begin_at: None,
            done_at: None,
            spent_time: None,
            created_at: now,
            updated_at: now,
        };

        (
            ProjectSnapshot {
                project,
                member_ids: [author, dev].into_iter().collect(),
                tasks: vec![task],
            },
            author,
            dev,
        )
    }

    #[test]
    fn test_snapshot_membership() {
        let (snap, author, dev) = snapshot();

        assert!(snap.is_member(author));
        assert!(snap.is_member(dev));
        assert!(!snap.is_member(Uuid::new_v4()));
        assert!(snap.is_author(author));
        assert!(!snap.is_author(dev));
    }

    #[test]
    fn test_snapshot_task_lookup() {
        let (snap, author, dev) = snapshot();
        let task_id = snap.tasks[0].id;

        assert!(snap.task(task_id).is_some());
        assert!(snap.task(Uuid::new_v4()).is_none());
        assert_eq!(snap.tasks_performed_by(dev).count(), 1);
        assert_eq!(snap.tasks_performed_by(author).count(), 0);
    }

    #[test]
    fn test_snapshot_serializes_flat() {
        let (snap, _, _) = snapshot();
        let json = serde_json::to_value(&snap).unwrap();

        assert_eq!(json["title"], "Apollo");
        assert_eq!(json["member_ids"].as_array().unwrap().len(), 2);
        assert_eq!(json["tasks"][0]["status"], "CREATED");
    }
}
