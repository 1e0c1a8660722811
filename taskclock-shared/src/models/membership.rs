/// Project membership model and database operations
///
/// Many-to-many relation between users and projects. A project's author is
/// inserted as its first member when the project is created; everybody else
/// is added (and removed) by the author.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE project_members (
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (project_id, user_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Membership of one user in one project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectMember {
    /// Project ID
    pub project_id: Uuid,

    /// Member user ID
    pub user_id: Uuid,

    /// When the user joined the project
    pub created_at: DateTime<Utc>,
}

impl ProjectMember {
    /// Adds a user to a project
    ///
    /// # Errors
    ///
    /// Returns an error if the membership already exists (primary key
    /// violation), either side doesn't exist, or the database connection fails
    pub async fn add<'e, E>(executor: E, project_id: Uuid, user_id: Uuid) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, ProjectMember>(
            r#"
            INSERT INTO project_members (project_id, user_id)
            VALUES ($1, $2)
            RETURNING project_id, user_id, created_at
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_one(executor)
        .await
    }

    /// Removes a user from a project
    ///
    /// Returns `true` if a membership was deleted
    pub async fn remove<'e, E>(executor: E, project_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            DELETE FROM project_members
            WHERE project_id = $1 AND user_id = $2
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists the member IDs of a project
    pub async fn list_user_ids<'e, E>(executor: E, project_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT user_id
            FROM project_members
            WHERE project_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(executor)
        .await
    }

    /// Lists every membership row of the given projects
    pub async fn list_by_projects<'e, E>(
        executor: E,
        project_ids: &[Uuid],
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, ProjectMember>(
            r#"
            SELECT project_id, user_id, created_at
            FROM project_members
            WHERE project_id = ANY($1)
            ORDER BY project_id, created_at ASC
            "#,
        )
        .bind(project_ids)
        .fetch_all(executor)
        .await
    }

    /// Lists the IDs of projects a user belongs to
    pub async fn list_project_ids_by_user<'e, E>(
        executor: E,
        user_id: Uuid,
    ) -> Result<Vec<Uuid>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT project_id
            FROM project_members
            WHERE user_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await
    }
}
