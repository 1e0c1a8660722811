/// Transactional command layer
///
/// Every mutating operation follows the same shape:
///
/// ```text
/// store.begin()
///   ├─> require_project_exists()      (snapshot load, project locked)
///   ├─> guards, in a fixed order      (pure, over the snapshot)
///   ├─> mutation(s) through the unit
///   └─> commit()
/// ```
///
/// The first failing guard ends the command with `?`; the unit of work is
/// dropped on the way out and nothing it wrote becomes visible. `now` is read
/// from the [`Clock`] once per command.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use chrono::{Duration, Utc};
/// use taskclock_shared::commands::{Commands, CreateProjectCommand, CreateTaskCommand};
/// use taskclock_shared::models::user::CreateUser;
/// use taskclock_shared::store::{memory::MemoryStore, Store};
/// use taskclock_shared::time::SystemClock;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = Arc::new(MemoryStore::new());
/// let alice = store.insert_user(CreateUser {
///     name: "alice".to_string(),
///     email: "alice@example.com".to_string(),
///     password_hash: "hash".to_string(),
/// }).await?;
///
/// let commands = Commands::new(store, Arc::new(SystemClock));
/// let project = commands.create_project(CreateProjectCommand {
///     author_id: alice.id,
///     title: "Apollo".to_string(),
///     description: None,
/// }).await?;
///
/// let task = commands.create_task(CreateTaskCommand {
///     project_id: project.id(),
///     initiator_id: alice.id,
///     title: "Launch".to_string(),
///     description: None,
///     deadline: Utc::now() + Duration::days(7),
/// }).await?;
/// assert_eq!(task.initiator_id, alice.id);
/// # Ok(())
/// # }
/// ```

use crate::aggregation::{self, DeveloperProjectTime};
use crate::error::{CommandError, CommandResult, ErrorKind};
use crate::guards::{
    require_author, require_initiator, require_is_member, require_member,
    require_not_already_member, require_performer, require_project_exists,
    require_task_in_project, require_user_exists,
};
use crate::lifecycle::compute_status_transition;
use crate::models::project::{CreateProject, ProjectSnapshot};
use crate::models::task::{CreateTask, Task, TaskStatus};
use crate::store::Store;
use crate::time::{Clock, TimeFilter, TimeSpent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Create a task in a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskCommand {
    pub project_id: Uuid,
    pub initiator_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub deadline: DateTime<Utc>,
}

/// Assign a performer to a task
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AssignTaskCommand {
    pub project_id: Uuid,
    pub task_id: Uuid,
    /// Must be the task's initiator
    pub requester_id: Uuid,
    pub performer_id: Uuid,
}

/// Move a task to another status
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChangeTaskStatusCommand {
    pub project_id: Uuid,
    pub task_id: Uuid,
    /// Must be the task's performer
    pub requester_id: Uuid,
    pub status: TaskStatus,
}

/// Delete a task
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DeleteTaskCommand {
    pub project_id: Uuid,
    pub task_id: Uuid,
    /// Must be the task's initiator
    pub requester_id: Uuid,
}

/// Create a project; the author becomes its first member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProjectCommand {
    pub author_id: Uuid,
    pub title: String,
    pub description: Option<String>,
}

/// Delete a project and all of its tasks
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DeleteProjectCommand {
    pub project_id: Uuid,
    /// Must be the project's author
    pub requester_id: Uuid,
}

/// Add or remove a project member
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MemberCommand {
    pub project_id: Uuid,
    /// Must be the project's author
    pub requester_id: Uuid,
    /// User being added or removed
    pub user_id: Uuid,
}

/// Entry point for every operation on projects and tasks
#[derive(Clone)]
pub struct Commands {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

/// Logs a failed command: rejections at warn, infrastructure failures at error
fn observe<T>(operation: &'static str, result: CommandResult<T>) -> CommandResult<T> {
    if let Err(e) = &result {
        if e.kind() == ErrorKind::Infrastructure {
            error!(operation, error = %e, retryable = e.is_retryable(), "Command failed");
        } else {
            warn!(operation, code = e.code(), "Command rejected");
        }
    }
    result
}

impl Commands {
    /// Creates the command layer over a store and a clock
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Creates a task in CREATED status
    ///
    /// Guards: project exists → initiator is a member.
    pub async fn create_task(&self, cmd: CreateTaskCommand) -> CommandResult<Task> {
        observe("create_task", self.try_create_task(cmd).await)
    }

    async fn try_create_task(&self, cmd: CreateTaskCommand) -> CommandResult<Task> {
        let mut uow = self.store.begin().await?;

        let project = require_project_exists(uow.as_mut(), cmd.project_id).await?;
        require_member(&project, cmd.initiator_id)?;

        let task = uow
            .insert_task(CreateTask {
                project_id: cmd.project_id,
                initiator_id: cmd.initiator_id,
                title: cmd.title,
                description: cmd.description,
                deadline: cmd.deadline,
            })
            .await?;
        uow.commit().await?;

        info!(
            project_id = %task.project_id,
            task_id = %task.id,
            initiator_id = %task.initiator_id,
            "Task created"
        );
        Ok(task)
    }

    /// Sets the performer of a task
    ///
    /// Guards: performer exists → project exists → requester is a member →
    /// performer is a member → task is in the project → requester is the
    /// task's initiator.
    pub async fn assign_task(&self, cmd: AssignTaskCommand) -> CommandResult<Task> {
        observe("assign_task", self.try_assign_task(cmd).await)
    }

    async fn try_assign_task(&self, cmd: AssignTaskCommand) -> CommandResult<Task> {
        let mut uow = self.store.begin().await?;

        require_user_exists(uow.as_mut(), cmd.performer_id)
            .await
            .map_err(|e| match e {
                CommandError::UserNotFound => CommandError::PerformerNotFound,
                other => other,
            })?;

        let project = require_project_exists(uow.as_mut(), cmd.project_id).await?;
        require_member(&project, cmd.requester_id)?;
        require_member(&project, cmd.performer_id)?;
        let task = require_task_in_project(&project, cmd.task_id)?;
        require_initiator(task, cmd.requester_id)?;

        let task = uow
            .assign_performer(cmd.task_id, cmd.performer_id)
            .await?
            .ok_or(CommandError::TaskNotFound)?;
        uow.commit().await?;

        info!(
            project_id = %cmd.project_id,
            task_id = %cmd.task_id,
            performer_id = %cmd.performer_id,
            "Task assigned"
        );
        Ok(task)
    }

    /// Moves a task along CREATED → IN_PROGRESS → DONE
    ///
    /// Guards: project exists → requester is a member → task is in the
    /// project → requester is the task's performer → transition is legal.
    pub async fn change_task_status(&self, cmd: ChangeTaskStatusCommand) -> CommandResult<Task> {
        observe("change_task_status", self.try_change_task_status(cmd).await)
    }

    async fn try_change_task_status(&self, cmd: ChangeTaskStatusCommand) -> CommandResult<Task> {
        let now = self.clock.now();
        let mut uow = self.store.begin().await?;

        let project = require_project_exists(uow.as_mut(), cmd.project_id).await?;
        require_member(&project, cmd.requester_id)?;
        let task = require_task_in_project(&project, cmd.task_id)?;
        require_performer(task, cmd.requester_id)?;
        let from = task.status;
        let delta = compute_status_transition(task, cmd.status, now)?;

        let task = uow
            .update_task(cmd.task_id, delta)
            .await?
            .ok_or(CommandError::TaskNotFound)?;
        uow.commit().await?;

        info!(
            project_id = %cmd.project_id,
            task_id = %cmd.task_id,
            from = %from,
            to = %task.status,
            spent_time = ?task.spent_time,
            "Task status changed"
        );
        Ok(task)
    }

    /// Deletes a task
    ///
    /// Guards: project exists → requester is a member → task is in the
    /// project → requester is the task's initiator.
    pub async fn delete_task(&self, cmd: DeleteTaskCommand) -> CommandResult<()> {
        observe("delete_task", self.try_delete_task(cmd).await)
    }

    async fn try_delete_task(&self, cmd: DeleteTaskCommand) -> CommandResult<()> {
        let mut uow = self.store.begin().await?;

        let project = require_project_exists(uow.as_mut(), cmd.project_id).await?;
        require_member(&project, cmd.requester_id)?;
        let task = require_task_in_project(&project, cmd.task_id)?;
        require_initiator(task, cmd.requester_id)?;

        if !uow.delete_task(cmd.task_id).await? {
            return Err(CommandError::TaskNotFound);
        }
        uow.commit().await?;

        info!(project_id = %cmd.project_id, task_id = %cmd.task_id, "Task deleted");
        Ok(())
    }

    /// Creates a project and makes its author the first member
    pub async fn create_project(&self, cmd: CreateProjectCommand) -> CommandResult<ProjectSnapshot> {
        observe("create_project", self.try_create_project(cmd).await)
    }

    async fn try_create_project(&self, cmd: CreateProjectCommand) -> CommandResult<ProjectSnapshot> {
        let mut uow = self.store.begin().await?;

        require_user_exists(uow.as_mut(), cmd.author_id).await?;

        let project = uow
            .insert_project(CreateProject {
                title: cmd.title,
                description: cmd.description,
                author_id: cmd.author_id,
            })
            .await?;
        uow.add_member(project.id, project.author_id).await?;
        uow.commit().await?;

        info!(project_id = %project.id, author_id = %project.author_id, "Project created");
        Ok(ProjectSnapshot {
            member_ids: [project.author_id].into_iter().collect(),
            tasks: Vec::new(),
            project,
        })
    }

    /// Deletes a project with all of its tasks and memberships
    ///
    /// Guards: project exists → requester is the author.
    pub async fn delete_project(&self, cmd: DeleteProjectCommand) -> CommandResult<()> {
        observe("delete_project", self.try_delete_project(cmd).await)
    }

    async fn try_delete_project(&self, cmd: DeleteProjectCommand) -> CommandResult<()> {
        let mut uow = self.store.begin().await?;

        let project = require_project_exists(uow.as_mut(), cmd.project_id).await?;
        require_author(&project, cmd.requester_id)?;

        let deleted_tasks = if project.tasks.is_empty() {
            0
        } else {
            uow.delete_tasks_by_project(cmd.project_id).await?
        };
        if !uow.delete_project(cmd.project_id).await? {
            return Err(CommandError::ProjectNotFound);
        }
        uow.commit().await?;

        info!(project_id = %cmd.project_id, deleted_tasks, "Project deleted");
        Ok(())
    }

    /// Adds a user to a project
    ///
    /// Guards: project exists → requester is the author → user exists →
    /// user is not a member yet.
    pub async fn add_member(&self, cmd: MemberCommand) -> CommandResult<()> {
        observe("add_member", self.try_add_member(cmd).await)
    }

    async fn try_add_member(&self, cmd: MemberCommand) -> CommandResult<()> {
        let mut uow = self.store.begin().await?;

        let project = require_project_exists(uow.as_mut(), cmd.project_id).await?;
        require_author(&project, cmd.requester_id)?;
        require_user_exists(uow.as_mut(), cmd.user_id).await?;
        require_not_already_member(&project, cmd.user_id)?;

        uow.add_member(cmd.project_id, cmd.user_id).await?;
        uow.commit().await?;

        info!(project_id = %cmd.project_id, user_id = %cmd.user_id, "Member added");
        Ok(())
    }

    /// Removes a user from a project
    ///
    /// Guards: user is not the requester → project exists → requester is the
    /// author → user exists → user is a member.
    ///
    /// Tasks the user initiated or performs keep referencing them. Such a task
    /// can only move again once the initiator assigns a current member.
    pub async fn remove_member(&self, cmd: MemberCommand) -> CommandResult<()> {
        observe("remove_member", self.try_remove_member(cmd).await)
    }

    async fn try_remove_member(&self, cmd: MemberCommand) -> CommandResult<()> {
        if cmd.user_id == cmd.requester_id {
            return Err(CommandError::CannotRemoveSelf);
        }

        let mut uow = self.store.begin().await?;

        let project = require_project_exists(uow.as_mut(), cmd.project_id).await?;
        require_author(&project, cmd.requester_id)?;
        require_user_exists(uow.as_mut(), cmd.user_id).await?;
        require_is_member(&project, cmd.user_id)?;

        uow.remove_member(cmd.project_id, cmd.user_id).await?;
        uow.commit().await?;

        info!(project_id = %cmd.project_id, user_id = %cmd.user_id, "Member removed");
        Ok(())
    }

    /// Loads a project for one of its members
    pub async fn get_project(&self, project_id: Uuid, requester_id: Uuid) -> CommandResult<ProjectSnapshot> {
        observe("get_project", self.try_get_project(project_id, requester_id).await)
    }

    async fn try_get_project(&self, project_id: Uuid, requester_id: Uuid) -> CommandResult<ProjectSnapshot> {
        let project = self
            .store
            .load_project_snapshot(project_id)
            .await?
            .ok_or(CommandError::ProjectNotFound)?;
        require_member(&project, requester_id)?;
        Ok(project)
    }

    /// Lists every project
    pub async fn list_projects(&self) -> CommandResult<Vec<ProjectSnapshot>> {
        observe("list_projects", self.store.list_project_snapshots().await.map_err(Into::into))
    }

    /// Lists the projects `user_id` is a member of
    pub async fn list_projects_for_user(&self, user_id: Uuid) -> CommandResult<Vec<ProjectSnapshot>> {
        observe(
            "list_projects_for_user",
            self.store
                .list_member_project_snapshots(user_id, &[])
                .await
                .map_err(Into::into),
        )
    }

    /// Time spent on a project, optionally within a trailing window
    pub async fn project_time(&self, project_id: Uuid, filter: Option<TimeFilter>) -> CommandResult<TimeSpent> {
        observe("project_time", self.try_project_time(project_id, filter).await)
    }

    async fn try_project_time(&self, project_id: Uuid, filter: Option<TimeFilter>) -> CommandResult<TimeSpent> {
        let now = self.clock.now();
        let project = self
            .store
            .load_project_snapshot(project_id)
            .await?
            .ok_or(CommandError::ProjectNotFound)?;

        Ok(aggregation::project_time(&project, filter, now))
    }

    /// Time a developer spent per project
    ///
    /// Covers every project the developer is a member of, or only those in
    /// `project_ids` when it is non-empty. Counts tasks the developer performs.
    pub async fn developer_time(
        &self,
        dev_id: Uuid,
        filter: Option<TimeFilter>,
        project_ids: &[Uuid],
    ) -> CommandResult<Vec<DeveloperProjectTime>> {
        observe("developer_time", self.try_developer_time(dev_id, filter, project_ids).await)
    }

    async fn try_developer_time(
        &self,
        dev_id: Uuid,
        filter: Option<TimeFilter>,
        project_ids: &[Uuid],
    ) -> CommandResult<Vec<DeveloperProjectTime>> {
        let now = self.clock.now();
        let projects = self
            .store
            .list_member_project_snapshots(dev_id, project_ids)
            .await?;

        Ok(aggregation::developer_time_report(&projects, dev_id, filter, now))
    }
}
