/// Membership and authorization guards
///
/// Every command loads one [`ProjectSnapshot`] and runs its checks against
/// it, in a fixed order, before writing anything. The snapshot guards are
/// plain functions; the two store-backed guards
/// ([`require_project_exists`], [`require_user_exists`]) do a single point
/// lookup through the command's unit of work. None of them writes.
///
/// # Example
///
/// ```no_run
/// use taskclock_shared::guards::{require_project_exists, require_member, require_task_in_project, require_initiator};
/// use taskclock_shared::store::UnitOfWork;
/// use taskclock_shared::error::CommandResult;
/// use uuid::Uuid;
///
/// async fn can_delete(uow: &mut dyn UnitOfWork, project_id: Uuid, task_id: Uuid, user_id: Uuid) -> CommandResult<()> {
///     let project = require_project_exists(uow, project_id).await?;
///     require_member(&project, user_id)?;
///     let task = require_task_in_project(&project, task_id)?;
///     require_initiator(task, user_id)
/// }
/// ```

use crate::error::{CommandError, CommandResult};
use crate::models::project::ProjectSnapshot;
use crate::models::task::Task;
use crate::models::user::User;
use crate::store::UnitOfWork;
use uuid::Uuid;

/// Fails `NotAMember` unless `user_id` belongs to the project
pub fn require_member(project: &ProjectSnapshot, user_id: Uuid) -> CommandResult<()> {
    if !project.is_member(user_id) {
        return Err(CommandError::NotAMember);
    }
    Ok(())
}

/// Fails `NotAuthor` unless `user_id` created the project
pub fn require_author(project: &ProjectSnapshot, user_id: Uuid) -> CommandResult<()> {
    if !project.is_author(user_id) {
        return Err(CommandError::NotAuthor);
    }
    Ok(())
}

/// Fails `AlreadyMember` if `user_id` already belongs to the project
pub fn require_not_already_member(project: &ProjectSnapshot, user_id: Uuid) -> CommandResult<()> {
    if project.is_member(user_id) {
        return Err(CommandError::AlreadyMember);
    }
    Ok(())
}

/// Fails `NotAMember` unless the member about to be removed belongs to the project
pub fn require_is_member(project: &ProjectSnapshot, user_id: Uuid) -> CommandResult<()> {
    require_member(project, user_id)
}

/// Returns the task if it belongs to the project, `TaskNotFound` otherwise
pub fn require_task_in_project(project: &ProjectSnapshot, task_id: Uuid) -> CommandResult<&Task> {
    project.task(task_id).ok_or(CommandError::TaskNotFound)
}

/// Fails `NotInitiator` unless `user_id` created the task
pub fn require_initiator(task: &Task, user_id: Uuid) -> CommandResult<()> {
    if task.initiator_id != user_id {
        return Err(CommandError::NotInitiator);
    }
    Ok(())
}

/// Fails `NotPerformer` unless `user_id` is assigned to the task
pub fn require_performer(task: &Task, user_id: Uuid) -> CommandResult<()> {
    if task.performer_id != Some(user_id) {
        return Err(CommandError::NotPerformer);
    }
    Ok(())
}

/// Looks the user up in the live store; `UserNotFound` if absent
///
/// The target of a membership change or assignment is usually not in the
/// snapshot yet, hence the store lookup.
pub async fn require_user_exists(uow: &mut dyn UnitOfWork, user_id: Uuid) -> CommandResult<User> {
    uow.load_user(user_id)
        .await?
        .ok_or(CommandError::UserNotFound)
}

/// Loads (and locks) the project snapshot; `ProjectNotFound` if absent
pub async fn require_project_exists(
    uow: &mut dyn UnitOfWork,
    project_id: Uuid,
) -> CommandResult<ProjectSnapshot> {
    uow.load_project_snapshot(project_id)
        .await?
        .ok_or(CommandError::ProjectNotFound)
}
