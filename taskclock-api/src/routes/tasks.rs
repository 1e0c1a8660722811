/// Task endpoints
///
/// # Endpoints
///
/// - `POST   /v1/projects/:project_id/tasks` - Create a task (members only)
/// - `POST   /v1/projects/:project_id/tasks/:task_id/assign` - Assign a performer (initiator only)
/// - `PATCH  /v1/projects/:project_id/tasks/:task_id/status` - Change status (performer only)
/// - `DELETE /v1/projects/:project_id/tasks/:task_id` - Delete a task (initiator only)
///
/// # Status lifecycle
///
/// ```text
/// CREATED ──> IN_PROGRESS ──> DONE
/// ```
///
/// Entering `IN_PROGRESS` records `begin_at`; entering `DONE` records
/// `done_at` and freezes `spent_time` (milliseconds).

use super::MessageResponse;
use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use taskclock_shared::{
    auth::middleware::AuthContext,
    commands::{AssignTaskCommand, ChangeTaskStatusCommand, CreateTaskCommand, DeleteTaskCommand},
    models::task::{Task, TaskStatus},
};
use uuid::Uuid;
use validator::Validate;

/// Create task request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 3, max = 200, message = "Title must be between 3 and 200 characters long."))]
    pub title: String,

    #[validate(length(max = 1000, message = "Description must be at most 1000 characters long."))]
    pub description: Option<String>,

    /// RFC 3339 timestamp
    pub deadline: DateTime<Utc>,
}

/// Assign task request
#[derive(Debug, Deserialize)]
pub struct AssignTaskRequest {
    pub performer_id: Uuid,
}

/// Change status request
///
/// ```json
/// { "status": "IN_PROGRESS" }
/// ```
#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: TaskStatus,
}

/// Create a task; the caller becomes its initiator
///
/// # Response (201)
///
/// The new task, in status `CREATED` with no performer.
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    req.validate()?;

    let task = state
        .commands
        .create_task(CreateTaskCommand {
            project_id,
            initiator_id: auth.user_id,
            title: req.title,
            description: req.description,
            deadline: req.deadline,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn assign_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, task_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<AssignTaskRequest>,
) -> ApiResult<Json<Task>> {
    let task = state
        .commands
        .assign_task(AssignTaskCommand {
            project_id,
            task_id,
            requester_id: auth.user_id,
            performer_id: req.performer_id,
        })
        .await?;

    Ok(Json(task))
}

/// Change the status of a task
///
/// # Errors
///
/// - `400 Bad Request`: Transition not allowed (e.g. `CREATED` to `DONE`)
/// - `403 Forbidden`: Caller is not a member or not the performer
/// - `404 Not Found`: Unknown project or task
/// - `409 Conflict`: Task already has the requested status
pub async fn change_task_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, task_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<ChangeStatusRequest>,
) -> ApiResult<Json<Task>> {
    let task = state
        .commands
        .change_task_status(ChangeTaskStatusCommand {
            project_id,
            task_id,
            requester_id: auth.user_id,
            status: req.status,
        })
        .await?;

    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, task_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .commands
        .delete_task(DeleteTaskCommand {
            project_id,
            task_id,
            requester_id: auth.user_id,
        })
        .await?;

    Ok(Json(MessageResponse::new("Task deleted successfully.")))
}
