/// Project endpoints
///
/// # Endpoints
///
/// - `GET    /v1/projects` - Every project
/// - `GET    /v1/projects/mine` - Projects the caller is a member of
/// - `POST   /v1/projects` - Create a project; the caller becomes its author
/// - `GET    /v1/projects/:project_id` - One project (members only)
/// - `DELETE /v1/projects/:project_id` - Delete a project and its tasks (author only)
/// - `GET    /v1/projects/:project_id/time?time_filter=week` - Time spent on a project
/// - `POST   /v1/projects/:project_id/members` - Add a member (author only)
/// - `DELETE /v1/projects/:project_id/members/:user_id` - Remove a member (author only)
///
/// Projects are returned as snapshots: the project fields plus
/// `member_ids` and `tasks`.

use super::{parse_time_filter, MessageResponse};
use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use taskclock_shared::{
    auth::middleware::AuthContext,
    commands::{CreateProjectCommand, DeleteProjectCommand, MemberCommand},
    models::project::ProjectSnapshot,
    time::TimeSpent,
};
use uuid::Uuid;
use validator::Validate;

/// Create project request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 3, max = 100, message = "Title must be between 3 and 100 characters long."))]
    pub title: String,

    #[validate(length(max = 1000, message = "Description must be at most 1000 characters long."))]
    pub description: Option<String>,
}

/// Add member request
#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: Uuid,
}

/// Query of the project time endpoint
#[derive(Debug, Default, Deserialize)]
pub struct ProjectTimeQuery {
    /// `week`, `month` or `hour`; absent means all time
    pub time_filter: Option<String>,
}

pub async fn list_projects(State(state): State<AppState>) -> ApiResult<Json<Vec<ProjectSnapshot>>> {
    Ok(Json(state.commands.list_projects().await?))
}

pub async fn list_my_projects(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<ProjectSnapshot>>> {
    Ok(Json(state.commands.list_projects_for_user(auth.user_id).await?))
}

/// Create a project
///
/// # Endpoint
///
/// ```text
/// POST /v1/projects
/// Authorization: Bearer <access token>
///
/// {
///   "title": "Apollo",
///   "description": "Moon landing"
/// }
/// ```
///
/// # Response (201)
///
/// The new project snapshot, with the caller as its only member.
pub async fn create_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<ProjectSnapshot>)> {
    req.validate()?;

    let project = state
        .commands
        .create_project(CreateProjectCommand {
            author_id: auth.user_id,
            title: req.title,
            description: req.description,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<ProjectSnapshot>> {
    Ok(Json(state.commands.get_project(project_id, auth.user_id).await?))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .commands
        .delete_project(DeleteProjectCommand {
            project_id,
            requester_id: auth.user_id,
        })
        .await?;

    Ok(Json(MessageResponse::new("Project deleted successfully.")))
}

/// Time spent on a project
///
/// # Endpoint
///
/// ```text
/// GET /v1/projects/:project_id/time?time_filter=week
/// ```
///
/// # Response
///
/// ```json
/// { "days": 1, "hours": 2, "minutes": 30 }
/// ```
pub async fn project_time(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Query(query): Query<ProjectTimeQuery>,
) -> ApiResult<Json<TimeSpent>> {
    let filter = parse_time_filter(query.time_filter.as_deref())?;

    Ok(Json(state.commands.project_time(project_id, filter).await?))
}

pub async fn add_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<AddMemberRequest>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .commands
        .add_member(MemberCommand {
            project_id,
            requester_id: auth.user_id,
            user_id: req.user_id,
        })
        .await?;

    Ok(Json(MessageResponse::new("User added successfully.")))
}

pub async fn remove_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .commands
        .remove_member(MemberCommand {
            project_id,
            requester_id: auth.user_id,
            user_id,
        })
        .await?;

    Ok(Json(MessageResponse::new("User removed successfully.")))
}
