/// Developer time report
///
/// # Endpoint
///
/// ```text
/// GET /v1/users/:dev_id/time?time_filter=month&project_ids=<uuid>,<uuid>
/// ```
///
/// Without `project_ids` the report covers every project the developer is a
/// member of. IDs of projects they are not a member of are skipped.
///
/// # Response
///
/// ```json
/// [
///   {
///     "project_id": "uuid",
///     "project_name": "Apollo",
///     "time_spent": { "days": 0, "hours": 2, "minutes": 15 }
///   }
/// ]
/// ```

use super::parse_time_filter;
use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use taskclock_shared::aggregation::DeveloperProjectTime;
use uuid::Uuid;

/// Query of the developer time endpoint
#[derive(Debug, Default, Deserialize)]
pub struct DeveloperTimeQuery {
    pub time_filter: Option<String>,

    /// Comma-separated project IDs
    pub project_ids: Option<String>,
}

fn parse_project_ids(raw: Option<&str>) -> ApiResult<Vec<Uuid>> {
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return Ok(Vec::new());
    };

    raw.split(',')
        .map(|id| id.trim().parse::<Uuid>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| {
            ApiError::ValidationError(vec![ValidationErrorDetail::new(
                "project_ids",
                "project_ids must be a comma-separated list of UUIDs.",
            )])
        })
}

pub async fn developer_time(
    State(state): State<AppState>,
    Path(dev_id): Path<Uuid>,
    Query(query): Query<DeveloperTimeQuery>,
) -> ApiResult<Json<Vec<DeveloperProjectTime>>> {
    let filter = parse_time_filter(query.time_filter.as_deref())?;
    let project_ids = parse_project_ids(query.project_ids.as_deref())?;

    let report = state
        .commands
        .developer_time(dev_id, filter, &project_ids)
        .await?;

    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_project_ids() {
        assert!(parse_project_ids(None).unwrap().is_empty());
        assert!(parse_project_ids(Some(" ")).unwrap().is_empty());

        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(
            parse_project_ids(Some(&format!("{}, {}", a, b))).unwrap(),
            vec![a, b]
        );

        assert!(parse_project_ids(Some("1,2")).is_err());
    }
}
