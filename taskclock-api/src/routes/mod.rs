/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login, token refresh and logout
/// - `projects`: Projects, membership and project time
/// - `tasks`: Task creation, assignment, status changes and deletion
/// - `users`: Developer time reports

pub mod auth;
pub mod health;
pub mod projects;
pub mod tasks;
pub mod users;

use crate::error::{ApiError, ApiResult, ValidationErrorDetail};
use serde::{Deserialize, Serialize};
use taskclock_shared::time::TimeFilter;

/// Body of endpoints that only acknowledge
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Parses the optional `time_filter` query parameter
pub(crate) fn parse_time_filter(raw: Option<&str>) -> ApiResult<Option<TimeFilter>> {
    match raw {
        None | Some("") => Ok(None),
        Some(s) => s.parse::<TimeFilter>().map(Some).map_err(|_| {
            ApiError::ValidationError(vec![ValidationErrorDetail::new(
                "time_filter",
                "time_filter must be one of: week, month, hour.",
            )])
        }),
    }
}
