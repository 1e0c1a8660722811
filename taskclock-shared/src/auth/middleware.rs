/// Authentication middleware for Axum
///
/// Validates the `Authorization: Bearer <access token>` header and puts an
/// [`AuthContext`] into the request extensions. Handlers read it with
/// `Extension<AuthContext>`; the user ID it carries is the identity every
/// command authorizes against.
///
/// The router installs it through `axum::middleware::from_fn_with_state`,
/// calling [`authenticate`] with the configured access-token secret.

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::{validate_access_token, Claims, JwtError};

/// Authenticated caller, added to request extensions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,

    /// Email from the access token
    pub email: String,
}

impl AuthContext {
    /// Builds the context from validated access-token claims
    pub fn from_claims(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
        }
    }
}

/// Error type for authentication middleware
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No Authorization header
    #[error("Missing authorization header")]
    MissingCredentials,

    /// Header present but not `Bearer <token>`
    #[error("{0}")]
    InvalidFormat(String),

    /// Token rejected
    #[error("{0}")]
    InvalidToken(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AuthError::MissingCredentials => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AuthError::InvalidFormat(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AuthError::InvalidToken(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
        };

        let body = Json(serde_json::json!({
            "error": code,
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Validates the bearer token in `headers`
pub fn authenticate(headers: &HeaderMap, secret: &str) -> Result<AuthContext, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

    let claims = validate_access_token(token, secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        other => AuthError::InvalidToken(other.to_string()),
    })?;

    Ok(AuthContext::from_claims(claims))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{create_token, TokenType};
    use axum::http::HeaderValue;

    const SECRET: &str = "access-secret-key-at-least-32-bytes!!";

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_authenticate_valid_token() {
        let user_id = Uuid::new_v4();
        let token = create_token(&Claims::new(user_id, "eve@example.com", TokenType::Access), SECRET).unwrap();

        let ctx = authenticate(&headers_with(&format!("Bearer {}", token)), SECRET).unwrap();
        assert_eq!(ctx.user_id, user_id);
        assert_eq!(ctx.email, "eve@example.com");
    }

    #[test]
    fn test_authenticate_failures() {
        assert_eq!(
            authenticate(&HeaderMap::new(), SECRET),
            Err(AuthError::MissingCredentials)
        );
        assert!(matches!(
            authenticate(&headers_with("Basic abc"), SECRET),
            Err(AuthError::InvalidFormat(_))
        ));
        assert!(matches!(
            authenticate(&headers_with("Bearer not-a-jwt"), SECRET),
            Err(AuthError::InvalidToken(_))
        ));

        let refresh = create_token(&Claims::new(Uuid::new_v4(), "eve@example.com", TokenType::Refresh), SECRET).unwrap();
        assert!(matches!(
            authenticate(&headers_with(&format!("Bearer {}", refresh)), SECRET),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_auth_error_into_response() {
        assert_eq!(
            AuthError::MissingCredentials.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::InvalidFormat("x".to_string()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::InvalidToken("x".to_string()).into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
