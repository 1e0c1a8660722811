/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /v1/auth/register` - Register new user, returns a token pair
/// - `POST /v1/auth/login` - Login and get a token pair
/// - `POST /v1/auth/refresh` - Exchange the current refresh token for an access token
/// - `POST /v1/auth/logout` - Forget the stored refresh token (authenticated)
///
/// The latest refresh token issued to a user is stored on the user row; a
/// refresh token is only accepted while it is that stored token, so logging
/// in again or logging out invalidates older ones.

use super::MessageResponse;
use crate::{
    app::AppState,
    error::{validation_details, ApiError, ApiResult, ValidationErrorDetail},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use taskclock_shared::{
    auth::{
        jwt::{self, Claims, TokenPair, TokenType},
        middleware::AuthContext,
        password,
    },
    models::user::CreateUser,
};
use tracing::info;
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Display name, alphanumeric
    #[validate(length(min = 3, max = 20, message = "Name must be between 3 and 20 characters long."))]
    pub name: String,

    /// Email address
    #[validate(email(message = "Email must be a valid email address."))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters long."))]
    pub password: String,

    #[validate(must_match(other = "password", message = "Passwords do not match."))]
    pub confirm_password: String,
}

impl RegisterRequest {
    fn check(&self) -> ApiResult<()> {
        let mut details = match self.validate() {
            Ok(()) => Vec::new(),
            Err(e) => validation_details(&e),
        };

        if !self.name.is_empty() && !self.name.chars().all(|c| c.is_ascii_alphanumeric()) {
            details.push(ValidationErrorDetail::new(
                "name",
                "Name can only contain alphanumeric characters.",
            ));
        }

        if details.is_empty() {
            Ok(())
        } else {
            Err(ApiError::ValidationError(details))
        }
    }
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Email must be a valid email address."))]
    pub email: String,

    #[validate(length(min = 1, message = "Password cannot be empty."))]
    pub password: String,
}

/// Refresh token request
#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Refresh token cannot be empty."))]
    pub refresh_token: String,
}

/// Refresh token response
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    /// New access token (1h)
    pub access_token: String,
}

/// Issues a pair and stores its refresh token on the user
async fn issue_tokens(state: &AppState, user_id: uuid::Uuid, email: &str) -> ApiResult<TokenPair> {
    let tokens = jwt::issue_token_pair(user_id, email, state.jwt_secret(), state.jwt_refresh_secret())?;

    if !state
        .store
        .update_refresh_token(user_id, Some(&tokens.refresh_token))
        .await?
    {
        return Err(ApiError::NotFound("User not found.".to_string()));
    }

    Ok(tokens)
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/register
/// Content-Type: application/json
///
/// {
///   "name": "alice",
///   "email": "alice@example.com",
///   "password": "correct-horse",
///   "confirm_password": "correct-horse"
/// }
/// ```
///
/// # Response (201)
///
/// ```json
/// {
///   "access_token": "eyJ...",
///   "refresh_token": "eyJ..."
/// }
/// ```
///
/// # Errors
///
/// - `409 Conflict`: Email already registered
/// - `422 Unprocessable Entity`: Validation failed
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<TokenPair>)> {
    req.check()?;

    if state.store.find_user_by_email(&req.email).await?.is_some() {
        return Err(ApiError::Conflict("User already exists.".to_string()));
    }

    let password_hash = password::hash_password_blocking(req.password).await?;

    // A concurrent registration with the same email surfaces as Duplicate => 409
    let user = state
        .store
        .insert_user(CreateUser {
            name: req.name,
            email: req.email,
            password_hash,
        })
        .await?;

    let tokens = issue_tokens(&state, user.id, &user.email).await?;

    info!(user_id = %user.id, "User registered");
    Ok((StatusCode::CREATED, Json(tokens)))
}

/// Login endpoint
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown email or wrong password
/// - `422 Unprocessable Entity`: Validation failed
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<TokenPair>> {
    req.validate()?;

    let invalid = || ApiError::Unauthorized("Invalid credentials.".to_string());

    let user = state
        .store
        .find_user_by_email(&req.email)
        .await?
        .ok_or_else(invalid)?;

    if !password::verify_password_blocking(req.password, user.password_hash.clone()).await? {
        return Err(invalid());
    }

    let tokens = issue_tokens(&state, user.id, &user.email).await?;

    info!(user_id = %user.id, "User logged in");
    Ok(Json(tokens))
}

/// Token refresh endpoint
///
/// Exchanges the user's current refresh token for a new access token. The
/// refresh token itself is not rotated.
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid, expired or superseded refresh token
/// - `404 Not Found`: The token's user no longer exists
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    req.validate()?;

    let claims = jwt::validate_refresh_token(&req.refresh_token, state.jwt_refresh_secret())?;

    let user = state
        .store
        .load_user(claims.sub)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found.".to_string()))?;

    if user.refresh_token.as_deref() != Some(req.refresh_token.as_str()) {
        return Err(ApiError::Unauthorized("Invalid refresh token.".to_string()));
    }

    let access_token = jwt::create_token(
        &Claims::new(user.id, user.email, TokenType::Access),
        state.jwt_secret(),
    )?;

    Ok(Json(RefreshResponse { access_token }))
}

/// Logout endpoint
///
/// Clears the stored refresh token. Access tokens already issued stay valid
/// until they expire.
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<MessageResponse>> {
    if !state.store.update_refresh_token(auth.user_id, None).await? {
        return Err(ApiError::NotFound("User not found.".to_string()));
    }

    info!(user_id = %auth.user_id, "User logged out");
    Ok(Json(MessageResponse::new("Logged out successfully.")))
}
