/// Authentication utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`jwt`]: access/refresh token generation and validation
/// - [`middleware`]: Axum bearer-token middleware and [`middleware::AuthContext`]
///
/// Authorization (who may do what to a project or task) lives in
/// [`crate::guards`], not here.
///
/// # Example
///
/// ```
/// use taskclock_shared::auth::password::{hash_password, verify_password};
/// use taskclock_shared::auth::jwt::issue_token_pair;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let tokens = issue_token_pair(
///     Uuid::new_v4(),
///     "user@example.com",
///     "access-secret-that-is-long-enough!",
///     "refresh-secret-that-is-long-enough",
/// )?;
/// # Ok(())
/// # }
/// ```

pub mod jwt;
pub mod middleware;
pub mod password;
