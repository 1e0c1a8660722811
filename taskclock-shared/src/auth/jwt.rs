/// JWT token generation and validation
///
/// Access and refresh tokens are HS256-signed with *different* secrets, so a
/// refresh token can never pass as an access token even if its `token_type`
/// claim were ignored.
///
/// # Token Types
///
/// - **Access**: short-lived (1 hour), sent as `Authorization: Bearer <token>`
/// - **Refresh**: long-lived (7 days), exchanged for a new access token; the
///   latest one is stored on the user row and must match on use
///
/// # Claims
///
/// - `sub`: user ID
/// - `email`: user email at issue time
/// - `iss`: always `"taskclock"`
/// - `iat` / `nbf` / `exp`: Unix timestamps
/// - `jti`: unique token ID
/// - `token_type`: `access` or `refresh`
///
/// # Example
///
/// ```
/// use taskclock_shared::auth::jwt::{create_token, validate_access_token, Claims, TokenType};
/// use uuid::Uuid;
///
/// let claims = Claims::new(Uuid::new_v4(), "alice@example.com", TokenType::Access);
/// let token = create_token(&claims, "access-secret-that-is-long-enough!").unwrap();
///
/// let decoded = validate_access_token(&token, "access-secret-that-is-long-enough!").unwrap();
/// assert_eq!(decoded.sub, claims.sub);
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuer written into and required from every token
pub const ISSUER: &str = "taskclock";

/// JWT error types
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Token encoding failed
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Signature, issuer or shape is wrong
    #[error("Invalid token: {0}")]
    Invalid(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Token is valid but of the other type
    #[error("Expected {expected} token, got {actual} token")]
    WrongType {
        expected: TokenType,
        actual: TokenType,
    },
}

/// Token type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Access token (1 hour)
    Access,

    /// Refresh token (7 days)
    Refresh,
}

impl TokenType {
    /// Lifetime of a freshly issued token
    pub fn lifetime(&self) -> Duration {
        match self {
            TokenType::Access => Duration::hours(1),
            TokenType::Refresh => Duration::days(7),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JWT claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: Uuid,

    /// User email
    pub email: String,

    /// Issuer
    pub iss: String,

    /// Issued at
    pub iat: i64,

    /// Expiration time
    pub exp: i64,

    /// Not before
    pub nbf: i64,

    /// Token ID
    pub jti: Uuid,

    /// Token type
    pub token_type: TokenType,
}

impl Claims {
    /// Creates claims with the default lifetime of `token_type`
    pub fn new(user_id: Uuid, email: impl Into<String>, token_type: TokenType) -> Self {
        Self::with_expiration(user_id, email, token_type, token_type.lifetime())
    }

    /// Creates claims expiring `expires_in` from now
    pub fn with_expiration(
        user_id: Uuid,
        email: impl Into<String>,
        token_type: TokenType,
        expires_in: Duration,
    ) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            email: email.into(),
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
            nbf: now.timestamp(),
            jti: Uuid::new_v4(),
            token_type,
        }
    }

    /// Checks if the token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Signs claims with HS256
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&Header::new(Algorithm::HS256), claims, &key)
        .map_err(|e| JwtError::CreateError(e.to_string()))
}

/// Verifies signature, issuer, `exp` and `nbf`
///
/// # Errors
///
/// - `JwtError::Expired` if `exp` is in the past
/// - `JwtError::Invalid` for any other failure
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.leeway = 0;

    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
            _ => JwtError::Invalid(e.to_string()),
        })
}

fn validate_typed(token: &str, secret: &str, expected: TokenType) -> Result<Claims, JwtError> {
    let claims = validate_token(token, secret)?;

    if claims.token_type != expected {
        return Err(JwtError::WrongType {
            expected,
            actual: claims.token_type,
        });
    }

    Ok(claims)
}

/// Validates an access token
pub fn validate_access_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    validate_typed(token, secret, TokenType::Access)
}

/// Validates a refresh token
pub fn validate_refresh_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    validate_typed(token, secret, TokenType::Refresh)
}

/// Access/refresh token pair handed out on register and login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Issues a fresh access/refresh pair for a user
pub fn issue_token_pair(
    user_id: Uuid,
    email: &str,
    access_secret: &str,
    refresh_secret: &str,
) -> Result<TokenPair, JwtError> {
    Ok(TokenPair {
        access_token: create_token(&Claims::new(user_id, email, TokenType::Access), access_secret)?,
        refresh_token: create_token(&Claims::new(user_id, email, TokenType::Refresh), refresh_secret)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCESS: &str = "access-secret-key-at-least-32-bytes!!";
    const REFRESH: &str = "refresh-secret-key-at-least-32-bytes!";

    #[test]
    fn test_token_lifetimes() {
        assert_eq!(TokenType::Access.lifetime(), Duration::hours(1));
        assert_eq!(TokenType::Refresh.lifetime(), Duration::days(7));
    }

    #[test]
    fn test_create_and_validate() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(user_id, "bob@example.com", TokenType::Access);

        let token = create_token(&claims, ACCESS).unwrap();
        let decoded = validate_access_token(&token, ACCESS).unwrap();

        assert_eq!(decoded, claims);
        assert_eq!(decoded.iss, ISSUER);
        assert_eq!(decoded.exp - decoded.iat, 3600);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let claims = Claims::new(Uuid::new_v4(), "bob@example.com", TokenType::Access);
        let token = create_token(&claims, ACCESS).unwrap();

        assert!(matches!(validate_token(&token, REFRESH), Err(JwtError::Invalid(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        let claims = Claims::with_expiration(
            Uuid::new_v4(),
            "bob@example.com",
            TokenType::Access,
            Duration::seconds(-10),
        );
        assert!(claims.is_expired());

        let token = create_token(&claims, ACCESS).unwrap();
        assert!(matches!(validate_token(&token, ACCESS), Err(JwtError::Expired)));
    }

    #[test]
    fn test_token_type_enforced() {
        let pair = issue_token_pair(Uuid::new_v4(), "bob@example.com", ACCESS, REFRESH).unwrap();

        assert!(validate_access_token(&pair.access_token, ACCESS).is_ok());
        assert!(validate_refresh_token(&pair.refresh_token, REFRESH).is_ok());

        // Right secret, wrong type
        let refresh_as_access = create_token(
            &Claims::new(Uuid::new_v4(), "bob@example.com", TokenType::Refresh),
            ACCESS,
        )
        .unwrap();
        assert!(matches!(
            validate_access_token(&refresh_as_access, ACCESS),
            Err(JwtError::WrongType { .. })
        ));
    }

    #[test]
    fn test_refresh_tokens_are_unique() {
        let user_id = Uuid::new_v4();
        let a = issue_token_pair(user_id, "bob@example.com", ACCESS, REFRESH).unwrap();
        let b = issue_token_pair(user_id, "bob@example.com", ACCESS, REFRESH).unwrap();

        assert_ne!(a.refresh_token, b.refresh_token);
    }
}
