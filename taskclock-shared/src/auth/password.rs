/// Argon2id password hashing
///
/// Hashing costs tens of milliseconds of CPU; async callers use
/// [`hash_password_blocking`] and [`verify_password_blocking`], which run on
/// tokio's blocking pool.
///
/// Hashes are PHC strings (`$argon2id$v=19$m=65536,t=3,p=4$<salt>$<hash>`)
/// carrying their own parameters, so verification keeps working if the
/// parameters below change.
///
/// # Parameters
///
/// - memory: 64 MiB
/// - iterations: 3
/// - parallelism: 4
/// - output: 32 bytes
///
/// # Example
///
/// ```
/// use taskclock_shared::auth::password::{hash_password, verify_password};
///
/// let hash = hash_password("correct horse battery").unwrap();
/// assert!(verify_password("correct horse battery", &hash).unwrap());
/// assert!(!verify_password("wrong", &hash).unwrap());
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};

/// Password hashing error types
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Hashing failed
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Verification failed for a reason other than a wrong password
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Stored hash is not a valid PHC string
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

fn hasher() -> Result<Argon2<'static>, PasswordError> {
    let params = ParamsBuilder::new()
        .m_cost(65536)
        .t_cost(3)
        .p_cost(4)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    Ok(Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params))
}

/// Hashes a password with a fresh random salt
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::HashError(e.to_string()))
}

/// Checks a password against a stored hash
///
/// Returns `Ok(false)` for a wrong password and an error only if the hash
/// itself is unusable.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHash(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(e.to_string())),
    }
}

/// [`hash_password`] on the blocking thread pool
pub async fn hash_password_blocking(password: String) -> Result<String, PasswordError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| PasswordError::HashError(format!("Hashing task failed: {}", e)))?
}

/// [`verify_password`] on the blocking thread pool
pub async fn verify_password_blocking(password: String, hash: String) -> Result<bool, PasswordError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| PasswordError::VerifyError(format!("Verification task failed: {}", e)))?
}
