//! Password hashing utilities using bcrypt.

use thiserror::Error;

/// Bcrypt work factor used for new hashes.
pub const BCRYPT_COST: u32 = 10;

/// Password hashing errors.
#[derive(Error, Debug)]
pub enum PasswordError {
    /// Error during password hashing.
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// The stored hash is not a valid bcrypt string.
    #[error("Invalid password hash format")]
    InvalidHash,
}

/// Hashes a password with bcrypt.
///
/// ```
/// use wp_core::auth::password::hash_password;
///
/// let hash = hash_password("correct horse").unwrap();
/// assert!(hash.starts_with("$2"));
/// ```
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    bcrypt::hash(password, BCRYPT_COST).map_err(|e| PasswordError::HashError(e.to_string()))
}

/// Verifies a password against a stored bcrypt hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    bcrypt::verify(password, hash).map_err(|_| PasswordError::InvalidHash)
}
