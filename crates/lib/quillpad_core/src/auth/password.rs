//! Password hashing via bcrypt.

use tracing::warn;

use super::AuthError;

/// bcrypt cost factor.
pub const BCRYPT_COST: u32 = bcrypt::DEFAULT_COST;

/// Hash a password with bcrypt.
///
/// Passwords longer than bcrypt's 72-byte input limit are rejected rather
/// than silently truncated.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    bcrypt::non_truncating_hash(password, BCRYPT_COST)
        .map_err(|e| AuthError::internal("hash password", e))
}

/// Verify a password against a bcrypt hash. Malformed hashes never match.
pub fn verify_password(hash: &str, password: &str) -> bool {
    match bcrypt::non_truncating_verify(password, hash) {
        Ok(matches) => matches,
        Err(e) => {
            warn!(error = %e, "password verification failed");
            false
        }
    }
}
