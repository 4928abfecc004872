//! Authentication and session issuance.
//!
//! Provides password hashing, token issuance, the user repository seam, and
//! the register/login flows shared by `quillpad_api` and the server binary.

pub mod jwt;
pub mod memory;
pub mod password;
pub mod provider;
pub mod queries;
pub mod repository;
pub mod service;

use thiserror::Error;

use crate::context::Interrupted;

/// Boxed source error carried by [`AuthError::Internal`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Authentication errors.
///
/// The first five variants are caller-facing outcomes; `Interrupted` and
/// `Internal` are failures of the request itself.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Email already registered")]
    EmailTaken,

    #[error("Username already taken")]
    UsernameTaken,

    /// Unknown email and wrong password are deliberately the same error.
    #[error("Invalid email or password")]
    InvalidLogin,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Registration is disabled in local mode")]
    RegistrationDisabled,

    #[error("Signing secret is not configured")]
    MissingSecret,

    #[error(transparent)]
    Interrupted(#[from] Interrupted),

    #[error("{op} failed: {source}")]
    Internal {
        op: &'static str,
        #[source]
        source: BoxError,
    },
}

impl AuthError {
    /// Wrap an unexpected failure with the name of the failing step.
    pub fn internal(op: &'static str, source: impl Into<BoxError>) -> Self {
        AuthError::Internal {
            op,
            source: source.into(),
        }
    }

    /// Whether the caller can fix this by changing its input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AuthError::EmailTaken
                | AuthError::UsernameTaken
                | AuthError::InvalidLogin
                | AuthError::InvalidToken
                | AuthError::RegistrationDisabled
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_error_names_the_operation() {
        let err = AuthError::internal("create user", "connection reset");
        assert_eq!(err.to_string(), "create user failed: connection reset");
        assert!(!err.is_client_error());
    }

    #[test]
    fn interruption_is_not_a_client_error() {
        let err = AuthError::from(Interrupted::Cancelled);
        assert_eq!(err.to_string(), "operation cancelled");
        assert!(!err.is_client_error());
        assert!(AuthError::InvalidLogin.is_client_error());
    }
}
