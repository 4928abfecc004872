//! User repository seam.
//!
//! Storage owns the uniqueness of usernames and emails; implementations must
//! report a violated constraint as [`RepoError::Duplicate`].

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::context::{Interrupted, RequestContext};
use crate::models::auth::{NewUser, User};

/// Which unique column a write collided on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Email,
    Username,
}

impl fmt::Display for UniqueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UniqueField::Email => f.write_str("email"),
            UniqueField::Username => f.write_str("username"),
        }
    }
}

/// Repository errors.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Duplicate {0}")]
    Duplicate(UniqueField),

    #[error("User not found")]
    NotFound,

    #[error(transparent)]
    Interrupted(#[from] Interrupted),

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),
}

/// Persistence for [`User`] records.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(
        &self,
        ctx: &RequestContext,
        email: &str,
    ) -> Result<Option<User>, RepoError>;

    async fn find_by_username(
        &self,
        ctx: &RequestContext,
        username: &str,
    ) -> Result<Option<User>, RepoError>;

    async fn find_by_id(&self, ctx: &RequestContext, id: i64) -> Result<Option<User>, RepoError>;

    /// Insert a user; storage assigns the id.
    async fn create(&self, ctx: &RequestContext, user: NewUser) -> Result<User, RepoError>;

    /// Persist mutable fields of an existing user.
    async fn update(&self, ctx: &RequestContext, user: &User) -> Result<(), RepoError>;
}
