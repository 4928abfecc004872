//! Registration and login flows for online (multi-user) mode.
//!
//! The service holds no mutable state; every call runs its steps strictly in
//! order and tokens are only minted once persistence has succeeded.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use super::AuthError;
use super::jwt::{TokenManager, TokenVerifier};
use super::password::{hash_password, verify_password};
use super::repository::{RepoError, UniqueField, UserRepository};
use crate::context::RequestContext;
use crate::models::auth::{NewUser, TokenKind, TokenPair, User};

/// Decides whether a registration or login is allowed and which identity
/// the caller receives.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<dyn TokenManager>,
    verifier: Arc<dyn TokenVerifier>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: Arc<dyn TokenManager>,
        verifier: Arc<dyn TokenVerifier>,
    ) -> Self {
        Self {
            users,
            tokens,
            verifier,
        }
    }

    /// Create an account and issue its first token pair.
    pub async fn register(
        &self,
        ctx: &RequestContext,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(User, TokenPair), AuthError> {
        // Advisory pre-checks; the storage constraint is authoritative.
        if self
            .users
            .find_by_email(ctx, email)
            .await
            .map_err(repo_error("find user by email"))?
            .is_some()
        {
            return Err(AuthError::EmailTaken);
        }
        if self
            .users
            .find_by_username(ctx, username)
            .await
            .map_err(repo_error("find user by username"))?
            .is_some()
        {
            return Err(AuthError::UsernameTaken);
        }

        let password_hash = hash_blocking(ctx, password).await?;

        let user = self
            .users
            .create(
                ctx,
                NewUser {
                    username: username.to_string(),
                    email: email.to_string(),
                    password_hash,
                    is_admin: false,
                },
            )
            .await
            .map_err(repo_error("create user"))?;

        let tokens = self.issue(ctx, &user).await?;
        info!(user_id = user.id, username = %user.username, "user registered");
        Ok((user, tokens))
    }

    /// Verify credentials, record the login, and issue a token pair.
    pub async fn login(
        &self,
        ctx: &RequestContext,
        email: &str,
        password: &str,
    ) -> Result<(User, TokenPair), AuthError> {
        let Some(mut user) = self
            .users
            .find_by_email(ctx, email)
            .await
            .map_err(repo_error("find user by email"))?
        else {
            debug!("login rejected: unknown email");
            return Err(AuthError::InvalidLogin);
        };

        if !verify_blocking(ctx, &user.password_hash, password).await? {
            debug!(user_id = user.id, "login rejected: wrong password");
            return Err(AuthError::InvalidLogin);
        }

        user.last_login_at = Some(Utc::now());
        self.users
            .update(ctx, &user)
            .await
            .map_err(repo_error("record login"))?;

        let tokens = self.issue(ctx, &user).await?;
        info!(user_id = user.id, "user logged in");
        Ok((user, tokens))
    }

    /// Exchange a refresh token for a fresh pair.
    pub async fn refresh(
        &self,
        ctx: &RequestContext,
        refresh_token: &str,
    ) -> Result<(User, TokenPair), AuthError> {
        let claims = self.verifier.verify(refresh_token, TokenKind::Refresh)?;
        let user_id = claims.user_id().ok_or(AuthError::InvalidToken)?;
        let user = self.current_user(ctx, user_id).await?;
        let tokens = self.issue(ctx, &user).await?;
        debug!(user_id, "tokens refreshed");
        Ok((user, tokens))
    }

    /// Load the user an access token refers to.
    pub async fn current_user(&self, ctx: &RequestContext, user_id: i64) -> Result<User, AuthError> {
        self.users
            .find_by_id(ctx, user_id)
            .await
            .map_err(repo_error("find user by id"))?
            .ok_or(AuthError::InvalidToken)
    }

    /// Token verifier shared with the HTTP middleware.
    pub fn verifier(&self) -> &Arc<dyn TokenVerifier> {
        &self.verifier
    }

    async fn issue(&self, ctx: &RequestContext, user: &User) -> Result<TokenPair, AuthError> {
        self.tokens
            .generate_tokens(ctx, user)
            .await
            .map_err(|e| match e {
                AuthError::Interrupted(_) | AuthError::Internal { .. } => e,
                other => AuthError::internal("issue tokens", other),
            })
    }
}

/// Map repository failures: interruptions stay interruptions, constraint
/// violations become the matching domain error, everything else is internal.
fn repo_error(op: &'static str) -> impl Fn(RepoError) -> AuthError {
    move |e| match e {
        RepoError::Interrupted(i) => AuthError::Interrupted(i),
        RepoError::Duplicate(UniqueField::Email) => AuthError::EmailTaken,
        RepoError::Duplicate(UniqueField::Username) => AuthError::UsernameTaken,
        other => AuthError::internal(op, other),
    }
}

async fn hash_blocking(ctx: &RequestContext, password: &str) -> Result<String, AuthError> {
    let password = password.to_owned();
    let joined = ctx
        .run(tokio::task::spawn_blocking(move || hash_password(&password)))
        .await?;
    joined.map_err(|e| AuthError::internal("hash password", e))?
}

async fn verify_blocking(
    ctx: &RequestContext,
    hash: &str,
    password: &str,
) -> Result<bool, AuthError> {
    let (hash, password) = (hash.to_owned(), password.to_owned());
    ctx.run(tokio::task::spawn_blocking(move || {
        verify_password(&hash, &password)
    }))
    .await?
    .map_err(|e| AuthError::internal("verify password", e))
}
