//! Authentication provider — one variant per runtime mode.
//!
//! Local mode serves a single pre-seeded identity and never touches a user
//! repository, so the online [`AuthService`] stays free of mode checks.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use super::AuthError;
use super::jwt::{TokenManager, TokenVerifier};
use super::service::AuthService;
use crate::context::RequestContext;
use crate::models::auth::{TokenClaims, TokenKind, TokenPair, User};
use crate::runtime::{LocalRuntime, RuntimeMode};

/// Single-user, offline authentication.
#[derive(Clone)]
pub struct LocalAuth {
    user: User,
    tokens: Arc<dyn TokenManager>,
    verifier: Arc<dyn TokenVerifier>,
}

impl LocalAuth {
    pub fn new(
        local: &LocalRuntime,
        tokens: Arc<dyn TokenManager>,
        verifier: Arc<dyn TokenVerifier>,
    ) -> Self {
        let user = User {
            id: local.user_id,
            username: local.username.clone(),
            email: local.email.clone(),
            password_hash: String::new(),
            is_admin: local.is_admin,
            last_login_at: None,
            created_at: Utc::now(),
        };
        Self {
            user,
            tokens,
            verifier,
        }
    }

    /// The fixed local identity.
    pub fn user(&self) -> &User {
        &self.user
    }

    /// Credentials are not checked: the local user is the only principal.
    pub async fn login(&self, ctx: &RequestContext) -> Result<(User, TokenPair), AuthError> {
        let mut user = self.user.clone();
        user.last_login_at = Some(Utc::now());
        let tokens = self.tokens.generate_tokens(ctx, &user).await?;
        debug!(user_id = user.id, "local session issued");
        Ok((user, tokens))
    }

    pub async fn refresh(
        &self,
        ctx: &RequestContext,
        refresh_token: &str,
    ) -> Result<(User, TokenPair), AuthError> {
        let claims = self.verifier.verify(refresh_token, TokenKind::Refresh)?;
        let user = self.current_user(claims.user_id().ok_or(AuthError::InvalidToken)?)?;
        let tokens = self.tokens.generate_tokens(ctx, &user).await?;
        Ok((user, tokens))
    }

    pub fn current_user(&self, user_id: i64) -> Result<User, AuthError> {
        if user_id != self.user.id {
            return Err(AuthError::InvalidToken);
        }
        Ok(self.user.clone())
    }
}

/// Mode-specific authentication entry point.
#[derive(Clone)]
pub enum AuthProvider {
    Online(AuthService),
    Local(LocalAuth),
}

impl AuthProvider {
    pub fn mode(&self) -> RuntimeMode {
        match self {
            AuthProvider::Online(_) => RuntimeMode::Online,
            AuthProvider::Local(_) => RuntimeMode::Local,
        }
    }

    pub async fn register(
        &self,
        ctx: &RequestContext,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(User, TokenPair), AuthError> {
        match self {
            AuthProvider::Online(svc) => svc.register(ctx, username, email, password).await,
            AuthProvider::Local(_) => {
                info!("registration attempted in local mode");
                Err(AuthError::RegistrationDisabled)
            }
        }
    }

    pub async fn login(
        &self,
        ctx: &RequestContext,
        email: &str,
        password: &str,
    ) -> Result<(User, TokenPair), AuthError> {
        match self {
            AuthProvider::Online(svc) => svc.login(ctx, email, password).await,
            AuthProvider::Local(local) => local.login(ctx).await,
        }
    }

    pub async fn refresh(
        &self,
        ctx: &RequestContext,
        refresh_token: &str,
    ) -> Result<(User, TokenPair), AuthError> {
        match self {
            AuthProvider::Online(svc) => svc.refresh(ctx, refresh_token).await,
            AuthProvider::Local(local) => local.refresh(ctx, refresh_token).await,
        }
    }

    pub async fn current_user(&self, ctx: &RequestContext, user_id: i64) -> Result<User, AuthError> {
        match self {
            AuthProvider::Online(svc) => svc.current_user(ctx, user_id).await,
            AuthProvider::Local(local) => local.current_user(user_id),
        }
    }

    /// Validate a bearer access token.
    pub fn verify_access(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let verifier = match self {
            AuthProvider::Online(svc) => svc.verifier(),
            AuthProvider::Local(local) => &local.verifier,
        };
        verifier.verify(token, TokenKind::Access)
    }
}
