//! JWT token issuance and verification.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::{debug, warn};

use super::AuthError;
use crate::context::RequestContext;
use crate::models::auth::{TokenClaims, TokenKind, TokenPair, User};
use crate::runtime::RuntimeFlags;

/// Access token lifetime: 15 minutes.
pub const DEFAULT_ACCESS_TTL: Duration = Duration::from_secs(15 * 60);

/// Refresh token lifetime: 7 days.
pub const DEFAULT_REFRESH_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Longest lifetime a token may carry: 100 years.
pub const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Signing key used in local mode when no secret is configured. Only the
/// single local user can reach the token surface, so it need not be secret.
const LOCAL_SIGNING_KEY: &[u8] = b"quillpad-local-mode-signing-key";

/// Issues token pairs for an authenticated user.
#[async_trait]
pub trait TokenManager: Send + Sync {
    async fn generate_tokens(
        &self,
        ctx: &RequestContext,
        user: &User,
    ) -> Result<TokenPair, AuthError>;
}

/// Validates tokens previously issued by a [`TokenManager`].
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str, kind: TokenKind) -> Result<TokenClaims, AuthError>;
}

/// Signing secret and lifetimes, fixed at construction.
#[derive(Clone)]
pub struct TokenConfig {
    pub secret: Option<String>,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: None,
            access_ttl: DEFAULT_ACCESS_TTL,
            refresh_ttl: DEFAULT_REFRESH_TTL,
        }
    }
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

/// HS256 JWT implementation of [`TokenManager`] and [`TokenVerifier`].
pub struct JwtTokenManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtTokenManager {
    /// Build a token manager for the resolved runtime mode.
    ///
    /// Online mode requires a non-blank secret. Local mode falls back to a
    /// fixed placeholder key.
    pub fn new(config: &TokenConfig, flags: &RuntimeFlags) -> Result<Self, AuthError> {
        let secret = config
            .secret
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let key = match (secret, flags.is_local()) {
            (Some(s), _) => s.as_bytes(),
            (None, true) => {
                debug!("local mode without signing secret, using placeholder key");
                LOCAL_SIGNING_KEY
            }
            (None, false) => return Err(AuthError::MissingSecret),
        };
        Ok(Self {
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            access_ttl: capped("access", config.access_ttl),
            refresh_ttl: capped("refresh", config.refresh_ttl),
        })
    }

    /// Access token lifetime in whole seconds.
    pub fn access_ttl_secs(&self) -> i64 {
        ttl_secs(self.access_ttl)
    }

    fn sign(&self, user: &User, kind: TokenKind, ttl: Duration) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let exp = now
            .checked_add(ttl_secs(ttl))
            .ok_or_else(|| AuthError::internal("sign token", "expiry out of range"))?;
        let claims = TokenClaims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            admin: user.is_admin,
            typ: kind,
            exp,
            iat: now,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::internal("sign token", e))
    }
}

fn capped(kind: &'static str, ttl: Duration) -> Duration {
    if ttl > MAX_TTL {
        warn!(kind, ttl_secs = ttl.as_secs(), "token lifetime too long, capping");
        return MAX_TTL;
    }
    ttl
}

fn ttl_secs(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX)
}

#[async_trait]
impl TokenManager for JwtTokenManager {
    async fn generate_tokens(
        &self,
        ctx: &RequestContext,
        user: &User,
    ) -> Result<TokenPair, AuthError> {
        ctx.check()?;
        let access_token = self.sign(user, TokenKind::Access, self.access_ttl)?;
        let refresh_token = self.sign(user, TokenKind::Refresh, self.refresh_ttl)?;
        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.access_ttl_secs(),
        })
    }
}

impl TokenVerifier for JwtTokenManager {
    fn verify(&self, token: &str, kind: TokenKind) -> Result<TokenClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        let claims = decode::<TokenClaims>(token, &self.decoding, &validation)
            .map_err(|e| {
                debug!(error = %e, "token rejected");
                AuthError::InvalidToken
            })?
            .claims;
        if claims.typ != kind {
            warn!(expected = ?kind, got = ?claims.typ, "token used for the wrong purpose");
            return Err(AuthError::InvalidToken);
        }
        Ok(claims)
    }
}
