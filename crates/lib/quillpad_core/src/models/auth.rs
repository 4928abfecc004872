//! Authentication domain models.
//!
//! These are internal domain models; the HTTP layer wraps them in its own
//! response types (camelCase etc.).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Domain user, including the password hash.
///
/// Never serialized directly; expose [`PublicUser`] instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Safe-to-expose projection.
    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            is_admin: self.is_admin,
            last_login_at: self.last_login_at,
        }
    }
}

/// User fields that may leave the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Input to `UserRepository::create`; storage assigns the id.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
}

/// Access/refresh token pair handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds at issuance.
    pub expires_in: i64,
}

/// Which half of a token pair a JWT is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims embedded in both access and refresh tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject — user ID (standard JWT `sub` claim).
    pub sub: String,
    pub username: String,
    pub admin: bool,
    pub typ: TokenKind,
    /// Expiry (unix timestamp).
    pub exp: i64,
    /// Issued at (unix timestamp).
    pub iat: i64,
}

impl TokenClaims {
    /// Numeric user id from `sub`, if well-formed.
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> User {
        User {
            id: 3,
            username: "alice".into(),
            email: "alice@x.com".into(),
            password_hash: "$2b$12$secret".into(),
            is_admin: false,
            last_login_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn public_user_omits_hash() {
        let json = serde_json::to_value(sample().public()).unwrap();
        assert_eq!(json["username"], "alice");
        assert_eq!(json["isAdmin"], false);
        assert!(json["lastLoginAt"].is_null());
        assert!(!json.to_string().contains("secret"));
    }

    #[test]
    fn claims_user_id_parses_sub() {
        let claims = TokenClaims {
            sub: "42".into(),
            username: "a".into(),
            admin: false,
            typ: TokenKind::Access,
            exp: 0,
            iat: 0,
        };
        assert_eq!(claims.user_id(), Some(42));
    }
}
