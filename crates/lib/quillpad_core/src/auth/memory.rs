//! In-process [`UserRepository`] with the same uniqueness semantics as the
//! Postgres schema.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::repository::{RepoError, UniqueField, UserRepository};
use crate::context::RequestContext;
use crate::models::auth::{NewUser, User};

#[derive(Debug, Default)]
struct Inner {
    last_id: i64,
    users: HashMap<i64, User>,
    by_email: HashMap<String, i64>,
    by_username: HashMap<String, i64>,
}

impl Inner {
    fn lookup(&self, index: &HashMap<String, i64>, key: &str) -> Option<User> {
        index.get(key).and_then(|id| self.users.get(id)).cloned()
    }
}

/// Users held in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryUserRepository {
    inner: RwLock<Inner>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    pub async fn len(&self) -> usize {
        self.inner.read().await.users.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_email(
        &self,
        ctx: &RequestContext,
        email: &str,
    ) -> Result<Option<User>, RepoError> {
        let inner = ctx.run(self.inner.read()).await?;
        Ok(inner.lookup(&inner.by_email, email))
    }

    async fn find_by_username(
        &self,
        ctx: &RequestContext,
        username: &str,
    ) -> Result<Option<User>, RepoError> {
        let inner = ctx.run(self.inner.read()).await?;
        Ok(inner.lookup(&inner.by_username, username))
    }

    async fn find_by_id(&self, ctx: &RequestContext, id: i64) -> Result<Option<User>, RepoError> {
        let inner = ctx.run(self.inner.read()).await?;
        Ok(inner.users.get(&id).cloned())
    }

    async fn create(&self, ctx: &RequestContext, user: NewUser) -> Result<User, RepoError> {
        let mut inner = ctx.run(self.inner.write()).await?;
        if inner.by_email.contains_key(&user.email) {
            return Err(RepoError::Duplicate(UniqueField::Email));
        }
        if inner.by_username.contains_key(&user.username) {
            return Err(RepoError::Duplicate(UniqueField::Username));
        }
        inner.last_id += 1;
        let created = User {
            id: inner.last_id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            is_admin: user.is_admin,
            last_login_at: None,
            created_at: Utc::now(),
        };
        inner.by_email.insert(created.email.clone(), created.id);
        inner.by_username.insert(created.username.clone(), created.id);
        inner.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, ctx: &RequestContext, user: &User) -> Result<(), RepoError> {
        let mut inner = ctx.run(self.inner.write()).await?;
        let Some(existing) = inner.users.get(&user.id).cloned() else {
            return Err(RepoError::NotFound);
        };
        if existing.email != user.email {
            if inner.by_email.contains_key(&user.email) {
                return Err(RepoError::Duplicate(UniqueField::Email));
            }
            inner.by_email.remove(&existing.email);
            inner.by_email.insert(user.email.clone(), user.id);
        }
        if existing.username != user.username {
            if inner.by_username.contains_key(&user.username) {
                return Err(RepoError::Duplicate(UniqueField::Username));
            }
            inner.by_username.remove(&existing.username);
            inner.by_username.insert(user.username.clone(), user.id);
        }
        let stored = User {
            created_at: existing.created_at,
            ..user.clone()
        };
        inner.users.insert(user.id, stored);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.into(),
            email: email.into(),
            password_hash: "hash".into(),
            is_admin: false,
        }
    }

    #[tokio::test]
    async fn create_assigns_sequential_ids() {
        let repo = MemoryUserRepository::new();
        let ctx = RequestContext::background();
        let a = repo.create(&ctx, new_user("a", "a@x.com")).await.unwrap();
        let b = repo.create(&ctx, new_user("b", "b@x.com")).await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert!(a.last_login_at.is_none());
        assert_eq!(repo.len().await, 2);
    }

    #[tokio::test]
    async fn lookups_find_created_user() {
        let repo = MemoryUserRepository::new();
        let ctx = RequestContext::background();
        let a = repo.create(&ctx, new_user("a", "a@x.com")).await.unwrap();
        assert_eq!(repo.find_by_email(&ctx, "a@x.com").await.unwrap(), Some(a.clone()));
        assert_eq!(repo.find_by_username(&ctx, "a").await.unwrap(), Some(a.clone()));
        assert_eq!(repo.find_by_id(&ctx, a.id).await.unwrap(), Some(a));
        assert_eq!(repo.find_by_email(&ctx, "z@x.com").await.unwrap(), None);
    }

    #[tokio::test]
    async fn duplicates_are_rejected() {
        let repo = MemoryUserRepository::new();
        let ctx = RequestContext::background();
        repo.create(&ctx, new_user("a", "a@x.com")).await.unwrap();
        assert!(matches!(
            repo.create(&ctx, new_user("b", "a@x.com")).await,
            Err(RepoError::Duplicate(UniqueField::Email))
        ));
        assert!(matches!(
            repo.create(&ctx, new_user("a", "b@x.com")).await,
            Err(RepoError::Duplicate(UniqueField::Username))
        ));
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn update_persists_last_login() {
        let repo = MemoryUserRepository::new();
        let ctx = RequestContext::background();
        let mut a = repo.create(&ctx, new_user("a", "a@x.com")).await.unwrap();
        a.last_login_at = Some(Utc::now());
        repo.update(&ctx, &a).await.unwrap();
        let stored = repo.find_by_id(&ctx, a.id).await.unwrap().unwrap();
        assert_eq!(stored.last_login_at, a.last_login_at);
    }

    #[tokio::test]
    async fn update_missing_user_is_not_found() {
        let repo = MemoryUserRepository::new();
        let ctx = RequestContext::background();
        let mut ghost = repo.create(&ctx, new_user("a", "a@x.com")).await.unwrap();
        ghost.id = 99;
        assert!(matches!(
            repo.update(&ctx, &ghost).await,
            Err(RepoError::NotFound)
        ));
    }

    #[tokio::test]
    async fn cancelled_context_is_reported() {
        let repo = MemoryUserRepository::new();
        let ctx = RequestContext::background();
        ctx.cancel();
        assert!(matches!(
            repo.find_by_email(&ctx, "a@x.com").await,
            Err(RepoError::Interrupted(_))
        ));
        assert!(repo.is_empty().await);
    }
}
