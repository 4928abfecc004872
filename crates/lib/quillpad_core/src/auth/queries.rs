//! Postgres-backed [`UserRepository`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;

use super::repository::{RepoError, UniqueField, UserRepository};
use crate::context::RequestContext;
use crate::models::auth::{NewUser, User};

/// Unique constraint on `users.email` (see `migrations/0001_users.sql`).
const EMAIL_CONSTRAINT: &str = "users_email_key";
/// Unique constraint on `users.username`.
const USERNAME_CONSTRAINT: &str = "users_username_key";

const USER_COLUMNS: &str =
    "id, username, email, password_hash, is_admin, last_login_at, created_at";

type UserRow = (
    i64,
    String,
    String,
    String,
    bool,
    Option<DateTime<Utc>>,
    DateTime<Utc>,
);

fn user_from_row(row: UserRow) -> User {
    let (id, username, email, password_hash, is_admin, last_login_at, created_at) = row;
    User {
        id,
        username,
        email,
        password_hash,
        is_admin,
        last_login_at,
        created_at,
    }
}

/// Map a unique constraint name to the column it guards.
fn constraint_field(constraint: &str) -> Option<UniqueField> {
    match constraint {
        EMAIL_CONSTRAINT => Some(UniqueField::Email),
        USERNAME_CONSTRAINT => Some(UniqueField::Username),
        _ => None,
    }
}

/// Translate unique violations into [`RepoError::Duplicate`].
fn map_write_error(e: sqlx::Error) -> RepoError {
    if let sqlx::Error::Database(db) = &e
        && db.is_unique_violation()
        && let Some(field) = db.constraint().and_then(constraint_field)
    {
        debug!(%field, "unique constraint rejected write");
        return RepoError::Duplicate(field);
    }
    RepoError::Db(e)
}

/// Users stored in the `users` table.
#[derive(Debug, Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(
        &self,
        ctx: &RequestContext,
        column: &str,
        value: &str,
    ) -> Result<Option<User>, RepoError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1");
        let row = ctx
            .run(
                sqlx::query_as::<_, UserRow>(&sql)
                    .bind(value)
                    .fetch_optional(&self.pool),
            )
            .await??;
        Ok(row.map(user_from_row))
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_email(
        &self,
        ctx: &RequestContext,
        email: &str,
    ) -> Result<Option<User>, RepoError> {
        self.find_one(ctx, "email", email).await
    }

    async fn find_by_username(
        &self,
        ctx: &RequestContext,
        username: &str,
    ) -> Result<Option<User>, RepoError> {
        self.find_one(ctx, "username", username).await
    }

    async fn find_by_id(&self, ctx: &RequestContext, id: i64) -> Result<Option<User>, RepoError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = ctx
            .run(
                sqlx::query_as::<_, UserRow>(&sql)
                    .bind(id)
                    .fetch_optional(&self.pool),
            )
            .await??;
        Ok(row.map(user_from_row))
    }

    async fn create(&self, ctx: &RequestContext, user: NewUser) -> Result<User, RepoError> {
        let sql = format!(
            "INSERT INTO users (username, email, password_hash, is_admin) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        );
        let row = ctx
            .run(
                sqlx::query_as::<_, UserRow>(&sql)
                    .bind(&user.username)
                    .bind(&user.email)
                    .bind(&user.password_hash)
                    .bind(user.is_admin)
                    .fetch_one(&self.pool),
            )
            .await?
            .map_err(map_write_error)?;
        Ok(user_from_row(row))
    }

    async fn update(&self, ctx: &RequestContext, user: &User) -> Result<(), RepoError> {
        let result = ctx
            .run(
                sqlx::query(
                    "UPDATE users SET username = $2, email = $3, password_hash = $4, \
                     is_admin = $5, last_login_at = $6 WHERE id = $1",
                )
                .bind(user.id)
                .bind(&user.username)
                .bind(&user.email)
                .bind(&user.password_hash)
                .bind(user.is_admin)
                .bind(user.last_login_at)
                .execute(&self.pool),
            )
            .await?
            .map_err(map_write_error)?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
