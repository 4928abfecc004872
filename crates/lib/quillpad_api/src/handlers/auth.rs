//! Authentication request handlers.

use axum::extract::State;
use axum::{Extension, Json};
use quillpad_core::models::auth::PublicUser;
use quillpad_core::runtime::RuntimeMode;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{LoginRequest, RefreshRequest, RegisterRequest, TokenResponse};

/// Minimum accepted password length.
const MIN_PASSWORD_LEN: usize = 8;

/// `POST /auth/register` — create a new user account.
pub async fn register_handler(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<Json<TokenResponse>> {
    let username = body.username.trim();
    let email = body.email.trim();
    if username.is_empty() {
        return Err(AppError::Validation("Username is required".into()));
    }
    validate_email(email)?;
    if body.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let ctx = state.request_context();
    let (user, tokens) = state
        .provider
        .register(&ctx, username, email, &body.password)
        .await?;
    Ok(Json(TokenResponse::new(&user, tokens)))
}

/// `POST /auth/login` — authenticate with email + password.
pub async fn login_handler(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let email = body.email.trim();
    if state.provider.mode() == RuntimeMode::Online {
        validate_email(email)?;
        if body.password.is_empty() {
            return Err(AppError::Validation("Password is required".into()));
        }
    }

    let ctx = state.request_context();
    let (user, tokens) = state.provider.login(&ctx, email, &body.password).await?;
    Ok(Json(TokenResponse::new(&user, tokens)))
}

/// `POST /auth/refresh` — exchange a refresh token for a new token pair.
pub async fn refresh_handler(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> AppResult<Json<TokenResponse>> {
    let ctx = state.request_context();
    let (user, tokens) = state.provider.refresh(&ctx, &body.refresh_token).await?;
    Ok(Json(TokenResponse::new(&user, tokens)))
}

/// `GET /auth/me` — the user behind the bearer token.
pub async fn me_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(claims)): Extension<AuthenticatedUser>,
) -> AppResult<Json<PublicUser>> {
    let user_id = claims
        .user_id()
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired token".into()))?;
    let ctx = state.request_context();
    let user = state.provider.current_user(&ctx, user_id).await?;
    Ok(Json(user.public()))
}

fn validate_email(email: &str) -> AppResult<()> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(AppError::Validation("A valid email is required".into())),
    }
}
