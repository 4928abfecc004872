//! # quillpad_api
//!
//! HTTP API library for Quillpad.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;

use axum::Router;
use axum::routing::{get, post};
use quillpad_core::auth::provider::AuthProvider;
use quillpad_core::context::RequestContext;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ApiConfig;
use crate::handlers::{auth, hello};

/// Route paths.
pub mod routes {
    pub const GET_API_HELLO: &str = "/api/hello";
    pub const POST_AUTH_REGISTER: &str = "/auth/register";
    pub const POST_AUTH_LOGIN: &str = "/auth/login";
    pub const POST_AUTH_REFRESH: &str = "/auth/refresh";
    pub const GET_AUTH_ME: &str = "/auth/me";
}

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Mode-specific authentication provider.
    pub provider: AuthProvider,
    /// API configuration.
    pub config: ApiConfig,
}

impl AppState {
    /// Fresh context for one request, bounded by the configured timeout.
    pub fn request_context(&self) -> RequestContext {
        RequestContext::background().with_timeout(self.config.request_timeout)
    }
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public = Router::new()
        .route(routes::GET_API_HELLO, get(hello::hello_world))
        .route(routes::POST_AUTH_REGISTER, post(auth::register_handler))
        .route(routes::POST_AUTH_LOGIN, post(auth::login_handler))
        .route(routes::POST_AUTH_REFRESH, post(auth::refresh_handler));

    // Protected routes (require auth)
    let protected = Router::new()
        .route(routes::GET_AUTH_ME, get(auth::me_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(cors)
        .with_state(state)
}
