//! Integration tests — build the router over in-process providers and drive
//! the auth endpoints with `oneshot`.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use quillpad_api::{AppState, config::ApiConfig};
use quillpad_core::auth::jwt::JwtTokenManager;
use quillpad_core::auth::memory::MemoryUserRepository;
use quillpad_core::auth::provider::{AuthProvider, LocalAuth};
use quillpad_core::auth::service::AuthService;
use quillpad_core::runtime::RuntimeFlags;
use quillpad_core::settings::Settings;
use serde_json::{Value, json};
use tower::ServiceExt;

fn online_app() -> Router {
    online_app_with("10m", ApiConfig::default())
}

fn online_app_with(access_ttl: &str, config: ApiConfig) -> Router {
    let settings = Settings::from_pairs([
        ("QUILLPAD_JWT_SECRET", "integration-secret"),
        ("QUILLPAD_ACCESS_TTL", access_ttl),
    ]);
    let flags = RuntimeFlags::resolve(&settings);
    let jwt = Arc::new(JwtTokenManager::new(&settings.token_config(), &flags).expect("jwt"));
    let provider = AuthProvider::Online(AuthService::new(
        Arc::new(MemoryUserRepository::new()),
        jwt.clone(),
        jwt,
    ));
    quillpad_api::router(AppState { provider, config })
}

fn local_app() -> Router {
    let settings = Settings::from_pairs([("QUILLPAD_MODE", "local")]);
    let flags = RuntimeFlags::resolve(&settings);
    let jwt = Arc::new(JwtTokenManager::new(&settings.token_config(), &flags).expect("jwt"));
    let local = flags.local.as_ref().expect("local runtime");
    quillpad_api::router(AppState {
        provider: AuthProvider::Local(LocalAuth::new(local, jwt.clone(), jwt)),
        config: ApiConfig::default(),
    })
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.expect("request");
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).expect("parse JSON")
    };
    (status, json)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_with_token(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn register_login_and_me() {
    let app = online_app();

    let (status, json) = send(
        &app,
        post_json(
            "/auth/register",
            json!({"username": "alice", "email": "alice@x.com", "password": "Secret123!"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["user"]["username"], "alice");
    assert_eq!(json["user"]["email"], "alice@x.com");
    assert_eq!(json["expiresIn"], 600);
    assert_eq!(json["tokenType"], "Bearer");
    assert!(json["user"].get("passwordHash").is_none());

    let (status, json) = send(
        &app,
        post_json(
            "/auth/login",
            json!({"email": "alice@x.com", "password": "Secret123!"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["user"]["lastLoginAt"].is_string());
    let access = json["accessToken"].as_str().expect("access token").to_string();
    let refresh = json["refreshToken"].as_str().expect("refresh token").to_string();

    let (status, json) = send(&app, get_with_token("/auth/me", &access)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["username"], "alice");

    let (status, json) = send(
        &app,
        post_json("/auth/refresh", json!({"refreshToken": refresh})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["user"]["username"], "alice");
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let app = online_app();
    let body = json!({"username": "alice", "email": "alice@x.com", "password": "Secret123!"});
    let (status, _) = send(&app, post_json("/auth/register", body)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(
        &app,
        post_json(
            "/auth/register",
            json!({"username": "alice2", "email": "alice@x.com", "password": "Secret123!"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "conflict");
}

#[tokio::test]
async fn bad_credentials_are_indistinguishable() {
    let app = online_app();
    let body = json!({"username": "alice", "email": "alice@x.com", "password": "Secret123!"});
    send(&app, post_json("/auth/register", body)).await;

    let (s1, j1) = send(
        &app,
        post_json(
            "/auth/login",
            json!({"email": "nobody@x.com", "password": "Secret123!"}),
        ),
    )
    .await;
    let (s2, j2) = send(
        &app,
        post_json(
            "/auth/login",
            json!({"email": "alice@x.com", "password": "wrong-password"}),
        ),
    )
    .await;
    assert_eq!(s1, StatusCode::UNAUTHORIZED);
    assert_eq!(s2, StatusCode::UNAUTHORIZED);
    assert_eq!(j1, j2);
}

#[tokio::test]
async fn short_password_is_rejected() {
    let app = online_app();
    let (status, json) = send(
        &app,
        post_json(
            "/auth/register",
            json!({"username": "alice", "email": "alice@x.com", "password": "short"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "validation_error");
}

#[tokio::test]
async fn me_requires_bearer_token() {
    let app = online_app();
    let req = Request::builder()
        .uri("/auth/me")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, get_with_token("/auth/me", "not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn local_mode_serves_fixed_identity() {
    let app = local_app();

    let req = Request::builder()
        .uri("/api/hello")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["mode"], "local");

    let (status, json) = send(&app, post_json("/auth/login", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["user"]["id"], 1);
    assert_eq!(json["user"]["username"], "离线用户");
    assert_eq!(json["user"]["isAdmin"], true);
    let access = json["accessToken"].as_str().expect("access token").to_string();

    let (status, json) = send(&app, get_with_token("/auth/me", &access)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], 1);

    let (status, _) = send(
        &app,
        post_json(
            "/auth/register",
            json!({"username": "bob", "email": "bob@x.com", "password": "Secret123!"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn oversized_settings_still_issue_usable_tokens() {
    let config = ApiConfig {
        request_timeout: Duration::MAX,
        ..ApiConfig::default()
    };
    let app = online_app_with("300000000000years", config);

    let (status, json) = send(
        &app,
        post_json(
            "/auth/register",
            json!({"username": "carol", "email": "carol@x.com", "password": "Secret123!"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["expiresIn"], 15 * 60);

    let access = json["accessToken"].as_str().expect("access token");
    let (status, json) = send(&app, get_with_token("/auth/me", access)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["username"], "carol");
}
