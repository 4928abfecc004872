//! Hello endpoint — bootstrap health check.

use axum::Json;
use axum::extract::State;

use crate::AppState;
use crate::models::HelloResponse;

/// `GET /api/hello` — reports the crate version and the runtime mode.
pub async fn hello_world(State(state): State<AppState>) -> Json<HelloResponse> {
    Json(HelloResponse {
        greeting: format!("Hello from quillpad_core v{}", quillpad_core::version()),
        mode: state.provider.mode().to_string(),
    })
}
