//! API module
//!
//! Contains the HTTP request handlers and the route table.

pub mod notes;
pub mod users;

use crate::state::AppState;
use axum::{http::StatusCode, response::Json, routing::get, Router};
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Serialize)]
struct HelloResponse {
    message: String,
    status: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    message: String,
}

/// Build the application router over `state`
///
/// Middleware (tracing, CORS, request ids) is layered on by the binary.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(hello_world))
        .route("/health", get(health_check))
        .route(
            "/notes",
            get(notes::list_notes)
                .post(notes::create_note)
                .patch(notes::update_note)
                .delete(notes::delete_note),
        )
        .route(
            "/users",
            get(users::list_users)
                .post(users::create_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        .fallback(not_found)
        .with_state(state)
}

async fn hello_world() -> Json<HelloResponse> {
    Json(HelloResponse {
        message: "Hello from the Notes Backend!".to_string(),
        status: "ok".to_string(),
    })
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        message: "Backend is healthy".to_string(),
    })
}

async fn not_found() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": "404 Not Found", "status": 404 })),
    )
}
