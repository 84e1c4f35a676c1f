use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::error::failure_response;

/// Service banner. Carries no `success` flag, so it is always sent in clear.
pub async fn index() -> Response {
    Json(sonic_rs::json!({
        "message": "Task Manager API is running!",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "auth": "/api/auth",
            "users": "/api/users",
            "tasks": "/api/tasks"
        }
    }))
    .into_response()
}

pub async fn not_found() -> Response {
    failure_response(StatusCode::NOT_FOUND, "Route not found")
}
