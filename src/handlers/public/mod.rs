// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Note reads, registration and login, plus service metadata.

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

pub mod notes; // GET /notes, GET /notes/:id
pub mod users; // POST /users, POST /users/auth

pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "AnnyNotes API",
            "version": version,
            "endpoints": {
                "notes": "GET /notes[?author=], GET /notes/:id (public)",
                "notes_write": "POST /notes, PUT|PATCH|DELETE /notes/:id (bearer token, owner only)",
                "users": "POST /users (register), POST /users/auth (login)",
                "me": "GET /users/me (bearer token)",
            }
        }
    }))
}

pub async fn health(State(state): State<AppState>) -> ApiResult<Value> {
    if let Err(e) = state.storage.health_check().await {
        tracing::error!("Health check failed: {}", e);
        return Err(ApiError::service_unavailable("database unavailable"));
    }

    Ok(ApiResponse::success(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
        "database": "ok"
    })))
}
