// handlers/system.rs - service info, health and reference data

use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};

use crate::actions::ActionResult;
use crate::app::AppState;
use crate::filter::{ALL_SPORTS, SPORT_TYPES};

pub async fn root() -> Json<Value> {
    Json(json!({
        "data": {
            "name": "Sports Events API",
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {
                "auth": "/auth/sign-up, /auth/sign-in, /auth/sign-out, /auth/me, /auth/verify, /auth/resend-verification",
                "events": "/api/events[/:id], /api/events/mine",
                "venues": "/api/venues[/:id], /api/venues/search?q=",
                "sports": "/api/sports",
            }
        },
        "error": null
    }))
}

/// GET /health - 200 when the backend answers, 503 otherwise
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let now = chrono::Utc::now();

    match state.backend.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "data": { "status": "ok", "timestamp": now, "database": "ok" },
                "error": null
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "data": null, "error": "database unavailable" })),
            )
        }
    }
}

/// GET /api/sports - filter choices, "All Sports" first
pub async fn sports() -> ActionResult<Vec<&'static str>> {
    let mut sports = Vec::with_capacity(SPORT_TYPES.len() + 1);
    sports.push(ALL_SPORTS);
    sports.extend_from_slice(SPORT_TYPES);
    ActionResult::Success(sports)
}
