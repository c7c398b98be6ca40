// handlers/public/mod.rs - Public handlers (no session required)
//
// Security Level: None
// Middleware: None

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::{json, Value};

use crate::app::SharedState;

/// GET / - Landing document with the route map
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Copytrade Portal",
            "version": version,
            "description": "Copy-trading portal backend",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "dashboard": "/dashboard (signed-in, redirects to / otherwise)",
                "admin": "/admin (admin, redirects to / otherwise)",
                "me": "/api/me (signed-in)",
                "upload": "/api/upload (signed-in, multipart: file, folder)",
                "claims": "/api/admin/claim (POST grant, DELETE revoke; admin or service key)",
            }
        }
    }))
}

/// GET /health - Liveness plus identity provider reachability
pub async fn health(State(state): State<SharedState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.identity.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "identity": state.identity.name(),
                    "media": state.media.name(),
                }
            })),
        ),
        Err(e) => {
            tracing::warn!("Identity health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "identity provider unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "identity": state.identity.name(),
                    }
                })),
            )
        }
    }
}
