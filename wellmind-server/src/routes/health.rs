//! Health / heartbeat endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tracing::warn;
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_health))]
pub struct HealthApi;

/// Register health-check routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(get_health))
}

/// Heartbeat endpoint.
///
/// Always answers 200; `ai_status` reports whether a provider credential is
/// configured and `database` whether the store answered a ping.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Server is up", body = Value)
    )
)]
pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let database = match state.store.ping().await {
        Ok(()) => "connected",
        Err(e) => {
            warn!(error = %e, "health check could not reach the database");
            "unavailable"
        }
    };
    let ai_status = if state.pipeline.has_provider() { "active" } else { "inactive" };

    Json(json!({
        "status":    "healthy",
        "service":   "Elmed Wellmind Mental Health AI",
        "version":   env!("CARGO_PKG_VERSION"),
        "ai_status": ai_status,
        "database":  database,
    }))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use crate::routes::test::scripted;
    use crate::state::test_state;

    #[tokio::test]
    async fn health_reports_inactive_ai_without_provider() {
        let Json(body) = get_health(State(test_state(None).await)).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["ai_status"], "inactive");
        assert_eq!(body["database"], "connected");
        assert!(!body["version"].as_str().unwrap_or("").is_empty());
    }

    #[tokio::test]
    async fn health_reports_active_ai_and_unavailable_database() {
        let state = test_state(Some(scripted(None))).await;
        state.store.close().await;
        let Json(body) = get_health(State(state)).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["ai_status"], "active");
        assert_eq!(body["database"], "unavailable");
    }
}
