//! Axum router construction.
//!
//! [`build`] assembles the complete application router, including:
//! - Middleware layers (CORS, per-request trace-ID injection)
//! - Optional Swagger UI / OpenAPI document endpoint (disable with `WELLMIND_ENABLE_SWAGGER=false`)
//! - Health / heartbeat route
//! - chat, community and concern routes under `/api`

mod api;
pub mod doc;
mod health;

use std::sync::Arc;

use axum::{middleware, Router};
use tower::ServiceBuilder;
use utoipa_swagger_ui::SwaggerUi;

use crate::middleware::{cors, trace};
use crate::state::AppState;

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .merge(health::router())
        .nest("/api", api::router());

    // Enabled by default; disable in production to keep the API surface private.
    if state.config.enable_swagger {
        app = app.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", doc::get_docs()));
    }

    app
        // Outermost layers execute first on the way in.
        .layer(ServiceBuilder::new().layer(cors::cors_layer(&state)))
        .layer(middleware::from_fn(trace::trace_middleware))
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::middleware::trace::X_TRACE_ID;
    use crate::services::{CompletionProvider, ContextTurn};
    use crate::state::test_state;

    struct FixedReply(Option<String>);

    #[async_trait]
    impl CompletionProvider for FixedReply {
        async fn complete(&self, _message: &str, _context: &[ContextTurn]) -> Option<String> {
            self.0.clone()
        }
    }

    pub(crate) fn scripted(reply: Option<&str>) -> Arc<dyn CompletionProvider> {
        Arc::new(FixedReply(reply.map(str::to_owned)))
    }

    pub(crate) fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder().method(method).uri(uri);
        match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    /// Send `req` through a fresh router and decode the JSON body (`Null` when empty).
    pub(crate) async fn send(state: &Arc<AppState>, req: Request<Body>) -> (StatusCode, Value) {
        let response = build(Arc::clone(state)).oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, body)
    }

    #[tokio::test]
    async fn trace_id_is_echoed_or_generated() {
        let state = test_state(None).await;
        let id = "6f1c2a3e-8d4b-4c7a-9e21-0b5d3f7a9c10";

        let req = Request::builder().uri("/health").header(X_TRACE_ID, id).body(Body::empty()).unwrap();
        let response = build(Arc::clone(&state)).oneshot(req).await.unwrap();
        assert_eq!(response.headers()[X_TRACE_ID], id);

        let req = Request::builder().uri("/health").header(X_TRACE_ID, "not-a-uuid").body(Body::empty()).unwrap();
        let response = build(state).oneshot(req).await.unwrap();
        let generated = response.headers()[X_TRACE_ID].to_str().unwrap();
        assert_ne!(generated, "not-a-uuid");
        assert!(uuid::Uuid::parse_str(generated).is_ok());
    }

    #[tokio::test]
    async fn openapi_document_lists_routes() {
        let state = test_state(None).await;
        let (status, doc) = send(&state, request("GET", "/api-docs/openapi.json", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(doc["info"]["title"], "wellmind-server");
        for path in ["/health", "/api/chat", "/api/chat/history/{session_id}", "/api/posts/{id}/comments", "/api/concerns/{id}/respond"] {
            assert!(doc["paths"].get(path).is_some(), "missing {path}");
        }
    }

    #[tokio::test]
    async fn swagger_can_be_disabled() {
        let mut config = crate::config::Config::from_lookup(|_| None);
        config.enable_swagger = false;
        let base = test_state(None).await;
        let state = Arc::new(AppState { config: Arc::new(config), ..(*base).clone() });

        let (status, _) = send(&state, request("GET", "/api-docs/openapi.json", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_json_uses_error_body() {
        let state = test_state(None).await;
        let req = Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&state, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn cors_allow_list_is_applied() {
        let mut config = crate::config::Config::from_lookup(|_| None);
        config.cors_allowed_origins = Some("https://wellmind.example".into());
        let base = test_state(None).await;
        let state = Arc::new(AppState { config: Arc::new(config), ..(*base).clone() });

        let req = Request::builder()
            .uri("/health")
            .header("origin", "https://wellmind.example")
            .body(Body::empty())
            .unwrap();
        let response = build(state).oneshot(req).await.unwrap();
        assert_eq!(response.headers()["access-control-allow-origin"], "https://wellmind.example");
    }
}
