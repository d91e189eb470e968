use std::time::Instant;

use axum::{
    body::Body,
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

pub static X_TRACE_ID: &str = "x-trace-id";

/// Wrap each request in a span carrying a trace id.
///
/// A valid UUID in the inbound `x-trace-id` header is reused; otherwise a
/// fresh one is generated. The id is echoed on the response. Bodies are
/// never logged since chat content is sensitive.
pub async fn trace_middleware(mut req: Request<Body>, next: Next) -> Response {
    let start_time = Instant::now();

    let trace_id = req
        .headers()
        .get(X_TRACE_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    let span = info_span!(
        "http_request",
        trace_id = %trace_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    async move {
        info!("→ request started");
        let header = HeaderValue::from_str(&trace_id.to_string());
        if let Ok(value) = &header {
            req.headers_mut().insert(X_TRACE_ID, value.clone());
        }

        let mut response = next.run(req).await;

        match header {
            Ok(value) => {
                response.headers_mut().insert(X_TRACE_ID, value);
            }
            Err(e) => warn!(error = %e, "trace id is not a valid header value"),
        }

        let status = response.status().as_u16();
        let latency_ms = start_time.elapsed().as_millis();
        if status >= 500 {
            warn!(status, latency_ms, "← response finished");
        } else {
            info!(status, latency_ms, "← response finished");
        }
        response
    }
    .instrument(span)
    .await
}
