//! Audit logging middleware.
//!
//! Logs every API request with caller id, method, path, and
//! response status. Runs innermost (after the session resolver has
//! injected `CallerContext`).

use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::api::types::CallerContext;

/// Log API access for the audit trail.
pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();

    let caller_id = req
        .extensions()
        .get::<CallerContext>()
        .and_then(|c| c.0.as_ref())
        .map(|caller| caller.id().to_string())
        .unwrap_or_else(|| "anonymous".to_string());

    let response = next.run(req).await;

    let status = response.status().as_u16();
    tracing::info!(%method, %path, status, caller = %caller_id, "API access");

    response
}
