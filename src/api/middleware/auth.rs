//! Session resolution middleware.
//!
//! Collects the bearer token and allow-listed session cookies, resolves
//! the caller, and injects `CallerContext` into request extensions.
//! Never rejects: handlers decide whether a caller is required.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::{candidate_tokens, ApiContext, CallerContext};
use crate::authorization::resolve_caller;

/// Resolve the session carried by the request, if any.
///
/// Accesses `ApiContext` from request extensions (injected by Extension layer).
pub async fn resolve_session(req: Request<axum::body::Body>, next: Next) -> Response {
    match resolve_session_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn resolve_session_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let candidates = candidate_tokens(req.headers());

    // Connection is dropped before .await
    let caller = if candidates.is_empty() {
        None
    } else {
        match ctx.core.open_db() {
            Ok(conn) => resolve_caller(
                &conn,
                &ctx.core.tokens,
                candidates.iter().map(String::as_str),
            ),
            Err(e) => {
                tracing::warn!(error = %e, "Session resolution skipped: database unavailable");
                None
            }
        }
    };

    req.extensions_mut().insert(CallerContext(caller));
    Ok(next.run(req).await)
}
