//! Per-email login rate limiting middleware.
//!
//! Applies a one-minute sliding window keyed by the normalized email in
//! the login body. Bodies without a readable email share one
//! "anonymous" bucket.

use axum::body::Body;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::accounts::normalize_email;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;

/// Login bodies larger than this are refused before parsing.
const MAX_LOGIN_BODY_BYTES: usize = 16 * 1024;

/// Extract a rate-limit key from a buffered login body.
fn rate_key(body: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("email").and_then(|e| e.as_str()).map(normalize_email))
        .filter(|email| !email.is_empty())
        .map(|email| format!("email:{email}"))
        .unwrap_or_else(|| "anonymous".to_string())
}

/// Per-email rate limiting for login. Returns 429 if exceeded.
/// Accesses `ApiContext` from request extensions.
pub async fn limit_login(req: Request<Body>, next: Next) -> Response {
    match limit_login_inner(req, next).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn limit_login_inner(req: Request<Body>, next: Next) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let (parts, body) = req.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_LOGIN_BODY_BYTES)
        .await
        .map_err(|_| ApiError::BadRequest("Request body too large".into()))?;

    let key = rate_key(&bytes);

    // MutexGuard is !Send — must drop before .await via block scope
    {
        let mut limiter = ctx
            .login_limiter
            .lock()
            .map_err(|_| ApiError::Internal("rate limiter lock".into()))?;

        if let Err(retry_after) = limiter.check(&key) {
            tracing::warn!(key = %key, retry_after, "Login rate limit exceeded");
            return Err(ApiError::RateLimited { retry_after });
        }
    }

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}
