//! Shared types for the HTTP API layer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::HeaderMap;

use crate::authorization::Caller;
use crate::core_state::CoreState;

/// Name of the session cookie set at login.
pub const SESSION_COOKIE: &str = "token";

/// Cookies that may carry a session token, in priority order.
pub const SESSION_COOKIE_ALLOW_LIST: [&str; 2] = [SESSION_COOKIE, "medbridge.session-token"];

/// Login attempts allowed per email per minute.
pub const LOGIN_ATTEMPTS_PER_MINUTE: u32 = 10;

// ═══════════════════════════════════════════════════════════
// API context — shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes and middleware.
/// Wraps `CoreState` plus the login rate limiter.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
    pub login_limiter: Arc<Mutex<RateLimiter>>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self {
            core,
            login_limiter: Arc::new(Mutex::new(RateLimiter::new(LOGIN_ATTEMPTS_PER_MINUTE))),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Caller context — injected by the auth middleware
// ═══════════════════════════════════════════════════════════

/// Resolved caller, injected into request extensions by the auth
/// middleware. `None` when no valid session was presented.
#[derive(Debug, Clone, Default)]
pub struct CallerContext(pub Option<Caller>);

// ═══════════════════════════════════════════════════════════
// Session transport — bearer header and cookies
// ═══════════════════════════════════════════════════════════

/// Collect candidate session tokens: the bearer token first, then
/// allow-listed cookies in allow-list order.
pub fn candidate_tokens(headers: &HeaderMap) -> Vec<String> {
    let mut candidates = Vec::new();

    if let Some(token) = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        candidates.push(token.to_string());
    }

    let cookies: Vec<(&str, &str)> = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .collect();

    for name in SESSION_COOKIE_ALLOW_LIST {
        for (cookie_name, value) in &cookies {
            if *cookie_name == name && !value.is_empty() {
                candidates.push(value.to_string());
            }
        }
    }

    candidates
}

/// `Set-Cookie` value delivering a session token.
pub fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{SESSION_COOKIE}={token}; HttpOnly; SameSite=Strict; Path=/; Max-Age={max_age_secs}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that clears the session cookie.
pub fn clear_session_cookie(secure: bool) -> String {
    session_cookie("", 0, secure)
}

// ═══════════════════════════════════════════════════════════
// Rate limiter — per-key sliding window
// ═══════════════════════════════════════════════════════════

/// Per-key rate limiter over a one-minute sliding window.
pub struct RateLimiter {
    windows: HashMap<String, Vec<Instant>>,
    per_minute: u32,
}

impl RateLimiter {
    pub fn new(per_minute: u32) -> Self {
        Self {
            windows: HashMap::new(),
            per_minute,
        }
    }

    /// Record an attempt for `key`. Returns `Ok(())` or
    /// `Err(retry_after_secs)` if the window is full.
    pub fn check(&mut self, key: &str) -> Result<(), u64> {
        let now = Instant::now();
        let window = Duration::from_secs(60);

        if self.windows.len() > 10_000 {
            self.windows
                .retain(|_, entries| entries.iter().any(|ts| now.duration_since(*ts) < window));
        }

        let entries = self.windows.entry(key.to_string()).or_default();
        entries.retain(|ts| now.duration_since(*ts) < window);

        if entries.len() as u32 >= self.per_minute {
            let retry_after = entries
                .first()
                .map(|oldest| window.saturating_sub(now.duration_since(*oldest)).as_secs().max(1))
                .unwrap_or(60);
            return Err(retry_after);
        }

        entries.push(now);
        Ok(())
    }
}
