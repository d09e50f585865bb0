//! Account endpoints: signup, login, session introspection, logout.
//!
//! `POST /auth/login` is the only route behind the login rate limiter.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::StatusCode;
use axum::response::{AppendHeaders, IntoResponse};
use axum::{Extension, Json};
use serde::Serialize;

use crate::accounts::{self, LoginOutcome, LoginRequest, SignupRequest, SignupResponse};
use crate::api::error::ApiError;
use crate::api::types::{clear_session_cookie, session_cookie, ApiContext, CallerContext};
use crate::models::UserSummary;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub redirect_url: &'static str,
    pub token: String,
    pub expires_in: i64,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

/// `POST /auth/signup` — create a patient or doctor account.
pub async fn signup(
    State(ctx): State<ApiContext>,
    body: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError> {
    let Json(request) = body?;
    let core = ctx.core.clone();
    // PBKDF2 and rusqlite block; keep them off the async workers
    let created = tokio::task::spawn_blocking(move || -> Result<SignupResponse, ApiError> {
        let conn = core.open_db()?;
        Ok(accounts::signup(&conn, request, core.password_iterations)?)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Signup task failed: {e}")))??;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `POST /auth/login` — check credentials, return a token and set the session cookie.
pub async fn login(
    State(ctx): State<ApiContext>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body?;
    let core = ctx.core.clone();
    let outcome = tokio::task::spawn_blocking(move || -> Result<LoginOutcome, ApiError> {
        let conn = core.open_db()?;
        Ok(accounts::login(
            &conn,
            &core.tokens,
            &request.email,
            &request.password,
            core.password_iterations,
        )?)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Login task failed: {e}")))??;

    let ttl = ctx.core.tokens.ttl_secs();
    let cookie = session_cookie(&outcome.token, ttl, ctx.core.production);
    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(LoginResponse {
            redirect_url: accounts::redirect_url(outcome.user.role),
            token: outcome.token,
            expires_in: ttl,
        }),
    ))
}

/// `GET /auth/me` — who is calling. Never fails on a bad session.
pub async fn me(Extension(CallerContext(caller)): Extension<CallerContext>) -> Json<MeResponse> {
    let user = caller.as_ref().map(|c| UserSummary::from(&c.user));
    Json(MeResponse {
        authenticated: user.is_some(),
        user,
    })
}

/// `POST /auth/logout` — clear the session cookie.
pub async fn logout(State(ctx): State<ApiContext>) -> impl IntoResponse {
    (
        AppendHeaders([(SET_COOKIE, clear_session_cookie(ctx.core.production))]),
        Json(LogoutResponse { success: true }),
    )
}
