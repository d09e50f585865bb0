//! HTTP API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//!
//! Middleware stack (outermost → innermost):
//! 1. Cache-Control: no-store → 2. Session resolver → 3. Audit logger
//!
//! `POST /auth/login` additionally runs the per-email rate limiter.

use std::sync::Arc;

use axum::http::header::CACHE_CONTROL;
use axum::http::HeaderValue;
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::error::ApiError;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the API router.
///
/// Middleware uses `Extension<ApiContext>` (injected outside the session layer).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn api_router(core: Arc<CoreState>) -> Router {
    build_router(ApiContext::new(core))
}

async fn route_not_found() -> ApiError {
    ApiError::NotFound("Route not found".into())
}

pub(crate) fn build_router(ctx: ApiContext) -> Router {
    use endpoints::{appointments, auth, doctors, health, medical_records, profiles, users};

    let login = post(auth::login).layer(axum::middleware::from_fn(middleware::rate::limit_login));

    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    Router::new()
        .route("/health", get(health::check))
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", login)
        .route("/auth/me", get(auth::me))
        .route("/auth/logout", post(auth::logout))
        .route("/appointments", get(appointments::list).post(appointments::create))
        .route(
            "/appointments/:id",
            put(appointments::update).delete(appointments::cancel),
        )
        .route("/doctor/appointments", get(appointments::list_for_doctor))
        .route(
            "/doctor/profile",
            get(profiles::doctor_profile)
                .patch(profiles::update_doctor_profile)
                .delete(profiles::delete_doctor_account),
        )
        .route(
            "/patient/profile",
            get(profiles::patient_profile)
                .patch(profiles::update_patient_profile)
                .delete(profiles::delete_patient_account),
        )
        .route("/doctors", get(doctors::list).post(doctors::create))
        .route(
            "/doctors/:id",
            get(doctors::detail).put(doctors::update).delete(doctors::delete),
        )
        .route("/medical-records", post(medical_records::create))
        .route(
            "/medical-records/:id",
            get(medical_records::detail)
                .patch(medical_records::update)
                .put(medical_records::update)
                .delete(medical_records::delete),
        )
        .route("/medical-records/:id/followups", post(medical_records::follow_up))
        .route("/users/:id", delete(users::delete))
        .fallback(route_not_found)
        .with_state(ctx.clone())
        // Middleware stack (innermost first, outermost last):
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::auth::resolve_session))
        // Extension must sit outside every middleware that extracts ApiContext
        .layer(axum::Extension(ctx))
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
}
