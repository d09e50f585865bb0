//! Appointment endpoints.
//!
//! - `GET /appointments` — the caller's appointments, paginated
//! - `POST /appointments` — book (patients)
//! - `PUT /appointments/:id` — partial update (owning patient)
//! - `DELETE /appointments/:id` — cancel (either party)
//! - `GET /doctor/appointments` — doctor-only view of the same list

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use crate::api::endpoints::MessageResponse;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, CallerContext};
use crate::appointment::{
    self, AppointmentListQuery, AppointmentPage, AppointmentPatch, CreateAppointmentRequest,
};
use crate::authorization::{require_caller, require_doctor_profile};
use crate::models::Appointment;

/// `GET /appointments`
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(CallerContext(caller)): Extension<CallerContext>,
    query: Result<Query<AppointmentListQuery>, QueryRejection>,
) -> Result<Json<AppointmentPage>, ApiError> {
    let caller = require_caller(caller)?;
    let Query(query) = query?;
    let conn = ctx.core.open_db()?;
    Ok(Json(appointment::list_appointments(&conn, &caller, query)?))
}

/// `GET /doctor/appointments`
pub async fn list_for_doctor(
    State(ctx): State<ApiContext>,
    Extension(CallerContext(caller)): Extension<CallerContext>,
    query: Result<Query<AppointmentListQuery>, QueryRejection>,
) -> Result<Json<AppointmentPage>, ApiError> {
    let caller = require_caller(caller)?;
    require_doctor_profile(&caller)?;
    let Query(query) = query?;
    let conn = ctx.core.open_db()?;
    Ok(Json(appointment::list_appointments(&conn, &caller, query)?))
}

/// `POST /appointments`
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(CallerContext(caller)): Extension<CallerContext>,
    body: Result<Json<CreateAppointmentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Appointment>), ApiError> {
    let caller = require_caller(caller)?;
    let Json(request) = body?;
    let conn = ctx.core.open_db()?;
    let created = appointment::create_appointment(&conn, &caller, request)?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PUT /appointments/:id`
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(CallerContext(caller)): Extension<CallerContext>,
    Path(id): Path<i64>,
    body: Result<Json<AppointmentPatch>, JsonRejection>,
) -> Result<Json<Appointment>, ApiError> {
    let caller = require_caller(caller)?;
    let Json(patch) = body?;
    let conn = ctx.core.open_db()?;
    Ok(Json(appointment::update_appointment(&conn, &caller, id, patch)?))
}

/// `DELETE /appointments/:id`
pub async fn cancel(
    State(ctx): State<ApiContext>,
    Extension(CallerContext(caller)): Extension<CallerContext>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let caller = require_caller(caller)?;
    let conn = ctx.core.open_db()?;
    appointment::cancel_appointment(&conn, &caller, id)?;
    Ok(Json(MessageResponse {
        message: "Appointment cancelled",
    }))
}
