//! Doctor directory endpoints.
//!
//! Reads are public; mutations are admin-only.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use crate::api::endpoints::MessageResponse;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, CallerContext};
use crate::authorization::require_caller;
use crate::models::{DoctorPatch, DoctorProfile};
use crate::profiles::{self, CreateDoctorRequest, DoctorListQuery, DoctorPage};

/// `GET /doctors` — search, filter, sort and paginate the directory.
pub async fn list(
    State(ctx): State<ApiContext>,
    query: Result<Query<DoctorListQuery>, QueryRejection>,
) -> Result<Json<DoctorPage>, ApiError> {
    let Query(query) = query?;
    let conn = ctx.core.open_db()?;
    Ok(Json(profiles::list_doctors(&conn, query)?))
}

/// `GET /doctors/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<DoctorProfile>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(profiles::get_doctor(&conn, id)?))
}

/// `POST /doctors`
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(CallerContext(caller)): Extension<CallerContext>,
    body: Result<Json<CreateDoctorRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DoctorProfile>), ApiError> {
    let caller = require_caller(caller)?;
    let Json(request) = body?;
    let conn = ctx.core.open_db()?;
    let created = profiles::create_doctor(&conn, &caller, request)?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PUT /doctors/:id`
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(CallerContext(caller)): Extension<CallerContext>,
    Path(id): Path<i64>,
    body: Result<Json<DoctorPatch>, JsonRejection>,
) -> Result<Json<DoctorProfile>, ApiError> {
    let caller = require_caller(caller)?;
    let Json(patch) = body?;
    let conn = ctx.core.open_db()?;
    Ok(Json(profiles::update_doctor(&conn, &caller, id, patch)?))
}

/// `DELETE /doctors/:id` — removes the doctor with their appointments and records.
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(CallerContext(caller)): Extension<CallerContext>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let caller = require_caller(caller)?;
    let conn = ctx.core.open_db()?;
    profiles::delete_doctor(&conn, &caller, id)?;
    Ok(Json(MessageResponse {
        message: "Doctor deleted successfully",
    }))
}
