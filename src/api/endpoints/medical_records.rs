//! Medical record and follow-up endpoints.
//!
//! - `POST /medical-records` — attending doctor opens the record
//! - `GET /medical-records/:id` — record with its thread (either party)
//! - `PATCH|PUT /medical-records/:id` — attending doctor edits
//! - `DELETE /medical-records/:id` — attending doctor or admin
//! - `POST /medical-records/:id/followups` — either party posts

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use crate::api::endpoints::MessageResponse;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, CallerContext};
use crate::authorization::require_caller;
use crate::medical_record::{self, CreateRecordRequest, FollowUpRequest, RecordDetail, RecordPatch};
use crate::models::{FollowUp, MedicalRecord};

/// `POST /medical-records`
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(CallerContext(caller)): Extension<CallerContext>,
    body: Result<Json<CreateRecordRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MedicalRecord>), ApiError> {
    let caller = require_caller(caller)?;
    let Json(request) = body?;
    let conn = ctx.core.open_db()?;
    let record = medical_record::create_record(&conn, &caller, request)?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// `GET /medical-records/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Extension(CallerContext(caller)): Extension<CallerContext>,
    Path(id): Path<i64>,
) -> Result<Json<RecordDetail>, ApiError> {
    let caller = require_caller(caller)?;
    let conn = ctx.core.open_db()?;
    Ok(Json(medical_record::get_record(&conn, &caller, id)?))
}

/// `PATCH /medical-records/:id` and `PUT /medical-records/:id`
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(CallerContext(caller)): Extension<CallerContext>,
    Path(id): Path<i64>,
    body: Result<Json<RecordPatch>, JsonRejection>,
) -> Result<Json<MedicalRecord>, ApiError> {
    let caller = require_caller(caller)?;
    let Json(patch) = body?;
    let conn = ctx.core.open_db()?;
    Ok(Json(medical_record::update_record(&conn, &caller, id, patch)?))
}

/// `DELETE /medical-records/:id`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(CallerContext(caller)): Extension<CallerContext>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let caller = require_caller(caller)?;
    let conn = ctx.core.open_db()?;
    medical_record::delete_record(&conn, &caller, id)?;
    Ok(Json(MessageResponse { message: "Deleted" }))
}

/// `POST /medical-records/:id/followups`
pub async fn follow_up(
    State(ctx): State<ApiContext>,
    Extension(CallerContext(caller)): Extension<CallerContext>,
    Path(id): Path<i64>,
    body: Result<Json<FollowUpRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<FollowUp>), ApiError> {
    let caller = require_caller(caller)?;
    let Json(request) = body?;
    let conn = ctx.core.open_db()?;
    let posted = medical_record::post_follow_up(&conn, &caller, id, &request.message)?;
    Ok((StatusCode::CREATED, Json(posted)))
}
