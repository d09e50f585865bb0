//! Own-profile endpoints for doctors and patients.
//!
//! `DELETE` on either profile removes the whole account.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{Extension, Json};

use crate::accounts;
use crate::api::endpoints::MessageResponse;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, CallerContext};
use crate::authorization::{require_caller, require_doctor, require_patient};
use crate::models::{DoctorPatch, DoctorProfile};
use crate::profiles::{self, PatientProfilePatch, PatientProfileView};

// ═══════════════════════════════════════════════════════════
// Doctor
// ═══════════════════════════════════════════════════════════

/// `GET /doctor/profile`
pub async fn doctor_profile(
    State(ctx): State<ApiContext>,
    Extension(CallerContext(caller)): Extension<CallerContext>,
) -> Result<Json<DoctorProfile>, ApiError> {
    let caller = require_caller(caller)?;
    let conn = ctx.core.open_db()?;
    Ok(Json(profiles::get_own_doctor_profile(&conn, &caller)?))
}

/// `PATCH /doctor/profile`
pub async fn update_doctor_profile(
    State(ctx): State<ApiContext>,
    Extension(CallerContext(caller)): Extension<CallerContext>,
    body: Result<Json<DoctorPatch>, JsonRejection>,
) -> Result<Json<DoctorProfile>, ApiError> {
    let caller = require_caller(caller)?;
    let Json(patch) = body?;
    let conn = ctx.core.open_db()?;
    Ok(Json(profiles::update_own_doctor_profile(&conn, &caller, patch)?))
}

/// `DELETE /doctor/profile`
pub async fn delete_doctor_account(
    State(ctx): State<ApiContext>,
    Extension(CallerContext(caller)): Extension<CallerContext>,
) -> Result<Json<MessageResponse>, ApiError> {
    let caller = require_caller(caller)?;
    require_doctor(&caller)?;
    let conn = ctx.core.open_db()?;
    accounts::delete_account(&conn, &caller, &caller.id())?;
    Ok(Json(MessageResponse {
        message: "Account and related data deleted",
    }))
}

// ═══════════════════════════════════════════════════════════
// Patient
// ═══════════════════════════════════════════════════════════

/// `GET /patient/profile`
pub async fn patient_profile(
    State(ctx): State<ApiContext>,
    Extension(CallerContext(caller)): Extension<CallerContext>,
) -> Result<Json<PatientProfileView>, ApiError> {
    let caller = require_caller(caller)?;
    let conn = ctx.core.open_db()?;
    Ok(Json(profiles::get_own_patient_profile(&conn, &caller)?))
}

/// `PATCH /patient/profile`
pub async fn update_patient_profile(
    State(ctx): State<ApiContext>,
    Extension(CallerContext(caller)): Extension<CallerContext>,
    body: Result<Json<PatientProfilePatch>, JsonRejection>,
) -> Result<Json<PatientProfileView>, ApiError> {
    let caller = require_caller(caller)?;
    let Json(patch) = body?;
    let conn = ctx.core.open_db()?;
    Ok(Json(profiles::update_own_patient_profile(&conn, &caller, patch)?))
}

/// `DELETE /patient/profile`
pub async fn delete_patient_account(
    State(ctx): State<ApiContext>,
    Extension(CallerContext(caller)): Extension<CallerContext>,
) -> Result<Json<MessageResponse>, ApiError> {
    let caller = require_caller(caller)?;
    require_patient(&caller)?;
    let conn = ctx.core.open_db()?;
    accounts::delete_account(&conn, &caller, &caller.id())?;
    Ok(Json(MessageResponse {
        message: "Account and related data deleted",
    }))
}
