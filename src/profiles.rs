//! Doctor and patient profiles, and the public doctor directory.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::authorization::{require_admin, require_doctor, require_patient, Caller};
use crate::db::repository;
use crate::error::ServiceError;
use crate::models::{
    DoctorFilter, DoctorPatch, DoctorProfile, DoctorSort, NewDoctor, PageRequest, Pagination,
    PatientProfile, SortOrder,
};

/// Directory page size when the client does not ask for one.
pub const DEFAULT_DIRECTORY_PAGE_SIZE: u32 = 6;

// ─── Types ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorListQuery {
    pub search: Option<String>,
    pub city: Option<String>,
    pub sort_by: Option<DoctorSort>,
    pub sort_order: Option<SortOrder>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorPage {
    pub doctors: Vec<DoctorProfile>,
    pub pagination: Pagination,
}

/// Admin form for a directory-only doctor.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDoctorRequest {
    pub name: Option<String>,
    pub specialization: Option<String>,
    pub qualification: Option<String>,
    pub experience_years: Option<i64>,
    pub city: Option<String>,
    pub consultation_fee: Option<i64>,
    pub profile_photo: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientProfilePatch {
    pub name: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<String>,
}

/// Patient profile merged with the account's name and email.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PatientProfileView {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    /// `None` until the first profile upsert.
    pub profile: Option<PatientProfile>,
}

fn required(value: Option<String>, field: &str) -> Result<String, ServiceError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ServiceError::validation(format!("{field} is required")))
}

fn check_patch(patch: &DoctorPatch) -> Result<(), ServiceError> {
    for (field, value) in [("name", &patch.name), ("specialization", &patch.specialization), ("city", &patch.city)] {
        if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
            return Err(ServiceError::validation(format!("{field} must not be empty")));
        }
    }
    if patch.experience_years.is_some_and(|v| v < 0) || patch.consultation_fee.is_some_and(|v| v < 0) {
        return Err(ServiceError::validation(
            "experienceYears and consultationFee must not be negative",
        ));
    }
    Ok(())
}

// ─── Doctor profile (self) ────────────────────────────────────────────────────

pub fn get_own_doctor_profile(conn: &Connection, caller: &Caller) -> Result<DoctorProfile, ServiceError> {
    require_doctor(caller)?;
    repository::get_doctor_by_user(conn, &caller.id())?
        .ok_or_else(|| ServiceError::not_found("Doctor profile not found"))
}

/// Partial update of the caller's own doctor profile. The display name
/// follows the account and is not editable here.
pub fn update_own_doctor_profile(
    conn: &Connection,
    caller: &Caller,
    mut patch: DoctorPatch,
) -> Result<DoctorProfile, ServiceError> {
    require_doctor(caller)?;
    let doctor_id = caller
        .doctor_id
        .ok_or_else(|| ServiceError::not_found("Doctor profile not found"))?;
    patch.name = None;
    check_patch(&patch)?;
    let profile = repository::update_doctor(conn, doctor_id, &patch)?;
    tracing::info!(doctor_id, "Doctor profile updated");
    Ok(profile)
}

// ─── Patient profile (self) ───────────────────────────────────────────────────

pub fn get_own_patient_profile(conn: &Connection, caller: &Caller) -> Result<PatientProfileView, ServiceError> {
    require_patient(caller)?;
    let profile = repository::get_patient_by_user(conn, &caller.id())?;
    Ok(PatientProfileView {
        user_id: caller.id(),
        name: caller.user.name.clone(),
        email: caller.user.email.clone(),
        profile,
    })
}

/// Rename the account and upsert age/gender in one transaction.
pub fn update_own_patient_profile(
    conn: &Connection,
    caller: &Caller,
    patch: PatientProfilePatch,
) -> Result<PatientProfileView, ServiceError> {
    require_patient(caller)?;
    if patch.age.is_some_and(|age| !(0..=150).contains(&age)) {
        return Err(ServiceError::validation("age must be between 0 and 150"));
    }
    let name = match patch.name {
        Some(name) => Some(required(Some(name), "name")?),
        None => None,
    };
    let gender = patch
        .gender
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty());

    let tx = conn.unchecked_transaction()?;
    if let Some(name) = &name {
        repository::update_user_name(&tx, &caller.id(), name)?;
    }
    let profile = repository::upsert_patient(&tx, &caller.id(), patch.age, gender.as_deref())?;
    tx.commit()?;

    tracing::info!(user_id = %caller.id(), "Patient profile updated");
    Ok(PatientProfileView {
        user_id: caller.id(),
        name: name.unwrap_or_else(|| caller.user.name.clone()),
        email: caller.user.email.clone(),
        profile: Some(profile),
    })
}

// ─── Directory ────────────────────────────────────────────────────────────────

/// Public, filtered listing of doctors.
pub fn list_doctors(conn: &Connection, query: DoctorListQuery) -> Result<DoctorPage, ServiceError> {
    let filter = DoctorFilter {
        search: query.search.map(|s| s.trim().to_string()),
        city: query.city.map(|c| c.trim().to_string()),
        sort_by: query.sort_by.unwrap_or_default(),
        sort_order: query.sort_order.unwrap_or_default(),
    };
    let page = PageRequest::normalized(query.page, query.page_size, DEFAULT_DIRECTORY_PAGE_SIZE);
    let (doctors, total) = repository::list_doctors(conn, &filter, &page)?;
    Ok(DoctorPage {
        doctors,
        pagination: page.meta(total),
    })
}

pub fn get_doctor(conn: &Connection, id: i64) -> Result<DoctorProfile, ServiceError> {
    repository::get_doctor(conn, id)?.ok_or_else(|| ServiceError::not_found("Doctor not found"))
}

/// Admin: add an unlinked doctor to the directory.
pub fn create_doctor(
    conn: &Connection,
    caller: &Caller,
    request: CreateDoctorRequest,
) -> Result<DoctorProfile, ServiceError> {
    require_admin(caller)?;
    let doctor = NewDoctor {
        user_id: None,
        name: required(request.name, "name")?,
        specialization: required(request.specialization, "specialization")?,
        qualification: request.qualification,
        experience_years: request.experience_years.unwrap_or(0),
        city: required(request.city, "city")?,
        consultation_fee: request.consultation_fee.unwrap_or(0),
        profile_photo: request.profile_photo,
    };
    if doctor.experience_years < 0 || doctor.consultation_fee < 0 {
        return Err(ServiceError::validation(
            "experienceYears and consultationFee must not be negative",
        ));
    }
    let profile = repository::insert_doctor(conn, &doctor)?;
    tracing::info!(doctor_id = profile.id, actor = %caller.id(), "Directory doctor created");
    Ok(profile)
}

/// Admin: partial update of any directory entry.
pub fn update_doctor(
    conn: &Connection,
    caller: &Caller,
    id: i64,
    patch: DoctorPatch,
) -> Result<DoctorProfile, ServiceError> {
    require_admin(caller)?;
    get_doctor(conn, id)?;
    check_patch(&patch)?;
    let profile = repository::update_doctor(conn, id, &patch)?;
    tracing::info!(doctor_id = id, actor = %caller.id(), "Directory doctor updated");
    Ok(profile)
}

/// Admin: remove a directory entry with its appointments, records and threads.
pub fn delete_doctor(conn: &Connection, caller: &Caller, id: i64) -> Result<(), ServiceError> {
    require_admin(caller)?;
    get_doctor(conn, id)?;

    let tx = conn.unchecked_transaction()?;
    repository::delete_doctor_cascade(&tx, id)?;
    repository::insert_audit_entry(&tx, Some(&caller.id()), "doctor.delete", &format!("doctor:{id}"))?;
    tx.commit()?;

    tracing::info!(doctor_id = id, actor = %caller.id(), "Directory doctor deleted");
    Ok(())
}
