//! Medical records and their follow-up threads.
//!
//! One record per appointment, written by the attending doctor. Both
//! parties of the appointment read the record and post to its thread.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::authorization::{is_owning_doctor, is_party, require_doctor, require_doctor_profile, Caller};
use crate::db::repository;
use crate::error::ServiceError;
use crate::models::{AuthorRole, FollowUp, MedicalRecord, RecordStatus, Role};

// ─── Types ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecordRequest {
    pub appointment_id: Option<i64>,
    /// Optional cross-check against the appointment's patient.
    pub patient_id: Option<Uuid>,
    pub problem: Option<String>,
    pub prescription: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPatch {
    pub problem: Option<String>,
    pub prescription: Option<String>,
    pub status: Option<RecordStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FollowUpRequest {
    #[serde(default)]
    pub message: String,
}

/// A record with its thread, oldest message first.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDetail {
    #[serde(flatten)]
    pub record: MedicalRecord,
    pub follow_ups: Vec<FollowUp>,
}

fn load(conn: &Connection, id: i64) -> Result<MedicalRecord, ServiceError> {
    repository::get_medical_record(conn, id)?
        .ok_or_else(|| ServiceError::not_found("Medical record not found"))
}

// ─── Operations ───────────────────────────────────────────────────────────────

/// Open the record for an appointment as its doctor.
pub fn create_record(
    conn: &Connection,
    caller: &Caller,
    request: CreateRecordRequest,
) -> Result<MedicalRecord, ServiceError> {
    let doctor_id = require_doctor_profile(caller)?;
    let appointment_id = request
        .appointment_id
        .ok_or_else(|| ServiceError::validation("appointmentId is required"))?;

    let appointment = repository::get_appointment(conn, appointment_id)?
        .ok_or_else(|| ServiceError::not_found("Appointment not found"))?;
    if appointment.doctor_id != doctor_id {
        return Err(ServiceError::forbidden("Not your appointment"));
    }
    if let Some(patient_id) = request.patient_id {
        if patient_id != appointment.user_id {
            return Err(ServiceError::validation(
                "patientId does not match the appointment's patient",
            ));
        }
    }
    if repository::get_record_for_appointment(conn, appointment_id)?.is_some() {
        return Err(ServiceError::validation(
            "A medical record already exists for this appointment",
        ));
    }

    let record = repository::insert_medical_record(
        conn,
        appointment_id,
        doctor_id,
        &appointment.user_id,
        request.problem.as_deref().unwrap_or_default(),
        request.prescription.as_deref().unwrap_or_default(),
    )
    .map_err(|e| {
        if e.is_unique_violation() {
            ServiceError::validation("A medical record already exists for this appointment")
        } else {
            ServiceError::from(e)
        }
    })?;

    tracing::info!(record_id = record.id, appointment_id, "Medical record created");
    Ok(record)
}

/// Partial update by the owning doctor. `CLOSED` is terminal.
pub fn update_record(
    conn: &Connection,
    caller: &Caller,
    id: i64,
    patch: RecordPatch,
) -> Result<MedicalRecord, ServiceError> {
    require_doctor(caller)?;
    let mut record = load(conn, id)?;
    if !is_owning_doctor(caller, record.doctor_id) {
        return Err(ServiceError::forbidden("Only the attending doctor may edit this record"));
    }

    if let Some(next) = patch.status {
        if !record.status.can_transition_to(next) {
            return Err(ServiceError::validation(format!(
                "Cannot change record status from {} to {next}",
                record.status
            )));
        }
        record.status = next;
    }
    if let Some(problem) = patch.problem {
        record.problem = problem;
    }
    if let Some(prescription) = patch.prescription {
        record.prescription = prescription;
    }

    repository::update_medical_record(conn, &record)?;
    tracing::info!(record_id = id, status = %record.status, "Medical record updated");
    Ok(record)
}

/// Record plus thread, for either party.
pub fn get_record(conn: &Connection, caller: &Caller, id: i64) -> Result<RecordDetail, ServiceError> {
    let record = load(conn, id)?;
    if !is_party(caller, &record.patient_id, record.doctor_id) {
        return Err(ServiceError::forbidden("Not your medical record"));
    }
    let follow_ups = repository::list_follow_ups(conn, id)?;
    Ok(RecordDetail { record, follow_ups })
}

/// Append to the thread. The author role comes from the caller, never the client.
pub fn post_follow_up(
    conn: &Connection,
    caller: &Caller,
    record_id: i64,
    message: &str,
) -> Result<FollowUp, ServiceError> {
    let message = message.trim();
    if message.is_empty() {
        return Err(ServiceError::validation("message must not be empty"));
    }

    let record = load(conn, record_id)?;
    if !is_party(caller, &record.patient_id, record.doctor_id) {
        return Err(ServiceError::forbidden("Not your medical record"));
    }
    let author_role = match caller.role() {
        Role::Doctor => AuthorRole::Doctor,
        _ => AuthorRole::Patient,
    };

    let follow_up = repository::insert_follow_up(conn, record_id, &caller.id(), author_role, message)?;
    tracing::debug!(record_id, author_role = %author_role, "Follow-up posted");
    Ok(follow_up)
}

/// Delete a record and its thread, as the owning doctor or an admin.
pub fn delete_record(conn: &Connection, caller: &Caller, id: i64) -> Result<(), ServiceError> {
    let record = load(conn, id)?;
    if !(is_owning_doctor(caller, record.doctor_id) || caller.role() == Role::Admin) {
        return Err(ServiceError::forbidden("Only the attending doctor or an admin may delete this record"));
    }

    let tx = conn.unchecked_transaction()?;
    if !repository::delete_record_cascade(&tx, id)? {
        return Err(ServiceError::not_found("Medical record not found"));
    }
    repository::insert_audit_entry(&tx, Some(&caller.id()), "record.delete", &format!("medical_record:{id}"))?;
    tx.commit()?;

    tracing::info!(record_id = id, actor = %caller.id(), "Medical record deleted");
    Ok(())
}
