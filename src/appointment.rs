//! Appointment lifecycle: book, list, update and cancel.
//!
//! States run `Scheduled → Completed | Cancelled`. There is no slot
//! model, so overlapping bookings and past dates are accepted.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::authorization::{is_party, require_doctor_profile, require_patient, Caller};
use crate::db::repository;
use crate::db::sqlite::is_storable_timestamp;
use crate::error::ServiceError;
use crate::models::{
    Appointment, AppointmentListItem, AppointmentScope, AppointmentStatus, PageRequest, Pagination,
    Role,
};

/// Page size when the client does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

// ─── Types ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    pub doctor_id: Option<i64>,
    pub date_time: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentListQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub search: Option<String>,
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentPatch {
    pub status: Option<AppointmentStatus>,
    pub date_time: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentPage {
    pub appointments: Vec<AppointmentListItem>,
    pub pagination: Pagination,
}

fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}

fn check_date_time(date_time: DateTime<Utc>) -> Result<DateTime<Utc>, ServiceError> {
    if is_storable_timestamp(&date_time) {
        Ok(date_time)
    } else {
        Err(ServiceError::validation("dateTime must fall between years 0000 and 9999"))
    }
}

fn load(conn: &Connection, id: i64) -> Result<Appointment, ServiceError> {
    repository::get_appointment(conn, id)?
        .ok_or_else(|| ServiceError::not_found("Appointment not found"))
}

// ─── Operations ───────────────────────────────────────────────────────────────

/// Book an appointment for the calling patient.
pub fn create_appointment(
    conn: &Connection,
    caller: &Caller,
    request: CreateAppointmentRequest,
) -> Result<Appointment, ServiceError> {
    require_patient(caller)?;
    let doctor_id = request
        .doctor_id
        .ok_or_else(|| ServiceError::validation("doctorId is required"))?;
    let date_time = request
        .date_time
        .ok_or_else(|| ServiceError::validation("dateTime is required"))?;
    let date_time = check_date_time(date_time)?;

    if repository::get_doctor(conn, doctor_id)?.is_none() {
        return Err(ServiceError::not_found("Doctor not found"));
    }

    let notes = normalize_notes(request.notes);
    let appointment =
        repository::insert_appointment(conn, &caller.id(), doctor_id, &date_time, notes.as_deref())?;
    tracing::info!(
        appointment_id = appointment.id,
        doctor_id,
        patient_id = %caller.id(),
        "Appointment booked"
    );
    Ok(appointment)
}

/// Appointments visible to the caller: their own as a patient, their
/// assigned ones as a doctor. Admins have no appointment view.
pub fn list_appointments(
    conn: &Connection,
    caller: &Caller,
    query: AppointmentListQuery,
) -> Result<AppointmentPage, ServiceError> {
    let scope = match caller.role() {
        Role::Patient => AppointmentScope::Patient(caller.id()),
        Role::Doctor => AppointmentScope::Doctor(require_doctor_profile(caller)?),
        Role::Admin => {
            return Err(ServiceError::forbidden(
                "Appointments are listed for patients and doctors only",
            ))
        }
    };

    let page = PageRequest::normalized(query.page, query.page_size, DEFAULT_PAGE_SIZE);
    let (appointments, total) =
        repository::list_appointments(conn, scope, query.search.as_deref(), &page)?;
    Ok(AppointmentPage {
        appointments,
        pagination: page.meta(total),
    })
}

/// Apply a partial update as the owning patient.
///
/// Status changes follow the state machine; a terminal appointment
/// cannot be rescheduled.
pub fn update_appointment(
    conn: &Connection,
    caller: &Caller,
    id: i64,
    patch: AppointmentPatch,
) -> Result<Appointment, ServiceError> {
    require_patient(caller)?;
    let mut appointment = load(conn, id)?;
    if appointment.user_id != caller.id() {
        return Err(ServiceError::forbidden("Not your appointment"));
    }

    if let Some(date_time) = patch.date_time {
        if appointment.status.is_terminal() {
            return Err(ServiceError::validation(format!(
                "A {} appointment cannot be rescheduled",
                appointment.status
            )));
        }
        appointment.date_time = check_date_time(date_time)?;
    }

    if let Some(next) = patch.status {
        if !appointment.status.can_transition_to(next) {
            return Err(ServiceError::validation(format!(
                "Cannot change status from {} to {next}",
                appointment.status
            )));
        }
        appointment.status = next;
    }

    if patch.notes.is_some() {
        appointment.notes = normalize_notes(patch.notes);
    }

    repository::update_appointment(conn, &appointment)?;
    tracing::info!(appointment_id = id, status = %appointment.status, "Appointment updated");
    Ok(appointment)
}

/// Hard-delete an appointment with its record and thread, as either party.
pub fn cancel_appointment(conn: &Connection, caller: &Caller, id: i64) -> Result<(), ServiceError> {
    let appointment = load(conn, id)?;
    if !is_party(caller, &appointment.user_id, appointment.doctor_id) {
        return Err(ServiceError::forbidden("Not your appointment"));
    }

    let tx = conn.unchecked_transaction()?;
    if !repository::delete_appointment_cascade(&tx, id)? {
        return Err(ServiceError::not_found("Appointment not found"));
    }
    repository::insert_audit_entry(
        &tx,
        Some(&caller.id()),
        "appointment.cancel",
        &format!("appointment:{id}"),
    )?;
    tx.commit()?;

    tracing::info!(appointment_id = id, actor = %caller.id(), "Appointment cancelled");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::{get_appointment, insert_doctor, insert_user, list_audit_entries};
    use crate::db::sqlite::open_memory_database;
    use crate::models::{NewDoctor, User};
    use chrono::Duration;
    use uuid::Uuid;

    fn account(conn: &Connection, name: &str, role: Role) -> Caller {
        let user = User {
            id: Uuid::new_v4(),
            name: name.into(),
            email: format!("{}@example.com", name.to_lowercase()),
            password_hash: "x".into(),
            role,
            created_at: Utc::now(),
        };
        insert_user(conn, &user).unwrap();
        let doctor_id = if role == Role::Doctor {
            Some(
                insert_doctor(
                    conn,
                    &NewDoctor {
                        user_id: Some(user.id),
                        name: format!("Dr {name}"),
                        specialization: "General".into(),
                        city: "Jaipur".into(),
                        ..Default::default()
                    },
                )
                .unwrap()
                .id,
            )
        } else {
            None
        };
        Caller { user, doctor_id }
    }

    fn book(conn: &Connection, patient: &Caller, doctor: &Caller, at: DateTime<Utc>) -> Appointment {
        create_appointment(
            conn,
            patient,
            CreateAppointmentRequest {
                doctor_id: doctor.doctor_id,
                date_time: Some(at),
                notes: Some("checkup".into()),
            },
        )
        .unwrap()
    }

    #[test]
    fn patient_books_scheduled_appointment() {
        let conn = open_memory_database().unwrap();
        let patient = account(&conn, "Anu", Role::Patient);
        let doctor = account(&conn, "Roy", Role::Doctor);
        let appt = book(&conn, &patient, &doctor, Utc::now() + Duration::days(1));
        assert_eq!(appt.status, AppointmentStatus::Scheduled);
        assert_eq!(appt.user_id, patient.id());
    }

    #[test]
    fn past_date_time_is_accepted() {
        let conn = open_memory_database().unwrap();
        let patient = account(&conn, "Anu", Role::Patient);
        let doctor = account(&conn, "Roy", Role::Doctor);
        let appt = book(&conn, &patient, &doctor, Utc::now() - Duration::days(30));
        assert!(appt.date_time < Utc::now());
    }

    #[test]
    fn unstorable_year_is_rejected_and_listing_survives() {
        use chrono::TimeZone;

        let conn = open_memory_database().unwrap();
        let patient = account(&conn, "Anu", Role::Patient);
        let doctor = account(&conn, "Roy", Role::Doctor);
        let far = Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();

        let err = create_appointment(
            &conn,
            &patient,
            CreateAppointmentRequest {
                doctor_id: doctor.doctor_id,
                date_time: Some(far),
                notes: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let appt = book(&conn, &patient, &doctor, Utc::now());
        let err = update_appointment(
            &conn,
            &patient,
            appt.id,
            AppointmentPatch {
                date_time: Some(far),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let view = list_appointments(&conn, &patient, AppointmentListQuery::default()).unwrap();
        assert_eq!(view.pagination.total_count, 1);
        let view = list_appointments(&conn, &doctor, AppointmentListQuery::default()).unwrap();
        assert_eq!(view.appointments[0].date_time, appt.date_time);
    }

    #[test]
    fn create_requires_patient_and_fields() {
        let conn = open_memory_database().unwrap();
        let doctor = account(&conn, "Roy", Role::Doctor);
        let patient = account(&conn, "Anu", Role::Patient);

        let err = create_appointment(&conn, &doctor, CreateAppointmentRequest::default()).unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let err = create_appointment(&conn, &patient, CreateAppointmentRequest::default()).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = create_appointment(
            &conn,
            &patient,
            CreateAppointmentRequest {
                doctor_id: Some(999),
                date_time: Some(Utc::now()),
                notes: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn listing_is_scoped_to_caller() {
        let conn = open_memory_database().unwrap();
        let alice = account(&conn, "Alice", Role::Patient);
        let bob = account(&conn, "Bob", Role::Patient);
        let roy = account(&conn, "Roy", Role::Doctor);
        let sen = account(&conn, "Sen", Role::Doctor);
        let a = book(&conn, &alice, &roy, Utc::now());
        book(&conn, &bob, &sen, Utc::now());

        let alice_view = list_appointments(&conn, &alice, AppointmentListQuery::default()).unwrap();
        assert_eq!(alice_view.pagination.total_count, 1);
        assert_eq!(alice_view.appointments[0].id, a.id);

        let bob_view = list_appointments(&conn, &bob, AppointmentListQuery::default()).unwrap();
        assert!(bob_view.appointments.iter().all(|item| item.id != a.id));

        let roy_view = list_appointments(&conn, &roy, AppointmentListQuery::default()).unwrap();
        assert!(roy_view.appointments.iter().all(|item| Some(item.doctor_id) == roy.doctor_id));
        assert_eq!(roy_view.pagination.page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn admin_cannot_list() {
        let conn = open_memory_database().unwrap();
        let admin = account(&conn, "Root", Role::Admin);
        let err = list_appointments(&conn, &admin, AppointmentListQuery::default()).unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[test]
    fn update_follows_state_machine() {
        let conn = open_memory_database().unwrap();
        let patient = account(&conn, "Anu", Role::Patient);
        let doctor = account(&conn, "Roy", Role::Doctor);
        let appt = book(&conn, &patient, &doctor, Utc::now());

        let done = update_appointment(
            &conn,
            &patient,
            appt.id,
            AppointmentPatch {
                status: Some(AppointmentStatus::Completed),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(done.status, AppointmentStatus::Completed);

        let err = update_appointment(
            &conn,
            &patient,
            appt.id,
            AppointmentPatch {
                status: Some(AppointmentStatus::Scheduled),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = update_appointment(
            &conn,
            &patient,
            appt.id,
            AppointmentPatch {
                date_time: Some(Utc::now() + Duration::days(3)),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let same = update_appointment(
            &conn,
            &patient,
            appt.id,
            AppointmentPatch {
                status: Some(AppointmentStatus::Completed),
                notes: Some("all good".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(same.notes.as_deref(), Some("all good"));
    }

    #[test]
    fn update_checks_existence_before_ownership() {
        let conn = open_memory_database().unwrap();
        let owner = account(&conn, "Anu", Role::Patient);
        let other = account(&conn, "Bob", Role::Patient);
        let doctor = account(&conn, "Roy", Role::Doctor);
        let appt = book(&conn, &owner, &doctor, Utc::now());

        let err = update_appointment(&conn, &other, 999, AppointmentPatch::default()).unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        let err = update_appointment(&conn, &other, appt.id, AppointmentPatch::default()).unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
        let err = update_appointment(&conn, &doctor, appt.id, AppointmentPatch::default()).unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[test]
    fn cancel_twice_is_not_found() {
        let conn = open_memory_database().unwrap();
        let patient = account(&conn, "Anu", Role::Patient);
        let doctor = account(&conn, "Roy", Role::Doctor);
        let appt = book(&conn, &patient, &doctor, Utc::now());

        cancel_appointment(&conn, &doctor, appt.id).unwrap();
        assert!(get_appointment(&conn, appt.id).unwrap().is_none());
        let err = cancel_appointment(&conn, &patient, appt.id).unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let audit = list_audit_entries(&conn, 10).unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].action, "appointment.cancel");
        assert_eq!(audit[0].actor_id, Some(doctor.id()));
    }

    #[test]
    fn stranger_cannot_cancel() {
        let conn = open_memory_database().unwrap();
        let patient = account(&conn, "Anu", Role::Patient);
        let doctor = account(&conn, "Roy", Role::Doctor);
        let other_doctor = account(&conn, "Sen", Role::Doctor);
        let appt = book(&conn, &patient, &doctor, Utc::now());

        let err = cancel_appointment(&conn, &other_doctor, appt.id).unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
        assert!(get_appointment(&conn, appt.id).unwrap().is_some());
    }
}
