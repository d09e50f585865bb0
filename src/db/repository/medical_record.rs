use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::sqlite::{enum_column, timestamp_column, timestamp_to_sql, uuid_column};
use crate::db::DatabaseError;
use crate::models::{AuthorRole, FollowUp, MedicalRecord, RecordStatus};

const RECORD_COLUMNS: &str =
    "id, appointment_id, doctor_id, patient_id, problem, prescription, status, created_at";

fn record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MedicalRecord> {
    Ok(MedicalRecord {
        id: row.get(0)?,
        appointment_id: row.get(1)?,
        doctor_id: row.get(2)?,
        patient_id: uuid_column(row, 3)?,
        problem: row.get(4)?,
        prescription: row.get(5)?,
        status: enum_column(row, 6)?,
        created_at: timestamp_column(row, 7)?,
    })
}

/// Open a record for an appointment. The UNIQUE index on `appointment_id`
/// rejects a second record for the same appointment.
pub fn insert_medical_record(
    conn: &Connection,
    appointment_id: i64,
    doctor_id: i64,
    patient_id: &Uuid,
    problem: &str,
    prescription: &str,
) -> Result<MedicalRecord, DatabaseError> {
    conn.execute(
        "INSERT INTO medical_records
            (appointment_id, doctor_id, patient_id, problem, prescription, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            appointment_id,
            doctor_id,
            patient_id.to_string(),
            problem,
            prescription,
            RecordStatus::Open.as_str(),
            timestamp_to_sql(&Utc::now()),
        ],
    )?;
    let id = conn.last_insert_rowid();
    get_medical_record(conn, id)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "MedicalRecord".into(),
        id: id.to_string(),
    })
}

pub fn get_medical_record(conn: &Connection, id: i64) -> Result<Option<MedicalRecord>, DatabaseError> {
    let record = conn
        .query_row(
            &format!("SELECT {RECORD_COLUMNS} FROM medical_records WHERE id = ?1"),
            params![id],
            record_from_row,
        )
        .optional()?;
    Ok(record)
}

pub fn get_record_for_appointment(
    conn: &Connection,
    appointment_id: i64,
) -> Result<Option<MedicalRecord>, DatabaseError> {
    let record = conn
        .query_row(
            &format!("SELECT {RECORD_COLUMNS} FROM medical_records WHERE appointment_id = ?1"),
            params![appointment_id],
            record_from_row,
        )
        .optional()?;
    Ok(record)
}

/// Persist problem, prescription and status.
pub fn update_medical_record(conn: &Connection, record: &MedicalRecord) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE medical_records SET problem = ?1, prescription = ?2, status = ?3 WHERE id = ?4",
        params![record.problem, record.prescription, record.status.as_str(), record.id],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "MedicalRecord".into(),
            id: record.id.to_string(),
        });
    }
    Ok(())
}

pub fn insert_follow_up(
    conn: &Connection,
    medical_record_id: i64,
    author_id: &Uuid,
    author_role: AuthorRole,
    message: &str,
) -> Result<FollowUp, DatabaseError> {
    let created_at = timestamp_to_sql(&Utc::now());
    conn.execute(
        "INSERT INTO follow_ups (medical_record_id, author_id, author_role, message, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            medical_record_id,
            author_id.to_string(),
            author_role.as_str(),
            message,
            created_at,
        ],
    )?;
    let id = conn.last_insert_rowid();
    let follow_up = conn.query_row(
        "SELECT id, medical_record_id, author_id, author_role, message, created_at
         FROM follow_ups WHERE id = ?1",
        params![id],
        follow_up_from_row,
    )?;
    Ok(follow_up)
}

fn follow_up_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<FollowUp> {
    Ok(FollowUp {
        id: row.get(0)?,
        medical_record_id: row.get(1)?,
        author_id: uuid_column(row, 2)?,
        author_role: enum_column(row, 3)?,
        message: row.get(4)?,
        created_at: timestamp_column(row, 5)?,
    })
}

/// Thread for a record, oldest first. Ties on timestamp fall back to insertion order.
pub fn list_follow_ups(conn: &Connection, medical_record_id: i64) -> Result<Vec<FollowUp>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, medical_record_id, author_id, author_role, message, created_at
         FROM follow_ups WHERE medical_record_id = ?1
         ORDER BY created_at ASC, id ASC",
    )?;
    let rows = stmt
        .query_map(params![medical_record_id], follow_up_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::{insert_appointment, insert_doctor, insert_user};
    use crate::db::sqlite::open_memory_database;
    use crate::models::{NewDoctor, Role, User};

    fn seeded() -> (Connection, Uuid, i64, i64) {
        let conn = open_memory_database().unwrap();
        let patient = User {
            id: Uuid::new_v4(),
            name: "Nina".into(),
            email: "nina@example.com".into(),
            password_hash: "x".into(),
            role: Role::Patient,
            created_at: Utc::now(),
        };
        insert_user(&conn, &patient).unwrap();
        let doctor = insert_doctor(
            &conn,
            &NewDoctor {
                name: "Dr Das".into(),
                specialization: "ENT".into(),
                city: "Kolkata".into(),
                ..Default::default()
            },
        )
        .unwrap();
        let appt = insert_appointment(&conn, &patient.id, doctor.id, &Utc::now(), None).unwrap();
        (conn, patient.id, doctor.id, appt.id)
    }

    #[test]
    fn record_opens_and_links_to_appointment() {
        let (conn, patient, doctor, appt) = seeded();
        let record = insert_medical_record(&conn, appt, doctor, &patient, "sore throat", "rest").unwrap();
        assert_eq!(record.status, RecordStatus::Open);
        assert_eq!(get_record_for_appointment(&conn, appt).unwrap().unwrap().id, record.id);
    }

    #[test]
    fn second_record_for_appointment_is_rejected() {
        let (conn, patient, doctor, appt) = seeded();
        insert_medical_record(&conn, appt, doctor, &patient, "a", "b").unwrap();
        let err = insert_medical_record(&conn, appt, doctor, &patient, "c", "d").unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[test]
    fn update_closes_record() {
        let (conn, patient, doctor, appt) = seeded();
        let mut record = insert_medical_record(&conn, appt, doctor, &patient, "a", "b").unwrap();
        record.status = RecordStatus::Closed;
        record.prescription = "antibiotics".into();
        update_medical_record(&conn, &record).unwrap();
        let stored = get_medical_record(&conn, record.id).unwrap().unwrap();
        assert_eq!(stored.status, RecordStatus::Closed);
        assert_eq!(stored.prescription, "antibiotics");
    }

    #[test]
    fn follow_ups_list_in_insertion_order() {
        let (conn, patient, doctor, appt) = seeded();
        let record = insert_medical_record(&conn, appt, doctor, &patient, "a", "b").unwrap();
        for message in ["first", "second", "third"] {
            insert_follow_up(&conn, record.id, &patient, AuthorRole::Patient, message).unwrap();
        }
        let thread = list_follow_ups(&conn, record.id).unwrap();
        let messages: Vec<&str> = thread.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second", "third"]);
        assert!(thread.iter().all(|f| f.author_role == AuthorRole::Patient));
    }
}
