//! Dependent-row deletes.
//!
//! None of these open a transaction: callers run them inside
//! `Connection::unchecked_transaction` so a failed step rolls back the
//! whole cascade. Children are deleted before parents because foreign
//! keys stay enforced.

use rusqlite::{params, Connection};
use uuid::Uuid;

use super::appointment::{appointment_ids_for_doctor, appointment_ids_for_patient};
use crate::db::DatabaseError;

/// Delete a record and its follow-up thread. Returns `false` if no such record.
pub fn delete_record_cascade(conn: &Connection, record_id: i64) -> Result<bool, DatabaseError> {
    conn.execute(
        "DELETE FROM follow_ups WHERE medical_record_id = ?1",
        params![record_id],
    )?;
    let deleted = conn.execute("DELETE FROM medical_records WHERE id = ?1", params![record_id])?;
    Ok(deleted > 0)
}

/// Delete an appointment, its record and the record's follow-ups.
/// Returns `false` if no such appointment.
pub fn delete_appointment_cascade(conn: &Connection, appointment_id: i64) -> Result<bool, DatabaseError> {
    conn.execute(
        "DELETE FROM follow_ups WHERE medical_record_id IN
            (SELECT id FROM medical_records WHERE appointment_id = ?1)",
        params![appointment_id],
    )?;
    conn.execute(
        "DELETE FROM medical_records WHERE appointment_id = ?1",
        params![appointment_id],
    )?;
    let deleted = conn.execute("DELETE FROM appointments WHERE id = ?1", params![appointment_id])?;
    Ok(deleted > 0)
}

/// Delete a doctor profile with every appointment and record that references it.
pub fn delete_doctor_cascade(conn: &Connection, doctor_id: i64) -> Result<bool, DatabaseError> {
    for appointment_id in appointment_ids_for_doctor(conn, doctor_id)? {
        delete_appointment_cascade(conn, appointment_id)?;
    }
    let deleted = conn.execute("DELETE FROM doctors WHERE id = ?1", params![doctor_id])?;
    Ok(deleted > 0)
}

/// Delete a user account and everything it owns: its doctor or patient
/// profile, its appointments, their records and any follow-ups it authored.
pub fn delete_user_cascade(conn: &Connection, user_id: &Uuid) -> Result<bool, DatabaseError> {
    let user_key = user_id.to_string();

    let doctor_ids: Vec<i64> = {
        let mut stmt = conn.prepare("SELECT id FROM doctors WHERE user_id = ?1")?;
        let ids = stmt
            .query_map(params![user_key], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        ids
    };
    for doctor_id in doctor_ids {
        delete_doctor_cascade(conn, doctor_id)?;
    }

    for appointment_id in appointment_ids_for_patient(conn, user_id)? {
        delete_appointment_cascade(conn, appointment_id)?;
    }

    conn.execute(
        "DELETE FROM follow_ups WHERE medical_record_id IN
            (SELECT id FROM medical_records WHERE patient_id = ?1)",
        params![user_key],
    )?;
    conn.execute("DELETE FROM medical_records WHERE patient_id = ?1", params![user_key])?;
    conn.execute("DELETE FROM follow_ups WHERE author_id = ?1", params![user_key])?;
    conn.execute("DELETE FROM patients WHERE user_id = ?1", params![user_key])?;
    let deleted = conn.execute("DELETE FROM users WHERE id = ?1", params![user_key])?;
    Ok(deleted > 0)
}
