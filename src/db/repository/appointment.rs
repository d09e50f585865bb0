use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::sqlite::{enum_column, like_pattern, timestamp_column, timestamp_to_sql, uuid_column};
use crate::db::DatabaseError;
use crate::models::{
    Appointment, AppointmentDoctor, AppointmentListItem, AppointmentPatient, AppointmentScope,
    AppointmentStatus, PageRequest,
};

const APPOINTMENT_COLUMNS: &str = "id, user_id, doctor_id, date_time, status, notes, created_at";

fn appointment_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: row.get(0)?,
        user_id: uuid_column(row, 1)?,
        doctor_id: row.get(2)?,
        date_time: timestamp_column(row, 3)?,
        status: enum_column(row, 4)?,
        notes: row.get(5)?,
        created_at: timestamp_column(row, 6)?,
    })
}

/// Book a new appointment in the `Scheduled` state.
pub fn insert_appointment(
    conn: &Connection,
    user_id: &Uuid,
    doctor_id: i64,
    date_time: &DateTime<Utc>,
    notes: Option<&str>,
) -> Result<Appointment, DatabaseError> {
    let created_at = Utc::now();
    conn.execute(
        "INSERT INTO appointments (user_id, doctor_id, date_time, status, notes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            user_id.to_string(),
            doctor_id,
            timestamp_to_sql(date_time),
            AppointmentStatus::Scheduled.as_str(),
            notes,
            timestamp_to_sql(&created_at),
        ],
    )?;
    let id = conn.last_insert_rowid();
    get_appointment(conn, id)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "Appointment".into(),
        id: id.to_string(),
    })
}

pub fn get_appointment(conn: &Connection, id: i64) -> Result<Option<Appointment>, DatabaseError> {
    let appointment = conn
        .query_row(
            &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1"),
            params![id],
            appointment_from_row,
        )
        .optional()?;
    Ok(appointment)
}

/// Persist the mutable fields (date/time, status, notes).
pub fn update_appointment(conn: &Connection, appointment: &Appointment) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE appointments SET date_time = ?1, status = ?2, notes = ?3 WHERE id = ?4",
        params![
            timestamp_to_sql(&appointment.date_time),
            appointment.status.as_str(),
            appointment.notes,
            appointment.id,
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Appointment".into(),
            id: appointment.id.to_string(),
        });
    }
    Ok(())
}

/// Ids of every appointment touching a doctor profile.
pub fn appointment_ids_for_doctor(conn: &Connection, doctor_id: i64) -> Result<Vec<i64>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT id FROM appointments WHERE doctor_id = ?1")?;
    let ids = stmt
        .query_map(params![doctor_id], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

/// Ids of every appointment booked by a patient user.
pub fn appointment_ids_for_patient(conn: &Connection, user_id: &Uuid) -> Result<Vec<i64>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT id FROM appointments WHERE user_id = ?1")?;
    let ids = stmt
        .query_map(params![user_id.to_string()], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

fn list_item_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AppointmentListItem> {
    Ok(AppointmentListItem {
        id: row.get(0)?,
        date_time: timestamp_column(row, 1)?,
        status: enum_column(row, 2)?,
        notes: row.get(3)?,
        doctor_id: row.get(4)?,
        patient: AppointmentPatient {
            id: uuid_column(row, 5)?,
            name: row.get(6)?,
            email: row.get(7)?,
        },
        doctor: AppointmentDoctor {
            id: row.get(8)?,
            name: row.get(9)?,
            specialization: row.get(10)?,
        },
        medical_record_id: row.get(11)?,
    })
}

/// Page of appointments visible in `scope`, earliest first, plus the unpaged total.
///
/// `search` matches the notes or the counterpart's name: the doctor's
/// name for a patient scope, the patient's name for a doctor scope.
pub fn list_appointments(
    conn: &Connection,
    scope: AppointmentScope,
    search: Option<&str>,
    page: &PageRequest,
) -> Result<(Vec<AppointmentListItem>, i64), DatabaseError> {
    let (scope_sql, counterpart, scope_value) = match scope {
        AppointmentScope::Patient(user_id) => ("a.user_id = ?1", "d.name", Value::Text(user_id.to_string())),
        AppointmentScope::Doctor(doctor_id) => ("a.doctor_id = ?1", "u.name", Value::Integer(doctor_id)),
    };

    let mut values = vec![scope_value];
    let mut where_sql = format!("WHERE {scope_sql}");
    if let Some(needle) = search.map(str::trim).filter(|s| !s.is_empty()) {
        values.push(Value::Text(like_pattern(needle)));
        where_sql.push_str(&format!(
            "
             AND (fold_case(a.notes) LIKE ?2 ESCAPE '\\' OR fold_case({counterpart}) LIKE ?2 ESCAPE '\\')"
        ));
    }

    let from_sql = "FROM appointments a
         JOIN users u ON u.id = a.user_id
         JOIN doctors d ON d.id = a.doctor_id
         LEFT JOIN medical_records m ON m.appointment_id = a.id";

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) {from_sql} {where_sql}"),
        params_from_iter(values.iter()),
        |row| row.get(0),
    )?;

    let sql = format!(
        "SELECT a.id, a.date_time, a.status, a.notes, a.doctor_id,
                u.id, u.name, u.email, d.id, d.name, d.specialization, m.id
         {from_sql} {where_sql}
         ORDER BY a.date_time ASC, a.id ASC
         LIMIT {limit} OFFSET {offset}",
        limit = page.limit(),
        offset = page.offset(),
    );
    let mut stmt = conn.prepare(&sql)?;
    let items = stmt
        .query_map(params_from_iter(values.iter()), list_item_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok((items, total))
}
