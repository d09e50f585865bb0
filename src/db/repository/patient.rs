use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::sqlite::uuid_column;
use crate::db::DatabaseError;
use crate::models::PatientProfile;

pub fn get_patient_by_user(conn: &Connection, user_id: &Uuid) -> Result<Option<PatientProfile>, DatabaseError> {
    let patient = conn
        .query_row(
            "SELECT id, user_id, age, gender FROM patients WHERE user_id = ?1",
            params![user_id.to_string()],
            |row| {
                Ok(PatientProfile {
                    id: row.get(0)?,
                    user_id: uuid_column(row, 1)?,
                    age: row.get(2)?,
                    gender: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(patient)
}

/// Create the profile row if missing, otherwise overwrite the given fields.
pub fn upsert_patient(
    conn: &Connection,
    user_id: &Uuid,
    age: Option<i64>,
    gender: Option<&str>,
) -> Result<PatientProfile, DatabaseError> {
    conn.execute(
        "INSERT INTO patients (user_id, age, gender) VALUES (?1, ?2, ?3)
         ON CONFLICT(user_id) DO UPDATE SET
            age = COALESCE(excluded.age, patients.age),
            gender = COALESCE(excluded.gender, patients.gender)",
        params![user_id.to_string(), age, gender],
    )?;
    get_patient_by_user(conn, user_id)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "Patient".into(),
        id: user_id.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::insert_user;
    use crate::db::sqlite::open_memory_database;
    use crate::models::{Role, User};
    use chrono::Utc;

    fn patient_user(conn: &Connection) -> Uuid {
        let user = User {
            id: Uuid::new_v4(),
            name: "Ravi".into(),
            email: "ravi@example.com".into(),
            password_hash: "x".into(),
            role: Role::Patient,
            created_at: Utc::now(),
        };
        insert_user(conn, &user).unwrap();
        user.id
    }

    #[test]
    fn upsert_creates_then_merges() {
        let conn = open_memory_database().unwrap();
        let user_id = patient_user(&conn);
        assert!(get_patient_by_user(&conn, &user_id).unwrap().is_none());

        let created = upsert_patient(&conn, &user_id, None, None).unwrap();
        assert_eq!(created.age, None);

        let updated = upsert_patient(&conn, &user_id, Some(34), Some("female")).unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.age, Some(34));

        let kept = upsert_patient(&conn, &user_id, None, Some("other")).unwrap();
        assert_eq!(kept.age, Some(34));
        assert_eq!(kept.gender.as_deref(), Some("other"));
    }

    #[test]
    fn profile_requires_existing_user() {
        let conn = open_memory_database().unwrap();
        assert!(upsert_patient(&conn, &Uuid::new_v4(), None, None).is_err());
    }
}
