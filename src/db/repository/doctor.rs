use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::sqlite::{like_pattern, optional_uuid_column, timestamp_column, timestamp_to_sql};
use crate::db::DatabaseError;
use crate::models::{DoctorFilter, DoctorPatch, DoctorProfile, DoctorSort, NewDoctor, PageRequest};

const DOCTOR_COLUMNS: &str = "id, user_id, name, specialization, qualification, experience_years,
     city, consultation_fee, profile_photo, created_at";

fn doctor_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DoctorProfile> {
    Ok(DoctorProfile {
        id: row.get(0)?,
        user_id: optional_uuid_column(row, 1)?,
        name: row.get(2)?,
        specialization: row.get(3)?,
        qualification: row.get(4)?,
        experience_years: row.get(5)?,
        city: row.get(6)?,
        consultation_fee: row.get(7)?,
        profile_photo: row.get(8)?,
        created_at: timestamp_column(row, 9)?,
    })
}

pub fn insert_doctor(conn: &Connection, doctor: &NewDoctor) -> Result<DoctorProfile, DatabaseError> {
    let created_at = Utc::now();
    conn.execute(
        "INSERT INTO doctors (user_id, name, specialization, qualification, experience_years,
         city, consultation_fee, profile_photo, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            doctor.user_id.map(|id| id.to_string()),
            doctor.name,
            doctor.specialization,
            doctor.qualification,
            doctor.experience_years,
            doctor.city,
            doctor.consultation_fee,
            doctor.profile_photo,
            timestamp_to_sql(&created_at),
        ],
    )?;
    let id = conn.last_insert_rowid();
    get_doctor(conn, id)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "Doctor".into(),
        id: id.to_string(),
    })
}

pub fn get_doctor(conn: &Connection, id: i64) -> Result<Option<DoctorProfile>, DatabaseError> {
    let doctor = conn
        .query_row(
            &format!("SELECT {DOCTOR_COLUMNS} FROM doctors WHERE id = ?1"),
            params![id],
            doctor_from_row,
        )
        .optional()?;
    Ok(doctor)
}

pub fn get_doctor_by_user(conn: &Connection, user_id: &Uuid) -> Result<Option<DoctorProfile>, DatabaseError> {
    let doctor = conn
        .query_row(
            &format!("SELECT {DOCTOR_COLUMNS} FROM doctors WHERE user_id = ?1"),
            params![user_id.to_string()],
            doctor_from_row,
        )
        .optional()?;
    Ok(doctor)
}

/// Id of the doctor profile linked to a user, if any.
pub fn doctor_id_for_user(conn: &Connection, user_id: &Uuid) -> Result<Option<i64>, DatabaseError> {
    let id = conn
        .query_row(
            "SELECT id FROM doctors WHERE user_id = ?1",
            params![user_id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

/// Apply a partial update and return the stored row.
pub fn update_doctor(conn: &Connection, id: i64, patch: &DoctorPatch) -> Result<DoctorProfile, DatabaseError> {
    let updated = conn.execute(
        "UPDATE doctors SET
            name = COALESCE(?1, name),
            specialization = COALESCE(?2, specialization),
            qualification = COALESCE(?3, qualification),
            experience_years = COALESCE(?4, experience_years),
            city = COALESCE(?5, city),
            consultation_fee = COALESCE(?6, consultation_fee),
            profile_photo = COALESCE(?7, profile_photo)
         WHERE id = ?8",
        params![
            patch.name,
            patch.specialization,
            patch.qualification,
            patch.experience_years,
            patch.city,
            patch.consultation_fee,
            patch.profile_photo,
            id,
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Doctor".into(),
            id: id.to_string(),
        });
    }
    get_doctor(conn, id)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "Doctor".into(),
        id: id.to_string(),
    })
}

/// Filtered, sorted page of the public directory plus the unpaged total.
pub fn list_doctors(
    conn: &Connection,
    filter: &DoctorFilter,
    page: &PageRequest,
) -> Result<(Vec<DoctorProfile>, i64), DatabaseError> {
    let mut clauses: Vec<&str> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        values.push(Value::Text(like_pattern(search)));
        clauses.push("(fold_case(name) LIKE ?1 ESCAPE '\\' OR fold_case(specialization) LIKE ?1 ESCAPE '\\')");
    }
    if let Some(city) = filter.city.as_deref().filter(|s| !s.is_empty()) {
        values.push(Value::Text(like_pattern(city)));
        clauses.push(if values.len() == 1 {
            "fold_case(city) LIKE ?1 ESCAPE '\\'"
        } else {
            "fold_case(city) LIKE ?2 ESCAPE '\\'"
        });
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM doctors {where_sql}"),
        params_from_iter(values.iter()),
        |row| row.get(0),
    )?;

    let sort_column = match filter.sort_by {
        DoctorSort::Experience => "experience_years",
        DoctorSort::Fee => "consultation_fee",
    };
    let sql = format!(
        "SELECT {DOCTOR_COLUMNS} FROM doctors {where_sql}
         ORDER BY {sort_column} {order}, id ASC
         LIMIT {limit} OFFSET {offset}",
        order = filter.sort_order.as_sql(),
        limit = page.limit(),
        offset = page.offset(),
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(values.iter()), doctor_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok((rows, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::models::SortOrder;

    fn directory_doctor(name: &str, specialization: &str, city: &str, years: i64, fee: i64) -> NewDoctor {
        NewDoctor {
            name: name.into(),
            specialization: specialization.into(),
            city: city.into(),
            experience_years: years,
            consultation_fee: fee,
            ..Default::default()
        }
    }

    fn seeded() -> Connection {
        let conn = open_memory_database().unwrap();
        insert_doctor(&conn, &directory_doctor("Dr Mehta", "Cardiology", "Delhi", 12, 900)).unwrap();
        insert_doctor(&conn, &directory_doctor("Dr Iyer", "Dermatology", "Chennai", 4, 400)).unwrap();
        insert_doctor(&conn, &directory_doctor("Dr Khan", "General Physician", "New Delhi", 7, 500)).unwrap();
        conn
    }

    #[test]
    fn insert_returns_stored_profile() {
        let conn = open_memory_database().unwrap();
        let doctor = insert_doctor(&conn, &directory_doctor("Dr Demo", "ENT", "Pune", 3, 300)).unwrap();
        assert!(doctor.id > 0);
        assert!(doctor.user_id.is_none());
        assert_eq!(get_doctor(&conn, doctor.id).unwrap().unwrap(), doctor);
    }

    #[test]
    fn default_sort_is_experience_desc() {
        let conn = seeded();
        let page = PageRequest::normalized(None, None, 6);
        let (doctors, total) = list_doctors(&conn, &DoctorFilter::default(), &page).unwrap();
        assert_eq!(total, 3);
        let years: Vec<i64> = doctors.iter().map(|d| d.experience_years).collect();
        assert_eq!(years, vec![12, 7, 4]);
    }

    #[test]
    fn search_matches_specialization_case_insensitively() {
        let conn = seeded();
        let filter = DoctorFilter {
            search: Some("derma".into()),
            ..Default::default()
        };
        let (doctors, total) = list_doctors(&conn, &filter, &PageRequest::normalized(None, None, 6)).unwrap();
        assert_eq!(total, 1);
        assert_eq!(doctors[0].name, "Dr Iyer");
    }

    #[test]
    fn search_folds_non_ascii_case() {
        let conn = seeded();
        insert_doctor(&conn, &directory_doctor("Élise Ünal", "Neurology", "Zürich", 9, 800)).unwrap();
        let filter = DoctorFilter {
            search: Some("élise".into()),
            city: Some("ZÜRICH".into()),
            ..Default::default()
        };
        let (doctors, total) = list_doctors(&conn, &filter, &PageRequest::normalized(None, None, 6)).unwrap();
        assert_eq!(total, 1);
        assert_eq!(doctors[0].name, "Élise Ünal");
    }

    #[test]
    fn city_filter_combines_with_search_and_fee_sort() {
        let conn = seeded();
        let filter = DoctorFilter {
            search: Some("dr".into()),
            city: Some("delhi".into()),
            sort_by: DoctorSort::Fee,
            sort_order: SortOrder::Asc,
        };
        let (doctors, total) = list_doctors(&conn, &filter, &PageRequest::normalized(None, None, 6)).unwrap();
        assert_eq!(total, 2);
        assert_eq!(doctors[0].name, "Dr Khan");
        assert_eq!(doctors[1].name, "Dr Mehta");
    }

    #[test]
    fn pagination_limits_rows_but_not_total() {
        let conn = seeded();
        let page = PageRequest::normalized(Some(2), Some(2), 6);
        let (doctors, total) = list_doctors(&conn, &DoctorFilter::default(), &page).unwrap();
        assert_eq!(total, 3);
        assert_eq!(doctors.len(), 1);
    }

    #[test]
    fn patch_only_touches_given_fields() {
        let conn = seeded();
        let patch = DoctorPatch {
            city: Some("Mumbai".into()),
            ..Default::default()
        };
        let updated = update_doctor(&conn, 1, &patch).unwrap();
        assert_eq!(updated.city, "Mumbai");
        assert_eq!(updated.specialization, "Cardiology");
        assert_eq!(updated.experience_years, 12);
    }

    #[test]
    fn patch_unknown_doctor_is_not_found() {
        let conn = open_memory_database().unwrap();
        let err = update_doctor(&conn, 99, &DoctorPatch::default()).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }
}
