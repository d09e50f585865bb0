use chrono::Utc;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::sqlite::timestamp_to_sql;
use crate::db::DatabaseError;

#[cfg(test)]
use chrono::DateTime;
#[cfg(test)]
use crate::db::sqlite::{optional_uuid_column, timestamp_column};

/// One row of the audit trail, as read back in tests.
#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub actor_id: Option<Uuid>,
    pub action: String,
    pub entity: String,
}

/// Record a state-changing action. `actor_id` is `None` for system actions.
pub fn insert_audit_entry(
    conn: &Connection,
    actor_id: Option<&Uuid>,
    action: &str,
    entity: &str,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO audit_log (timestamp, actor_id, action, entity) VALUES (?1, ?2, ?3, ?4)",
        params![
            timestamp_to_sql(&Utc::now()),
            actor_id.map(|id| id.to_string()),
            action,
            entity,
        ],
    )?;
    Ok(())
}

/// Most recent entries first.
#[cfg(test)]
pub fn list_audit_entries(conn: &Connection, limit: i64) -> Result<Vec<AuditEntry>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, timestamp, actor_id, action, entity FROM audit_log
         ORDER BY timestamp DESC, id DESC LIMIT ?1",
    )?;
    let rows = stmt
        .query_map(params![limit], |row| {
            Ok(AuditEntry {
                id: row.get(0)?,
                timestamp: timestamp_column(row, 1)?,
                actor_id: optional_uuid_column(row, 2)?,
                action: row.get(3)?,
                entity: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
