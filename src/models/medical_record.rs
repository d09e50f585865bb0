use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::enums::{AuthorRole, RecordStatus};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MedicalRecord {
    pub id: i64,
    pub appointment_id: i64,
    pub doctor_id: i64,
    pub patient_id: Uuid,
    pub problem: String,
    pub prescription: String,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
}

/// One message in a record's conversation thread.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FollowUp {
    pub id: i64,
    pub medical_record_id: i64,
    pub author_id: Uuid,
    pub author_role: AuthorRole,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl RecordStatus {
    /// OPEN → CLOSED only; CLOSED is terminal.
    pub fn can_transition_to(self, next: Self) -> bool {
        self == next || matches!((self, next), (Self::Open, Self::Closed))
    }
}
