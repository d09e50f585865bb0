use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::enums::AppointmentStatus;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: i64,
    /// The patient who booked.
    pub user_id: Uuid,
    pub doctor_id: i64,
    pub date_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Patient view embedded in an appointment listing.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentPatient {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// Doctor view embedded in an appointment listing.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentDoctor {
    pub id: i64,
    pub name: String,
    pub specialization: String,
}

/// One row of a caller-scoped appointment list.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentListItem {
    pub id: i64,
    pub date_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub doctor_id: i64,
    pub patient: AppointmentPatient,
    pub doctor: AppointmentDoctor,
    pub medical_record_id: Option<i64>,
}

impl AppointmentStatus {
    /// Whether no further transition is allowed out of this status.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Scheduled → Completed | Cancelled. Re-stating the current status is a no-op.
    pub fn can_transition_to(self, next: Self) -> bool {
        if self == next {
            return true;
        }
        matches!(
            (self, next),
            (Self::Scheduled, Self::Completed) | (Self::Scheduled, Self::Cancelled)
        )
    }
}
