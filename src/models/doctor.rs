use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DoctorProfile {
    pub id: i64,
    /// `None` for directory-only doctors created by an admin.
    pub user_id: Option<Uuid>,
    pub name: String,
    pub specialization: String,
    pub qualification: Option<String>,
    pub experience_years: i64,
    pub city: String,
    pub consultation_fee: i64,
    pub profile_photo: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields for a new doctor profile.
#[derive(Debug, Clone, Default)]
pub struct NewDoctor {
    pub user_id: Option<Uuid>,
    pub name: String,
    pub specialization: String,
    pub qualification: Option<String>,
    pub experience_years: i64,
    pub city: String,
    pub consultation_fee: i64,
    pub profile_photo: Option<String>,
}

/// Partial update; `None` leaves the column unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorPatch {
    pub name: Option<String>,
    pub specialization: Option<String>,
    pub qualification: Option<String>,
    pub experience_years: Option<i64>,
    pub city: Option<String>,
    pub consultation_fee: Option<i64>,
    pub profile_photo: Option<String>,
}
