use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PatientProfile {
    pub id: i64,
    pub user_id: Uuid,
    pub age: Option<i64>,
    pub gender: Option<String>,
}
