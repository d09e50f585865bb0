//! API endpoint handlers.
//!
//! Each module corresponds to one resource. Handlers resolve the caller,
//! open a connection, and delegate to the service modules.

use serde::Serialize;

pub mod appointments;
pub mod auth;
pub mod doctors;
pub mod health;
pub mod medical_records;
pub mod profiles;
pub mod users;

/// Plain acknowledgement body for deletions.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}
