//! Repository layer: entity-scoped database operations.
//!
//! Every function takes a borrowed `Connection` so callers decide the
//! transaction boundary. All public functions are re-exported here.

mod appointment;
mod audit;
mod cascade;
mod doctor;
mod medical_record;
mod patient;
mod user;

pub use appointment::*;
pub use audit::*;
pub use cascade::*;
pub use doctor::*;
pub use medical_record::*;
pub use patient::*;
pub use user::*;
