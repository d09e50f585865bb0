//! HTTP API: router, middleware, endpoints and server lifecycle.
//!
//! Handlers are thin: they resolve the caller, open a connection and
//! delegate to the service modules (`accounts`, `appointment`,
//! `medical_record`, `profiles`).

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{serve_until_ctrl_c, start_api_server, ApiServer, ServerError};
pub use types::ApiContext;
