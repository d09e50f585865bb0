//! Domain error taxonomy shared by the service modules.
//!
//! Each variant maps to exactly one HTTP status at the API edge
//! (see `api::error`).

use crate::crypto::CryptoError;
use crate::db::DatabaseError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

impl From<rusqlite::Error> for ServiceError {
    fn from(err: rusqlite::Error) -> Self {
        ServiceError::Database(DatabaseError::Sqlite(err))
    }
}

impl ServiceError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Fatal errors while bringing the server up.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error(transparent)]
    Core(#[from] crate::core_state::CoreError),

    #[error("Admin bootstrap failed: {0}")]
    AdminBootstrap(#[from] ServiceError),

    #[error(transparent)]
    Server(#[from] crate::api::ServerError),

    #[error("Cannot start async runtime: {0}")]
    Runtime(#[from] std::io::Error),
}
