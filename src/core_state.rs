//! Transport-agnostic server state.
//!
//! `CoreState` holds what every request needs: where the database lives,
//! how tokens are signed, and whether cookies must be `Secure`. It holds
//! no open connection; each request opens its own.

use std::path::PathBuf;

use rusqlite::Connection;

use crate::config::ServerConfig;
use crate::crypto::{TokenIssuer, PBKDF2_ITERATIONS};
use crate::db::{self, DatabaseError};

/// Errors from core state operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Cannot prepare data directory: {0}")]
    DataDir(#[from] std::io::Error),
}

pub struct CoreState {
    pub db_path: PathBuf,
    pub tokens: TokenIssuer,
    /// Production mode marks session cookies `Secure`.
    pub production: bool,
    /// PBKDF2 work factor for new password hashes.
    pub password_iterations: u32,
}

impl CoreState {
    pub fn new(db_path: PathBuf, tokens: TokenIssuer, production: bool) -> Self {
        Self {
            db_path,
            tokens,
            production,
            password_iterations: PBKDF2_ITERATIONS,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            config.db_path.clone(),
            TokenIssuer::new(config.secret.clone(), config.token_ttl_secs),
            config.production,
        )
    }

    /// Override the PBKDF2 work factor (tests use a small one).
    pub fn with_password_iterations(mut self, iterations: u32) -> Self {
        self.password_iterations = iterations;
        self
    }

    /// Create the data directory and bring the schema up to date.
    pub fn initialize(&self) -> Result<(), CoreError> {
        if let Some(parent) = self.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        self.open_db()?;
        tracing::info!(path = %self.db_path.display(), "Database ready");
        Ok(())
    }

    /// Open a fresh connection for one request.
    pub fn open_db(&self) -> Result<Connection, CoreError> {
        Ok(db::open_database(&self.db_path)?)
    }
}

impl std::fmt::Debug for CoreState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreState")
            .field("db_path", &self.db_path)
            .field("production", &self.production)
            .field("password_iterations", &self.password_iterations)
            .finish_non_exhaustive()
    }
}
