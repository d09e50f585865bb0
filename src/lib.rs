pub mod accounts; // Signup, login, admin bootstrap, account deletion
pub mod api; // HTTP router, middleware, server
pub mod appointment; // Appointment lifecycle
pub mod authorization; // Caller resolution + ownership predicate
pub mod config;
pub mod core_state;
pub mod crypto;
pub mod db;
pub mod error;
pub mod medical_record; // Records + follow-up thread
pub mod models;
pub mod profiles; // Own profiles + doctor directory

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;
use crate::core_state::CoreState;
use crate::error::StartupError;

pub fn run() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    if let Err(e) = start() {
        tracing::error!("{} failed: {e}", config::APP_NAME);
        std::process::exit(1);
    }
}

fn start() -> Result<(), StartupError> {
    let config = ServerConfig::from_env()?;
    let core = CoreState::from_config(&config);
    core.initialize()?;

    if let Some(admin) = &config.admin {
        let conn = core.open_db()?;
        accounts::ensure_admin(&conn, &admin.email, &admin.password, core.password_iterations)?;
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(api::serve_until_ctrl_c(Arc::new(core), config.bind_addr))?;

    tracing::info!("{} stopped", config::APP_NAME);
    Ok(())
}
