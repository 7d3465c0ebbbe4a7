pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

use std::path::Path;

use tracing::info;

use crate::commands::AppState;
use crate::config::AppConfig;
use crate::error::AppResult;

/// Loads configuration, installs logging and opens the database.
pub fn bootstrap(config_path: Option<&Path>) -> AppResult<AppState> {
    let config = AppConfig::load(config_path)?;
    std::fs::create_dir_all(&config.data_dir)?;
    crate::utils::logger::init_logging(&config.log_path())?;

    let state = AppState::new(config)?;
    info!(
        target: "app::bootstrap",
        db_path = %state.db().path().display(),
        schema_version = state.db().schema_version(),
        reports_dir = %state.reports().reports_dir().display(),
        "application state ready"
    );
    Ok(state)
}
