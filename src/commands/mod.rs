//! Subcommand implementations

use anyhow::{Context, Result};
use portfolio_analytics::store::SqliteLedger;
use portfolio_analytics::Config;
use std::path::Path;
use tracing::info;

pub mod import;
pub mod recommendations;
pub mod report;

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = Config::load(path)?;
    match path {
        Some(path) => info!("Loaded configuration from: {}", path.display()),
        None => info!("No configuration file given, using defaults"),
    }
    Ok(config)
}

pub fn open_ledger(config: &Config) -> Result<SqliteLedger> {
    let db_path = config.database_path();
    SqliteLedger::open(&db_path)
        .with_context(|| format!("Failed to open ledger database {}", db_path.display()))
}
