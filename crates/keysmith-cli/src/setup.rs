//! CLI setup module
//!
//! Handles initialization of the keysmith core for CLI usage.

use anyhow::{Context, Result};
use keysmith_core::{ApiKeyConfig, KeysmithCore, User, paths};

use crate::cli::Cli;

/// Load the API key configuration from the environment and env file.
pub fn load_config(cli: &Cli) -> Result<ApiKeyConfig> {
    ApiKeyConfig::from_env(cli.env_file.as_deref()).context("Failed to load configuration")
}

/// Build the embedded keysmith core
pub fn prepare_core(cli: &Cli) -> Result<KeysmithCore> {
    let config = load_config(cli)?;
    let db_path = match &cli.db_path {
        Some(path) => path.into(),
        None => paths::ensure_database_path()?,
    };
    KeysmithCore::new(&db_path, config)
        .with_context(|| format!("Failed to open database {}", db_path.display()))
}

/// The acting identity, when either actor flag is given.
pub fn actor(cli: &Cli) -> Option<User> {
    if cli.actor_name.is_none() && cli.actor_email.is_none() {
        return None;
    }
    Some(User::new(
        cli.actor_name.clone().unwrap_or_default(),
        cli.actor_email.clone().unwrap_or_default(),
    ))
}
