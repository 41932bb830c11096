use anyhow::Result;
use std::path::PathBuf;

const KEYSMITH_DIR: &str = ".keysmith";
const DB_FILE: &str = "keysmith.db";
const LOGS_DIR: &str = "logs";

/// Environment variable to override the keysmith directory.
const KEYSMITH_DIR_ENV: &str = "KEYSMITH_DIR";

/// Resolve the keysmith data directory.
/// Priority: KEYSMITH_DIR env var > ~/.keysmith/
pub fn resolve_keysmith_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(KEYSMITH_DIR_ENV)
        && !dir.trim().is_empty()
    {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|h| h.join(KEYSMITH_DIR))
        .ok_or_else(|| anyhow::anyhow!("Failed to determine home directory"))
}

/// Ensure the keysmith directory exists and return its path.
pub fn ensure_keysmith_dir() -> Result<PathBuf> {
    let dir = resolve_keysmith_dir()?;
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Ensure the keysmith directory exists and return the database path in it.
pub fn ensure_database_path() -> Result<PathBuf> {
    Ok(ensure_keysmith_dir()?.join(DB_FILE))
}

/// Ensure the log directory exists and return it: ~/.keysmith/logs
pub fn ensure_logs_dir() -> Result<PathBuf> {
    let dir = resolve_keysmith_dir()?.join(LOGS_DIR);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
