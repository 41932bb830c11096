//! API key configuration.
//!
//! The server-wide encryption secret is read once, at construction, from the
//! process environment or an env-file fallback. After that it is an immutable
//! value handed to whoever needs it.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use crate::error::{ApiKeyError, Result};

/// Environment variable holding the HMAC secret.
pub const ENCRYPTION_SECRET_ENV: &str = "ENCRYPTION_SECRET";
/// Environment variable overriding the generated key length.
pub const KEY_LENGTH_ENV: &str = "KEYSMITH_KEY_LENGTH";

pub const DEFAULT_API_KEY_LENGTH: usize = 128;
pub const MIN_API_KEY_LENGTH: usize = 32;

const DEFAULT_ENV_FILE: &str = ".env";

/// The server-wide secret keying the token digest. Never empty, never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionSecret(String);

impl EncryptionSecret {
    /// Trims surrounding whitespace and rejects an empty result.
    pub fn new(raw: impl AsRef<str>) -> Result<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ApiKeyError::Configuration(format!(
                "{} must be set in environment variable or .env file",
                ENCRYPTION_SECRET_ENV
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn expose_secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EncryptionSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionSecret(***)")
    }
}

/// API key configuration
#[derive(Debug, Clone)]
pub struct ApiKeyConfig {
    pub encryption_secret: EncryptionSecret,
    /// Length of generated plaintext keys, in characters.
    pub key_length: usize,
}

impl ApiKeyConfig {
    pub fn new(encryption_secret: EncryptionSecret) -> Self {
        Self {
            encryption_secret,
            key_length: DEFAULT_API_KEY_LENGTH,
        }
    }

    pub fn with_key_length(mut self, key_length: usize) -> Self {
        self.key_length = key_length;
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.key_length < MIN_API_KEY_LENGTH {
            return Err(ApiKeyError::Configuration(format!(
                "Key length must be at least {}, got {}",
                MIN_API_KEY_LENGTH, self.key_length
            )));
        }
        Ok(())
    }

    /// Build the configuration from a variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup(ENCRYPTION_SECRET_ENV).unwrap_or_default();
        let mut config = Self::new(EncryptionSecret::new(secret)?);

        if let Some(raw) = lookup(KEY_LENGTH_ENV) {
            config.key_length = raw.trim().parse().map_err(|_| {
                ApiKeyError::Configuration(format!("Invalid value for {}: {}", KEY_LENGTH_ENV, raw))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load from the process environment, falling back to an env file for
    /// variables the environment does not set.
    ///
    /// With `env_file = None`, `.env` in the current directory is used if it
    /// exists. An explicitly given file must exist.
    pub fn from_env(env_file: Option<&Path>) -> Result<Self> {
        let file_vars = match env_file {
            Some(path) => read_env_file(path)?,
            None if Path::new(DEFAULT_ENV_FILE).exists() => {
                read_env_file(Path::new(DEFAULT_ENV_FILE))?
            }
            None => HashMap::new(),
        };

        Self::from_lookup(|key| {
            std::env::var(key)
                .ok()
                .filter(|value| !value.trim().is_empty())
                .or_else(|| file_vars.get(key).cloned())
        })
    }
}

/// Parse an env file without touching the process environment.
fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let load_error = |err: dotenvy::Error| {
        ApiKeyError::Configuration(format!(
            "Failed to load env file from {}: {}",
            path.display(),
            err
        ))
    };

    let mut vars = HashMap::new();
    for item in dotenvy::from_path_iter(path).map_err(load_error)? {
        let (key, value) = item.map_err(load_error)?;
        vars.insert(key, value);
    }
    Ok(vars)
}
