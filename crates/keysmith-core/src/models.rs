//! API key models
//!
//! [`ApiKey`] is the stored shape (digest only). [`IssuedApiKey`] is the
//! shape handed back from issuance and rotation: it carries the plaintext,
//! which exists nowhere else once the value is dropped.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use keysmith_storage::ApiKey;

pub const PLUGIN_TYPE_PREFIX: &str = "plugin:";

/// Key type tag for keys issued on behalf of a plugin.
pub fn plugin_key_type(plugin_name: &str) -> String {
    format!("{}{}", PLUGIN_TYPE_PREFIX, plugin_name)
}

/// The identity acting on a key, recorded as creator/updater.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub email: String,
}

impl User {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// Parameters for issuing a new key.
#[derive(Debug, Clone, Default)]
pub struct CreateApiKeyRequest {
    pub name: String,
    pub expired_at: Option<DateTime<Utc>>,
    /// Regular expression over request paths this key may authorize.
    pub allowed_path: String,
    pub key_type: String,
    pub extra: String,
}

/// A freshly issued or rotated key, including its plaintext.
#[derive(Clone)]
pub struct IssuedApiKey {
    record: ApiKey,
    plaintext: String,
}

impl IssuedApiKey {
    pub(crate) fn new(record: ApiKey, plaintext: String) -> Self {
        Self { record, plaintext }
    }

    /// The stored record, with its digest.
    pub fn record(&self) -> &ApiKey {
        &self.record
    }

    pub fn id(&self) -> u64 {
        self.record.id
    }

    /// The plaintext key. Show it to the caller once; it cannot be recovered.
    pub fn plaintext(&self) -> &str {
        &self.plaintext
    }

    /// Get a display-safe version of the plaintext (masked)
    pub fn masked(&self) -> String {
        let value = &self.plaintext;
        if value.len() <= 8 {
            return "*".repeat(value.len());
        }
        format!("{}...{}", &value[..4], &value[value.len() - 4..])
    }
}

impl fmt::Debug for IssuedApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedApiKey")
            .field("record", &self.record)
            .field("plaintext", &self.masked())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issued(plaintext: &str) -> IssuedApiKey {
        let now = Utc::now();
        IssuedApiKey::new(
            ApiKey {
                id: 7,
                name: "deploy".to_string(),
                api_key: "digest".to_string(),
                expired_at: None,
                allowed_path: ".*".to_string(),
                key_type: "api".to_string(),
                extra: String::new(),
                creator: String::new(),
                creator_email: String::new(),
                updater: String::new(),
                updater_email: String::new(),
                created_at: now,
                updated_at: now,
            },
            plaintext.to_string(),
        )
    }

    #[test]
    fn test_plugin_key_type() {
        assert_eq!(plugin_key_type("webhook"), "plugin:webhook");
    }

    #[test]
    fn test_issued_masked() {
        let key = issued("abcdEFGHijklMNOP");
        assert_eq!(key.masked(), "abcd...MNOP");
        assert_eq!(issued("short").masked(), "*****");
    }

    #[test]
    fn test_issued_debug_hides_plaintext() {
        let key = issued("abcdEFGHijklMNOPqrst");
        let debug = format!("{:?}", key);
        assert!(!debug.contains("abcdEFGHijklMNOPqrst"));
        assert!(debug.contains("abcd...qrst"));
        assert!(debug.contains("deploy"));
    }
}
