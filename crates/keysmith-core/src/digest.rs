//! Keyed token digests.
//!
//! Stored keys are HMAC-SHA256 digests of the plaintext, keyed by the
//! server-wide encryption secret and hex encoded. The same function is used
//! by whatever verifies presented tokens, so it is public.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::EncryptionSecret;
use crate::error::{ApiKeyError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Hex length of a digest produced by [`TokenDigester::digest`].
pub const DIGEST_HEX_LEN: usize = 64;

#[derive(Debug, Clone)]
pub struct TokenDigester {
    secret: EncryptionSecret,
}

impl TokenDigester {
    pub fn new(secret: EncryptionSecret) -> Self {
        Self { secret }
    }

    /// Shorthand for `TokenDigester::new(EncryptionSecret::new(raw)?)`.
    pub fn from_secret(raw: &str) -> Result<Self> {
        Ok(Self::new(EncryptionSecret::new(raw)?))
    }

    pub fn digest(&self, token: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|err| {
                tracing::error!(error = %err, "hmac key setup");
                ApiKeyError::Digest(format!("hmac key setup: {}", err))
            })?;
        mac.update(token.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_deterministic() {
        let digester = TokenDigester::from_secret("server-secret").unwrap();
        let a = digester.digest("token").unwrap();
        let b = digester.digest("token").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), DIGEST_HEX_LEN);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_digest_depends_on_secret() {
        let a = TokenDigester::from_secret("secret-a").unwrap();
        let b = TokenDigester::from_secret("secret-b").unwrap();
        assert_ne!(a.digest("token").unwrap(), b.digest("token").unwrap());
    }

    #[test]
    fn test_digest_depends_on_token() {
        let digester = TokenDigester::from_secret("server-secret").unwrap();
        assert_ne!(
            digester.digest("token-a").unwrap(),
            digester.digest("token-b").unwrap()
        );
    }

    #[test]
    fn test_surrounding_whitespace_in_secret_is_ignored() {
        let plain = TokenDigester::from_secret("key").unwrap();
        let padded = TokenDigester::from_secret("  key\n").unwrap();
        assert_eq!(plain.digest("x").unwrap(), padded.digest("x").unwrap());
    }

    #[test]
    fn test_known_vector() {
        // RFC 4231 test case 2.
        let digester = TokenDigester::from_secret("Jefe").unwrap();
        assert_eq!(
            digester.digest("what do ya want for nothing?").unwrap(),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_empty_and_long_tokens() {
        let digester = TokenDigester::from_secret("server-secret").unwrap();
        assert_eq!(digester.digest("").unwrap().len(), DIGEST_HEX_LEN);
        let long = "a".repeat(1 << 20);
        assert_eq!(digester.digest(&long).unwrap().len(), DIGEST_HEX_LEN);
    }

    #[test]
    fn test_blank_secret_rejected_at_construction() {
        assert!(TokenDigester::from_secret("   ").is_err());
    }
}
