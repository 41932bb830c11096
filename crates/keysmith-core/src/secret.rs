//! Plaintext key generation.

use crate::error::{ApiKeyError, Result};

const LETTERS: &[u8; 52] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
/// Largest multiple of 52 below 256. Bytes at or above it are discarded so
/// every letter is equally likely.
const ACCEPT_BELOW: u8 = 208;
const CHUNK_SIZE: usize = 64;

/// Generate a random plaintext key of `len` ASCII letters from the OS
/// entropy source.
pub fn generate_secret(len: usize) -> Result<String> {
    generate_secret_with(len, getrandom::getrandom)
}

fn generate_secret_with<F>(len: usize, mut fill: F) -> Result<String>
where
    F: FnMut(&mut [u8]) -> std::result::Result<(), getrandom::Error>,
{
    let mut secret = String::with_capacity(len);
    let mut buf = [0u8; CHUNK_SIZE];

    while secret.len() < len {
        fill(&mut buf).map_err(ApiKeyError::RandomSource)?;
        let remaining = len - secret.len();
        secret.extend(
            buf.iter()
                .filter(|&&byte| byte < ACCEPT_BELOW)
                .take(remaining)
                .map(|&byte| LETTERS[(byte % 52) as usize] as char),
        );
    }

    Ok(secret)
}
