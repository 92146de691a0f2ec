//! Anti-forgery nonce (`state`) generation and comparison.

use anyhow::{Context, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{RngCore, rngs::OsRng};

const NONCE_BYTES: usize = 32;

/// Fresh, URL- and cookie-safe random nonce for one login attempt.
pub(crate) fn generate_nonce() -> Result<String> {
    let mut bytes = [0u8; NONCE_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate anti-forgery nonce")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

/// Compare the returned `state` with the pending nonce without short-circuiting
/// on the first differing byte.
pub(crate) fn nonce_matches(pending: &str, returned: &str) -> bool {
    let (pending, returned) = (pending.as_bytes(), returned.as_bytes());
    if pending.len() != returned.len() {
        return false;
    }
    pending
        .iter()
        .zip(returned)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonces_are_unique_and_url_safe() -> Result<()> {
        let first = generate_nonce()?;
        let second = generate_nonce()?;
        assert_ne!(first, second);
        // 32 bytes, unpadded base64url
        assert_eq!(first.len(), 43);
        assert!(
            first
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
        Ok(())
    }

    #[test]
    fn nonce_matches_exact_value_only() {
        assert!(nonce_matches("abc", "abc"));
        assert!(!nonce_matches("abc", "abd"));
        assert!(!nonce_matches("abc", "abcd"));
        assert!(!nonce_matches("abc", ""));
    }
}
