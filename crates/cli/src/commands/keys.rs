//! Encryption key commands.
//!
//! # Usage
//!
//! ```bash
//! # Print a fresh ENCRYPTION_KEY
//! digiful-cli keygen
//!
//! # Check that ENCRYPTION_KEY encrypts and decrypts
//! digiful-cli encrypt-check
//! ```

use digiful_admin::crypto::{CredentialCodec, CryptoError};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const PROBE: &str = "digiful-encrypt-check";

/// Errors from the key commands.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("round trip returned a different plaintext")]
    Mismatch,
}

/// Generate a new 32-byte key, hex encoded.
#[must_use]
pub fn keygen() -> String {
    CredentialCodec::generate_key_hex()
}

/// Encrypt and decrypt a probe value with `ENCRYPTION_KEY`.
///
/// Returns the IV of the probe ciphertext.
pub fn encrypt_check() -> Result<String, KeyError> {
    let key = std::env::var("ENCRYPTION_KEY")
        .map(SecretString::from)
        .map_err(|_| KeyError::MissingEnvVar("ENCRYPTION_KEY"))?;
    round_trip(key.expose_secret())
}

fn round_trip(hex_key: &str) -> Result<String, KeyError> {
    let codec = CredentialCodec::from_hex(hex_key)?;
    let secret = codec.encrypt(PROBE);
    if codec.decrypt(&secret)? != PROBE {
        return Err(KeyError::Mismatch);
    }
    Ok(secret.iv)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_key_passes_check() {
        let iv = round_trip(&keygen()).unwrap();
        assert_eq!(iv.len(), 32);
    }

    #[test]
    fn test_short_key_rejected() {
        assert!(matches!(round_trip("abcd"), Err(KeyError::Crypto(_))));
    }
}
