//! Encryption of merchant secrets at rest.
//!
//! Secrets (S3 secret access keys, webhook access tokens) are stored as
//! AES-256-CBC ciphertext with PKCS#7 padding, next to the random IV used to
//! produce them. Both halves are lowercase hex.
//!
//! # Security
//!
//! CBC carries no authentication tag. Padding corruption is detected, but a
//! targeted bit flip in the IV or an earlier ciphertext block decrypts to
//! different plaintext without error. The stored format predates this crate
//! and must keep decoding existing documents, so the mode is kept as is.

use aes::Aes256;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use digiful_core::EncryptedSecret;
use rand::Rng;
use secrecy::{ExposeSecret, SecretBox, SecretString};
use thiserror::Error;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;

/// CBC initialization vector length in bytes.
pub const IV_LEN: usize = 16;

/// Errors from decoding stored secrets.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid hex in {field}: {source}")]
    InvalidHex {
        field: &'static str,
        #[source]
        source: hex::FromHexError,
    },

    #[error("key must be {KEY_LEN} bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("iv must be {IV_LEN} bytes, got {0}")]
    InvalidIvLength(usize),

    #[error("ciphertext padding is invalid")]
    Padding,

    #[error("decrypted secret is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Symmetric codec for secrets stored in merchant documents.
///
/// The key is supplied by configuration and never generated or rotated here.
pub struct CredentialCodec {
    key: SecretBox<[u8; KEY_LEN]>,
}

impl std::fmt::Debug for CredentialCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCodec")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl CredentialCodec {
    /// Build a codec from a 64 character hex key.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidHex` or `CryptoError::InvalidKeyLength`.
    pub fn from_hex(hex_key: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(hex_key.trim()).map_err(|source| CryptoError::InvalidHex {
            field: "key",
            source,
        })?;
        let key: [u8; KEY_LEN] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength(bytes.len()))?;

        Ok(Self {
            key: SecretBox::new(Box::new(key)),
        })
    }

    /// Build a codec from the configured `ENCRYPTION_KEY`.
    ///
    /// # Errors
    ///
    /// See [`CredentialCodec::from_hex`].
    pub fn from_secret(hex_key: &SecretString) -> Result<Self, CryptoError> {
        Self::from_hex(hex_key.expose_secret())
    }

    /// Generate a fresh random key, hex encoded.
    #[must_use]
    pub fn generate_key_hex() -> String {
        let mut key = [0u8; KEY_LEN];
        rand::rng().fill(&mut key);
        hex::encode(key)
    }

    /// Encrypt a secret with a fresh random IV.
    #[must_use]
    pub fn encrypt(&self, plaintext: &str) -> EncryptedSecret {
        let mut iv = [0u8; IV_LEN];
        rand::rng().fill(&mut iv);

        let content = Aes256CbcEnc::new(&(*self.key.expose_secret()).into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

        EncryptedSecret {
            iv: hex::encode(iv),
            content: hex::encode(content),
        }
    }

    /// Decrypt a stored secret.
    ///
    /// # Errors
    ///
    /// Fails on malformed hex, a wrong IV length, bad padding, or plaintext
    /// that is not UTF-8. Tampering that keeps the padding valid is not
    /// detected.
    pub fn decrypt(&self, secret: &EncryptedSecret) -> Result<String, CryptoError> {
        let iv = hex::decode(&secret.iv).map_err(|source| CryptoError::InvalidHex {
            field: "iv",
            source,
        })?;
        let content = hex::decode(&secret.content).map_err(|source| CryptoError::InvalidHex {
            field: "content",
            source,
        })?;

        let decryptor = Aes256CbcDec::new_from_slices(self.key.expose_secret(), &iv)
            .map_err(|_| CryptoError::InvalidIvLength(iv.len()))?;
        let plaintext = decryptor
            .decrypt_padded_vec_mut::<Pkcs7>(&content)
            .map_err(|_| CryptoError::Padding)?;

        Ok(String::from_utf8(plaintext)?)
    }

    /// Decrypt straight into a `SecretString`.
    ///
    /// # Errors
    ///
    /// See [`CredentialCodec::decrypt`].
    pub fn decrypt_secret(&self, secret: &EncryptedSecret) -> Result<SecretString, CryptoError> {
        self.decrypt(secret).map(SecretString::from)
    }
}
