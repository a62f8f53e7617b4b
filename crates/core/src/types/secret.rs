//! Encrypted secret storage format.

use serde::{Deserialize, Serialize};

/// A secret encrypted for storage at rest.
///
/// Both fields are lowercase hex. `iv` is the 16-byte initialization vector
/// used for this ciphertext only; it must always be stored with `content`.
/// The encryption itself lives in the admin crate next to the key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedSecret {
    /// Hex-encoded initialization vector (32 hex chars).
    pub iv: String,
    /// Hex-encoded ciphertext.
    pub content: String,
}

impl EncryptedSecret {
    /// Whether both halves are present.
    ///
    /// Documents written by older revisions may carry empty strings.
    #[must_use]
    pub fn is_present(&self) -> bool {
        !self.iv.is_empty() && !self.content.is_empty()
    }
}
