//! Error types for keys and field encryption.

use thiserror::Error;

use super::{KeyFingerprint, KeyScope};

/// Errors from key lookup, key management and the field codec.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CryptoError {
    /// No key is provisioned for the requested scope.
    #[error("No symmetric key available for {scope}")]
    KeyUnavailable {
        /// Scope that was asked for
        scope: KeyScope,
    },

    /// Sealing a value failed.
    #[error("Encryption failed: {reason}")]
    EncryptionFailed {
        /// Description of the failure
        reason: String,
    },

    /// The authentication tag did not verify: corrupted ciphertext, wrong
    /// key material or a blob moved to a different row.
    #[error("Decryption failed: {reason}")]
    DecryptionFailed {
        /// Description of the failure
        reason: String,
    },

    /// The blob was sealed under a different key than the one now provisioned.
    #[error("Value was sealed with key {found}, current key is {expected}")]
    StaleKey {
        /// Fingerprint of the key currently provisioned
        expected: KeyFingerprint,
        /// Fingerprint recorded in the blob
        found: KeyFingerprint,
    },

    /// The blob is truncated or not in a known layout.
    #[error("Invalid encrypted blob: {reason}")]
    InvalidBlob {
        /// Description of what is wrong
        reason: String,
    },

    /// The blob layout version is newer or older than this build understands.
    #[error("Unsupported encrypted blob version {version}")]
    UnsupportedBlobVersion {
        /// Version byte found in the blob
        version: u8,
    },

    /// Key material has the wrong length.
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected key length in bytes
        expected: usize,
        /// Actual length supplied
        actual: usize,
    },

    /// Password based key derivation failed.
    #[error("Key derivation failed: {reason}")]
    KeyDerivationFailed {
        /// Description of the failure
        reason: String,
    },
}

impl CryptoError {
    /// Check if no key is provisioned for the requested scope.
    pub fn is_key_unavailable(&self) -> bool {
        matches!(self, CryptoError::KeyUnavailable { .. })
    }

    /// Check if a stored value could not be opened.
    pub fn is_decryption_error(&self) -> bool {
        matches!(
            self,
            CryptoError::DecryptionFailed { .. }
                | CryptoError::StaleKey { .. }
                | CryptoError::InvalidBlob { .. }
                | CryptoError::UnsupportedBlobVersion { .. }
        )
    }

    /// Check if the value was sealed under a superseded key.
    pub fn is_stale_key(&self) -> bool {
        matches!(self, CryptoError::StaleKey { .. })
    }

    /// Check if the blob itself is malformed, independent of any key.
    pub fn is_malformed_blob(&self) -> bool {
        matches!(
            self,
            CryptoError::InvalidBlob { .. } | CryptoError::UnsupportedBlobVersion { .. }
        )
    }

    /// Check if the error concerns key material rather than stored data.
    pub fn is_key_error(&self) -> bool {
        matches!(
            self,
            CryptoError::KeyUnavailable { .. }
                | CryptoError::InvalidKeyLength { .. }
                | CryptoError::KeyDerivationFailed { .. }
        )
    }
}

impl From<CryptoError> for crate::Error {
    fn from(err: CryptoError) -> Self {
        crate::Error::Crypto(err)
    }
}
