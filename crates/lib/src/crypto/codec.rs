//! AES-256-GCM field encryption
//!
//! Blob layout, all fixed-width except the ciphertext:
//!
//! ```text
//! +---------+------------------+-----------+---------------------+
//! | version | key fingerprint  | nonce     | ciphertext || tag   |
//! | 1 byte  | 8 bytes          | 12 bytes  | len(plaintext) + 16 |
//! +---------+------------------+-----------+---------------------+
//! ```
//!
//! The associated data is supplied by the caller and is not stored. Datasources
//! bind it to the table and row key, so a blob only opens in the row it was
//! written to.

use aes_gcm::{
    Aes256Gcm, KeyInit, Nonce,
    aead::{Aead, AeadCore, OsRng, Payload},
};
use base64ct::{Base64, Encoding};
use zeroize::Zeroizing;

use super::{CryptoError, FINGERPRINT_LENGTH, KeyFingerprint, SymmetricKey};
use crate::Result;

/// Current blob layout version
pub const BLOB_VERSION: u8 = 1;

/// Nonce length for AES-GCM (12 bytes standard)
pub const NONCE_LENGTH: usize = 12;

const TAG_LENGTH: usize = 16;
const HEADER_LENGTH: usize = 1 + FINGERPRINT_LENGTH + NONCE_LENGTH;

/// A sealed value together with the metadata needed to open it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedBlob {
    version: u8,
    fingerprint: KeyFingerprint,
    nonce: [u8; NONCE_LENGTH],
    ciphertext: Vec<u8>,
}

impl EncryptedBlob {
    /// Fingerprint of the key this blob was sealed with.
    pub fn key_fingerprint(&self) -> KeyFingerprint {
        self.fingerprint
    }

    /// Layout version.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Serialize to the binary layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LENGTH + self.ciphertext.len());
        out.push(self.version);
        out.extend_from_slice(self.fingerprint.as_bytes());
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Parse the binary layout.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let Some((&version, rest)) = bytes.split_first() else {
            return Err(CryptoError::InvalidBlob {
                reason: "empty blob".to_string(),
            }
            .into());
        };
        if version != BLOB_VERSION {
            return Err(CryptoError::UnsupportedBlobVersion { version }.into());
        }
        if bytes.len() < HEADER_LENGTH + TAG_LENGTH {
            return Err(CryptoError::InvalidBlob {
                reason: format!(
                    "blob is {} bytes, shorter than the {} byte minimum",
                    bytes.len(),
                    HEADER_LENGTH + TAG_LENGTH
                ),
            }
            .into());
        }

        let (fingerprint, rest) = rest.split_at(FINGERPRINT_LENGTH);
        let (nonce, ciphertext) = rest.split_at(NONCE_LENGTH);
        let mut fingerprint_bytes = [0u8; FINGERPRINT_LENGTH];
        fingerprint_bytes.copy_from_slice(fingerprint);
        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        nonce_bytes.copy_from_slice(nonce);

        Ok(Self {
            version,
            fingerprint: KeyFingerprint::from_bytes(fingerprint_bytes),
            nonce: nonce_bytes,
            ciphertext: ciphertext.to_vec(),
        })
    }

    /// Encode as standard base64 text.
    pub fn to_base64(&self) -> String {
        Base64::encode_string(&self.to_bytes())
    }

    /// Decode from standard base64 text.
    pub fn from_base64(text: &str) -> Result<Self> {
        let bytes = Base64::decode_vec(text).map_err(|e| CryptoError::InvalidBlob {
            reason: format!("invalid base64: {e}"),
        })?;
        Self::from_bytes(&bytes)
    }
}

/// Seals and opens individual values.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncryptedFieldCodec;

impl EncryptedFieldCodec {
    /// Encrypt `plaintext` under `key`, authenticating `aad` alongside it.
    ///
    /// A fresh random nonce is drawn for every call, so sealing the same
    /// value twice yields different blobs.
    pub fn encrypt(plaintext: &[u8], key: &SymmetricKey, aad: &[u8]) -> Result<EncryptedBlob> {
        let cipher =
            Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|e| CryptoError::EncryptionFailed {
                reason: format!("Failed to create cipher: {e}"),
            })?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(
                &nonce,
                Payload {
                    msg: plaintext,
                    aad,
                },
            )
            .map_err(|e| CryptoError::EncryptionFailed {
                reason: format!("AES-GCM encryption failed: {e}"),
            })?;

        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        nonce_bytes.copy_from_slice(nonce.as_slice());
        Ok(EncryptedBlob {
            version: BLOB_VERSION,
            fingerprint: key.fingerprint(),
            nonce: nonce_bytes,
            ciphertext,
        })
    }

    /// Decrypt a blob produced by [`EncryptedFieldCodec::encrypt`].
    ///
    /// Fails with `StaleKey` when the blob names a different key than `key`,
    /// and with `DecryptionFailed` when the tag does not verify.
    pub fn decrypt(
        blob: &EncryptedBlob,
        key: &SymmetricKey,
        aad: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>> {
        if blob.version != BLOB_VERSION {
            return Err(CryptoError::UnsupportedBlobVersion {
                version: blob.version,
            }
            .into());
        }
        if blob.fingerprint != key.fingerprint() {
            return Err(CryptoError::StaleKey {
                expected: key.fingerprint(),
                found: blob.fingerprint,
            }
            .into());
        }

        let cipher =
            Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|e| CryptoError::DecryptionFailed {
                reason: format!("Failed to create cipher: {e}"),
            })?;
        let plaintext = cipher
            .decrypt(
                Nonce::from_slice(&blob.nonce),
                Payload {
                    msg: &blob.ciphertext,
                    aad,
                },
            )
            .map_err(|_| CryptoError::DecryptionFailed {
                reason: "authentication tag mismatch".to_string(),
            })?;
        Ok(Zeroizing::new(plaintext))
    }

    /// Encrypt straight to the binary layout.
    pub fn seal(plaintext: &[u8], key: &SymmetricKey, aad: &[u8]) -> Result<Vec<u8>> {
        Ok(Self::encrypt(plaintext, key, aad)?.to_bytes())
    }

    /// Parse and decrypt the binary layout.
    pub fn open(sealed: &[u8], key: &SymmetricKey, aad: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        Self::decrypt(&EncryptedBlob::from_bytes(sealed)?, key, aad)
    }
}
