use std::fmt;

use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::CryptoError;
use crate::Result;

/// Symmetric key length for AES-256 (32 bytes)
pub const KEY_LENGTH: usize = 32;

/// Length of a key fingerprint in bytes
pub const FINGERPRINT_LENGTH: usize = 8;

const FINGERPRINT_DOMAIN: &[u8] = b"vaultkeep/key-fingerprint/v1";

/// Owner of a symmetric key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyScope {
    /// Install-wide key, available before any account logs in.
    Device,
    /// Key of one logged-in account.
    User(String),
}

impl KeyScope {
    /// Scope for a user id.
    pub fn user(user_id: impl Into<String>) -> Self {
        KeyScope::User(user_id.into())
    }
}

impl fmt::Display for KeyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyScope::Device => write!(f, "device"),
            KeyScope::User(id) => write!(f, "user {id}"),
        }
    }
}

/// Short public identifier of a key.
///
/// Recorded in every blob so a value sealed under a replaced key can be told
/// apart from a corrupted one.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyFingerprint([u8; FINGERPRINT_LENGTH]);

impl KeyFingerprint {
    /// Wrap raw fingerprint bytes.
    pub fn from_bytes(bytes: [u8; FINGERPRINT_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Raw fingerprint bytes.
    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_LENGTH] {
        &self.0
    }
}

impl fmt::Display for KeyFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for KeyFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyFingerprint({self})")
    }
}

/// A 256-bit symmetric key, wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey {
    bytes: [u8; KEY_LENGTH],
    #[zeroize(skip)]
    fingerprint: KeyFingerprint,
}

impl SymmetricKey {
    /// Build a key from exactly [`KEY_LENGTH`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; KEY_LENGTH] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyLength {
                    expected: KEY_LENGTH,
                    actual: bytes.len(),
                })?;
        Ok(Self::from_bytes(bytes))
    }

    /// Build a key from an owned array.
    pub fn from_bytes(bytes: [u8; KEY_LENGTH]) -> Self {
        let digest = Sha256::new()
            .chain_update(FINGERPRINT_DOMAIN)
            .chain_update(bytes)
            .finalize();
        let mut fingerprint = [0u8; FINGERPRINT_LENGTH];
        fingerprint.copy_from_slice(&digest[..FINGERPRINT_LENGTH]);
        Self {
            bytes,
            fingerprint: KeyFingerprint(fingerprint),
        }
    }

    /// Generate a fresh random key from the OS RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LENGTH];
        OsRng.fill_bytes(&mut bytes);
        let key = Self::from_bytes(bytes);
        bytes.zeroize();
        key
    }

    /// Raw key material.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.bytes
    }

    /// Public fingerprint of this key.
    pub fn fingerprint(&self) -> KeyFingerprint {
        self.fingerprint
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("fingerprint", &self.fingerprint)
            .finish_non_exhaustive()
    }
}

impl PartialEq for SymmetricKey {
    fn eq(&self, other: &Self) -> bool {
        self.fingerprint == other.fingerprint && self.bytes == other.bytes
    }
}

impl Eq for SymmetricKey {}
