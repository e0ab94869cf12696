//! Key lookup and in-process key management

use std::collections::HashMap;
use std::fmt::Debug;

use argon2::{
    Argon2,
    password_hash::{SaltString, rand_core},
};
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};
use zeroize::Zeroizing;

use super::{
    CryptoError, EncryptedBlob, EncryptedFieldCodec, KEY_LENGTH, KeyFingerprint, KeyScope,
    SymmetricKey,
};
use crate::Result;

/// Salt string length for Argon2 (base64 encoded, 22 chars)
pub const SALT_LENGTH: usize = 22;

const WRAP_DOMAIN: &[u8] = b"vaultkeep/wrapped-key/v1/";

/// Source of the symmetric key for each scope.
///
/// Lookups are reads: implementations must not create keys on demand. A scope
/// without a key fails with [`CryptoError::KeyUnavailable`].
#[async_trait]
pub trait SymmetricKeyProvider: Send + Sync + Debug {
    /// Return the current key for `scope`.
    async fn symmetric_key(&self, scope: &KeyScope) -> Result<SymmetricKey>;
}

/// Generate a random salt for [`KeyRing::derive_from_password`].
pub fn generate_salt() -> String {
    SaltString::generate(&mut rand_core::OsRng)
        .as_str()
        .to_string()
}

/// In-memory key store implementing [`SymmetricKeyProvider`].
///
/// Keys are provisioned explicitly (login, unlock) and removed explicitly
/// (logout). Replaced or removed keys are zeroized.
#[derive(Debug, Default)]
pub struct KeyRing {
    keys: RwLock<HashMap<KeyScope, SymmetricKey>>,
}

impl KeyRing {
    /// Create an empty key ring.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `key` for `scope`, replacing any previous key.
    pub async fn provision(&self, scope: KeyScope, key: SymmetricKey) -> KeyFingerprint {
        let fingerprint = key.fingerprint();
        debug!(%scope, %fingerprint, "Provisioning symmetric key");
        self.keys.write().await.insert(scope, key);
        fingerprint
    }

    /// Install a fresh random key for `scope`.
    pub async fn generate(&self, scope: KeyScope) -> KeyFingerprint {
        self.provision(scope, SymmetricKey::generate()).await
    }

    /// Derive the key for `scope` from a password using Argon2id.
    ///
    /// `salt` must be a base64 salt string as returned by [`generate_salt`].
    pub async fn derive_from_password(
        &self,
        scope: KeyScope,
        password: impl AsRef<str>,
        salt: impl AsRef<str>,
    ) -> Result<KeyFingerprint> {
        let salt_str = salt.as_ref();
        if salt_str.len() != SALT_LENGTH {
            return Err(CryptoError::KeyDerivationFailed {
                reason: format!(
                    "salt must be {SALT_LENGTH} characters, got {}",
                    salt_str.len()
                ),
            }
            .into());
        }
        let salt = SaltString::from_b64(salt_str).map_err(|e| CryptoError::KeyDerivationFailed {
            reason: format!("Invalid salt format: {e}"),
        })?;

        let mut derived = Zeroizing::new([0u8; KEY_LENGTH]);
        Argon2::default()
            .hash_password_into(
                password.as_ref().as_bytes(),
                salt.as_str().as_bytes(),
                &mut *derived,
            )
            .map_err(|e| CryptoError::KeyDerivationFailed {
                reason: e.to_string(),
            })?;

        Ok(self
            .provision(scope, SymmetricKey::from_bytes(*derived))
            .await)
    }

    /// Replace the key for `scope` with a fresh random one.
    ///
    /// Values sealed under the old key report `StaleKey` afterwards; nothing
    /// is re-encrypted.
    pub async fn rotate(&self, scope: KeyScope) -> Result<KeyFingerprint> {
        let mut keys = self.keys.write().await;
        let Some(current) = keys.get_mut(&scope) else {
            return Err(CryptoError::KeyUnavailable { scope }.into());
        };
        let previous = current.fingerprint();
        *current = SymmetricKey::generate();
        let fingerprint = current.fingerprint();
        info!(%scope, %previous, %fingerprint, "Rotated symmetric key");
        Ok(fingerprint)
    }

    /// Remove and wipe the key for `scope`. Returns whether one was present.
    pub async fn destroy(&self, scope: &KeyScope) -> bool {
        let removed = self.keys.write().await.remove(scope).is_some();
        if removed {
            debug!(%scope, "Destroyed symmetric key");
        }
        removed
    }

    /// Remove and wipe every key.
    pub async fn clear(&self) {
        self.keys.write().await.clear();
    }

    /// Check whether `scope` has a key.
    pub async fn is_provisioned(&self, scope: &KeyScope) -> bool {
        self.keys.read().await.contains_key(scope)
    }

    /// Fingerprint of the current key for `scope`.
    pub async fn fingerprint(&self, scope: &KeyScope) -> Option<KeyFingerprint> {
        self.keys.read().await.get(scope).map(|k| k.fingerprint())
    }

    /// Seal the key for `scope` under `wrapping_key` for storage in an
    /// external keychain.
    pub async fn export_wrapped(
        &self,
        scope: &KeyScope,
        wrapping_key: &SymmetricKey,
    ) -> Result<EncryptedBlob> {
        let key = self.symmetric_key(scope).await?;
        EncryptedFieldCodec::encrypt(key.as_bytes(), wrapping_key, &wrap_aad(scope))
    }

    /// Restore a key sealed by [`KeyRing::export_wrapped`].
    ///
    /// The blob only opens for the scope it was exported from.
    pub async fn import_wrapped(
        &self,
        scope: KeyScope,
        wrapped: &EncryptedBlob,
        wrapping_key: &SymmetricKey,
    ) -> Result<KeyFingerprint> {
        let bytes = EncryptedFieldCodec::decrypt(wrapped, wrapping_key, &wrap_aad(&scope))?;
        let key = SymmetricKey::from_slice(&bytes)?;
        Ok(self.provision(scope, key).await)
    }
}

fn wrap_aad(scope: &KeyScope) -> Vec<u8> {
    let mut aad = WRAP_DOMAIN.to_vec();
    aad.extend_from_slice(scope.to_string().as_bytes());
    aad
}

#[async_trait]
impl SymmetricKeyProvider for KeyRing {
    async fn symmetric_key(&self, scope: &KeyScope) -> Result<SymmetricKey> {
        self.keys
            .read()
            .await
            .get(scope)
            .cloned()
            .ok_or_else(|| {
                CryptoError::KeyUnavailable {
                    scope: scope.clone(),
                }
                .into()
            })
    }
}
