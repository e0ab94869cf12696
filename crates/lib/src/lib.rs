//!
//! Vaultkeep: encrypted, per-user local storage for password manager clients.
//!
//! Every value written through this crate is sealed with a symmetric key
//! belonging to its owner before it reaches storage, and opened again
//! transparently on read. One on-device store can hold any number of
//! accounts; no datasource operation can observe another user's rows.
//!
//! ## Core Concepts
//!
//! * **Keys (`crypto::SymmetricKeyProvider`)**: Supplies the AES-256 key for a
//!   [`crypto::KeyScope`], either a user or the install-wide device scope.
//!   [`crypto::KeyRing`] is the in-process implementation.
//! * **Codec (`crypto::EncryptedFieldCodec`)**: AES-256-GCM sealing into
//!   self-describing [`crypto::EncryptedBlob`]s that remember which key made them.
//! * **Backends (`backend::RowStore`)**: A queryable row store holding plaintext
//!   index attributes next to the sealed payload. [`backend::InMemory`] and the
//!   SQL backends (`sqlite`, `postgres` features) implement it.
//! * **Datasources (`datasource`)**: One typed datasource per stored entity
//!   (items, shares, credentials, telemetry, ...), all built on the generic
//!   [`datasource::EncryptedTable`].
//! * **LocalStore (`store::LocalStore`)**: The handle applications hold. It owns
//!   the backend, key provider and clock, and hands out datasources.

pub mod backend;
pub mod clock;
pub mod config;
pub mod constants;
pub mod crypto;
pub mod datasource;
pub mod store;

pub use clock::{Clock, SystemClock};
#[cfg(any(test, feature = "testing"))]
pub use clock::{ClockHold, FixedClock};
pub use config::{BackendConfig, ConfigError, StoreConfig};
pub use store::LocalStore;

/// Result type used throughout the Vaultkeep library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the Vaultkeep library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured key and cipher errors from the crypto module
    #[error(transparent)]
    Crypto(crypto::CryptoError),

    /// Structured storage errors from the backend module
    #[error(transparent)]
    Backend(backend::BackendError),

    /// Structured record errors from the datasource module
    #[error(transparent)]
    Datasource(datasource::DatasourceError),

    /// Configuration errors from the config module
    #[error(transparent)]
    Config(config::ConfigError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Crypto(_) => "crypto",
            Error::Backend(_) => "backend",
            Error::Datasource(_) => "datasource",
            Error::Config(_) => "config",
            Error::Io(_) => "io",
            Error::Serialize(_) => "serialize",
        }
    }

    /// Check if this error indicates a resource was not found.
    ///
    /// Plain reads never produce this; absence is reported as `None` or an
    /// empty list. Only operations that require an existing row do.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Datasource(err) => err.is_not_found(),
            _ => false,
        }
    }

    /// Check if no key is provisioned for the requested scope.
    pub fn is_key_unavailable(&self) -> bool {
        match self {
            Error::Crypto(err) => err.is_key_unavailable(),
            _ => false,
        }
    }

    /// Check if a stored value could not be opened.
    ///
    /// Covers tampered or corrupted blobs, wrong keys and stale keys.
    pub fn is_decryption_error(&self) -> bool {
        match self {
            Error::Crypto(err) => err.is_decryption_error(),
            _ => false,
        }
    }

    /// Check if a stored value was sealed under a key that has since been replaced.
    pub fn is_stale_key(&self) -> bool {
        match self {
            Error::Crypto(err) => err.is_stale_key(),
            _ => false,
        }
    }

    /// Check if this error is key or cipher related.
    pub fn is_crypto_error(&self) -> bool {
        matches!(self, Error::Crypto(_))
    }

    /// Check if the underlying storage failed.
    pub fn is_storage_failure(&self) -> bool {
        match self {
            Error::Io(_) => true,
            Error::Backend(err) => err.is_storage_failure(),
            _ => false,
        }
    }

    /// Check if this error is I/O related.
    pub fn is_io_error(&self) -> bool {
        match self {
            Error::Io(_) => true,
            Error::Backend(err) => err.is_io_error(),
            _ => false,
        }
    }

    /// Check if a stored record or its metadata could not be interpreted.
    pub fn is_integrity_error(&self) -> bool {
        match self {
            Error::Backend(err) => err.is_integrity_error(),
            Error::Datasource(err) => err.is_record_error(),
            Error::Crypto(err) => err.is_malformed_blob(),
            _ => false,
        }
    }

    /// Check if this error comes from configuration.
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}
