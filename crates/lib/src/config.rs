//! Store configuration
//!
//! A [`StoreConfig`] names the storage backend a [`crate::LocalStore`] runs on.
//! It deserializes from JSON (or any serde format) and can be read from the
//! environment:
//!
//! | Variable | Meaning |
//! |---|---|
//! | `VAULTKEEP_BACKEND` | `inmemory` (default), `sqlite`, `sqlite-memory` or `postgres` |
//! | `VAULTKEEP_STATE_FILE` | With `inmemory`: JSON file loaded on open and written by `LocalStore::flush` |
//! | `VAULTKEEP_SQLITE_PATH` | Database file for `sqlite` |
//! | `VAULTKEEP_POSTGRES_URL` | Connection URL for `postgres` |

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    Result,
    backend::{Backend, database::InMemory},
};

/// Configuration errors.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The backend name is not recognised.
    #[error("Unknown backend '{name}'")]
    UnknownBackend {
        /// The name that was given
        name: String,
    },

    /// A setting required by the chosen backend is missing.
    #[error("Missing setting {setting} for backend {backend}")]
    MissingSetting {
        /// Backend that needs the setting
        backend: &'static str,
        /// Name of the missing setting
        setting: &'static str,
    },

    /// The backend exists but this build was compiled without it.
    #[error("Backend {backend} requires the '{feature}' feature")]
    FeatureDisabled {
        /// Backend that was requested
        backend: &'static str,
        /// Cargo feature that enables it
        feature: &'static str,
    },
}

impl From<ConfigError> for crate::Error {
    fn from(err: ConfigError) -> Self {
        crate::Error::Config(err)
    }
}

/// Storage backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Process memory, lost on drop.
    #[default]
    InMemory,
    /// Process memory, loaded from and flushed to a JSON file.
    InMemoryFile {
        /// File holding the saved state
        path: PathBuf,
    },
    /// SQLite database file, created if missing.
    Sqlite {
        /// Path to the database file
        path: PathBuf,
    },
    /// Private in-memory SQLite database.
    SqliteInMemory,
    /// PostgreSQL server.
    Postgres {
        /// Connection URL
        url: String,
    },
}

/// Top-level configuration for a [`crate::LocalStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    /// Where rows are stored
    #[serde(default)]
    pub backend: BackendConfig,
}

impl StoreConfig {
    /// Create a configuration for the given backend.
    pub fn new(backend: BackendConfig) -> Self {
        Self { backend }
    }

    /// Read the configuration from `VAULTKEEP_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let name = lookup("VAULTKEEP_BACKEND").unwrap_or_else(|| "inmemory".to_string());
        let backend = match name.to_ascii_lowercase().as_str() {
            "inmemory" | "memory" => match lookup("VAULTKEEP_STATE_FILE") {
                Some(path) => BackendConfig::InMemoryFile { path: path.into() },
                None => BackendConfig::InMemory,
            },
            "sqlite" => BackendConfig::Sqlite {
                path: lookup("VAULTKEEP_SQLITE_PATH")
                    .ok_or(ConfigError::MissingSetting {
                        backend: "sqlite",
                        setting: "VAULTKEEP_SQLITE_PATH",
                    })?
                    .into(),
            },
            "sqlite-memory" => BackendConfig::SqliteInMemory,
            "postgres" => BackendConfig::Postgres {
                url: lookup("VAULTKEEP_POSTGRES_URL").ok_or(ConfigError::MissingSetting {
                    backend: "postgres",
                    setting: "VAULTKEEP_POSTGRES_URL",
                })?,
            },
            _ => return Err(ConfigError::UnknownBackend { name }.into()),
        };
        Ok(Self { backend })
    }

    /// Open the configured backend.
    pub async fn open_backend(&self) -> Result<Backend> {
        match &self.backend {
            BackendConfig::InMemory => Ok(Backend::new(Arc::new(InMemory::new()))),
            BackendConfig::InMemoryFile { path } => Ok(Backend::new(Arc::new(
                InMemory::load_from_file(path).await?,
            ))),
            #[cfg(feature = "sqlite")]
            BackendConfig::Sqlite { path } => {
                let sqlite = crate::backend::database::SqlxBackend::open_sqlite(path).await?;
                Ok(Backend::new(Arc::new(sqlite)))
            }
            #[cfg(feature = "sqlite")]
            BackendConfig::SqliteInMemory => {
                let sqlite = crate::backend::database::SqlxBackend::sqlite_in_memory().await?;
                Ok(Backend::new(Arc::new(sqlite)))
            }
            #[cfg(not(feature = "sqlite"))]
            BackendConfig::Sqlite { .. } | BackendConfig::SqliteInMemory => {
                Err(ConfigError::FeatureDisabled {
                    backend: "sqlite",
                    feature: "sqlite",
                }
                .into())
            }
            #[cfg(feature = "postgres")]
            BackendConfig::Postgres { url } => {
                let postgres = crate::backend::database::SqlxBackend::connect_postgres(url).await?;
                Ok(Backend::new(Arc::new(postgres)))
            }
            #[cfg(not(feature = "postgres"))]
            BackendConfig::Postgres { .. } => Err(ConfigError::FeatureDisabled {
                backend: "postgres",
                feature: "postgres",
            }
            .into()),
        }
    }

    /// Path the in-memory backend is flushed to, if any.
    pub fn state_file(&self) -> Option<&PathBuf> {
        match &self.backend {
            BackendConfig::InMemoryFile { path } => Some(path),
            _ => None,
        }
    }
}
