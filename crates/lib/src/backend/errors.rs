//! Storage error types for the Vaultkeep backend.
//!
//! This module defines structured error types for row store operations.

use thiserror::Error;

/// Errors that can occur during backend operations.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Existing variants will not be removed in minor versions
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BackendError {
    /// Serialization failed.
    #[error("Serialization failed")]
    SerializationFailed {
        /// The underlying serialization error
        #[source]
        source: serde_json::Error,
    },

    /// Deserialization failed.
    #[error("Deserialization failed")]
    DeserializationFailed {
        /// The underlying deserialization error
        #[source]
        source: serde_json::Error,
    },

    /// File I/O error.
    #[error("File I/O error")]
    FileIo {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A stored row could not be decoded.
    #[error("Invalid row in table {table}: {reason}")]
    InvalidRow {
        /// Table holding the row
        table: String,
        /// Description of the problem
        reason: String,
    },

    /// Stored data was written in a layout this build does not read.
    #[error("Unsupported {format} version {found}; expected {supported}")]
    UnsupportedVersion {
        /// Which stored layout was checked
        format: &'static str,
        /// Version found in storage
        found: i64,
        /// Version this build reads and writes
        supported: i64,
    },

    /// SQL database error from sqlx.
    #[cfg(any(feature = "sqlite", feature = "postgres"))]
    #[error("SQL error: {reason}")]
    SqlxError {
        /// Description of the SQL error
        reason: String,
        /// The underlying sqlx error, if available
        #[source]
        source: Option<sqlx::Error>,
    },
}

impl BackendError {
    /// Check if the underlying storage failed.
    pub fn is_storage_failure(&self) -> bool {
        match self {
            BackendError::FileIo { .. } => true,
            #[cfg(any(feature = "sqlite", feature = "postgres"))]
            BackendError::SqlxError { .. } => true,
            _ => false,
        }
    }

    /// Check if this error is I/O related.
    pub fn is_io_error(&self) -> bool {
        matches!(
            self,
            BackendError::FileIo { .. }
                | BackendError::SerializationFailed { .. }
                | BackendError::DeserializationFailed { .. }
        )
    }

    /// Check if stored data could not be interpreted.
    pub fn is_integrity_error(&self) -> bool {
        matches!(
            self,
            BackendError::InvalidRow { .. }
                | BackendError::DeserializationFailed { .. }
                | BackendError::UnsupportedVersion { .. }
        )
    }

    /// Check if this error came from the SQL layer.
    pub fn is_sql_error(&self) -> bool {
        #[cfg(any(feature = "sqlite", feature = "postgres"))]
        {
            matches!(self, BackendError::SqlxError { .. })
        }
        #[cfg(not(any(feature = "sqlite", feature = "postgres")))]
        {
            false
        }
    }
}

impl From<BackendError> for crate::Error {
    fn from(err: BackendError) -> Self {
        crate::Error::Backend(err)
    }
}
