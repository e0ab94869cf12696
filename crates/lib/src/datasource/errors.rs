//! Error types for the datasource layer.

use thiserror::Error;

/// Errors raised while turning records into rows and back.
///
/// Absence is never an error here: reads return `None` or an empty list.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DatasourceError {
    /// A record could not be serialized before sealing.
    #[error("Failed to encode record for table {table}")]
    EncodeFailed {
        /// Table being written
        table: &'static str,
        /// The underlying serialization error
        #[source]
        source: serde_json::Error,
    },

    /// An opened payload or its plaintext attributes did not decode.
    #[error("Failed to decode record from table {table}")]
    DecodeFailed {
        /// Table being read
        table: &'static str,
        /// The underlying deserialization error
        #[source]
        source: serde_json::Error,
    },

    /// An operation that modifies an existing record found none.
    #[error("No record {key} in table {table}")]
    RecordNotFound {
        /// Table that was searched
        table: &'static str,
        /// Rendered key of the missing record
        key: String,
    },

    /// A record violates a constraint of its datasource.
    #[error("Invalid record for table {table}: {reason}")]
    InvalidRecord {
        /// Table being written
        table: &'static str,
        /// Description of the violation
        reason: String,
    },
}

impl DatasourceError {
    /// Check if this error indicates a record was not found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DatasourceError::RecordNotFound { .. })
    }

    /// Check if a record could not be encoded, decoded or validated.
    pub fn is_record_error(&self) -> bool {
        matches!(
            self,
            DatasourceError::EncodeFailed { .. }
                | DatasourceError::DecodeFailed { .. }
                | DatasourceError::InvalidRecord { .. }
        )
    }
}

impl From<DatasourceError> for crate::Error {
    fn from(err: DatasourceError) -> Self {
        crate::Error::Datasource(err)
    }
}
