//! Persistence operations for the InMemory store
//!
//! Tables are written as JSON lists of rows. Sealed payloads are base64
//! encoded; they stay encrypted on disk.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use super::{InMemory, TableRows, Tables};
use crate::{
    Error, Result,
    backend::{BackendError, Row},
};

/// The current persistence file format version.
/// v0 indicates this is an unstable format subject to breaking changes.
const PERSISTENCE_VERSION: u8 = 0;

/// Helper to check if version is default (0) for serde skip_serializing_if
fn is_v0(v: &u8) -> bool {
    *v == 0
}

/// Serializable form of the InMemory store.
#[derive(Serialize, Deserialize)]
struct SerializableStore {
    /// File format version for compatibility checking
    #[serde(rename = "_v", default, skip_serializing_if = "is_v0")]
    version: u8,
    #[serde(default)]
    next_seq: i64,
    #[serde(default)]
    tables: std::collections::BTreeMap<String, Vec<Row>>,
}

impl SerializableStore {
    fn into_tables(self) -> Result<Tables> {
        if self.version != PERSISTENCE_VERSION {
            return Err(BackendError::UnsupportedVersion {
                format: "state file",
                found: self.version.into(),
                supported: PERSISTENCE_VERSION.into(),
            }
            .into());
        }
        let mut tables = Tables {
            next_seq: self.next_seq,
            ..Tables::default()
        };
        for (name, rows) in self.tables {
            let mut table_rows = TableRows::new();
            for row in rows {
                // keep the counter ahead of every stored sequence
                tables.next_seq = tables.next_seq.max(row.seq);
                if table_rows.insert(row.key.clone(), row).is_some() {
                    return Err(BackendError::InvalidRow {
                        table: name,
                        reason: "duplicate key in saved state".to_string(),
                    }
                    .into());
                }
            }
            tables.rows.insert(name, table_rows);
        }
        Ok(tables)
    }
}

/// Saves every table to a specified file as JSON.
pub(crate) async fn save_to_file<P: AsRef<Path>>(store: &InMemory, path: P) -> Result<()> {
    let serializable = {
        let tables = store.tables.read().await;
        SerializableStore {
            version: PERSISTENCE_VERSION,
            next_seq: tables.next_seq,
            tables: tables
                .rows
                .iter()
                .filter(|(_, rows)| !rows.is_empty())
                .map(|(name, rows)| (name.clone(), rows.values().cloned().collect()))
                .collect(),
        }
    };

    let json = serde_json::to_string_pretty(&serializable)
        .map_err(|e| -> Error { BackendError::SerializationFailed { source: e }.into() })?;
    tokio::fs::write(path.as_ref(), json)
        .await
        .map_err(|e| -> Error { BackendError::FileIo { source: e }.into() })?;
    info!(path = %path.as_ref().display(), tables = serializable.tables.len(), "Saved in-memory store");
    Ok(())
}

/// Loads the store from a specified JSON file.
///
/// If the file does not exist, a new, empty `InMemory` store is returned.
pub(crate) async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<InMemory> {
    match tokio::fs::read_to_string(path.as_ref()).await {
        Ok(json) => {
            let serializable: SerializableStore = serde_json::from_str(&json).map_err(|e| -> Error {
                BackendError::DeserializationFailed { source: e }.into()
            })?;
            Ok(InMemory {
                tables: RwLock::new(serializable.into_tables()?),
            })
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(InMemory::new()),
        Err(e) => Err(BackendError::FileIo { source: e }.into()),
    }
}
