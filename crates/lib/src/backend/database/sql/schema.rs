//! Table layout of the SQL row store.
//!
//! All logical tables share `vault_rows`. `row_sequence` hands out the
//! insertion sequence that breaks ordering ties, and `schema_version` stamps
//! the layout a database was created with. A database stamped with any other
//! version is refused instead of being read with the wrong layout.

use sqlx::{Any, Transaction};
use tracing::info;

use super::{SqlxBackend, SqlxResultExt};
use crate::Result;
use crate::backend::BackendError;

/// Layout version written into new databases.
pub const SCHEMA_VERSION: i64 = 1;

/// Statements creating the layout. Portable between SQLite and PostgreSQL.
const CREATE_STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS schema_version (
        version BIGINT PRIMARY KEY
    )",
    // scope is 'device' or 'user:<id>'; key_path is the JSON array of key parts.
    // meta holds plaintext JSON attributes, sealed the base64 ciphertext.
    "CREATE TABLE IF NOT EXISTS vault_rows (
        table_name TEXT NOT NULL,
        scope TEXT NOT NULL,
        key_path TEXT NOT NULL,
        sort_key BIGINT NOT NULL,
        seq BIGINT NOT NULL,
        meta TEXT NOT NULL,
        sealed TEXT NOT NULL,
        PRIMARY KEY (table_name, scope, key_path)
    )",
    "CREATE TABLE IF NOT EXISTS row_sequence (
        id BIGINT PRIMARY KEY,
        next_seq BIGINT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_vault_rows_order ON vault_rows(table_name, scope, sort_key, seq)",
    "CREATE INDEX IF NOT EXISTS idx_vault_rows_table_sort ON vault_rows(table_name, sort_key)",
];

/// Create the layout on first use, or check the stamp of an existing one.
pub(crate) async fn initialize(backend: &SqlxBackend) -> Result<()> {
    let mut tx = backend
        .pool()
        .begin()
        .await
        .sql_context("Failed to begin schema setup")?;

    for statement in CREATE_STATEMENTS {
        sqlx::query(statement)
            .execute(&mut *tx)
            .await
            .sql_context(&format!("Schema statement failed: {statement}"))?;
    }

    match stored_version(&mut tx).await? {
        None => {
            sqlx::query("INSERT INTO schema_version (version) VALUES ($1)")
                .bind(SCHEMA_VERSION)
                .execute(&mut *tx)
                .await
                .sql_context("Failed to stamp schema version")?;
            info!(version = SCHEMA_VERSION, "Created vault schema");
        }
        Some(found) if found == SCHEMA_VERSION => {}
        Some(found) => {
            return Err(BackendError::UnsupportedVersion {
                format: "SQL schema",
                found,
                supported: SCHEMA_VERSION,
            }
            .into());
        }
    }

    sqlx::query("INSERT INTO row_sequence (id, next_seq) VALUES (1, 0) ON CONFLICT (id) DO NOTHING")
        .execute(&mut *tx)
        .await
        .sql_context("Failed to initialize row sequence")?;

    tx.commit().await.sql_context("Failed to commit schema setup")
}

async fn stored_version(tx: &mut Transaction<'_, Any>) -> Result<Option<i64>> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT version FROM schema_version")
        .fetch_optional(&mut **tx)
        .await
        .sql_context("Failed to read schema version")?;
    Ok(row.map(|(version,)| version))
}
