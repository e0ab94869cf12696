//! SQL row store for SQLite and PostgreSQL.
//!
//! [`SqlxBackend`] talks to either database through sqlx's `AnyPool`. Every
//! logical table lives in the single `vault_rows` table described in
//! [`schema`], keyed by `(table_name, scope, key_path)`.
//!
//! Scope and sort bounds are pushed into the `WHERE` clause. Key prefixes
//! and metadata equality are checked on the returned candidates with
//! [`RowFilter::matches`], the same test the in-memory store applies, so
//! both stores agree on every filter.

mod storage;

/// Table layout and version stamp.
pub mod schema;

use std::any::Any;
#[cfg(feature = "postgres")]
use std::time::Duration;

use async_trait::async_trait;
use sqlx::AnyPool;
#[cfg(feature = "postgres")]
use sqlx::Executor;
use sqlx::any::AnyPoolOptions;
use tracing::debug;

use crate::Result;
use crate::backend::{BackendError, Row, RowFilter, RowKey, RowPatch, RowQuery, RowStore};

/// Attach a context message to sqlx failures.
pub(crate) trait SqlxResultExt<T> {
    /// Map the error into [`BackendError::SqlxError`] prefixed with `context`.
    fn sql_context(self, context: &str) -> Result<T>;
}

impl<T> SqlxResultExt<T> for std::result::Result<T, sqlx::Error> {
    fn sql_context(self, context: &str) -> Result<T> {
        self.map_err(|e| {
            BackendError::SqlxError {
                reason: format!("{context}: {e}"),
                source: Some(e),
            }
            .into()
        })
    }
}

/// Row store over a SQLite file, a private in-memory SQLite database, or
/// a PostgreSQL server.
#[derive(Debug)]
pub struct SqlxBackend {
    pool: AnyPool,
}

impl SqlxBackend {
    /// Pool shared by every operation of this store.
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    async fn with_schema(pool: AnyPool) -> Result<Self> {
        let backend = Self { pool };
        schema::initialize(&backend).await?;
        Ok(backend)
    }
}

#[cfg(feature = "sqlite")]
impl SqlxBackend {
    /// Open the SQLite database file at `path`, creating it when missing.
    ///
    /// ```ignore
    /// let backend = SqlxBackend::open_sqlite("vault.db").await?;
    /// ```
    pub async fn open_sqlite<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let url = format!("sqlite:{}?mode=rwc", path.as_ref().display());
        Self::connect_sqlite(&url).await
    }

    /// Connect with a SQLite URL such as `sqlite:./vault.db`.
    pub async fn connect_sqlite(url: &str) -> Result<Self> {
        sqlx::any::install_default_drivers();

        let in_memory = url.contains("mode=memory");
        let mut options = AnyPoolOptions::new().max_connections(5);
        if in_memory {
            // The shared-cache database disappears with its last connection
            options = options
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = options
            .connect(url)
            .await
            .sql_context("Failed to connect to SQLite")?;

        // WAL lets readers proceed during the writes of another connection
        let pragmas = if in_memory {
            "PRAGMA busy_timeout = 5000;"
        } else {
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;"
        };
        sqlx::query(pragmas)
            .execute(&pool)
            .await
            .sql_context("Failed to configure SQLite")?;

        debug!(in_memory, "Opened SQLite row store");
        Self::with_schema(pool).await
    }

    /// A private in-memory SQLite database living as long as this store.
    pub async fn sqlite_in_memory() -> Result<Self> {
        let name = uuid::Uuid::new_v4();
        Self::connect_sqlite(&format!("sqlite:file:vault_{name}?mode=memory&cache=shared")).await
    }
}

#[cfg(feature = "postgres")]
impl SqlxBackend {
    /// Connect with a PostgreSQL URL, using the server's default schema.
    pub async fn connect_postgres(url: &str) -> Result<Self> {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .sql_context("Failed to connect to PostgreSQL")?;
        Self::with_schema(pool).await
    }

    /// Connect inside a freshly created schema of its own.
    ///
    /// Stores opened this way never see each other's rows, which lets tests
    /// share one server.
    pub async fn connect_postgres_isolated(url: &str) -> Result<Self> {
        sqlx::any::install_default_drivers();

        // Schema names must start with a letter
        let schema = format!("vault_{}", uuid::Uuid::new_v4().simple());
        let setup = AnyPoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await
            .sql_context("Failed to connect to PostgreSQL")?;
        sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {schema}"))
            .execute(&setup)
            .await
            .sql_context(&format!("Failed to create schema {schema}"))?;
        setup.close().await;

        let search_path = format!("SET search_path TO {schema}");
        // Small pools so parallel tests stay under the server's connection cap
        let pool = AnyPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(30))
            .after_connect(move |conn, _meta| {
                let search_path = search_path.clone();
                Box::pin(async move {
                    conn.execute(search_path.as_str()).await?;
                    Ok(())
                })
            })
            .connect(url)
            .await
            .sql_context("Failed to connect to PostgreSQL")?;

        debug!(schema = %schema, "Opened isolated PostgreSQL row store");
        Self::with_schema(pool).await
    }
}

#[async_trait]
impl RowStore for SqlxBackend {
    async fn get(&self, table: &str, key: &RowKey) -> Result<Option<Row>> {
        storage::get(self, table, key).await
    }

    async fn scan(&self, table: &str, query: &RowQuery) -> Result<Vec<Row>> {
        storage::scan(self, table, query).await
    }

    async fn upsert(&self, table: &str, rows: Vec<Row>) -> Result<()> {
        storage::upsert(self, table, rows).await
    }

    async fn patch(&self, table: &str, key: &RowKey, patch: &RowPatch) -> Result<bool> {
        storage::patch(self, table, key, patch).await
    }

    async fn delete(&self, table: &str, keys: &[RowKey]) -> Result<u64> {
        storage::delete(self, table, keys).await
    }

    async fn delete_where(&self, table: &str, filter: &RowFilter) -> Result<u64> {
        storage::delete_where(self, table, filter).await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
