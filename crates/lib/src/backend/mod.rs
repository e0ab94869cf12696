//! Backend implementations for Vaultkeep storage
//!
//! This module provides the core `RowStore` trait and its implementations
//! organized by category.
//!
//! A row store is a set of named tables. Each row has a [`RowKey`] made of an
//! owning [`Scope`] and secondary key parts, a sort column, plaintext
//! attributes used for filtering, and an opaque sealed payload. The store
//! never sees plaintext record contents; datasources seal and open payloads.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use handle_trait::Handle;

use crate::Result;

pub mod database;
mod errors;
mod types;

pub use database::InMemory;
pub use errors::BackendError;
pub use types::{Meta, Row, RowFilter, RowKey, RowPatch, RowQuery, Scope, SortOrder};

/// Storage trait behind every datasource.
///
/// All implementations must be `Send` and `Sync` to allow sharing across tasks,
/// and implement `Any` to allow for downcasting if needed.
///
/// ## Contract
///
/// - `upsert` inserts or fully replaces each row by key. A batch is applied
///   atomically: either every row is written or none is.
/// - `seq` is assigned from a store-wide counter on first insert and kept
///   when a row is replaced or patched.
/// - Reads of absent keys return `None` or an empty list, never an error.
/// - `scan` honours [`RowQuery::select`] semantics exactly.
#[async_trait]
pub trait RowStore: Send + Sync + Any {
    /// Fetch one row.
    async fn get(&self, table: &str, key: &RowKey) -> Result<Option<Row>>;

    /// Fetch the rows matching `query`, ordered and limited.
    async fn scan(&self, table: &str, query: &RowQuery) -> Result<Vec<Row>>;

    /// Count rows matching `filter`.
    async fn count(&self, table: &str, filter: &RowFilter) -> Result<usize> {
        Ok(self.scan(table, &RowQuery::new(filter.clone())).await?.len())
    }

    /// Insert or replace a batch of rows atomically.
    async fn upsert(&self, table: &str, rows: Vec<Row>) -> Result<()>;

    /// Update plaintext columns of an existing row, leaving the payload alone.
    ///
    /// Returns `false` when the row does not exist.
    async fn patch(&self, table: &str, key: &RowKey, patch: &RowPatch) -> Result<bool>;

    /// Delete rows by key; absent keys are ignored. Returns the number removed.
    async fn delete(&self, table: &str, keys: &[RowKey]) -> Result<u64>;

    /// Delete every row matching `filter`. Returns the number removed.
    async fn delete_where(&self, table: &str, filter: &RowFilter) -> Result<u64>;

    /// Returns a reference to the store as a dynamic `Any` type.
    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to a row store.
///
/// Cloning is cheap; all clones talk to the same store.
#[derive(Clone, Handle)]
pub struct Backend {
    store: Arc<dyn RowStore>,
}

impl Backend {
    /// Wrap a row store.
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self { store }
    }

    /// Access the underlying store, e.g. to downcast it.
    pub fn store(&self) -> &Arc<dyn RowStore> {
        &self.store
    }

    /// Downcast to a concrete store type.
    pub fn downcast_ref<T: RowStore>(&self) -> Option<&T> {
        self.store.as_any().downcast_ref::<T>()
    }

    /// Fetch one row.
    pub async fn get(&self, table: &str, key: &RowKey) -> Result<Option<Row>> {
        self.store.get(table, key).await
    }

    /// Fetch rows matching a query.
    pub async fn scan(&self, table: &str, query: &RowQuery) -> Result<Vec<Row>> {
        self.store.scan(table, query).await
    }

    /// Count rows matching a filter.
    pub async fn count(&self, table: &str, filter: &RowFilter) -> Result<usize> {
        self.store.count(table, filter).await
    }

    /// Insert or replace rows atomically.
    pub async fn upsert(&self, table: &str, rows: Vec<Row>) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        self.store.upsert(table, rows).await
    }

    /// Patch plaintext columns of an existing row.
    pub async fn patch(&self, table: &str, key: &RowKey, patch: &RowPatch) -> Result<bool> {
        self.store.patch(table, key, patch).await
    }

    /// Delete rows by key.
    pub async fn delete(&self, table: &str, keys: &[RowKey]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        self.store.delete(table, keys).await
    }

    /// Delete rows matching a filter.
    pub async fn delete_where(&self, table: &str, filter: &RowFilter) -> Result<u64> {
        self.store.delete_where(table, filter).await
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend").finish_non_exhaustive()
    }
}
