//! In-memory database backend implementation
//!
//! This module provides an in-memory implementation of the `RowStore` trait,
//! suitable for testing, development, or clients that persist the whole state
//! themselves through `save_to_file` / `load_from_file`.

mod persistence;

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::trace;

use crate::Result;
use crate::backend::{Row, RowFilter, RowKey, RowPatch, RowQuery, RowStore};

/// Rows of one table, ordered by key.
pub(crate) type TableRows = BTreeMap<RowKey, Row>;

/// Table contents and the insertion counter, guarded together so sequence
/// numbers follow commit order.
#[derive(Debug, Default)]
pub(crate) struct Tables {
    pub(crate) rows: HashMap<String, TableRows>,
    pub(crate) next_seq: i64,
}

/// A simple in-memory row store.
///
/// Payloads are already sealed by the datasource layer, so persisting this
/// store to disk never writes record contents in plaintext. Plaintext index
/// attributes (ids, timestamps, states) are written as-is.
#[derive(Debug, Default)]
pub struct InMemory {
    pub(crate) tables: RwLock<Tables>,
}

impl InMemory {
    /// Creates a new, empty `InMemory` store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of tables that currently hold at least one row.
    pub async fn table_names(&self) -> Vec<String> {
        let tables = self.tables.read().await;
        let mut names: Vec<String> = tables
            .rows
            .iter()
            .filter(|(_, rows)| !rows.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Total number of rows across all tables.
    pub async fn row_count(&self) -> usize {
        self.tables.read().await.rows.values().map(BTreeMap::len).sum()
    }

    /// Saves every table to a JSON file.
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        persistence::save_to_file(self, path).await
    }

    /// Loads a store from a JSON file.
    ///
    /// If the file does not exist, a new, empty `InMemory` store is returned.
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        persistence::load_from_file(path).await
    }
}

#[async_trait]
impl RowStore for InMemory {
    async fn get(&self, table: &str, key: &RowKey) -> Result<Option<Row>> {
        let tables = self.tables.read().await;
        Ok(tables.rows.get(table).and_then(|rows| rows.get(key)).cloned())
    }

    async fn scan(&self, table: &str, query: &RowQuery) -> Result<Vec<Row>> {
        let tables = self.tables.read().await;
        let Some(rows) = tables.rows.get(table) else {
            return Ok(Vec::new());
        };
        Ok(query.select(rows.values().cloned()))
    }

    async fn count(&self, table: &str, filter: &RowFilter) -> Result<usize> {
        let tables = self.tables.read().await;
        Ok(tables
            .rows
            .get(table)
            .map(|rows| rows.values().filter(|row| filter.matches(row)).count())
            .unwrap_or(0))
    }

    async fn upsert(&self, table: &str, rows: Vec<Row>) -> Result<()> {
        let mut tables = self.tables.write().await;
        let Tables {
            rows: all_rows,
            next_seq,
        } = &mut *tables;
        let table_rows = all_rows.entry(table.to_string()).or_default();
        trace!(table, count = rows.len(), "Upserting rows");

        for mut row in rows {
            row.seq = match table_rows.get(&row.key) {
                Some(existing) => existing.seq,
                None => {
                    *next_seq += 1;
                    *next_seq
                }
            };
            table_rows.insert(row.key.clone(), row);
        }
        Ok(())
    }

    async fn patch(&self, table: &str, key: &RowKey, patch: &RowPatch) -> Result<bool> {
        let mut tables = self.tables.write().await;
        match tables.rows.get_mut(table).and_then(|rows| rows.get_mut(key)) {
            Some(row) => {
                patch.apply(row);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, table: &str, keys: &[RowKey]) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.rows.get_mut(table) else {
            return Ok(0);
        };
        let removed = keys.iter().filter(|key| rows.remove(key).is_some()).count();
        Ok(removed as u64)
    }

    async fn delete_where(&self, table: &str, filter: &RowFilter) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.rows.get_mut(table) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|_, row| !filter.matches(row));
        let removed = (before - rows.len()) as u64;
        trace!(table, removed, "Deleted rows by filter");
        Ok(removed)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
