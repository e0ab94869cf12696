//! Generic encrypted table
//!
//! [`EncryptedTable`] is the per-user keyed store every datasource is built on.
//! It maps a [`Scope`] to the matching [`KeyScope`], seals payloads with the
//! [`EncryptedFieldCodec`] using the table name and row key as associated
//! data, and opens them again on read.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::{debug, trace, warn};
use zeroize::Zeroizing;

use super::DatasourceError;
use crate::{
    Result,
    backend::{Backend, Meta, Row, RowFilter, RowKey, RowPatch, RowQuery, Scope},
    crypto::{EncryptedFieldCodec, KeyScope, SymmetricKey, SymmetricKeyProvider},
};

/// A value ready to be written to an [`EncryptedTable`].
#[derive(Debug, Clone)]
pub struct Record<T> {
    /// Row key
    pub key: RowKey,
    /// Ordering column
    pub sort: i64,
    /// Plaintext attributes for filtering
    pub meta: Meta,
    /// Value sealed into the payload
    pub value: T,
}

impl<T> Record<T> {
    /// Record with no plaintext attributes.
    pub fn new(key: RowKey, sort: i64, value: T) -> Self {
        Self {
            key,
            sort,
            meta: Meta::new(),
            value,
        }
    }

    /// Attach plaintext attributes.
    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = meta;
        self
    }
}

/// A row read back from an [`EncryptedTable`] with its payload opened.
#[derive(Debug, Clone)]
pub struct Opened<T> {
    /// Row key
    pub key: RowKey,
    /// Ordering column
    pub sort: i64,
    /// Plaintext attributes
    pub meta: Meta,
    /// Opened payload
    pub value: T,
}

/// Key for each scope a single call touches, fetched once.
#[derive(Default)]
struct KeyCache(HashMap<Scope, SymmetricKey>);

/// The key scope protecting rows in `scope`.
pub fn key_scope(scope: &Scope) -> KeyScope {
    match scope {
        Scope::Device => KeyScope::Device,
        Scope::User(id) => KeyScope::User(id.clone()),
    }
}

/// Serialize a value into plaintext row attributes.
pub fn to_meta<T: Serialize>(table: &'static str, value: &T) -> Result<Meta> {
    match serde_json::to_value(value)
        .map_err(|source| DatasourceError::EncodeFailed { table, source })?
    {
        Value::Object(map) => Ok(map),
        other => Err(DatasourceError::InvalidRecord {
            table,
            reason: format!("attributes must serialize to an object, got {other}"),
        }
        .into()),
    }
}

/// Deserialize plaintext row attributes.
pub fn from_meta<T: DeserializeOwned>(table: &'static str, meta: &Meta) -> Result<T> {
    serde_json::from_value(Value::Object(meta.clone()))
        .map_err(|source| DatasourceError::DecodeFailed { table, source }.into())
}

/// One logical table whose payloads are sealed per owner.
#[derive(Clone)]
pub struct EncryptedTable {
    name: &'static str,
    backend: Backend,
    keys: Arc<dyn SymmetricKeyProvider>,
}

impl fmt::Debug for EncryptedTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedTable")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl EncryptedTable {
    /// Bind a table name to a backend and key provider.
    pub fn new(name: &'static str, backend: Backend, keys: Arc<dyn SymmetricKeyProvider>) -> Self {
        Self {
            name,
            backend,
            keys,
        }
    }

    /// Table name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    async fn key_for<'a>(&self, cache: &'a mut KeyCache, scope: &Scope) -> Result<&'a SymmetricKey> {
        if !cache.0.contains_key(scope) {
            let key = self.keys.symmetric_key(&key_scope(scope)).await?;
            cache.0.insert(scope.clone(), key);
        }
        cache.0.get(scope).ok_or_else(|| {
            crate::crypto::CryptoError::KeyUnavailable {
                scope: key_scope(scope),
            }
            .into()
        })
    }

    fn seal_with(&self, key: &SymmetricKey, row_key: &RowKey, plaintext: &[u8]) -> Result<Vec<u8>> {
        EncryptedFieldCodec::seal(plaintext, key, &row_key.binding(self.name))
    }

    fn open_with(&self, key: &SymmetricKey, row: &Row) -> Result<Zeroizing<Vec<u8>>> {
        EncryptedFieldCodec::open(&row.sealed, key, &row.key.binding(self.name)).inspect_err(
            |err| {
                if err.is_stale_key() {
                    warn!(
                        table = self.name,
                        scope = %row.key.scope,
                        "Stored value was sealed under a replaced key"
                    );
                }
            },
        )
    }

    fn encode<T: Serialize>(&self, value: &T) -> Result<Zeroizing<Vec<u8>>> {
        serde_json::to_vec(value)
            .map(Zeroizing::new)
            .map_err(|source| {
                DatasourceError::EncodeFailed {
                    table: self.name,
                    source,
                }
                .into()
            })
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(|source| {
            DatasourceError::DecodeFailed {
                table: self.name,
                source,
            }
            .into()
        })
    }

    /// Insert or replace one record.
    pub async fn upsert<T: Serialize>(&self, record: Record<T>) -> Result<()> {
        self.upsert_many([record]).await
    }

    /// Insert or replace records atomically; all are sealed before any is written.
    pub async fn upsert_many<T, I>(&self, records: I) -> Result<()>
    where
        T: Serialize,
        I: IntoIterator<Item = Record<T>>,
    {
        let mut cache = KeyCache::default();
        let mut rows = Vec::new();
        for record in records {
            let plaintext = self.encode(&record.value)?;
            let key = self.key_for(&mut cache, &record.key.scope).await?;
            let sealed = self.seal_with(key, &record.key, &plaintext)?;
            rows.push(Row::new(record.key, record.sort, record.meta, sealed));
        }
        trace!(table = self.name, count = rows.len(), "Writing sealed rows");
        self.backend.upsert(self.name, rows).await
    }

    /// Insert or replace raw byte payloads atomically.
    pub async fn upsert_raw<I>(&self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = Record<Zeroizing<Vec<u8>>>>,
    {
        let mut cache = KeyCache::default();
        let mut rows = Vec::new();
        for record in records {
            let key = self.key_for(&mut cache, &record.key.scope).await?;
            let sealed = self.seal_with(key, &record.key, &record.value)?;
            rows.push(Row::new(record.key, record.sort, record.meta, sealed));
        }
        self.backend.upsert(self.name, rows).await
    }

    /// Fetch and open one record.
    pub async fn get<T: DeserializeOwned>(&self, key: &RowKey) -> Result<Option<T>> {
        Ok(self.get_entry(key).await?.map(|opened| opened.value))
    }

    /// Fetch one record together with its row columns.
    pub async fn get_entry<T: DeserializeOwned>(&self, key: &RowKey) -> Result<Option<Opened<T>>> {
        match self.backend.get(self.name, key).await? {
            Some(row) => Ok(self
                .open_rows(&mut KeyCache::default(), vec![row])
                .await?
                .pop()),
            None => Ok(None),
        }
    }

    /// Fetch one raw payload together with its row columns.
    pub async fn get_raw(&self, key: &RowKey) -> Result<Option<Opened<Zeroizing<Vec<u8>>>>> {
        match self.backend.get(self.name, key).await? {
            Some(row) => Ok(self
                .open_raw_rows(&mut KeyCache::default(), vec![row])
                .await?
                .pop()),
            None => Ok(None),
        }
    }

    /// Open every record matching `query`, preserving its order.
    pub async fn list<T: DeserializeOwned>(&self, query: &RowQuery) -> Result<Vec<T>> {
        Ok(self
            .list_entries(query)
            .await?
            .into_iter()
            .map(|opened| opened.value)
            .collect())
    }

    /// Like [`EncryptedTable::list`], keeping row columns.
    pub async fn list_entries<T: DeserializeOwned>(&self, query: &RowQuery) -> Result<Vec<Opened<T>>> {
        let rows = self.backend.scan(self.name, query).await?;
        self.open_rows(&mut KeyCache::default(), rows).await
    }

    /// Like [`EncryptedTable::list_entries`] for listings spanning owners.
    ///
    /// Rows of owners whose key is unavailable are left out instead of
    /// failing the call. Rows that fail to open under an available key
    /// still fail it.
    pub async fn list_unlocked_entries<T: DeserializeOwned>(
        &self,
        query: &RowQuery,
    ) -> Result<Vec<Opened<T>>> {
        let rows = self.backend.scan(self.name, query).await?;
        let mut cache = KeyCache::default();
        let mut locked = HashSet::new();
        let mut readable = Vec::with_capacity(rows.len());
        for row in rows {
            if locked.contains(&row.key.scope) {
                continue;
            }
            match self.key_for(&mut cache, &row.key.scope).await {
                Ok(_) => readable.push(row),
                Err(err) if err.is_key_unavailable() => {
                    debug!(
                        table = self.name,
                        scope = %row.key.scope,
                        "Skipping rows of an owner without a key"
                    );
                    locked.insert(row.key.scope.clone());
                }
                Err(err) => return Err(err),
            }
        }
        self.open_rows(&mut cache, readable).await
    }

    /// Like [`EncryptedTable::list`] for listings spanning owners.
    pub async fn list_unlocked<T: DeserializeOwned>(&self, query: &RowQuery) -> Result<Vec<T>> {
        Ok(self
            .list_unlocked_entries(query)
            .await?
            .into_iter()
            .map(|opened| opened.value)
            .collect())
    }

    /// Like [`EncryptedTable::list_entries`] for raw byte payloads.
    pub async fn list_raw(&self, query: &RowQuery) -> Result<Vec<Opened<Zeroizing<Vec<u8>>>>> {
        let rows = self.backend.scan(self.name, query).await?;
        self.open_raw_rows(&mut KeyCache::default(), rows).await
    }

    async fn open_raw_rows(
        &self,
        cache: &mut KeyCache,
        rows: Vec<Row>,
    ) -> Result<Vec<Opened<Zeroizing<Vec<u8>>>>> {
        let mut opened = Vec::with_capacity(rows.len());
        for row in rows {
            let key = self.key_for(cache, &row.key.scope).await?;
            let value = self.open_with(key, &row)?;
            opened.push(Opened {
                key: row.key,
                sort: row.sort,
                meta: row.meta,
                value,
            });
        }
        Ok(opened)
    }

    async fn open_rows<T: DeserializeOwned>(
        &self,
        cache: &mut KeyCache,
        rows: Vec<Row>,
    ) -> Result<Vec<Opened<T>>> {
        self.open_raw_rows(cache, rows)
            .await?
            .into_iter()
            .map(|opened| -> Result<Opened<T>> {
                Ok(Opened {
                    value: self.decode(&opened.value)?,
                    key: opened.key,
                    sort: opened.sort,
                    meta: opened.meta,
                })
            })
            .collect()
    }

    /// Keys of the rows matching `query`; payloads are not opened.
    pub async fn list_keys(&self, query: &RowQuery) -> Result<Vec<RowKey>> {
        let rows = self.backend.scan(self.name, query).await?;
        Ok(rows.into_iter().map(|row| row.key).collect())
    }

    /// Update plaintext attributes without touching the payload.
    pub async fn patch(&self, key: &RowKey, patch: &RowPatch) -> Result<bool> {
        self.backend.patch(self.name, key, patch).await
    }

    /// Count rows matching a filter; payloads are not opened.
    pub async fn count(&self, filter: &RowFilter) -> Result<usize> {
        self.backend.count(self.name, filter).await
    }

    /// Remove one record. Returns whether it existed.
    pub async fn remove(&self, key: &RowKey) -> Result<bool> {
        Ok(self.remove_many(std::slice::from_ref(key)).await? > 0)
    }

    /// Remove records by key.
    pub async fn remove_many(&self, keys: &[RowKey]) -> Result<u64> {
        self.backend.delete(self.name, keys).await
    }

    /// Remove every record matching a filter; no key is needed.
    pub async fn remove_where(&self, filter: &RowFilter) -> Result<u64> {
        let removed = self.backend.delete_where(self.name, filter).await?;
        trace!(table = self.name, removed, "Removed rows");
        Ok(removed)
    }
}
