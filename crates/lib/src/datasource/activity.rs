//! Time-ordered histories: item reads, text autofill, search, generated
//! passwords and telemetry.
//!
//! Each history orders on the row sort column, with insertion order breaking
//! ties, so the ordering contracts below hold on every backend.

use std::sync::Arc;

use tracing::debug;

use super::types::{
    GeneratedPassword, ItemIdentifier, ItemReadEvent, SearchEntry, TelemetryEvent,
    TextAutoFillHistoryEntry,
};
use super::{EncryptedTable, Record, user_filter, user_key};
use crate::{
    Clock, Result,
    backend::{Backend, RowFilter, RowKey, RowQuery},
    constants::{
        ITEM_READ_EVENTS_TABLE, ITEM_TEXT_AUTOFILL_TABLE, PASSWORDS_TABLE, SEARCH_ENTRIES_TABLE,
        TELEMETRY_EVENTS_TABLE,
    },
    crypto::SymmetricKeyProvider,
};

/// Item views waiting to be reported.
#[derive(Debug, Clone)]
pub struct LocalItemReadEventDatasource {
    table: EncryptedTable,
}

impl LocalItemReadEventDatasource {
    /// Open over `backend`, sealing with `keys`.
    pub fn new(backend: Backend, keys: Arc<dyn SymmetricKeyProvider>) -> Self {
        Self {
            table: EncryptedTable::new(ITEM_READ_EVENTS_TABLE, backend, keys),
        }
    }

    pub async fn insert_event(&self, user_id: &str, event: &ItemReadEvent) -> Result<()> {
        self.table
            .upsert(Record::new(
                user_key(user_id, [event.uuid.as_str()]),
                event.timestamp,
                event,
            ))
            .await
    }

    /// Every event of `user_id`, oldest first.
    pub async fn get_all_events(&self, user_id: &str) -> Result<Vec<ItemReadEvent>> {
        self.table.list(&RowQuery::new(user_filter(user_id))).await
    }

    /// The `count` oldest events of `user_id`.
    pub async fn get_events(&self, user_id: &str, count: usize) -> Result<Vec<ItemReadEvent>> {
        self.table
            .list(&RowQuery::new(user_filter(user_id)).limit(count))
            .await
    }

    pub async fn remove_events(&self, user_id: &str, events: &[ItemReadEvent]) -> Result<()> {
        let keys: Vec<RowKey> = events
            .iter()
            .map(|event| user_key(user_id, [event.uuid.as_str()]))
            .collect();
        self.table.remove_many(&keys).await?;
        Ok(())
    }

    pub async fn remove_all_events(&self, user_id: &str) -> Result<()> {
        self.table.remove_where(&user_filter(user_id)).await?;
        Ok(())
    }
}

/// When items were last used for text autofill.
#[derive(Debug, Clone)]
pub struct LocalItemTextAutoFillDatasource {
    table: EncryptedTable,
    clock: Arc<dyn Clock>,
}

impl LocalItemTextAutoFillDatasource {
    /// Open over `backend`, sealing with `keys` and stamping times from `clock`.
    pub fn new(
        backend: Backend,
        keys: Arc<dyn SymmetricKeyProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            table: EncryptedTable::new(ITEM_TEXT_AUTOFILL_TABLE, backend, keys),
            clock,
        }
    }

    /// Record that `item` was just used. Using it again refreshes its time.
    pub async fn upsert(&self, user_id: &str, item: &ItemIdentifier) -> Result<()> {
        let entry = TextAutoFillHistoryEntry {
            share_id: item.share_id.clone(),
            item_id: item.item_id.clone(),
            time: self.clock.now_millis(),
        };
        self.table
            .upsert(Record::new(
                user_key(user_id, [item.share_id.as_str(), item.item_id.as_str()]),
                entry.time,
                &entry,
            ))
            .await
    }

    /// The `count` most recently used entries, newest first.
    pub async fn get_most_recent_items(
        &self,
        user_id: &str,
        count: usize,
    ) -> Result<Vec<TextAutoFillHistoryEntry>> {
        self.table
            .list(&RowQuery::new(user_filter(user_id)).descending().limit(count))
            .await
    }

    pub async fn remove_all_items(&self, user_id: &str) -> Result<()> {
        self.table.remove_where(&user_filter(user_id)).await?;
        Ok(())
    }

    /// Clear the history of every user.
    pub async fn remove_all(&self) -> Result<()> {
        self.table.remove_where(&RowFilter::all()).await?;
        Ok(())
    }
}

/// Generator history.
#[derive(Debug, Clone)]
pub struct LocalPasswordDatasource {
    table: EncryptedTable,
}

impl LocalPasswordDatasource {
    /// Open over `backend`, sealing with `keys`.
    pub fn new(backend: Backend, keys: Arc<dyn SymmetricKeyProvider>) -> Self {
        Self {
            table: EncryptedTable::new(PASSWORDS_TABLE, backend, keys),
        }
    }

    pub async fn insert_password(&self, user_id: &str, password: &GeneratedPassword) -> Result<()> {
        self.table
            .upsert(Record::new(
                user_key(user_id, [password.id.as_str()]),
                password.creation_time,
                password,
            ))
            .await
    }

    pub async fn get_password(&self, user_id: &str, id: &str) -> Result<Option<GeneratedPassword>> {
        self.table.get(&user_key(user_id, [id])).await
    }

    /// Passwords of `user_id`, oldest creation time first.
    pub async fn get_all_passwords(&self, user_id: &str) -> Result<Vec<GeneratedPassword>> {
        self.table.list(&RowQuery::new(user_filter(user_id))).await
    }

    pub async fn delete_password(&self, user_id: &str, id: &str) -> Result<()> {
        self.table.remove(&user_key(user_id, [id])).await?;
        Ok(())
    }

    /// Delete every user's passwords created at or before `cut_off`.
    pub async fn delete_passwords(&self, cut_off: i64) -> Result<u64> {
        let removed = self
            .table
            .remove_where(&RowFilter::all().sort_at_most(cut_off))
            .await?;
        debug!(cut_off, removed, "Expired generated passwords");
        Ok(removed)
    }

    pub async fn remove_all_passwords(&self, user_id: &str) -> Result<()> {
        self.table.remove_where(&user_filter(user_id)).await?;
        Ok(())
    }
}

/// Recently searched items.
#[derive(Debug, Clone)]
pub struct LocalSearchEntryDatasource {
    table: EncryptedTable,
    clock: Arc<dyn Clock>,
}

impl LocalSearchEntryDatasource {
    /// Open over `backend`, sealing with `keys` and stamping times from `clock`.
    pub fn new(
        backend: Backend,
        keys: Arc<dyn SymmetricKeyProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            table: EncryptedTable::new(SEARCH_ENTRIES_TABLE, backend, keys),
            clock,
        }
    }

    fn key(user_id: &str, item: &ItemIdentifier) -> RowKey {
        user_key(user_id, [item.share_id.as_str(), item.item_id.as_str()])
    }

    /// Record a search hit on `item`, stamped with the current time.
    pub async fn upsert(&self, user_id: &str, item: &ItemIdentifier) -> Result<()> {
        let entry = SearchEntry {
            user_id: user_id.to_string(),
            share_id: item.share_id.clone(),
            item_id: item.item_id.clone(),
            time: self.clock.now_millis(),
        };
        self.table
            .upsert(Record::new(Self::key(user_id, item), entry.time, &entry))
            .await
    }

    /// Entries of `user_id`, newest first.
    pub async fn get_all_entries(&self, user_id: &str) -> Result<Vec<SearchEntry>> {
        self.table
            .list(&RowQuery::new(user_filter(user_id)).descending())
            .await
    }

    /// Entries pointing into `share_id` for every user, newest first.
    ///
    /// Each entry is opened with its owner's key; entries of users whose key
    /// is not loaded are left out.
    pub async fn get_all_entries_for_share(&self, share_id: &str) -> Result<Vec<SearchEntry>> {
        self.table
            .list_unlocked(&RowQuery::new(RowFilter::all().with_prefix([share_id])).descending())
            .await
    }

    pub async fn remove(&self, user_id: &str, item: &ItemIdentifier) -> Result<()> {
        self.table.remove(&Self::key(user_id, item)).await?;
        Ok(())
    }

    pub async fn remove_all_entries(&self, user_id: &str) -> Result<()> {
        self.table.remove_where(&user_filter(user_id)).await?;
        Ok(())
    }

    pub async fn remove_all_entries_for_share(&self, share_id: &str) -> Result<()> {
        self.table
            .remove_where(&RowFilter::all().with_prefix([share_id]))
            .await?;
        Ok(())
    }
}

/// Usage events queued for upload.
#[derive(Debug, Clone)]
pub struct LocalTelemetryEventDatasource {
    table: EncryptedTable,
}

impl LocalTelemetryEventDatasource {
    /// Open over `backend`, sealing with `keys`.
    pub fn new(backend: Backend, keys: Arc<dyn SymmetricKeyProvider>) -> Self {
        Self {
            table: EncryptedTable::new(TELEMETRY_EVENTS_TABLE, backend, keys),
        }
    }

    pub async fn insert_event(&self, user_id: &str, event: &TelemetryEvent) -> Result<()> {
        self.table
            .upsert(Record::new(
                user_key(user_id, [event.uuid.as_str()]),
                event.time,
                event,
            ))
            .await
    }

    /// The `count` earliest events of `user_id`, by event time and then
    /// insertion order.
    pub async fn get_oldest_events(
        &self,
        user_id: &str,
        count: usize,
    ) -> Result<Vec<TelemetryEvent>> {
        self.table
            .list(&RowQuery::new(user_filter(user_id)).limit(count))
            .await
    }

    pub async fn remove_events(&self, user_id: &str, events: &[TelemetryEvent]) -> Result<()> {
        let keys: Vec<RowKey> = events
            .iter()
            .map(|event| user_key(user_id, [event.uuid.as_str()]))
            .collect();
        self.table.remove_many(&keys).await?;
        Ok(())
    }

    pub async fn remove_all_events(&self, user_id: &str) -> Result<()> {
        self.table.remove_where(&user_filter(user_id)).await?;
        Ok(())
    }
}
