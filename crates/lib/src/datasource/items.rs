//! Local item storage.
//!
//! Item revision attributes (state, pin, alias email, timestamps, flags) are
//! kept as plaintext row attributes so they can be filtered on and patched
//! by server updates without opening the item. Only the item content is
//! sealed.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;
use zeroize::Zeroizing;

use super::types::{
    ItemCount, ItemIdentifier, ItemRevision, ItemState, LastUseItem, LocalItem, ModifiedItem,
};
use super::{EncryptedTable, Opened, Record, from_meta, to_meta, user_filter, user_key};
use crate::{
    Result,
    backend::{Backend, RowFilter, RowKey, RowPatch, RowQuery},
    constants::ITEMS_TABLE,
    crypto::SymmetricKeyProvider,
    datasource::DatasourceError,
};

const SHARE_ID: &str = "share_id";
const IS_LOGIN_ITEM: &str = "is_login_item";

fn item_key(user_id: &str, share_id: &str, item_id: &str) -> RowKey {
    user_key(user_id, [share_id, item_id])
}

/// Items per user, share and item id. Listings are most recently modified first.
#[derive(Debug, Clone)]
pub struct LocalItemDatasource {
    table: EncryptedTable,
}

impl LocalItemDatasource {
    /// Open over `backend`, sealing with `keys`.
    pub fn new(backend: Backend, keys: Arc<dyn SymmetricKeyProvider>) -> Self {
        Self {
            table: EncryptedTable::new(ITEMS_TABLE, backend, keys),
        }
    }

    fn to_record(item: &LocalItem) -> Result<Record<Zeroizing<Vec<u8>>>> {
        let mut meta = to_meta(ITEMS_TABLE, &item.revision)?;
        meta.insert(SHARE_ID.to_string(), Value::from(item.share_id.clone()));
        meta.insert(IS_LOGIN_ITEM.to_string(), Value::from(item.is_login_item));
        Ok(Record::new(
            item_key(&item.user_id, &item.share_id, item.item_id()),
            item.revision.modify_time,
            Zeroizing::new(item.content.clone()),
        )
        .with_meta(meta))
    }

    fn from_opened(opened: Opened<Zeroizing<Vec<u8>>>) -> Result<LocalItem> {
        let invalid = |reason: &str| DatasourceError::InvalidRecord {
            table: ITEMS_TABLE,
            reason: reason.to_string(),
        };
        let user_id = opened
            .key
            .scope
            .user_id()
            .ok_or_else(|| invalid("item stored outside a user scope"))?
            .to_string();
        let share_id = opened
            .key
            .parts
            .first()
            .cloned()
            .ok_or_else(|| invalid("item key has no share id"))?;
        let revision: ItemRevision = from_meta(ITEMS_TABLE, &opened.meta)?;
        let is_login_item = opened
            .meta
            .get(IS_LOGIN_ITEM)
            .and_then(Value::as_bool)
            .unwrap_or(false);
        Ok(LocalItem {
            user_id,
            share_id,
            revision,
            content: opened.value.to_vec(),
            is_login_item,
        })
    }

    async fn list(&self, query: RowQuery) -> Result<Vec<LocalItem>> {
        self.table
            .list_raw(&query.descending())
            .await?
            .into_iter()
            .map(Self::from_opened)
            .collect()
    }

    pub async fn get_item(
        &self,
        user_id: &str,
        share_id: &str,
        item_id: &str,
    ) -> Result<Option<LocalItem>> {
        self.table
            .get_raw(&item_key(user_id, share_id, item_id))
            .await?
            .map(Self::from_opened)
            .transpose()
    }

    /// Every item of `user_id` regardless of state.
    pub async fn get_all_items(&self, user_id: &str) -> Result<Vec<LocalItem>> {
        self.list(RowQuery::new(user_filter(user_id))).await
    }

    pub async fn get_all_pinned_items(&self, user_id: &str) -> Result<Vec<LocalItem>> {
        self.list(RowQuery::new(user_filter(user_id).meta_eq("pinned", true)))
            .await
    }

    pub async fn get_items(&self, user_id: &str, state: ItemState) -> Result<Vec<LocalItem>> {
        self.list(RowQuery::new(
            user_filter(user_id).meta_eq("state", state.as_str()),
        ))
        .await
    }

    pub async fn get_items_for_share(
        &self,
        user_id: &str,
        share_id: &str,
        state: ItemState,
    ) -> Result<Vec<LocalItem>> {
        self.list(RowQuery::new(
            user_filter(user_id)
                .with_prefix([share_id])
                .meta_eq("state", state.as_str()),
        ))
        .await
    }

    /// Active items that autofill can offer as logins.
    pub async fn get_active_login_items(&self, user_id: &str) -> Result<Vec<LocalItem>> {
        self.list(RowQuery::new(
            user_filter(user_id)
                .meta_eq("state", ItemState::Active.as_str())
                .meta_eq(IS_LOGIN_ITEM, true),
        ))
        .await
    }

    /// The alias item whose address is `alias_email`, in any state.
    pub async fn get_alias_item(
        &self,
        user_id: &str,
        alias_email: &str,
    ) -> Result<Option<LocalItem>> {
        let mut found = self
            .list(RowQuery::new(user_filter(user_id).meta_eq("alias_email", alias_email)).limit(1))
            .await?;
        Ok(found.pop())
    }

    pub async fn get_item_count(&self, user_id: &str, share_id: &str) -> Result<ItemCount> {
        let in_share = user_filter(user_id).with_prefix([share_id]);
        let active = self
            .table
            .count(&in_share.clone().meta_eq("state", ItemState::Active.as_str()))
            .await?;
        let trashed = self
            .table
            .count(&in_share.meta_eq("state", ItemState::Trashed.as_str()))
            .await?;
        Ok(ItemCount { active, trashed })
    }

    /// Items for the given identifiers, in the same order; unknown ids are skipped.
    pub async fn get_items_by_ids(
        &self,
        user_id: &str,
        ids: &[ItemIdentifier],
    ) -> Result<Vec<LocalItem>> {
        let mut items = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(item) = self.get_item(user_id, &id.share_id, &id.item_id).await? {
                items.push(item);
            }
        }
        Ok(items)
    }

    /// Insert or replace items, each under its own user. The batch is atomic.
    pub async fn upsert_items(&self, items: &[LocalItem]) -> Result<()> {
        let records = items
            .iter()
            .map(Self::to_record)
            .collect::<Result<Vec<_>>>()?;
        debug!(count = records.len(), "Upserting items");
        self.table.upsert_raw(records).await
    }

    /// Upsert `items`, then apply `modified` to items of `user_id`.
    pub async fn upsert_items_with_modifications(
        &self,
        user_id: &str,
        items: &[LocalItem],
        modified: &[ModifiedItem],
    ) -> Result<usize> {
        self.upsert_items(items).await?;
        self.apply_modified_items(user_id, modified).await
    }

    /// Patch state, revision, timestamps and flags of existing items.
    ///
    /// Content and every other attribute stay as they are. Items not stored
    /// locally are skipped. Returns the number of items patched.
    pub async fn apply_modified_items(
        &self,
        user_id: &str,
        modified: &[ModifiedItem],
    ) -> Result<usize> {
        let mut patched = 0;
        for item in modified {
            let patch = RowPatch::default()
                .set("revision", item.revision)
                .set("state", item.state.as_str())
                .set("modify_time", item.modify_time)
                .set("revision_time", item.revision_time)
                .set("flags", item.flags)
                .sort(item.modify_time);
            let key = item_key(user_id, &item.share_id, &item.item_id);
            if self.table.patch(&key, &patch).await? {
                patched += 1;
            } else {
                debug!(user_id, item_id = %item.item_id, "Skipping modification of unknown item");
            }
        }
        Ok(patched)
    }

    /// Record last-use times. Returns the number of items updated.
    pub async fn update_last_use_items(
        &self,
        user_id: &str,
        items: &[LastUseItem],
    ) -> Result<usize> {
        let mut updated = 0;
        for item in items {
            let patch = RowPatch::default().set("last_use_time", item.last_use_time);
            let key = item_key(user_id, &item.share_id, &item.item_id);
            if self.table.patch(&key, &patch).await? {
                updated += 1;
            }
        }
        Ok(updated)
    }

    /// Pin or unpin one item. `pin_time` of `None` unpins it.
    ///
    /// Fails with `RecordNotFound` when the item is not stored locally.
    pub async fn set_pinned(
        &self,
        user_id: &str,
        share_id: &str,
        item_id: &str,
        pin_time: Option<i64>,
    ) -> Result<()> {
        let patch = RowPatch::default()
            .set("pinned", pin_time.is_some())
            .set("pin_time", pin_time);
        let key = item_key(user_id, share_id, item_id);
        if self.table.patch(&key, &patch).await? {
            Ok(())
        } else {
            Err(DatasourceError::RecordNotFound {
                table: ITEMS_TABLE,
                key: format!("{share_id}/{item_id}"),
            }
            .into())
        }
    }

    pub async fn delete_items(&self, user_id: &str, ids: &[ItemIdentifier]) -> Result<()> {
        let keys: Vec<RowKey> = ids
            .iter()
            .map(|id| item_key(user_id, &id.share_id, &id.item_id))
            .collect();
        self.table.remove_many(&keys).await?;
        Ok(())
    }

    pub async fn delete_item_ids(
        &self,
        user_id: &str,
        share_id: &str,
        item_ids: &[String],
    ) -> Result<()> {
        let keys: Vec<RowKey> = item_ids
            .iter()
            .map(|item_id| item_key(user_id, share_id, item_id))
            .collect();
        self.table.remove_many(&keys).await?;
        Ok(())
    }

    pub async fn remove_all_items(&self, user_id: &str) -> Result<()> {
        let removed = self.table.remove_where(&user_filter(user_id)).await?;
        debug!(user_id, removed, "Removed all items of user");
        Ok(())
    }

    /// Remove the items of a share for every user holding it.
    pub async fn remove_all_items_for_share(&self, share_id: &str) -> Result<()> {
        self.table
            .remove_where(&RowFilter::all().with_prefix([share_id]))
            .await?;
        Ok(())
    }

    pub async fn remove_all_items_globally(&self) -> Result<()> {
        self.table.remove_where(&RowFilter::all()).await?;
        Ok(())
    }
}
