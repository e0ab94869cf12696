//! Shares, their keys and invites, public keys and Spotlight vault selection.

use std::sync::Arc;

use super::types::{InviteKey, PublicKey, Share, ShareKey, UserInvite};
use super::{EncryptedTable, Record, user_filter, user_key, user_singleton};
use crate::{
    Result,
    backend::{Backend, RowFilter, RowKey, RowQuery, Scope},
    constants::{
        INVITE_KEYS_TABLE, PUBLIC_KEYS_TABLE, SHARE_EVENT_IDS_TABLE, SHARE_KEYS_TABLE,
        SHARES_TABLE, SPOTLIGHT_VAULTS_TABLE, USER_INVITES_TABLE,
    },
    crypto::SymmetricKeyProvider,
};

/// Shares per user, oldest first.
#[derive(Debug, Clone)]
pub struct LocalShareDatasource {
    table: EncryptedTable,
}

impl LocalShareDatasource {
    /// Open over `backend`, sealing with `keys`.
    pub fn new(backend: Backend, keys: Arc<dyn SymmetricKeyProvider>) -> Self {
        Self {
            table: EncryptedTable::new(SHARES_TABLE, backend, keys),
        }
    }

    pub async fn get_share(&self, user_id: &str, share_id: &str) -> Result<Option<Share>> {
        self.table.get(&user_key(user_id, [share_id])).await
    }

    pub async fn get_all_shares(&self, user_id: &str) -> Result<Vec<Share>> {
        self.table.list(&RowQuery::new(user_filter(user_id))).await
    }

    /// Insert or replace shares of `user_id`; other shares are kept.
    pub async fn upsert_shares(&self, user_id: &str, shares: &[Share]) -> Result<()> {
        self.table
            .upsert_many(shares.iter().map(|share| {
                Record::new(
                    user_key(user_id, [share.share_id.as_str()]),
                    share.create_time,
                    share,
                )
            }))
            .await
    }

    pub async fn remove_share(&self, user_id: &str, share_id: &str) -> Result<()> {
        self.table.remove(&user_key(user_id, [share_id])).await?;
        Ok(())
    }

    pub async fn remove_all_shares(&self, user_id: &str) -> Result<()> {
        self.table.remove_where(&user_filter(user_id)).await?;
        Ok(())
    }
}

/// Cursor into each share's event stream.
#[derive(Debug, Clone)]
pub struct LocalShareEventIdDatasource {
    table: EncryptedTable,
}

impl LocalShareEventIdDatasource {
    /// Open over `backend`, sealing with `keys`.
    pub fn new(backend: Backend, keys: Arc<dyn SymmetricKeyProvider>) -> Self {
        Self {
            table: EncryptedTable::new(SHARE_EVENT_IDS_TABLE, backend, keys),
        }
    }

    pub async fn get_last_event_id(&self, user_id: &str, share_id: &str) -> Result<Option<String>> {
        self.table.get(&user_key(user_id, [share_id])).await
    }

    pub async fn upsert_last_event_id(
        &self,
        user_id: &str,
        share_id: &str,
        event_id: &str,
    ) -> Result<()> {
        self.table
            .upsert(Record::new(user_key(user_id, [share_id]), 0, event_id))
            .await
    }

    pub async fn remove_all_event_ids(&self, user_id: &str) -> Result<()> {
        self.table.remove_where(&user_filter(user_id)).await?;
        Ok(())
    }
}

/// Share keys by rotation. Share keys are not user records: they are sealed
/// with the device key.
#[derive(Debug, Clone)]
pub struct LocalShareKeyDatasource {
    table: EncryptedTable,
}

impl LocalShareKeyDatasource {
    /// Open over `backend`, sealing with `keys`.
    pub fn new(backend: Backend, keys: Arc<dyn SymmetricKeyProvider>) -> Self {
        Self {
            table: EncryptedTable::new(SHARE_KEYS_TABLE, backend, keys),
        }
    }

    fn key(share_key: &ShareKey) -> RowKey {
        RowKey::new(
            Scope::Device,
            [share_key.share_id.clone(), share_key.key_rotation.to_string()],
        )
    }

    /// Keys of `share_id`, lowest rotation first.
    pub async fn get_keys(&self, share_id: &str) -> Result<Vec<ShareKey>> {
        self.table
            .list(&RowQuery::new(
                RowFilter::scope(Scope::Device).with_prefix([share_id]),
            ))
            .await
    }

    pub async fn upsert_keys(&self, keys: &[ShareKey]) -> Result<()> {
        self.table
            .upsert_many(
                keys.iter()
                    .map(|key| Record::new(Self::key(key), key.key_rotation, key)),
            )
            .await
    }

    pub async fn remove_all_keys(&self, share_id: &str) -> Result<()> {
        self.table
            .remove_where(&RowFilter::scope(Scope::Device).with_prefix([share_id]))
            .await?;
        Ok(())
    }
}

/// Keys received with invites, per invite token.
#[derive(Debug, Clone)]
pub struct LocalInviteKeyDatasource {
    table: EncryptedTable,
}

impl LocalInviteKeyDatasource {
    /// Open over `backend`, sealing with `keys`.
    pub fn new(backend: Backend, keys: Arc<dyn SymmetricKeyProvider>) -> Self {
        Self {
            table: EncryptedTable::new(INVITE_KEYS_TABLE, backend, keys),
        }
    }

    /// Keys of the invite; empty when none are stored.
    pub async fn get_invite_keys(&self, user_id: &str, invite_token: &str) -> Result<Vec<InviteKey>> {
        Ok(self
            .table
            .get(&user_key(user_id, [invite_token]))
            .await?
            .unwrap_or_default())
    }

    /// Replace the keys stored for the invite.
    pub async fn upsert_invite_keys(
        &self,
        user_id: &str,
        invite_token: &str,
        keys: &[InviteKey],
    ) -> Result<()> {
        self.table
            .upsert(Record::new(user_key(user_id, [invite_token]), 0, keys))
            .await
    }

    pub async fn remove_invite_keys(&self, user_id: &str, invite_token: &str) -> Result<()> {
        self.table.remove(&user_key(user_id, [invite_token])).await?;
        Ok(())
    }

    pub async fn remove_all_invite_keys(&self, user_id: &str) -> Result<()> {
        self.table.remove_where(&user_filter(user_id)).await?;
        Ok(())
    }
}

/// Pending invites per user, oldest first.
#[derive(Debug, Clone)]
pub struct LocalUserInviteDatasource {
    table: EncryptedTable,
}

impl LocalUserInviteDatasource {
    /// Open over `backend`, sealing with `keys`.
    pub fn new(backend: Backend, keys: Arc<dyn SymmetricKeyProvider>) -> Self {
        Self {
            table: EncryptedTable::new(USER_INVITES_TABLE, backend, keys),
        }
    }

    pub async fn get_invites(&self, user_id: &str) -> Result<Vec<UserInvite>> {
        self.table.list(&RowQuery::new(user_filter(user_id))).await
    }

    pub async fn upsert_invites(&self, user_id: &str, invites: &[UserInvite]) -> Result<()> {
        self.table
            .upsert_many(invites.iter().map(|invite| {
                Record::new(
                    user_key(user_id, [invite.invite_token.as_str()]),
                    invite.create_time,
                    invite,
                )
            }))
            .await
    }

    pub async fn remove_invite(&self, user_id: &str, invite_token: &str) -> Result<()> {
        self.table.remove(&user_key(user_id, [invite_token])).await?;
        Ok(())
    }

    pub async fn remove_all_invites(&self, user_id: &str) -> Result<()> {
        self.table.remove_where(&user_filter(user_id)).await?;
        Ok(())
    }
}

/// Public keys per email address, shared by every user of the install.
#[derive(Debug, Clone)]
pub struct LocalPublicKeyDatasource {
    table: EncryptedTable,
}

impl LocalPublicKeyDatasource {
    /// Open over `backend`, sealing with `keys`.
    pub fn new(backend: Backend, keys: Arc<dyn SymmetricKeyProvider>) -> Self {
        Self {
            table: EncryptedTable::new(PUBLIC_KEYS_TABLE, backend, keys),
        }
    }

    fn key(email: &str) -> RowKey {
        RowKey::new(Scope::Device, [email])
    }

    pub async fn get_public_keys(&self, email: &str) -> Result<Vec<PublicKey>> {
        Ok(self.table.get(&Self::key(email)).await?.unwrap_or_default())
    }

    /// Replace the keys stored for `email`.
    pub async fn upsert_public_keys(&self, email: &str, keys: &[PublicKey]) -> Result<()> {
        self.table.upsert(Record::new(Self::key(email), 0, keys)).await
    }

    pub async fn remove_public_keys(&self, email: &str) -> Result<()> {
        self.table.remove(&Self::key(email)).await?;
        Ok(())
    }
}

/// Vaults selected for Spotlight indexing.
#[derive(Debug, Clone)]
pub struct LocalSpotlightVaultDatasource {
    table: EncryptedTable,
}

impl LocalSpotlightVaultDatasource {
    /// Open over `backend`, sealing with `keys`.
    pub fn new(backend: Backend, keys: Arc<dyn SymmetricKeyProvider>) -> Self {
        Self {
            table: EncryptedTable::new(SPOTLIGHT_VAULTS_TABLE, backend, keys),
        }
    }

    /// Selected share ids; empty when nothing is selected.
    pub async fn get_ids(&self, user_id: &str) -> Result<Vec<String>> {
        Ok(self
            .table
            .get(&user_singleton(user_id))
            .await?
            .unwrap_or_default())
    }

    /// Replace the selection.
    pub async fn set_ids(&self, user_id: &str, share_ids: &[String]) -> Result<()> {
        self.table
            .upsert(Record::new(user_singleton(user_id), 0, share_ids))
            .await
    }

    pub async fn remove_all(&self, user_id: &str) -> Result<()> {
        self.table.remove_where(&user_filter(user_id)).await?;
        Ok(())
    }
}
