//! Account-level datasources: access, credentials, user data, preferences
//! and the install-wide singletons.

use std::sync::Arc;

use tracing::debug;

use super::types::{
    Access, AuthCredential, MigrationStatus, Organization, PassModule, SharedPreferences,
    UserAccess, UserData, UserPreferences,
};
use super::{EncryptedTable, Record, device_singleton, user_filter, user_key, user_singleton};
use crate::{
    Clock, Result,
    backend::{Backend, Meta, RowFilter, RowPatch, RowQuery},
    constants::{
        ACCESS_TABLE, ACTIVE_USER_ID_TABLE, AUTH_CREDENTIALS_TABLE, MIGRATION_STATUS_TABLE,
        ORGANIZATIONS_TABLE, SHARED_PREFERENCES_TABLE, UNAUTH_CREDENTIAL_TABLE, USER_DATA_TABLE,
        USER_EVENT_IDS_TABLE, USER_PREFERENCES_TABLE,
    },
    crypto::SymmetricKeyProvider,
};

/// Plan and limits per user.
#[derive(Debug, Clone)]
pub struct LocalAccessDatasource {
    table: EncryptedTable,
}

impl LocalAccessDatasource {
    /// Open over `backend`, sealing with `keys`.
    pub fn new(backend: Backend, keys: Arc<dyn SymmetricKeyProvider>) -> Self {
        Self {
            table: EncryptedTable::new(ACCESS_TABLE, backend, keys),
        }
    }

    pub async fn get_access(&self, user_id: &str) -> Result<Option<Access>> {
        self.table.get(&user_singleton(user_id)).await
    }

    /// Every stored access, across users.
    ///
    /// Each record is opened with its owner's key. Users whose key is not
    /// loaded are left out.
    pub async fn get_all_accesses(&self) -> Result<Vec<UserAccess>> {
        let opened = self
            .table
            .list_unlocked_entries::<Access>(&RowQuery::new(RowFilter::all()))
            .await?;
        Ok(opened
            .into_iter()
            .filter_map(|entry| {
                let user_id = entry.key.scope.user_id()?.to_string();
                Some(UserAccess {
                    user_id,
                    access: entry.value,
                })
            })
            .collect())
    }

    pub async fn upsert_access(&self, user_id: &str, access: &Access) -> Result<()> {
        self.table
            .upsert(Record::new(user_singleton(user_id), 0, access))
            .await
    }

    pub async fn remove_access(&self, user_id: &str) -> Result<()> {
        self.table.remove(&user_singleton(user_id)).await?;
        Ok(())
    }
}

/// The user currently selected on this install.
#[derive(Debug, Clone)]
pub struct LocalActiveUserIdDatasource {
    table: EncryptedTable,
}

impl LocalActiveUserIdDatasource {
    /// Open over `backend`, sealing with `keys`.
    pub fn new(backend: Backend, keys: Arc<dyn SymmetricKeyProvider>) -> Self {
        Self {
            table: EncryptedTable::new(ACTIVE_USER_ID_TABLE, backend, keys),
        }
    }

    pub async fn get_active_user_id(&self) -> Result<Option<String>> {
        self.table.get(&device_singleton()).await
    }

    pub async fn update_active_user_id(&self, user_id: &str) -> Result<()> {
        debug!(user_id, "Switching active user");
        self.table
            .upsert(Record::new(device_singleton(), 0, user_id))
            .await
    }

    pub async fn remove_active_user_id(&self) -> Result<()> {
        self.table.remove(&device_singleton()).await?;
        Ok(())
    }
}

/// Session tokens, one slot per user and [`PassModule`].
///
/// Refreshing the tokens of one module leaves the other modules' sessions
/// untouched.
#[derive(Debug, Clone)]
pub struct LocalAuthCredentialDatasource {
    table: EncryptedTable,
}

impl LocalAuthCredentialDatasource {
    /// Open over `backend`, sealing with `keys`.
    pub fn new(backend: Backend, keys: Arc<dyn SymmetricKeyProvider>) -> Self {
        Self {
            table: EncryptedTable::new(AUTH_CREDENTIALS_TABLE, backend, keys),
        }
    }

    pub async fn get_credential(
        &self,
        user_id: &str,
        module: PassModule,
    ) -> Result<Option<AuthCredential>> {
        self.table.get(&user_key(user_id, [module.as_str()])).await
    }

    pub async fn upsert_credential(
        &self,
        user_id: &str,
        credential: &AuthCredential,
        module: PassModule,
    ) -> Result<()> {
        self.table
            .upsert(Record::new(user_key(user_id, [module.as_str()]), 0, credential))
            .await
    }

    /// Remove the credential of every module for `user_id`.
    pub async fn remove_all_credentials(&self, user_id: &str) -> Result<()> {
        let removed = self.table.remove_where(&user_filter(user_id)).await?;
        debug!(user_id, removed, "Removed credentials");
        Ok(())
    }
}

/// Record of one-off migrations already applied on this install.
#[derive(Debug, Clone)]
pub struct LocalMigrationStatusDatasource {
    table: EncryptedTable,
}

impl LocalMigrationStatusDatasource {
    /// Open over `backend`, sealing with `keys`.
    pub fn new(backend: Backend, keys: Arc<dyn SymmetricKeyProvider>) -> Self {
        Self {
            table: EncryptedTable::new(MIGRATION_STATUS_TABLE, backend, keys),
        }
    }

    pub async fn get_migration_status(&self) -> Result<Option<MigrationStatus>> {
        self.table.get(&device_singleton()).await
    }

    pub async fn upsert_migration_status(&self, status: &MigrationStatus) -> Result<()> {
        self.table
            .upsert(Record::new(device_singleton(), 0, status))
            .await
    }

    /// Add `migration` to the completed set and return the new status.
    pub async fn mark_completed(&self, migration: &str) -> Result<MigrationStatus> {
        let mut status = self.get_migration_status().await?.unwrap_or_default();
        if status.completed.insert(migration.to_string()) {
            self.upsert_migration_status(&status).await?;
        }
        Ok(status)
    }
}

#[derive(Debug, Clone)]
pub struct LocalOrganizationDatasource {
    table: EncryptedTable,
}

impl LocalOrganizationDatasource {
    /// Open over `backend`, sealing with `keys`.
    pub fn new(backend: Backend, keys: Arc<dyn SymmetricKeyProvider>) -> Self {
        Self {
            table: EncryptedTable::new(ORGANIZATIONS_TABLE, backend, keys),
        }
    }

    pub async fn get_organization(&self, user_id: &str) -> Result<Option<Organization>> {
        self.table.get(&user_singleton(user_id)).await
    }

    pub async fn upsert_organization(&self, user_id: &str, organization: &Organization) -> Result<()> {
        self.table
            .upsert(Record::new(user_singleton(user_id), 0, organization))
            .await
    }

    pub async fn remove_organization(&self, user_id: &str) -> Result<()> {
        self.table.remove(&user_singleton(user_id)).await?;
        Ok(())
    }
}

/// Install-wide settings.
#[derive(Debug, Clone)]
pub struct LocalSharedPreferencesDatasource {
    table: EncryptedTable,
}

impl LocalSharedPreferencesDatasource {
    /// Open over `backend`, sealing with `keys`.
    pub fn new(backend: Backend, keys: Arc<dyn SymmetricKeyProvider>) -> Self {
        Self {
            table: EncryptedTable::new(SHARED_PREFERENCES_TABLE, backend, keys),
        }
    }

    pub async fn get_preferences(&self) -> Result<Option<SharedPreferences>> {
        self.table.get(&device_singleton()).await
    }

    pub async fn upsert_preferences(&self, preferences: &SharedPreferences) -> Result<()> {
        self.table
            .upsert(Record::new(device_singleton(), 0, preferences))
            .await
    }

    pub async fn remove_preferences(&self) -> Result<()> {
        self.table.remove(&device_singleton()).await?;
        Ok(())
    }
}

/// Session used before any user logs in.
#[derive(Debug, Clone)]
pub struct LocalUnauthCredentialDatasource {
    table: EncryptedTable,
}

impl LocalUnauthCredentialDatasource {
    /// Open over `backend`, sealing with `keys`.
    pub fn new(backend: Backend, keys: Arc<dyn SymmetricKeyProvider>) -> Self {
        Self {
            table: EncryptedTable::new(UNAUTH_CREDENTIAL_TABLE, backend, keys),
        }
    }

    pub async fn get_unauth_credential(&self) -> Result<Option<AuthCredential>> {
        self.table.get(&device_singleton()).await
    }

    pub async fn upsert_unauth_credential(&self, credential: &AuthCredential) -> Result<()> {
        self.table
            .upsert(Record::new(device_singleton(), 0, credential))
            .await
    }

    pub async fn remove_unauth_credential(&self) -> Result<()> {
        self.table.remove(&device_singleton()).await?;
        Ok(())
    }
}

/// Plaintext flag marking the active user's data.
const ACTIVE_FIELD: &str = "active";

/// Cached account details, ordered by when they were last written.
#[derive(Debug, Clone)]
pub struct LocalUserDataDatasource {
    table: EncryptedTable,
    clock: Arc<dyn Clock>,
}

impl LocalUserDataDatasource {
    /// Open over `backend`, sealing with `keys` and stamping times from `clock`.
    pub fn new(
        backend: Backend,
        keys: Arc<dyn SymmetricKeyProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            table: EncryptedTable::new(USER_DATA_TABLE, backend, keys),
            clock,
        }
    }

    fn active_filter() -> RowFilter {
        RowFilter::all().meta_eq(ACTIVE_FIELD, true)
    }

    /// Store `user_data` under its own user id, stamped with the current time.
    ///
    /// Replacing a user keeps its active flag.
    pub async fn upsert(&self, user_data: &UserData) -> Result<()> {
        let user_id = &user_data.user_id;
        let active = self
            .table
            .count(&user_filter(user_id).meta_eq(ACTIVE_FIELD, true))
            .await?
            > 0;
        let mut meta = Meta::new();
        meta.insert(ACTIVE_FIELD.to_string(), active.into());

        let update_time = self.clock.now_millis();
        self.table
            .upsert(
                Record::new(user_singleton(user_id), update_time, user_data).with_meta(meta),
            )
            .await
    }

    pub async fn get(&self, user_id: &str) -> Result<Option<UserData>> {
        self.table.get(&user_singleton(user_id)).await
    }

    /// Every unlocked user's data, least recently updated first.
    pub async fn get_all(&self) -> Result<Vec<UserData>> {
        self.table.list_unlocked(&RowQuery::new(RowFilter::all())).await
    }

    /// The user flagged active, if any.
    pub async fn get_active_user(&self) -> Result<Option<UserData>> {
        Ok(self
            .table
            .list(&RowQuery::new(Self::active_filter()).limit(1))
            .await?
            .pop())
    }

    /// Move the active flag to `user_id`.
    ///
    /// The previous holder loses the flag even when `user_id` has no stored
    /// data, leaving no user active. Returns whether `user_id` was flagged.
    pub async fn update_new_active_user(&self, user_id: &str) -> Result<bool> {
        let clear = RowPatch::default().set(ACTIVE_FIELD, false);
        for key in self
            .table
            .list_keys(&RowQuery::new(Self::active_filter()))
            .await?
        {
            self.table.patch(&key, &clear).await?;
        }
        let flagged = self
            .table
            .patch(
                &user_singleton(user_id),
                &RowPatch::default().set(ACTIVE_FIELD, true),
            )
            .await?;
        debug!(user_id, flagged, "Updated active user");
        Ok(flagged)
    }

    pub async fn remove(&self, user_id: &str) -> Result<()> {
        self.table.remove(&user_singleton(user_id)).await?;
        Ok(())
    }

    pub async fn remove_all(&self) -> Result<()> {
        self.table.remove_where(&RowFilter::all()).await?;
        Ok(())
    }
}

/// Cursor into the user event stream.
#[derive(Debug, Clone)]
pub struct LocalUserEventIdDatasource {
    table: EncryptedTable,
}

impl LocalUserEventIdDatasource {
    /// Open over `backend`, sealing with `keys`.
    pub fn new(backend: Backend, keys: Arc<dyn SymmetricKeyProvider>) -> Self {
        Self {
            table: EncryptedTable::new(USER_EVENT_IDS_TABLE, backend, keys),
        }
    }

    pub async fn get_last_event_id(&self, user_id: &str) -> Result<Option<String>> {
        self.table.get(&user_singleton(user_id)).await
    }

    pub async fn upsert_last_event_id(&self, user_id: &str, event_id: &str) -> Result<()> {
        self.table
            .upsert(Record::new(user_singleton(user_id), 0, event_id))
            .await
    }

    pub async fn remove_last_event_id(&self, user_id: &str) -> Result<()> {
        self.table.remove(&user_singleton(user_id)).await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct LocalUserPreferencesDatasource {
    table: EncryptedTable,
}

impl LocalUserPreferencesDatasource {
    /// Open over `backend`, sealing with `keys`.
    pub fn new(backend: Backend, keys: Arc<dyn SymmetricKeyProvider>) -> Self {
        Self {
            table: EncryptedTable::new(USER_PREFERENCES_TABLE, backend, keys),
        }
    }

    pub async fn get_preferences(&self, user_id: &str) -> Result<Option<UserPreferences>> {
        self.table.get(&user_singleton(user_id)).await
    }

    pub async fn upsert_preferences(
        &self,
        user_id: &str,
        preferences: &UserPreferences,
    ) -> Result<()> {
        self.table
            .upsert(Record::new(user_singleton(user_id), 0, preferences))
            .await
    }

    pub async fn remove_preferences(&self, user_id: &str) -> Result<()> {
        self.table.remove(&user_singleton(user_id)).await?;
        Ok(())
    }

    pub async fn remove_all_preferences(&self) -> Result<()> {
        self.table.remove_where(&RowFilter::all()).await?;
        Ok(())
    }

    /// Number of users with stored preferences.
    pub async fn count(&self) -> Result<usize> {
        self.table.count(&RowFilter::all()).await
    }
}
