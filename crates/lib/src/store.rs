//! Entry point bundling every datasource over one backend.
//!
//! A [`LocalStore`] owns the backend handle, the key provider and the clock,
//! and constructs each datasource once. Clones share all of them.
//!
//! # Example
//!
//! ```
//! # use std::sync::Arc;
//! # use vaultkeep::{LocalStore, StoreConfig, crypto::{KeyRing, KeyScope}};
//! # #[tokio::main]
//! # async fn main() -> vaultkeep::Result<()> {
//! let keys = Arc::new(KeyRing::new());
//! keys.generate(KeyScope::user("alice")).await;
//!
//! let store = LocalStore::open(&StoreConfig::default(), keys).await?;
//! store.user_event_ids().upsert_last_event_id("alice", "evt-1").await?;
//! assert_eq!(
//!     store.user_event_ids().get_last_event_id("alice").await?,
//!     Some("evt-1".to_string())
//! );
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use handle_trait::Handle;
use tracing::{debug, info};

use crate::{
    Clock, Result, StoreConfig, SystemClock,
    backend::{Backend, InMemory, RowFilter, Scope},
    constants::ALL_TABLES,
    crypto::SymmetricKeyProvider,
    datasource::{
        LocalAccessDatasource, LocalActiveUserIdDatasource, LocalAuthCredentialDatasource,
        LocalInAppNotificationDatasource, LocalInviteKeyDatasource, LocalItemDatasource,
        LocalItemReadEventDatasource, LocalItemTextAutoFillDatasource,
        LocalMigrationStatusDatasource, LocalNotificationSendTimeDatasource,
        LocalOrganizationDatasource, LocalPasswordDatasource, LocalPublicKeyDatasource,
        LocalSearchEntryDatasource, LocalShareDatasource, LocalShareEventIdDatasource,
        LocalShareKeyDatasource, LocalSharedPreferencesDatasource, LocalSpotlightVaultDatasource,
        LocalTelemetryEventDatasource, LocalUnauthCredentialDatasource, LocalUserDataDatasource,
        LocalUserEventIdDatasource, LocalUserInviteDatasource, LocalUserPreferencesDatasource,
    },
};

/// Encrypted local storage for every user of this install.
#[derive(Clone, Debug, Handle)]
pub struct LocalStore {
    inner: Arc<LocalStoreInner>,
}

#[derive(Debug)]
struct LocalStoreInner {
    backend: Backend,
    keys: Arc<dyn SymmetricKeyProvider>,
    clock: Arc<dyn Clock>,
    state_file: Option<PathBuf>,

    access: LocalAccessDatasource,
    active_user_id: LocalActiveUserIdDatasource,
    auth_credentials: LocalAuthCredentialDatasource,
    migration_status: LocalMigrationStatusDatasource,
    in_app_notifications: LocalInAppNotificationDatasource,
    invite_keys: LocalInviteKeyDatasource,
    items: LocalItemDatasource,
    item_read_events: LocalItemReadEventDatasource,
    item_text_autofill: LocalItemTextAutoFillDatasource,
    notification_send_time: LocalNotificationSendTimeDatasource,
    organizations: LocalOrganizationDatasource,
    passwords: LocalPasswordDatasource,
    public_keys: LocalPublicKeyDatasource,
    search_entries: LocalSearchEntryDatasource,
    shares: LocalShareDatasource,
    share_event_ids: LocalShareEventIdDatasource,
    share_keys: LocalShareKeyDatasource,
    shared_preferences: LocalSharedPreferencesDatasource,
    spotlight_vaults: LocalSpotlightVaultDatasource,
    telemetry_events: LocalTelemetryEventDatasource,
    unauth_credential: LocalUnauthCredentialDatasource,
    user_data: LocalUserDataDatasource,
    user_event_ids: LocalUserEventIdDatasource,
    user_invites: LocalUserInviteDatasource,
    user_preferences: LocalUserPreferencesDatasource,
}

impl LocalStore {
    /// Open the backend described by `config`.
    ///
    /// For [`BackendConfig::InMemoryFile`](crate::BackendConfig::InMemoryFile)
    /// the state file is loaded now and written back by [`LocalStore::flush`].
    pub async fn open(config: &StoreConfig, keys: Arc<dyn SymmetricKeyProvider>) -> Result<Self> {
        let backend = config.open_backend().await?;
        info!(
            state_file = ?config.state_file(),
            "Opened local store"
        );
        Ok(Self::build(
            backend,
            keys,
            Arc::new(SystemClock),
            config.state_file().cloned(),
        ))
    }

    /// Use an already opened backend.
    pub fn with_backend(backend: Backend, keys: Arc<dyn SymmetricKeyProvider>) -> Self {
        Self::build(backend, keys, Arc::new(SystemClock), None)
    }

    /// Use an already opened backend and a custom clock.
    ///
    /// Only available with the `testing` feature or in test builds.
    #[cfg(any(test, feature = "testing"))]
    pub fn with_clock(
        backend: Backend,
        keys: Arc<dyn SymmetricKeyProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::build(backend, keys, clock, None)
    }

    fn build(
        backend: Backend,
        keys: Arc<dyn SymmetricKeyProvider>,
        clock: Arc<dyn Clock>,
        state_file: Option<PathBuf>,
    ) -> Self {
        let b = || backend.clone();
        let k = || keys.clone();
        let inner = LocalStoreInner {
            access: LocalAccessDatasource::new(b(), k()),
            active_user_id: LocalActiveUserIdDatasource::new(b(), k()),
            auth_credentials: LocalAuthCredentialDatasource::new(b(), k()),
            migration_status: LocalMigrationStatusDatasource::new(b(), k()),
            in_app_notifications: LocalInAppNotificationDatasource::new(b(), k()),
            invite_keys: LocalInviteKeyDatasource::new(b(), k()),
            items: LocalItemDatasource::new(b(), k()),
            item_read_events: LocalItemReadEventDatasource::new(b(), k()),
            item_text_autofill: LocalItemTextAutoFillDatasource::new(b(), k(), clock.clone()),
            notification_send_time: LocalNotificationSendTimeDatasource::new(
                b(),
                k(),
                clock.clone(),
            ),
            organizations: LocalOrganizationDatasource::new(b(), k()),
            passwords: LocalPasswordDatasource::new(b(), k()),
            public_keys: LocalPublicKeyDatasource::new(b(), k()),
            search_entries: LocalSearchEntryDatasource::new(b(), k(), clock.clone()),
            shares: LocalShareDatasource::new(b(), k()),
            share_event_ids: LocalShareEventIdDatasource::new(b(), k()),
            share_keys: LocalShareKeyDatasource::new(b(), k()),
            shared_preferences: LocalSharedPreferencesDatasource::new(b(), k()),
            spotlight_vaults: LocalSpotlightVaultDatasource::new(b(), k()),
            telemetry_events: LocalTelemetryEventDatasource::new(b(), k()),
            unauth_credential: LocalUnauthCredentialDatasource::new(b(), k()),
            user_data: LocalUserDataDatasource::new(b(), k(), clock.clone()),
            user_event_ids: LocalUserEventIdDatasource::new(b(), k()),
            user_invites: LocalUserInviteDatasource::new(b(), k()),
            user_preferences: LocalUserPreferencesDatasource::new(b(), k()),
            backend: backend.clone(),
            keys: keys.clone(),
            clock,
            state_file,
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn backend(&self) -> &Backend {
        &self.inner.backend
    }

    pub fn keys(&self) -> &Arc<dyn SymmetricKeyProvider> {
        &self.inner.keys
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.inner.clock
    }

    /// Write an in-memory backend back to its state file.
    ///
    /// A no-op for SQL backends and for in-memory stores without a state file.
    pub async fn flush(&self) -> Result<()> {
        let Some(path) = &self.inner.state_file else {
            return Ok(());
        };
        match self.inner.backend.downcast_ref::<InMemory>() {
            Some(store) => store.save_to_file(path).await,
            None => Ok(()),
        }
    }

    /// Delete every row owned by `user_id` in every table.
    ///
    /// Install-wide records and other users are untouched. No key is needed.
    pub async fn wipe_user(&self, user_id: &str) -> Result<u64> {
        let filter = RowFilter::scope(Scope::user(user_id));
        let mut removed = 0;
        for table in ALL_TABLES {
            removed += self.inner.backend.delete_where(table, &filter).await?;
        }
        info!(user_id, removed, "Wiped local data of user");
        Ok(removed)
    }

    /// Delete every row of every table, including install-wide records.
    pub async fn wipe_all(&self) -> Result<u64> {
        let mut removed = 0;
        for table in ALL_TABLES {
            let count = self
                .inner
                .backend
                .delete_where(table, &RowFilter::all())
                .await?;
            debug!(table, count, "Cleared table");
            removed += count;
        }
        info!(removed, "Wiped all local data");
        Ok(removed)
    }

    /// Plan and limits per user.
    pub fn access(&self) -> &LocalAccessDatasource {
        &self.inner.access
    }

    /// The user selected on this install.
    pub fn active_user_id(&self) -> &LocalActiveUserIdDatasource {
        &self.inner.active_user_id
    }

    /// Session credentials per user and app module.
    pub fn auth_credentials(&self) -> &LocalAuthCredentialDatasource {
        &self.inner.auth_credentials
    }

    /// Completed local data migrations.
    pub fn migration_status(&self) -> &LocalMigrationStatusDatasource {
        &self.inner.migration_status
    }

    /// In-app notifications per user.
    pub fn in_app_notifications(&self) -> &LocalInAppNotificationDatasource {
        &self.inner.in_app_notifications
    }

    /// Keys attached to pending vault invites.
    pub fn invite_keys(&self) -> &LocalInviteKeyDatasource {
        &self.inner.invite_keys
    }

    /// Vault items.
    pub fn items(&self) -> &LocalItemDatasource {
        &self.inner.items
    }

    /// Item read events awaiting upload.
    pub fn item_read_events(&self) -> &LocalItemReadEventDatasource {
        &self.inner.item_read_events
    }

    /// Items recently used for text autofill.
    pub fn item_text_autofill(&self) -> &LocalItemTextAutoFillDatasource {
        &self.inner.item_text_autofill
    }

    /// When each user was last sent a notification.
    pub fn notification_send_time(&self) -> &LocalNotificationSendTimeDatasource {
        &self.inner.notification_send_time
    }

    /// Organization membership and settings.
    pub fn organizations(&self) -> &LocalOrganizationDatasource {
        &self.inner.organizations
    }

    /// Generated password history.
    pub fn passwords(&self) -> &LocalPasswordDatasource {
        &self.inner.passwords
    }

    /// Public keys of other accounts, by email.
    pub fn public_keys(&self) -> &LocalPublicKeyDatasource {
        &self.inner.public_keys
    }

    /// Recently searched items.
    pub fn search_entries(&self) -> &LocalSearchEntryDatasource {
        &self.inner.search_entries
    }

    /// Shares each user has access to.
    pub fn shares(&self) -> &LocalShareDatasource {
        &self.inner.shares
    }

    /// Event stream cursor per share.
    pub fn share_event_ids(&self) -> &LocalShareEventIdDatasource {
        &self.inner.share_event_ids
    }

    /// Share keys by rotation.
    pub fn share_keys(&self) -> &LocalShareKeyDatasource {
        &self.inner.share_keys
    }

    /// Preferences common to every user of the install.
    pub fn shared_preferences(&self) -> &LocalSharedPreferencesDatasource {
        &self.inner.shared_preferences
    }

    /// Vaults indexed for system search.
    pub fn spotlight_vaults(&self) -> &LocalSpotlightVaultDatasource {
        &self.inner.spotlight_vaults
    }

    /// Telemetry events awaiting upload.
    pub fn telemetry_events(&self) -> &LocalTelemetryEventDatasource {
        &self.inner.telemetry_events
    }

    /// Credential of the unauthenticated session.
    pub fn unauth_credential(&self) -> &LocalUnauthCredentialDatasource {
        &self.inner.unauth_credential
    }

    /// Cached account details.
    pub fn user_data(&self) -> &LocalUserDataDatasource {
        &self.inner.user_data
    }

    /// Event stream cursor per user.
    pub fn user_event_ids(&self) -> &LocalUserEventIdDatasource {
        &self.inner.user_event_ids
    }

    /// Invites received by each user.
    pub fn user_invites(&self) -> &LocalUserInviteDatasource {
        &self.inner.user_invites
    }

    /// Preferences per user.
    pub fn user_preferences(&self) -> &LocalUserPreferencesDatasource {
        &self.inner.user_preferences
    }
}
