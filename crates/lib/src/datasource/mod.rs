//! Per-entity local datasources.
//!
//! Every datasource wraps one [`EncryptedTable`] and turns its entity's
//! operations into keyed row operations. User records are keyed by
//! `Scope::User(user_id)` plus secondary parts, so an operation invoked for
//! one user never reads or removes another user's rows. Install-wide
//! singletons live in `Scope::Device`.
//!
//! Absent records are reported as `None`, an empty list or a no-op; they
//! are never errors.

mod account;
mod activity;
mod errors;
mod items;
mod notifications;
mod sharing;
mod table;
pub mod types;

pub use account::{
    LocalAccessDatasource, LocalActiveUserIdDatasource, LocalAuthCredentialDatasource,
    LocalMigrationStatusDatasource, LocalOrganizationDatasource, LocalSharedPreferencesDatasource,
    LocalUnauthCredentialDatasource, LocalUserDataDatasource, LocalUserEventIdDatasource,
    LocalUserPreferencesDatasource,
};
pub use activity::{
    LocalItemReadEventDatasource, LocalItemTextAutoFillDatasource, LocalPasswordDatasource,
    LocalSearchEntryDatasource, LocalTelemetryEventDatasource,
};
pub use errors::DatasourceError;
pub use items::LocalItemDatasource;
pub use notifications::{LocalInAppNotificationDatasource, LocalNotificationSendTimeDatasource};
pub use sharing::{
    LocalInviteKeyDatasource, LocalPublicKeyDatasource, LocalShareDatasource,
    LocalShareEventIdDatasource, LocalShareKeyDatasource, LocalSpotlightVaultDatasource,
    LocalUserInviteDatasource,
};
pub use table::{EncryptedTable, Opened, Record, from_meta, key_scope, to_meta};

use crate::backend::{RowFilter, RowKey, Scope};
use crate::constants::SINGLETON_KEY;

/// Key of a user record with the given secondary parts.
pub(crate) fn user_key<I, S>(user_id: &str, parts: I) -> RowKey
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    RowKey::new(Scope::user(user_id), parts)
}

/// Key of the single record a user has in a table.
pub(crate) fn user_singleton(user_id: &str) -> RowKey {
    user_key(user_id, [SINGLETON_KEY])
}

/// Key of an install-wide singleton.
pub(crate) fn device_singleton() -> RowKey {
    RowKey::new(Scope::Device, [SINGLETON_KEY])
}

/// Every row owned by `user_id`.
pub(crate) fn user_filter(user_id: &str) -> RowFilter {
    RowFilter::scope(Scope::user(user_id))
}
