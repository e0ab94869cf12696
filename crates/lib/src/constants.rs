//! Table names and fixed values shared across datasources.

/// Access plans and limits per user.
pub const ACCESS_TABLE: &str = "access";
/// Device-wide record of which account is active.
pub const ACTIVE_USER_ID_TABLE: &str = "active_user_id";
/// Per-module authentication credentials.
pub const AUTH_CREDENTIALS_TABLE: &str = "auth_credentials";
/// Device-wide data migration progress.
pub const MIGRATION_STATUS_TABLE: &str = "migration_status";
/// In-app notifications.
pub const IN_APP_NOTIFICATIONS_TABLE: &str = "in_app_notifications";
/// Keys attached to pending invites.
pub const INVITE_KEYS_TABLE: &str = "invite_keys";
/// Vault items.
pub const ITEMS_TABLE: &str = "items";
/// Item read events waiting to be reported.
pub const ITEM_READ_EVENTS_TABLE: &str = "item_read_events";
/// Items recently used for text autofill.
pub const ITEM_TEXT_AUTOFILL_TABLE: &str = "item_text_autofill";
/// Last time a notification was shown.
pub const NOTIFICATION_SEND_TIME_TABLE: &str = "notification_send_time";
/// Organization settings per user.
pub const ORGANIZATIONS_TABLE: &str = "organizations";
/// Generated password history.
pub const PASSWORDS_TABLE: &str = "passwords";
/// Public address keys by email.
pub const PUBLIC_KEYS_TABLE: &str = "public_keys";
/// Search history entries.
pub const SEARCH_ENTRIES_TABLE: &str = "search_entries";
/// Shares (vaults) visible to a user.
pub const SHARES_TABLE: &str = "shares";
/// Last synced event id per share.
pub const SHARE_EVENT_IDS_TABLE: &str = "share_event_ids";
/// Share keys by rotation.
pub const SHARE_KEYS_TABLE: &str = "share_keys";
/// Device-wide preferences.
pub const SHARED_PREFERENCES_TABLE: &str = "shared_preferences";
/// Vaults indexed by system search.
pub const SPOTLIGHT_VAULTS_TABLE: &str = "spotlight_vaults";
/// Telemetry events waiting to be sent.
pub const TELEMETRY_EVENTS_TABLE: &str = "telemetry_events";
/// Credential used before login.
pub const UNAUTH_CREDENTIAL_TABLE: &str = "unauth_credential";
/// Account data per user.
pub const USER_DATA_TABLE: &str = "user_data";
/// Last synced user event id.
pub const USER_EVENT_IDS_TABLE: &str = "user_event_ids";
/// Invites received by a user.
pub const USER_INVITES_TABLE: &str = "user_invites";
/// Per-user preferences.
pub const USER_PREFERENCES_TABLE: &str = "user_preferences";

/// Every table a [`crate::LocalStore`] writes to.
///
/// Used by per-user and global wipes; a table missing here survives logout.
pub const ALL_TABLES: &[&str] = &[
    ACCESS_TABLE,
    ACTIVE_USER_ID_TABLE,
    AUTH_CREDENTIALS_TABLE,
    MIGRATION_STATUS_TABLE,
    IN_APP_NOTIFICATIONS_TABLE,
    INVITE_KEYS_TABLE,
    ITEMS_TABLE,
    ITEM_READ_EVENTS_TABLE,
    ITEM_TEXT_AUTOFILL_TABLE,
    NOTIFICATION_SEND_TIME_TABLE,
    ORGANIZATIONS_TABLE,
    PASSWORDS_TABLE,
    PUBLIC_KEYS_TABLE,
    SEARCH_ENTRIES_TABLE,
    SHARES_TABLE,
    SHARE_EVENT_IDS_TABLE,
    SHARE_KEYS_TABLE,
    SHARED_PREFERENCES_TABLE,
    SPOTLIGHT_VAULTS_TABLE,
    TELEMETRY_EVENTS_TABLE,
    UNAUTH_CREDENTIAL_TABLE,
    USER_DATA_TABLE,
    USER_EVENT_IDS_TABLE,
    USER_INVITES_TABLE,
    USER_PREFERENCES_TABLE,
];

/// Key part used by singleton records in the device scope.
pub const SINGLETON_KEY: &str = "_";
