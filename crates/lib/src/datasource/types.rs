//! Records persisted by the datasources.
//!
//! Everything here round-trips through `serde_json` before sealing. Fields
//! added later carry `#[serde(default)]` so rows written by older builds keep
//! decoding. Times stamped by the store clock are milliseconds since the Unix
//! epoch; times received from the server are stored as given.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Account

/// Subscription plan attached to an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Plan family, e.g. `free` or `plus`
    pub plan_type: String,
    /// Server-side plan name
    pub internal_name: String,
    /// Name shown to the user
    pub display_name: String,
    /// Hide upgrade prompts
    #[serde(default)]
    pub hide_upgrade: bool,
    /// End of the trial period, if on trial
    #[serde(default)]
    pub trial_end: Option<i64>,
    /// Maximum vault count; `None` means unlimited
    #[serde(default)]
    pub vault_limit: Option<i64>,
    /// Maximum alias count; `None` means unlimited
    #[serde(default)]
    pub alias_limit: Option<i64>,
    /// Maximum TOTP count; `None` means unlimited
    #[serde(default)]
    pub totp_limit: Option<i64>,
    /// Whether aliases can be managed
    #[serde(default)]
    pub manage_alias: bool,
}

/// What an account may do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Access {
    /// Current plan
    pub plan: Plan,
    /// Invites waiting for this user
    #[serde(default)]
    pub pending_invites: i64,
    /// Invites sent to addresses without an account yet
    #[serde(default)]
    pub waiting_new_user_invites: i64,
    /// Oldest app version the server still accepts
    #[serde(default)]
    pub min_version_upgrade: Option<String>,
}

/// An [`Access`] together with its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccess {
    /// Owner
    pub user_id: String,
    /// Owner's access
    pub access: Access,
}

/// Process context holding its own authentication session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassModule {
    /// The main application
    HostApp,
    /// Password autofill extension
    AutoFillExtension,
    /// Share sheet extension
    ShareExtension,
}

impl PassModule {
    /// Every module, in a fixed order.
    pub const ALL: [PassModule; 3] = [
        PassModule::HostApp,
        PassModule::AutoFillExtension,
        PassModule::ShareExtension,
    ];

    /// Key component for this module.
    pub fn as_str(&self) -> &'static str {
        match self {
            PassModule::HostApp => "host_app",
            PassModule::AutoFillExtension => "autofill_extension",
            PassModule::ShareExtension => "share_extension",
        }
    }
}

impl fmt::Display for PassModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session tokens for one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthCredential {
    /// Session id
    pub session_id: String,
    /// Bearer token
    pub access_token: String,
    /// Token used to renew `access_token`
    pub refresh_token: String,
    /// Account name the session was opened for
    #[serde(default)]
    pub user_name: String,
    /// Scopes granted to the session
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Mailbox password, for accounts using two passwords
    #[serde(default)]
    pub mailbox_password: Option<String>,
}

/// Identifiers of one-off migrations that already ran on this install.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationStatus {
    /// Completed migration identifiers
    #[serde(default)]
    pub completed: BTreeSet<String>,
}

impl MigrationStatus {
    /// Whether `migration` already ran.
    pub fn is_completed(&self, migration: &str) -> bool {
        self.completed.contains(migration)
    }
}

/// Organization the account belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    /// Whether the user may change organization settings
    pub can_update: bool,
    /// Policies, when the account is managed
    #[serde(default)]
    pub settings: Option<OrganizationSettings>,
}

/// Policies an organization applies to its members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationSettings {
    /// Who vaults may be shared with
    pub share_mode: i64,
    /// Whether item-level sharing is allowed
    pub items_allowed: bool,
    /// Enforced lock delay; 0 leaves it to the user
    #[serde(default)]
    pub force_lock_seconds: i64,
    /// Whether exporting data is allowed
    #[serde(default)]
    pub export_mode: i64,
}

/// Locally cached account details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    /// Account id
    pub user_id: String,
    /// Primary email
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Key id to passphrase
    #[serde(default)]
    pub passphrases: BTreeMap<String, String>,
    #[serde(default)]
    pub addresses: Vec<Address>,
}

/// Email address owned by an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub address_id: String,
    pub email: String,
}

/// Per-user settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Index items in system search
    #[serde(default)]
    pub spotlight_enabled: bool,
    /// What part of an item is indexed
    #[serde(default)]
    pub spotlight_searchable_content: SpotlightSearchableContent,
    /// Which vaults are indexed
    #[serde(default)]
    pub spotlight_searchable_vaults: SpotlightSearchableVaults,
    /// Whether a second password protects the app
    #[serde(default)]
    pub extra_password_enabled: bool,
    /// Consecutive wrong extra password attempts
    #[serde(default)]
    pub failed_extra_password_count: i64,
    /// Share selected in the vault list
    #[serde(default)]
    pub last_selected_share_id: Option<String>,
    /// Share the last item was created in
    #[serde(default)]
    pub last_created_item_share_id: Option<String>,
}

/// Item fields exposed to system search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpotlightSearchableContent {
    #[default]
    Title,
    TitleAndNote,
    AllExceptSensitiveData,
}

/// Vaults exposed to system search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpotlightSearchableVaults {
    #[default]
    All,
    /// Only those stored by the spotlight vault datasource
    Selected,
}

/// Install-wide settings shared by every user and module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedPreferences {
    /// Offer credentials above the keyboard
    #[serde(default)]
    pub quick_type_bar: bool,
    /// Copy the TOTP code after autofilling a login
    #[serde(default)]
    pub automatically_copy_totp_code: bool,
    /// Lock the app after this long in the background
    #[serde(default)]
    pub app_lock_time_seconds: Option<i64>,
    /// Local unlock PIN
    #[serde(default)]
    pub pin_code: Option<String>,
    /// Consecutive failed unlock attempts
    #[serde(default)]
    pub failed_attempt_count: i64,
    #[serde(default)]
    pub theme: Theme,
    /// Clear copied values after this long
    #[serde(default)]
    pub clipboard_expiration_seconds: Option<i64>,
}

/// Color scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    MatchSystem,
}

// ---------------------------------------------------------------------------
// Items

/// Whether an item is live or in the trash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    Active,
    Trashed,
}

impl ItemState {
    /// Value stored in the plaintext `state` attribute.
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemState::Active => "active",
            ItemState::Trashed => "trashed",
        }
    }
}

/// Server revision attributes of an item, stored in plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRevision {
    /// Item id, unique within its share
    pub item_id: String,
    /// Server revision counter
    pub revision: i64,
    /// Version of the content encoding
    #[serde(default)]
    pub content_format_version: i64,
    /// Share key rotation the content is encrypted with
    #[serde(default)]
    pub key_rotation: i64,
    pub state: ItemState,
    #[serde(default)]
    pub pinned: bool,
    /// When the item was pinned
    #[serde(default)]
    pub pin_time: Option<i64>,
    /// Address of an alias item, used for lookups by email
    #[serde(default)]
    pub alias_email: Option<String>,
    pub create_time: i64,
    /// Last content change; share listings are ordered by it
    pub modify_time: i64,
    /// Last time the item was autofilled or opened
    #[serde(default)]
    pub last_use_time: Option<i64>,
    /// Time of the current revision
    pub revision_time: i64,
    /// Server item flags
    #[serde(default)]
    pub flags: i64,
}

/// An item as stored locally: revision attributes plus its content.
///
/// `content` is the serialized item body; it is only ever written sealed.
#[derive(Clone, PartialEq, Eq)]
pub struct LocalItem {
    /// Owner
    pub user_id: String,
    /// Share holding the item
    pub share_id: String,
    pub revision: ItemRevision,
    /// Serialized item body
    pub content: Vec<u8>,
    /// Whether the item is a login, for autofill listings
    pub is_login_item: bool,
}

impl fmt::Debug for LocalItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalItem")
            .field("user_id", &self.user_id)
            .field("share_id", &self.share_id)
            .field("revision", &self.revision)
            .field("content_len", &self.content.len())
            .field("is_login_item", &self.is_login_item)
            .finish()
    }
}

impl LocalItem {
    /// Item id from the revision.
    pub fn item_id(&self) -> &str {
        &self.revision.item_id
    }

    /// Item state from the revision.
    pub fn state(&self) -> ItemState {
        self.revision.state
    }
}

/// Locates an item within a share.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemIdentifier {
    pub share_id: String,
    pub item_id: String,
}

impl ItemIdentifier {
    /// Identifier of `item_id` in `share_id`.
    pub fn new(share_id: impl Into<String>, item_id: impl Into<String>) -> Self {
        Self {
            share_id: share_id.into(),
            item_id: item_id.into(),
        }
    }
}

/// Partial update received from the server, e.g. a trash or restore.
///
/// Applying one never touches item content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifiedItem {
    pub share_id: String,
    pub item_id: String,
    /// New revision counter
    pub revision: i64,
    pub state: ItemState,
    pub modify_time: i64,
    pub revision_time: i64,
    pub flags: i64,
}

/// New last-use time for an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastUseItem {
    pub share_id: String,
    pub item_id: String,
    pub last_use_time: i64,
}

/// Number of items per state in one share.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemCount {
    pub active: usize,
    pub trashed: usize,
}

impl ItemCount {
    /// Items in any state.
    pub fn total(&self) -> usize {
        self.active + self.trashed
    }
}

/// Record of an item being viewed, reported to the server later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemReadEvent {
    /// Event id
    pub uuid: String,
    pub share_id: String,
    pub item_id: String,
    /// When the item was read
    pub timestamp: i64,
}

/// When an item was last used for text autofill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextAutoFillHistoryEntry {
    pub share_id: String,
    pub item_id: String,
    pub time: i64,
}

/// Recently searched item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchEntry {
    /// User who searched
    pub user_id: String,
    pub share_id: String,
    pub item_id: String,
    /// When the item was last picked from search
    pub time: i64,
}

/// Locally generated password kept in the generator history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedPassword {
    pub id: String,
    /// The password itself
    pub value: String,
    pub creation_time: i64,
}

// ---------------------------------------------------------------------------
// Sharing

/// A vault or item shared with the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    pub share_id: String,
    pub vault_id: String,
    /// Address the share was given to
    pub address_id: String,
    /// Vault or item share
    pub target_type: i64,
    /// Id of the shared vault or item
    pub target_id: String,
    /// Permission bit set
    pub permission: i64,
    /// Whether the user owns the target
    #[serde(default)]
    pub owner: bool,
    /// Whether other users also have access
    #[serde(default)]
    pub shared: bool,
    /// Encrypted vault content as received from the server
    #[serde(default)]
    pub content: Option<String>,
    /// Key rotation `content` is encrypted with
    #[serde(default)]
    pub content_key_rotation: Option<i64>,
    /// When access ends, for time-limited shares
    #[serde(default)]
    pub expire_time: Option<i64>,
    pub create_time: i64,
}

/// One rotation of a share's key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareKey {
    pub share_id: String,
    /// Rotation number; listings are ordered by it
    pub key_rotation: i64,
    /// Key encrypted to the user key
    pub key: String,
    /// User key the share key is encrypted to
    pub user_key_id: String,
    pub create_time: i64,
}

/// Key material attached to an invite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteKey {
    /// Encrypted key
    pub key: String,
    pub key_rotation: i64,
}

/// An invitation to join a share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInvite {
    pub invite_token: String,
    pub inviter_email: String,
    pub invited_email: String,
    /// Vault or item invite
    pub target_type: i64,
    pub target_id: String,
    /// Share id on the server once known
    #[serde(default)]
    pub remote_share_id: Option<String>,
    #[serde(default)]
    pub keys: Vec<InviteKey>,
    pub create_time: i64,
    /// Whether the invite was sent before the invitee had an account
    #[serde(default)]
    pub from_new_user: bool,
}

/// Alias or address public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    /// Armored key
    pub value: String,
}

// ---------------------------------------------------------------------------
// Notifications and telemetry

/// Whether the user has seen a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InAppNotificationState {
    Unread,
    Read,
    Dismissed,
}

/// Call to action attached to a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InAppNotificationCta {
    /// Button label
    pub text: String,
    /// Kind of action, e.g. an internal route or an external link
    pub cta_type: String,
    /// Route or URL the action opens
    pub reference: String,
}

/// What a notification displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InAppNotificationContent {
    #[serde(default)]
    pub image_url: Option<String>,
    /// Banner or modal
    pub display_type: i64,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub cta: Option<InAppNotificationCta>,
}

/// Message shown inside the app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InAppNotification {
    pub id: String,
    /// Server key used to report state changes
    pub notification_key: String,
    /// Not shown before this time
    pub start_time: i64,
    /// Not shown after this time
    #[serde(default)]
    pub end_time: Option<i64>,
    pub state: InAppNotificationState,
    /// Higher values are shown first
    pub priority: i64,
    pub content: InAppNotificationContent,
}

/// Usage event waiting to be sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    /// Event id
    pub uuid: String,
    /// When the event happened
    pub time: i64,
    /// Event name
    pub event_type: String,
}
