//! Row model shared by every backend.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Plaintext row attributes used for filtering and partial updates.
pub type Meta = serde_json::Map<String, Value>;

/// Partition component of every row key.
///
/// User rows are only reachable through their owner's scope; device rows hold
/// install-wide records that exist before login.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Scope {
    /// Install-wide records
    Device,
    /// Records owned by one user id
    User(String),
}

impl Scope {
    /// Scope for a user id.
    pub fn user(user_id: impl Into<String>) -> Self {
        Scope::User(user_id.into())
    }

    /// Text form stored in SQL columns.
    pub fn storage_key(&self) -> String {
        match self {
            Scope::Device => "device".to_string(),
            Scope::User(id) => format!("user:{id}"),
        }
    }

    /// Parse the text form produced by [`Scope::storage_key`].
    pub fn from_storage_key(value: &str) -> Option<Self> {
        if value == "device" {
            Some(Scope::Device)
        } else {
            value.strip_prefix("user:").map(Scope::user)
        }
    }

    /// The user id, for user scopes.
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Scope::Device => None,
            Scope::User(id) => Some(id),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}

/// Primary key of a row within a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowKey {
    /// Owning scope
    pub scope: Scope,
    /// Secondary key components, e.g. `[share_id, item_id]`
    pub parts: Vec<String>,
}

impl RowKey {
    /// Build a key from a scope and its secondary parts.
    pub fn new<I, S>(scope: Scope, parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            scope,
            parts: parts.into_iter().map(Into::into).collect(),
        }
    }

    /// Text form of `parts` stored in SQL columns.
    pub fn path(&self) -> String {
        // JSON keeps separators inside ids unambiguous
        serde_json::to_string(&self.parts).unwrap_or_default()
    }

    /// Bytes identifying this key within `table`; used as associated data
    /// when sealing the row payload.
    ///
    /// Each component is written with a big-endian `u64` length prefix.
    pub fn binding(&self, table: &str) -> Vec<u8> {
        let scope = self.scope.storage_key();
        let mut out = Vec::new();
        for component in [table, scope.as_str()]
            .into_iter()
            .chain(self.parts.iter().map(String::as_str))
        {
            out.extend_from_slice(&(component.len() as u64).to_be_bytes());
            out.extend_from_slice(component.as_bytes());
        }
        out
    }

    /// Whether the first parts of this key equal `prefix`.
    pub fn starts_with(&self, prefix: &[String]) -> bool {
        self.parts.len() >= prefix.len() && self.parts[..prefix.len()] == *prefix
    }
}

/// One stored record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Primary key
    pub key: RowKey,
    /// Ordering column: a timestamp, priority or creation time
    pub sort: i64,
    /// Insertion sequence, assigned by the store on first insert and kept on
    /// replace. Ignored on write.
    #[serde(default)]
    pub seq: i64,
    /// Plaintext index attributes
    #[serde(default)]
    pub meta: Meta,
    /// Sealed payload
    #[serde(with = "base64_bytes")]
    pub sealed: Vec<u8>,
}

impl Row {
    /// Build a row ready for upsert.
    pub fn new(key: RowKey, sort: i64, meta: Meta, sealed: Vec<u8>) -> Self {
        Self {
            key,
            sort,
            seq: 0,
            meta,
            sealed,
        }
    }
}

/// Predicate over rows of one table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowFilter {
    /// Only rows in this scope; `None` means every scope
    pub scope: Option<Scope>,
    /// Only rows whose key parts start with these
    pub prefix: Vec<String>,
    /// Only rows whose meta fields equal these values (missing fields equal `null`)
    pub meta: Vec<(String, Value)>,
    /// Only rows whose sort column is at most this value
    pub sort_at_most: Option<i64>,
}

impl RowFilter {
    /// Every row of the table.
    pub fn all() -> Self {
        Self::default()
    }

    /// Every row in `scope`.
    pub fn scope(scope: Scope) -> Self {
        Self {
            scope: Some(scope),
            ..Self::default()
        }
    }

    /// Restrict to keys starting with `parts`.
    pub fn with_prefix<I, S>(mut self, parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prefix = parts.into_iter().map(Into::into).collect();
        self
    }

    /// Restrict to rows whose `field` equals `value`.
    pub fn meta_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.push((field.into(), value.into()));
        self
    }

    /// Restrict to rows whose sort column is `<= max`.
    pub fn sort_at_most(mut self, max: i64) -> Self {
        self.sort_at_most = Some(max);
        self
    }

    /// Evaluate the filter against a row.
    pub fn matches(&self, row: &Row) -> bool {
        if let Some(scope) = &self.scope
            && row.key.scope != *scope
        {
            return false;
        }
        if !row.key.starts_with(&self.prefix) {
            return false;
        }
        if let Some(max) = self.sort_at_most
            && row.sort > max
        {
            return false;
        }
        self.meta
            .iter()
            .all(|(field, value)| row.meta.get(field).unwrap_or(&Value::Null) == value)
    }
}

/// Direction of the `(sort, seq)` ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Oldest / lowest first
    #[default]
    Ascending,
    /// Newest / highest first
    Descending,
}

/// Filter plus ordering and limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowQuery {
    /// Which rows
    pub filter: RowFilter,
    /// Ordering over `(sort, seq)`
    pub order: SortOrder,
    /// Maximum number of rows returned
    pub limit: Option<usize>,
}

impl RowQuery {
    /// Ascending query over `filter`.
    pub fn new(filter: RowFilter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    /// Highest sort first.
    pub fn descending(mut self) -> Self {
        self.order = SortOrder::Descending;
        self
    }

    /// Return at most `limit` rows.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Apply filter, ordering and limit to candidate rows.
    ///
    /// Ties on `sort` fall back to insertion order in both directions, so
    /// rows with equal priority keep the order they were first written in.
    pub fn select(&self, rows: impl IntoIterator<Item = Row>) -> Vec<Row> {
        let mut selected: Vec<Row> = rows
            .into_iter()
            .filter(|row| self.filter.matches(row))
            .collect();
        selected.sort_by(|a, b| match self.order {
            SortOrder::Ascending => a.sort.cmp(&b.sort).then(a.seq.cmp(&b.seq)),
            SortOrder::Descending => match b.sort.cmp(&a.sort) {
                Ordering::Equal => a.seq.cmp(&b.seq),
                other => other,
            },
        });
        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }
        selected
    }
}

/// Partial update of a row's plaintext columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowPatch {
    /// Meta fields to overwrite; other fields are kept
    pub meta: Meta,
    /// New sort value, if it changes
    pub sort: Option<i64>,
}

impl RowPatch {
    /// Overwrite one meta field.
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(field.into(), value.into());
        self
    }

    /// Change the sort column.
    pub fn sort(mut self, sort: i64) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Apply the patch to a row in place.
    pub fn apply(&self, row: &mut Row) {
        for (field, value) in &self.meta {
            row.meta.insert(field.clone(), value.clone());
        }
        if let Some(sort) = self.sort {
            row.sort = sort;
        }
    }
}

mod base64_bytes {
    use base64ct::{Base64, Encoding};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&Base64::encode_string(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        Base64::decode_vec(&text).map_err(serde::de::Error::custom)
    }
}
