//! Stored per-user permission records.

use super::rule::GrantRule;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user's stored permissions.
///
/// # Example
///
/// ```rust
/// use resalt_auth::permission::{GrantRule, UserPermissions};
///
/// let user = UserPermissions::new("alice", vec![GrantRule::bare("test.ping")])
///     .with_groups(["ops"]);
/// assert_eq!(user.groups, vec!["ops"]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPermissions {
    /// Username this record belongs to.
    pub username: String,

    /// The user's own grants, in evaluation order.
    #[serde(default)]
    pub perms: Vec<GrantRule>,

    /// Names of the permission groups the user belongs to.
    #[serde(default)]
    pub groups: Vec<String>,

    /// When the record was last written.
    pub updated_at: DateTime<Utc>,
}

impl UserPermissions {
    /// Create a record with no group memberships.
    pub fn new(username: impl Into<String>, perms: Vec<GrantRule>) -> Self {
        Self {
            username: username.into(),
            perms,
            groups: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Set group memberships.
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }
}

impl PartialEq for UserPermissions {
    fn eq(&self, other: &Self) -> bool {
        self.username == other.username && self.perms == other.perms && self.groups == other.groups
    }
}

impl Eq for UserPermissions {}
