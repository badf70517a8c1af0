//! Permission groups.
//!
//! A user's effective grant list is their own grants followed by the grants
//! of each group they belong to, in membership order. Because evaluation is
//! first-match, a user's own scoped rules take precedence over group rules
//! for the same target.

use super::rule::GrantRule;
use serde::{Deserialize, Serialize};

/// A named, shareable list of grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGroup {
    /// Group name, unique within a deployment.
    pub name: String,

    /// Grants every member receives.
    #[serde(default)]
    pub perms: Vec<GrantRule>,
}

impl PermissionGroup {
    /// Create a group.
    pub fn new(name: impl Into<String>, perms: Vec<GrantRule>) -> Self {
        Self {
            name: name.into(),
            perms,
        }
    }
}

/// Build the grant list that is evaluated for a user.
pub fn effective_permissions<'a>(
    own: &[GrantRule],
    groups: impl IntoIterator<Item = &'a PermissionGroup>,
) -> Vec<GrantRule> {
    let mut perms = own.to_vec();
    for group in groups {
        perms.extend(group.perms.iter().cloned());
    }
    perms
}
