//! Permission configuration files.
//!
//! A configuration file declares permission groups and users:
//!
//! ```json
//! {
//!   "groups": {
//!     "ops": [{"@resalt": ["minion.*", "job.list"]}]
//!   },
//!   "users": {
//!     "alice": { "perms": ["test.ping"], "groups": ["ops"] },
//!     "bob": { "perms": [{"${WEB_TARGET:-web*}": ["grains.items"]}] }
//!   }
//! }
//! ```
//!
//! `perms` arrays use the same shape as stored user records and are parsed
//! strictly.

use crate::error::{Error, Result};
use crate::permission::{
    permissions_from_value, GrantRule, MemoryPermissionStore, PermissionAuthorizer,
    PermissionDataError, PermissionGroup, UserPermissions,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Configuration file format
#[derive(Debug, Deserialize)]
pub struct PermissionConfigFile {
    /// Map of group name to its `perms` array
    #[serde(default)]
    pub groups: BTreeMap<String, Value>,
    /// Map of username to user entry
    #[serde(default)]
    pub users: BTreeMap<String, UserEntry>,
}

/// Individual user entry
#[derive(Debug, Deserialize)]
pub struct UserEntry {
    /// The user's own `perms` array
    #[serde(default)]
    pub perms: Option<Value>,
    /// Group memberships, in evaluation order
    #[serde(default)]
    pub groups: Vec<String>,
}

/// Validated permission configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionConfig {
    /// Declared groups, ordered by name.
    pub groups: Vec<PermissionGroup>,
    /// Declared users, ordered by username.
    pub users: Vec<UserPermissions>,
}

impl PermissionConfig {
    /// Parse configuration from a JSON string.
    ///
    /// `${VAR}` and `${VAR:-default}` references are expanded first.
    pub fn parse(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content);
        let file: PermissionConfigFile = serde_json::from_str(&expanded)
            .map_err(|e| Error::Config(format!("invalid configuration JSON: {}", e)))?;
        Self::from_file(file)
    }

    fn from_file(file: PermissionConfigFile) -> Result<Self> {
        let mut groups = Vec::with_capacity(file.groups.len());
        for (name, perms) in &file.groups {
            let perms = parse_entry_perms("group", name, perms)?;
            groups.push(PermissionGroup::new(name.clone(), perms));
        }

        let mut users = Vec::with_capacity(file.users.len());
        for (name, entry) in file.users {
            if let Some(unknown) = entry.groups.iter().find(|g| !file.groups.contains_key(*g)) {
                return Err(Error::Config(format!(
                    "User '{}': unknown group '{}'",
                    name, unknown
                )));
            }
            let perms = match &entry.perms {
                Some(perms) => parse_entry_perms("user", &name, perms)?,
                None => Vec::new(),
            };
            users.push(UserPermissions::new(name, perms).with_groups(entry.groups));
        }

        Ok(Self { groups, users })
    }

    /// Build an authorizer backed by a memory store seeded with these users.
    pub async fn into_authorizer(self) -> Result<PermissionAuthorizer> {
        let auth = PermissionAuthorizer::with_store(MemoryPermissionStore::new())
            .with_groups(self.groups);
        for user in self.users {
            auth.save_user(user).await?;
        }
        log::debug!("Loaded {} user(s) into authorizer", auth.users().await?.len());
        Ok(auth)
    }
}

/// Load permission configuration from a JSON file
///
/// The path is expanded using shell expansion (e.g., `~/.resalt/perms.json`).
pub async fn load_config_file(path: impl AsRef<Path>) -> Result<PermissionConfig> {
    let path_str = path.as_ref().to_string_lossy().to_string();
    let expanded_path = shellexpand::tilde(&path_str);
    let path = Path::new(expanded_path.as_ref());

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;

    let config = PermissionConfig::parse(&content)?;
    log::debug!(
        "Loaded permission config from {}: {} group(s), {} user(s)",
        path.display(),
        config.groups.len(),
        config.users.len()
    );
    Ok(config)
}

fn parse_entry_perms(kind: &str, name: &str, perms: &Value) -> Result<Vec<GrantRule>> {
    permissions_from_value(perms).map_err(|e| {
        Error::InvalidPermissionData(PermissionDataError::InvalidRule(format!(
            "{} '{}': {}",
            kind, name, e
        )))
    })
}

/// Expand environment variables in a string
///
/// Supports:
/// - `${VAR}` - expands to the value of VAR, or empty string if not set
/// - `${VAR:-default}` - expands to the value of VAR, or "default" if not set
///
/// A `$` not followed by `{` is kept, so regex anchors in patterns survive.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::new();
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'

            let mut var_name = String::new();
            let mut default_value = None;

            while let Some(next_ch) = chars.next() {
                if next_ch == '}' {
                    break;
                } else if next_ch == ':' && chars.peek() == Some(&'-') {
                    chars.next(); // consume '-'
                    let mut value = String::new();
                    for default_ch in chars.by_ref() {
                        if default_ch == '}' {
                            break;
                        }
                        value.push(default_ch);
                    }
                    default_value = Some(value);
                    break;
                } else {
                    var_name.push(next_ch);
                }
            }

            match std::env::var(&var_name) {
                Ok(value) => result.push_str(&value),
                Err(_) => result.push_str(default_value.as_deref().unwrap_or_default()),
            }
        } else {
            result.push(ch);
        }
    }

    result
}
