//! Per-user authorization on top of a permission store.

use super::evaluator::{has_permission, RESALT_TARGET};
use super::group::{effective_permissions, PermissionGroup};
use super::request::Request;
use super::rule::GrantRule;
use super::store::{MemoryPermissionStore, PermissionStore, StoreError};
use super::user::UserPermissions;
use std::collections::HashMap;

/// Authorizes user requests against stored permissions.
///
/// The authorizer wraps a [`PermissionStore`] and a set of
/// [`PermissionGroup`]s, and provides:
/// - Setting and revoking a user's permissions
/// - Resolving a user's effective grant list (own grants, then groups)
/// - Checking requests and console feature permissions
///
/// # Example
///
/// ```rust
/// use resalt_auth::permission::{parse_permissions, PermissionAuthorizer, Request};
///
/// # tokio_test::block_on(async {
/// let auth = PermissionAuthorizer::new();
///
/// let perms = parse_permissions(r#"[{"web*": ["grains.items"]}, {"@resalt": ["minion.list"]}]"#).unwrap();
/// auth.set_permissions("alice", perms).await.unwrap();
///
/// assert!(auth.check("alice", &Request::new("web01", "grains.items")).await.is_authorized());
/// assert!(auth.check_named("alice", "minion.list").await.is_authorized());
/// assert!(auth.check("bob", &Request::new("web01", "grains.items")).await.is_denied());
/// # });
/// ```
pub struct PermissionAuthorizer {
    store: Box<dyn PermissionStore>,
    groups: HashMap<String, PermissionGroup>,
}

impl PermissionAuthorizer {
    /// Create a new authorizer with an in-memory store and no groups.
    pub fn new() -> Self {
        Self::with_store(MemoryPermissionStore::new())
    }

    /// Create an authorizer with a custom store.
    pub fn with_store(store: impl PermissionStore + 'static) -> Self {
        Self::with_boxed_store(Box::new(store))
    }

    /// Create an authorizer with a boxed store.
    pub fn with_boxed_store(store: Box<dyn PermissionStore>) -> Self {
        Self {
            store,
            groups: HashMap::new(),
        }
    }

    /// Register permission groups, replacing groups with the same name.
    pub fn with_groups(mut self, groups: impl IntoIterator<Item = PermissionGroup>) -> Self {
        for group in groups {
            self.groups.insert(group.name.clone(), group);
        }
        self
    }

    /// Look up a registered group.
    pub fn group(&self, name: &str) -> Option<&PermissionGroup> {
        self.groups.get(name)
    }

    /// Replace a user's own grants, keeping their group memberships.
    pub async fn set_permissions(
        &self,
        username: &str,
        perms: Vec<GrantRule>,
    ) -> Result<(), StoreError> {
        let groups = self
            .store
            .load(username)
            .await?
            .map(|record| record.groups)
            .unwrap_or_default();
        self.store
            .save(UserPermissions::new(username, perms).with_groups(groups))
            .await
    }

    /// Store a complete user record.
    pub async fn save_user(&self, record: UserPermissions) -> Result<(), StoreError> {
        self.store.save(record).await
    }

    /// Resolve the grant list evaluated for a user.
    ///
    /// Returns `None` for unknown users. Memberships in unregistered groups
    /// contribute nothing.
    pub async fn effective_permissions(
        &self,
        username: &str,
    ) -> Result<Option<Vec<GrantRule>>, StoreError> {
        let Some(record) = self.store.load(username).await? else {
            return Ok(None);
        };
        let groups = record.groups.iter().filter_map(|name| {
            let group = self.groups.get(name);
            if group.is_none() {
                log::warn!("User '{}' is a member of unknown group '{}'", username, name);
            }
            group
        });
        Ok(Some(effective_permissions(&record.perms, groups)))
    }

    /// Check whether a user may perform `request`.
    pub async fn check(&self, username: &str, request: &Request) -> Authorization {
        let perms = match self.effective_permissions(username).await {
            Ok(Some(perms)) => perms,
            Ok(None) => {
                log::debug!("Denied {} for unknown user '{}'", request, username);
                return Authorization::Denied {
                    reason: format!("No permissions configured for user '{}'", username),
                };
            }
            Err(e) => {
                log::warn!("Failed to load permissions for {}: {}", username, e);
                return Authorization::Denied {
                    reason: format!("Failed to load permissions for user '{}'", username),
                };
            }
        };

        if has_permission(&perms, request) {
            log::debug!("Granted {} for user '{}'", request, username);
            Authorization::Granted {
                username: username.to_string(),
            }
        } else {
            log::debug!("Denied {} for user '{}'", request, username);
            Authorization::Denied {
                reason: format!(
                    "User '{}' is not permitted to run '{}' on '{}'",
                    username, request.function, request.target
                ),
            }
        }
    }

    /// Check a console feature permission for a user.
    pub async fn check_named(&self, username: &str, name: &str) -> Authorization {
        self.check(username, &Request::new(RESALT_TARGET, name)).await
    }

    /// Remove a user's stored permissions.
    pub async fn revoke(&self, username: &str) -> Result<bool, StoreError> {
        self.store.delete(username).await
    }

    /// Get all stored user records.
    pub async fn users(&self) -> Result<Vec<UserPermissions>, StoreError> {
        self.store.load_all().await
    }

    /// Remove every stored user record.
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.store.clear().await
    }
}

impl Default for PermissionAuthorizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    /// The request is allowed.
    Granted {
        /// The user that was authorized.
        username: String,
    },
    /// The request is not allowed.
    Denied {
        /// Reason for denial.
        reason: String,
    },
}

impl Authorization {
    /// Check if the request is authorized.
    pub fn is_authorized(&self) -> bool {
        matches!(self, Authorization::Granted { .. })
    }

    /// Check if the request is denied.
    pub fn is_denied(&self) -> bool {
        matches!(self, Authorization::Denied { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::{names, FunctionRule};
    use async_trait::async_trait;

    struct FailingStore;

    #[async_trait]
    impl PermissionStore for FailingStore {
        async fn save(&self, _record: UserPermissions) -> Result<(), StoreError> {
            Err(StoreError::Write("read-only".into()))
        }
        async fn load(&self, _username: &str) -> Result<Option<UserPermissions>, StoreError> {
            Err(StoreError::Read("unavailable".into()))
        }
        async fn load_all(&self) -> Result<Vec<UserPermissions>, StoreError> {
            Err(StoreError::Read("unavailable".into()))
        }
        async fn delete(&self, _username: &str) -> Result<bool, StoreError> {
            Err(StoreError::Write("read-only".into()))
        }
        async fn clear(&self) -> Result<(), StoreError> {
            Err(StoreError::Write("read-only".into()))
        }
    }

    fn ops_group() -> PermissionGroup {
        PermissionGroup::new(
            "ops",
            vec![GrantRule::scoped(
                "@resalt",
                [FunctionRule::bare(names::JOB_LIST)],
            )],
        )
    }

    #[tokio::test]
    async fn test_unknown_user_denied() {
        let auth = PermissionAuthorizer::new();
        let result = auth.check("nobody", &Request::new("web01", "test.ping")).await;

        assert!(result.is_denied());
        assert!(!result.is_authorized());
        match result {
            Authorization::Denied { reason } => assert!(reason.contains("nobody")),
            other => panic!("Expected denial, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_granted_by_own_permissions() {
        let auth = PermissionAuthorizer::new();
        auth.set_permissions("alice", vec![GrantRule::bare("test.ping")])
            .await
            .unwrap();

        let result = auth.check("alice", &Request::new("web01", "test.ping")).await;
        assert_eq!(
            result,
            Authorization::Granted {
                username: "alice".to_string()
            }
        );
        assert!(auth
            .check("alice", &Request::new("web01", "pkg.list"))
            .await
            .is_denied());
    }

    #[tokio::test]
    async fn test_granted_by_group() {
        let auth = PermissionAuthorizer::new().with_groups([ops_group()]);
        auth.save_user(UserPermissions::new("alice", Vec::new()).with_groups(["ops"]))
            .await
            .unwrap();

        assert!(auth.check_named("alice", names::JOB_LIST).await.is_authorized());
        assert!(auth.check_named("alice", names::EVENT_LIST).await.is_denied());
    }

    #[tokio::test]
    async fn test_unknown_group_contributes_nothing() {
        let auth = PermissionAuthorizer::new();
        auth.save_user(UserPermissions::new("alice", Vec::new()).with_groups(["ops"]))
            .await
            .unwrap();

        let perms = auth.effective_permissions("alice").await.unwrap().unwrap();
        assert!(perms.is_empty());
    }

    #[tokio::test]
    async fn test_set_permissions_keeps_groups() {
        let auth = PermissionAuthorizer::new().with_groups([ops_group()]);
        auth.save_user(UserPermissions::new("alice", Vec::new()).with_groups(["ops"]))
            .await
            .unwrap();
        auth.set_permissions("alice", vec![GrantRule::bare("test.ping")])
            .await
            .unwrap();

        let perms = auth.effective_permissions("alice").await.unwrap().unwrap();
        assert_eq!(perms.len(), 2);
        assert_eq!(perms[0], GrantRule::bare("test.ping"));
    }

    #[tokio::test]
    async fn test_store_failure_denies() {
        let auth = PermissionAuthorizer::with_store(FailingStore);
        let result = auth.check_named("alice", names::USER_ADMIN).await;
        assert!(result.is_denied());
        assert!(auth.set_permissions("alice", Vec::new()).await.is_err());
    }

    #[tokio::test]
    async fn test_revoke_users_and_clear() {
        let auth = PermissionAuthorizer::new();
        auth.set_permissions("alice", vec![GrantRule::bare(".*")])
            .await
            .unwrap();
        auth.set_permissions("bob", vec![GrantRule::bare(".*")])
            .await
            .unwrap();
        assert_eq!(auth.users().await.unwrap().len(), 2);

        assert!(auth.revoke("alice").await.unwrap());
        assert!(auth
            .check("alice", &Request::new("web01", "test.ping"))
            .await
            .is_denied());

        auth.clear().await.unwrap();
        assert!(auth.users().await.unwrap().is_empty());
    }

    #[test]
    fn test_authorization_methods() {
        let granted = Authorization::Granted {
            username: "alice".to_string(),
        };
        assert!(granted.is_authorized());
        assert!(!granted.is_denied());

        let denied = Authorization::Denied {
            reason: "test".to_string(),
        };
        assert!(!denied.is_authorized());
        assert!(denied.is_denied());
    }
}
