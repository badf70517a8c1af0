//! # resalt-auth
//!
//! eAuth-style permission evaluation for the Resalt minion fleet console.
//!
//! Every user carries an ordered list of grant rules (their `perms`). A rule
//! either allows a function pattern on every target, or maps a target pattern
//! to function rules that may also constrain positional and keyword
//! arguments. A request is allowed by the first rule that matches it.
//!
//! ## Quick Start
//!
//! ```rust
//! use resalt_auth::permission::{has_named_permission, has_permission, parse_permissions, Request};
//!
//! let grants = parse_permissions(r#"[
//!     {"web*": ["grains.items", {"pkg.install": {"args": ["nginx"]}}]},
//!     {"@resalt": ["minion.list"]}
//! ]"#).unwrap();
//!
//! assert!(has_permission(&grants, &Request::new("web01", "grains.items")));
//! assert!(has_permission(&grants, &Request::new("web01", "pkg.install").with_arg("nginx")));
//! assert!(!has_permission(&grants, &Request::new("db01", "grains.items")));
//! assert!(has_named_permission(&grants, "minion.list"));
//! ```
//!
//! ## Authorizing Users
//!
//! [`PermissionAuthorizer`] resolves a user's grants (their own, then their
//! groups') from a [`PermissionStore`](permission::PermissionStore) and
//! evaluates requests against them:
//!
//! ```rust
//! use resalt_auth::config::PermissionConfig;
//!
//! # tokio_test::block_on(async {
//! let auth = PermissionConfig::parse(r#"{
//!     "groups": {"ops": [{"@resalt": ["job.list"]}]},
//!     "users": {"alice": {"groups": ["ops"]}}
//! }"#)
//! .unwrap()
//! .into_authorizer()
//! .await
//! .unwrap();
//!
//! assert!(auth.check_named("alice", "job.list").await.is_authorized());
//! # });
//! ```

pub mod config;
pub mod error;
pub mod permission;

pub use error::{Error, Result};

pub use permission::{
    has_named_permission, has_permission, parse_permissions, Authorization, FunctionRule,
    GrantRule, PermissionAuthorizer, PermissionGroup, Request, RESALT_TARGET,
};
