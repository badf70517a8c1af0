//! eAuth-style permission evaluation.
//!
//! A user's permissions are an ordered list of grant rules, stored as the
//! `perms` JSON array of their user record. Each rule either names a function
//! pattern directly or maps a target pattern to a list of function rules,
//! optionally constraining positional and keyword arguments.
//!
//! # Overview
//!
//! - **[`GrantRule`] / [`FunctionRule`]**: The rule model, parsed from raw JSON
//!   with [`parse_permissions`]
//! - **[`Request`]**: The action being authorized
//! - **[`has_permission`] / [`has_named_permission`]**: Pure first-match evaluation
//! - **[`PermissionGroup`]**: Grants shared by group members
//! - **[`PermissionStore`]**: Trait for persisting user records
//! - **[`MemoryPermissionStore`]** / **[`FilePermissionStore`]**: Store implementations
//! - **[`PermissionAuthorizer`]**: Loads a user's grants and checks requests
//!
//! # Example
//!
//! ```rust
//! use resalt_auth::permission::{has_permission, parse_permissions, Request};
//!
//! let grants = parse_permissions(
//!     r#"["test.ping", {"cc": [{"grains.items": {"args": ["test"]}}]}]"#,
//! ).unwrap();
//!
//! assert!(has_permission(&grants, &Request::new("anything", "test.ping")));
//! assert!(has_permission(&grants, &Request::new("cc", "grains.items").with_arg("test")));
//! assert!(!has_permission(&grants, &Request::new("cc", "grains.items").with_arg("other")));
//! ```
//!
//! # Pattern Syntax
//!
//! | Pattern | Matches |
//! |---------|---------|
//! | `test.ping` | `test.ping` (and `testXping`, `.` is a regex dot) |
//! | `log*` | `log`, `logstash`, anything starting with `log` |
//! | `.*` | anything |
//! | `(web\|db)01` | `web01`, `db01` |

mod authorizer;
mod evaluator;
mod group;
pub mod names;
mod pattern;
mod request;
mod rule;
mod store;
mod user;

pub use authorizer::{Authorization, PermissionAuthorizer};
pub use evaluator::{has_named_permission, has_permission, RESALT_TARGET};
pub use group::{effective_permissions, PermissionGroup};
pub use pattern::{compile as compile_pattern, expand_pattern, matches as pattern_matches};
pub use request::Request;
pub use rule::{
    parse_permissions, permissions_from_value, permissions_from_value_lenient,
    permissions_to_value, FunctionRule, GrantRule, Kwargs, PermissionDataError,
};
pub use store::{FilePermissionStore, MemoryPermissionStore, PermissionStore, StoreError};
pub use user::UserPermissions;
