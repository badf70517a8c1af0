//! Console feature permissions, checked against the `@resalt` target.
//!
//! These are granted like any other function, e.g.
//! `{"@resalt": ["minion.*", "job.list"]}`.

pub const ADMIN_SUPERADMIN: &str = "admin.superadmin";
pub const ADMIN_GROUP: &str = "admin.group";
pub const ADMIN_USER: &str = "admin.user";

pub const RUN_LIVE: &str = "run.live";
pub const RUN_TEMPLATE_LOCAL: &str = "run.template.local";
pub const RUN_TEMPLATE_GLOBAL: &str = "run.template.global";
pub const RUN_TEMPLATE_LIST: &str = "run.template.list";

pub const MINION_LIST: &str = "minion.list";
pub const MINION_CONFORMITY: &str = "minion.conformity";
pub const MINION_PACKAGES: &str = "minion.packages";
pub const MINION_REFRESH: &str = "minion.refresh";
pub const MINION_GRAINEXPLORER: &str = "minion.grainexplorer";

pub const JOB_LIST: &str = "job.list";
pub const EVENT_LIST: &str = "event.list";

pub const SALTKEY_LIST: &str = "saltkey.list";
pub const SALTKEY_ACCEPT: &str = "saltkey.accept";
pub const SALTKEY_REJECT: &str = "saltkey.reject";
pub const SALTKEY_DELETE: &str = "saltkey.delete";

pub const USER_ADMIN: &str = "user.admin";
pub const USER_LIST: &str = "user.list";
pub const USER_EMAIL: &str = "user.email";
pub const USER_PASSWORD: &str = "user.password";

pub const PRESET_LIST: &str = "preset.list";
pub const PRESET_MANAGE: &str = "preset.manage";

/// Every console feature permission, in menu order.
pub const ALL: &[&str] = &[
    ADMIN_SUPERADMIN,
    ADMIN_GROUP,
    ADMIN_USER,
    RUN_LIVE,
    RUN_TEMPLATE_LOCAL,
    RUN_TEMPLATE_GLOBAL,
    RUN_TEMPLATE_LIST,
    MINION_LIST,
    MINION_CONFORMITY,
    MINION_PACKAGES,
    MINION_REFRESH,
    MINION_GRAINEXPLORER,
    JOB_LIST,
    EVENT_LIST,
    SALTKEY_LIST,
    SALTKEY_ACCEPT,
    SALTKEY_REJECT,
    SALTKEY_DELETE,
    USER_ADMIN,
    USER_LIST,
    USER_EMAIL,
    USER_PASSWORD,
    PRESET_LIST,
    PRESET_MANAGE,
];

/// The console feature permissions `grants` allow, in [`ALL`] order.
pub fn granted(grants: &[super::GrantRule]) -> Vec<&'static str> {
    ALL.iter()
        .copied()
        .filter(|name| super::has_named_permission(grants, name))
        .collect()
}
