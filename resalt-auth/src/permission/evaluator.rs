//! Grant list evaluation.
//!
//! Rules are tested in list order and the first match wins. A
//! [`GrantRule::Scoped`] rule whose target matches but whose function rules
//! do not is final: evaluation stops there with a denial.

use super::pattern;
use super::request::Request;
use super::rule::{FunctionRule, GrantRule, Kwargs};

/// Virtual target for console features that are not scoped to minions.
pub const RESALT_TARGET: &str = "@resalt";

/// Check whether `grants` authorize `request`.
///
/// # Example
///
/// ```rust
/// use resalt_auth::permission::{has_permission, FunctionRule, GrantRule, Request};
///
/// let grants = vec![GrantRule::scoped("web*", [FunctionRule::bare("grains.items")])];
///
/// assert!(has_permission(&grants, &Request::new("web01", "grains.items")));
/// assert!(!has_permission(&grants, &Request::new("db01", "grains.items")));
/// assert!(!has_permission(&grants, &Request::new("web01", "pkg.list")));
/// ```
pub fn has_permission(grants: &[GrantRule], request: &Request) -> bool {
    for grant in grants {
        match grant {
            // Target is not checked for bare grants
            GrantRule::Bare(function) => {
                if pattern::matches(function, &request.function) {
                    return true;
                }
            }
            GrantRule::Scoped { target, functions } => {
                if pattern::matches(target, &request.target) {
                    return functions.iter().any(|rule| function_matches(rule, request));
                }
            }
        }
    }
    false
}

/// Check a console feature permission, i.e. `name` against [`RESALT_TARGET`].
///
/// ```rust
/// use resalt_auth::permission::{has_named_permission, FunctionRule, GrantRule};
///
/// let grants = vec![GrantRule::scoped("@resalt", [FunctionRule::bare("user.admin")])];
/// assert!(has_named_permission(&grants, "user.admin"));
/// ```
pub fn has_named_permission(grants: &[GrantRule], name: &str) -> bool {
    has_permission(grants, &Request::new(RESALT_TARGET, name))
}

fn function_matches(rule: &FunctionRule, request: &Request) -> bool {
    if !pattern::matches(rule.function(), &request.function) {
        return false;
    }
    match rule {
        FunctionRule::Bare(_) => true,
        FunctionRule::WithArgs { args, .. } => args_match(args, &request.args),
        FunctionRule::WithKwargs { kwargs, .. } => kwargs_match(kwargs, &request.kwargs),
        FunctionRule::WithArgsAndKwargs { args, kwargs, .. } => {
            args_match(args, &request.args) && kwargs_match(kwargs, &request.kwargs)
        }
    }
}

/// Positional comparison over the allowed list. An empty allowed list
/// accepts any request args.
fn args_match(allowed: &[String], args: &[String]) -> bool {
    allowed.iter().enumerate().all(|(i, allowed)| {
        args.get(i).is_some_and(|arg| pattern::matches(allowed, arg))
    })
}

fn kwargs_match(allowed: &Kwargs, kwargs: &Kwargs) -> bool {
    if allowed.is_empty() && !kwargs.is_empty() {
        return false;
    }
    allowed.iter().all(|(key, allowed)| {
        kwargs.get(key).is_some_and(|value| pattern::matches(allowed, value))
    })
}
