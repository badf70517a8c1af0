//! Grant rule types and the validating parser for raw `perms` JSON.
//!
//! A user's stored permission list is a JSON array mixing bare strings and
//! single-key objects:
//!
//! ```json
//! [
//!   "test.ping",
//!   { "web*": ["grains.items", { "pkg.install": { "args": ["nginx"] } }] },
//!   { "@resalt": ["user.admin"] }
//! ]
//! ```
//!
//! [`parse_permissions`] turns that shape into [`GrantRule`] values and
//! rejects anything it does not recognize. [`permissions_from_value_lenient`]
//! skips unrecognized entries instead, which evaluates the same as treating
//! them as non-matching.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Keyword arguments, by name.
pub type Kwargs = BTreeMap<String, String>;

/// Raw permission data that could not be turned into grant rules.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PermissionDataError {
    /// The input was not valid JSON.
    #[error("invalid permission JSON: {0}")]
    Json(String),

    /// The top-level value was not an array.
    #[error("expected a permission list (JSON array), got {0}")]
    NotAList(&'static str),

    /// One element of the permission list was malformed.
    #[error("grant #{index}: {reason}")]
    Grant {
        /// Position of the offending element in the list.
        index: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// A single rule was malformed.
    #[error("{0}")]
    InvalidRule(String),
}

/// One element of a user's permission list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum GrantRule {
    /// A function pattern that applies to every target.
    Bare(String),

    /// Function rules that apply when `target` matches the request target.
    Scoped {
        /// Target selector pattern.
        target: String,
        /// Function rules, tried in order.
        functions: Vec<FunctionRule>,
    },
}

/// One element of a [`GrantRule::Scoped`] function list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum FunctionRule {
    /// Function name only, any args and kwargs.
    Bare(String),

    /// Function name plus positional argument patterns.
    WithArgs { function: String, args: Vec<String> },

    /// Function name plus keyword argument patterns.
    WithKwargs { function: String, kwargs: Kwargs },

    /// Function name plus both positional and keyword argument patterns.
    WithArgsAndKwargs {
        function: String,
        args: Vec<String>,
        kwargs: Kwargs,
    },
}

impl GrantRule {
    /// Shorthand for a bare function pattern.
    pub fn bare(pattern: impl Into<String>) -> Self {
        Self::Bare(pattern.into())
    }

    /// A target pattern with its function rules.
    pub fn scoped(
        target: impl Into<String>,
        functions: impl IntoIterator<Item = FunctionRule>,
    ) -> Self {
        Self::Scoped {
            target: target.into(),
            functions: functions.into_iter().collect(),
        }
    }

    /// Convert one raw permission list element.
    pub fn from_value(value: &Value) -> Result<Self, PermissionDataError> {
        match value {
            Value::String(pattern) => Ok(Self::Bare(pattern.clone())),
            Value::Object(map) => {
                let (target, functions) = single_entry(map)?;
                let Value::Array(items) = functions else {
                    return Err(invalid(format!(
                        "functions for target '{}' must be an array, got {}",
                        target,
                        kind(functions)
                    )));
                };
                let functions = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| {
                        FunctionRule::from_value(item).map_err(|e| {
                            invalid(format!("target '{}', function #{}: {}", target, i, e))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Self::Scoped {
                    target: target.clone(),
                    functions,
                })
            }
            other => Err(invalid(format!(
                "expected a string or single-key object, got {}",
                kind(other)
            ))),
        }
    }

    /// Convert back to the raw JSON shape.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Bare(pattern) => Value::String(pattern.clone()),
            Self::Scoped { target, functions } => {
                let mut map = Map::new();
                map.insert(
                    target.clone(),
                    Value::Array(functions.iter().map(FunctionRule::to_value).collect()),
                );
                Value::Object(map)
            }
        }
    }
}

impl FunctionRule {
    /// Shorthand for a bare function pattern.
    pub fn bare(pattern: impl Into<String>) -> Self {
        Self::Bare(pattern.into())
    }

    /// A function pattern with positional argument patterns.
    pub fn with_args<I, S>(function: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::WithArgs {
            function: function.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// A function pattern with keyword argument patterns.
    pub fn with_kwargs<I, K, V>(function: impl Into<String>, kwargs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::WithKwargs {
            function: function.into(),
            kwargs: kwargs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// The function name pattern this rule applies to.
    pub fn function(&self) -> &str {
        match self {
            Self::Bare(function)
            | Self::WithArgs { function, .. }
            | Self::WithKwargs { function, .. }
            | Self::WithArgsAndKwargs { function, .. } => function,
        }
    }

    /// Convert one element of a scoped rule's function list.
    pub fn from_value(value: &Value) -> Result<Self, PermissionDataError> {
        match value {
            Value::String(pattern) => Ok(Self::Bare(pattern.clone())),
            Value::Object(map) => {
                let (function, spec) = single_entry(map)?;
                let Value::Object(spec) = spec else {
                    return Err(invalid(format!(
                        "arguments for function '{}' must be an object, got {}",
                        function,
                        kind(spec)
                    )));
                };
                if let Some(key) = spec.keys().find(|k| *k != "args" && *k != "kwargs") {
                    return Err(invalid(format!(
                        "function '{}': unknown key '{}'",
                        function, key
                    )));
                }

                let args = spec.get("args").map(|v| parse_args(function, v)).transpose()?;
                let kwargs = spec
                    .get("kwargs")
                    .map(|v| parse_kwargs(function, v))
                    .transpose()?;

                let function = function.clone();
                match (args, kwargs) {
                    (Some(args), Some(kwargs)) => Ok(Self::WithArgsAndKwargs {
                        function,
                        args,
                        kwargs,
                    }),
                    (Some(args), None) => Ok(Self::WithArgs { function, args }),
                    (None, Some(kwargs)) => Ok(Self::WithKwargs { function, kwargs }),
                    (None, None) => Err(invalid(format!(
                        "function '{}' must define 'args' or 'kwargs'",
                        function
                    ))),
                }
            }
            other => Err(invalid(format!(
                "expected a string or single-key object, got {}",
                kind(other)
            ))),
        }
    }

    /// Convert back to the raw JSON shape.
    pub fn to_value(&self) -> Value {
        let (function, args, kwargs) = match self {
            Self::Bare(pattern) => return Value::String(pattern.clone()),
            Self::WithArgs { function, args } => (function, Some(args), None),
            Self::WithKwargs { function, kwargs } => (function, None, Some(kwargs)),
            Self::WithArgsAndKwargs {
                function,
                args,
                kwargs,
            } => (function, Some(args), Some(kwargs)),
        };

        let mut spec = Map::new();
        if let Some(args) = args {
            spec.insert(
                "args".to_string(),
                Value::Array(args.iter().cloned().map(Value::String).collect()),
            );
        }
        if let Some(kwargs) = kwargs {
            spec.insert(
                "kwargs".to_string(),
                Value::Object(
                    kwargs
                        .iter()
                        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                        .collect(),
                ),
            );
        }

        let mut map = Map::new();
        map.insert(function.clone(), Value::Object(spec));
        Value::Object(map)
    }
}

impl TryFrom<Value> for GrantRule {
    type Error = PermissionDataError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(&value)
    }
}

impl From<GrantRule> for Value {
    fn from(rule: GrantRule) -> Self {
        rule.to_value()
    }
}

impl TryFrom<Value> for FunctionRule {
    type Error = PermissionDataError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(&value)
    }
}

impl From<FunctionRule> for Value {
    fn from(rule: FunctionRule) -> Self {
        rule.to_value()
    }
}

/// Parse a user's `perms` JSON string.
///
/// ```rust
/// use resalt_auth::permission::{parse_permissions, GrantRule};
///
/// let grants = parse_permissions(r#"["test.ping", {"web*": ["grains.items"]}]"#).unwrap();
/// assert_eq!(grants[0], GrantRule::bare("test.ping"));
/// assert_eq!(grants.len(), 2);
/// ```
pub fn parse_permissions(json: &str) -> Result<Vec<GrantRule>, PermissionDataError> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| PermissionDataError::Json(e.to_string()))?;
    permissions_from_value(&value)
}

/// Convert an already-parsed `perms` value, failing on the first malformed element.
pub fn permissions_from_value(value: &Value) -> Result<Vec<GrantRule>, PermissionDataError> {
    let Value::Array(items) = value else {
        return Err(PermissionDataError::NotAList(kind(value)));
    };
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            GrantRule::from_value(item).map_err(|e| PermissionDataError::Grant {
                index,
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Convert a `perms` value, skipping malformed elements.
///
/// A single-key object whose function list is an array keeps its target and
/// drops only the malformed function rules inside it. Any other malformed
/// element is skipped entirely, so evaluation continues with the next grant.
pub fn permissions_from_value_lenient(value: &Value) -> Vec<GrantRule> {
    let Value::Array(items) = value else {
        log::warn!("Ignoring permission data: expected an array, got {}", kind(value));
        return Vec::new();
    };
    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| lenient_grant(index, item))
        .collect()
}

/// Convert grant rules back to the raw `perms` JSON array.
pub fn permissions_to_value(grants: &[GrantRule]) -> Value {
    Value::Array(grants.iter().map(GrantRule::to_value).collect())
}

fn lenient_grant(index: usize, item: &Value) -> Option<GrantRule> {
    let err = match GrantRule::from_value(item) {
        Ok(rule) => return Some(rule),
        Err(e) => e,
    };

    let scoped = item.as_object().and_then(|m| single_entry(m).ok());
    if let Some((target, Value::Array(items))) = scoped {
        log::warn!("Grant #{} is partially malformed: {}", index, err);
        let functions = items
            .iter()
            .filter_map(|f| FunctionRule::from_value(f).ok())
            .collect();
        return Some(GrantRule::Scoped {
            target: target.clone(),
            functions,
        });
    }

    log::warn!("Skipping grant #{}: {}", index, err);
    None
}

fn parse_args(function: &str, value: &Value) -> Result<Vec<String>, PermissionDataError> {
    let Value::Array(items) = value else {
        return Err(invalid(format!(
            "function '{}': 'args' must be an array, got {}",
            function,
            kind(value)
        )));
    };
    items
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::String(s) => Ok(s.clone()),
            other => Err(invalid(format!(
                "function '{}': arg #{} must be a string, got {}",
                function,
                i,
                kind(other)
            ))),
        })
        .collect()
}

fn parse_kwargs(function: &str, value: &Value) -> Result<Kwargs, PermissionDataError> {
    let Value::Object(map) = value else {
        return Err(invalid(format!(
            "function '{}': 'kwargs' must be an object, got {}",
            function,
            kind(value)
        )));
    };
    map.iter()
        .map(|(key, item)| match item {
            Value::String(s) => Ok((key.clone(), s.clone())),
            other => Err(invalid(format!(
                "function '{}': kwarg '{}' must be a string, got {}",
                function,
                key,
                kind(other)
            ))),
        })
        .collect()
}

fn single_entry(map: &Map<String, Value>) -> Result<(&String, &Value), PermissionDataError> {
    let mut entries = map.iter();
    match (entries.next(), entries.next()) {
        (Some(entry), None) => Ok(entry),
        _ => Err(invalid(format!(
            "expected an object with exactly one key, found {}",
            map.len()
        ))),
    }
}

fn invalid(reason: String) -> PermissionDataError {
    PermissionDataError::InvalidRule(reason)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
