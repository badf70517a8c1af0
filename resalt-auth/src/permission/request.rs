//! The action being authorized.

use super::rule::Kwargs;
use serde::{Deserialize, Serialize};

/// A requested action: run `function` with `args`/`kwargs` against `target`.
///
/// # Example
///
/// ```rust
/// use resalt_auth::permission::Request;
///
/// let request = Request::new("web01", "pkg.install")
///     .with_arg("nginx")
///     .with_kwarg("refresh", "True");
/// assert_eq!(request.args, vec!["nginx"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Minion target selector.
    pub target: String,

    /// Function name, e.g. `pkg.list`.
    pub function: String,

    /// Positional arguments.
    #[serde(default)]
    pub args: Vec<String>,

    /// Keyword arguments.
    #[serde(default)]
    pub kwargs: Kwargs,
}

impl Request {
    /// Create a request with no arguments.
    pub fn new(target: impl Into<String>, function: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            function: function.into(),
            args: Vec::new(),
            kwargs: Kwargs::new(),
        }
    }

    /// Append a positional argument.
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Replace the positional arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set a keyword argument.
    pub fn with_kwarg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }
}

impl std::fmt::Display for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} on '{}'", self.function, self.target)?;
        if !self.args.is_empty() {
            write!(f, " args={:?}", self.args)?;
        }
        if !self.kwargs.is_empty() {
            write!(f, " kwargs={:?}", self.kwargs)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = Request::new("cc", "grains.items")
            .with_args(["a", "b"])
            .with_kwarg("k", "v");
        assert_eq!(request.target, "cc");
        assert_eq!(request.function, "grains.items");
        assert_eq!(request.args, vec!["a", "b"]);
        assert_eq!(request.kwargs.get("k").map(String::as_str), Some("v"));
    }

    #[test]
    fn test_request_display() {
        assert_eq!(Request::new("web01", "test.ping").to_string(), "test.ping on 'web01'");
        assert_eq!(
            Request::new("web01", "pkg.install").with_arg("nginx").to_string(),
            r#"pkg.install on 'web01' args=["nginx"]"#
        );
    }

    #[test]
    fn test_request_deserialize_defaults() {
        let request: Request =
            serde_json::from_str(r#"{"target": "web01", "function": "test.ping"}"#).unwrap();
        assert!(request.args.is_empty());
        assert!(request.kwargs.is_empty());
    }
}
