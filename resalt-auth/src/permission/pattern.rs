//! Wildcard-extended regular expressions used by grant rules.
//!
//! Stored patterns are a hybrid of glob and regex syntax. A `*` directly
//! after a word character is a glob wildcard (`log*` matches `logstash` and
//! `log`), everything else is read as a regular expression, and the whole
//! pattern is anchored at both ends.
//!
//! The regex part follows the browser dialect the patterns were written
//! for: `\w` and `\d` are ASCII-only, and a quantifier with nothing to
//! repeat (`*`, `a**`, `(+x)`) makes the pattern invalid.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref GLOB_STAR: Regex =
        Regex::new(r"([A-Za-z0-9_])\*").expect("Invalid glob star regex");
}

/// Rewrite a stored pattern into the anchored regex source it stands for.
///
/// ```rust
/// use resalt_auth::permission::expand_pattern;
///
/// assert_eq!(expand_pattern("log*"), "^log.*$");
/// assert_eq!(expand_pattern(".*"), "^.*$");
/// ```
pub fn expand_pattern(pattern: &str) -> String {
    format!("^{}$", GLOB_STAR.replace_all(pattern, "${1}.*"))
}

/// Compile a stored pattern.
///
/// Returns `None` when the expanded pattern is not a valid regular
/// expression. Every call builds a fresh [`Regex`].
pub fn compile(pattern: &str) -> Option<Regex> {
    let source = expand_pattern(pattern);
    if has_dangling_quantifier(&source) {
        log::debug!("Pattern '{}' has a quantifier with nothing to repeat", pattern);
        return None;
    }
    match Regex::new(&ascii_classes(&source)) {
        Ok(re) => Some(re),
        Err(e) => {
            log::debug!("Pattern '{}' does not compile: {}", pattern, e);
            None
        }
    }
}

/// Test a stored pattern against a subject string.
///
/// Patterns that fail to compile match nothing.
pub fn matches(pattern: &str, subject: &str) -> bool {
    compile(pattern).is_some_and(|re| re.is_match(subject))
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Prev {
    Nothing,
    Atom,
    Quantifier { lazy_ok: bool },
}

/// Find a quantifier that follows no atom: at the start, after `^`, `$`,
/// `|`, `(`, or after another quantifier (a single lazy `?` excepted).
fn has_dangling_quantifier(source: &str) -> bool {
    let chars: Vec<char> = source.chars().collect();
    let mut prev = Prev::Nothing;
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '\\' => {
                i += 1;
                prev = Prev::Atom;
            }
            '[' => {
                i += 1;
                while i < chars.len() && chars[i] != ']' {
                    if chars[i] == '\\' {
                        i += 1;
                    }
                    i += 1;
                }
                prev = Prev::Atom;
            }
            '(' => {
                if chars.get(i + 1) == Some(&'?') {
                    i += 1;
                    match chars.get(i + 1) {
                        Some(':' | '=' | '!') => i += 1,
                        Some('<') => {
                            while i < chars.len() && !matches!(chars[i], '>' | '=' | '!') {
                                i += 1;
                            }
                        }
                        _ => {}
                    }
                }
                prev = Prev::Nothing;
            }
            ')' => prev = Prev::Atom,
            '^' | '$' | '|' => prev = Prev::Nothing,
            '?' if prev == (Prev::Quantifier { lazy_ok: true }) => {
                prev = Prev::Quantifier { lazy_ok: false };
            }
            '*' | '+' | '?' => {
                if prev != Prev::Atom {
                    return true;
                }
                prev = Prev::Quantifier { lazy_ok: true };
            }
            '{' => match brace_quantifier_len(&chars[i..]) {
                Some(len) => {
                    if prev != Prev::Atom {
                        return true;
                    }
                    i += len - 1;
                    prev = Prev::Quantifier { lazy_ok: true };
                }
                None => prev = Prev::Atom,
            },
            _ => prev = Prev::Atom,
        }
        i += 1;
    }
    false
}

/// Length of a `{n}`, `{n,}` or `{n,m}` quantifier at the start of `chars`.
fn brace_quantifier_len(chars: &[char]) -> Option<usize> {
    let close = chars.iter().position(|&c| c == '}')?;
    let body: String = chars[1..close].iter().collect();
    let (min, max) = match body.split_once(',') {
        Some((min, max)) => (min, max),
        None => (body.as_str(), "0"),
    };
    let digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    (!min.is_empty() && digits(min) && digits(max)).then_some(close + 1)
}

/// Replace `\w`, `\W`, `\d` and `\D` with their ASCII classes.
fn ascii_classes(source: &str) -> String {
    let mut result = String::with_capacity(source.len());
    let mut chars = source.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }
        match chars.next() {
            Some('w') => result.push_str("[0-9A-Za-z_]"),
            Some('W') => result.push_str("[^0-9A-Za-z_]"),
            Some('d') => result.push_str("[0-9]"),
            Some('D') => result.push_str("[^0-9]"),
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }
    result
}
