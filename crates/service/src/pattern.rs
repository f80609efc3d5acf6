//! Path patterns: regular expressions matched against the whole request path.
//!
//! Patterns may already carry `^`/`$` anchors; one leading `^` and one trailing unescaped `$` are
//! stripped and the rest is anchored as `^(?:...)$`, so `/a|/b` can't match a prefix of `/abc`.

use crate::error::ConfigurationError;
use crate::request::PathParams;
use regex::Regex;
use std::fmt;

#[derive(Clone)]
pub struct PathPattern {
    raw: String,
    anchored: String,
    regex: Regex,
}

impl PathPattern {
    /// Compiles `raw` into a full-path matcher.
    ///
    /// ```
    /// use nimbus::PathPattern;
    ///
    /// let pattern = PathPattern::compile(r"/users/(?P<id>\d+)").unwrap();
    /// let params = pattern.match_path("/users/42").unwrap();
    /// assert_eq!(params.get("id"), Some("42"));
    /// assert!(pattern.match_path("/users/42/avatar").is_none());
    /// ```
    pub fn compile(raw: &str) -> Result<Self, ConfigurationError> {
        let body = strip_anchors(raw);
        let regex = Regex::new(&format!("^(?:{body})$")).map_err(|e| ConfigurationError::bad_pattern(raw, e))?;
        Ok(Self { raw: raw.to_string(), anchored: format!("^{body}$"), regex })
    }

    /// The pattern as registered.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The pattern with exactly one leading `^` and one trailing `$`, whether or not it was
    /// registered with them.
    pub fn anchored(&self) -> &str {
        &self.anchored
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Matches the whole `path`, returning the named groups that took part in the match.
    pub fn match_path(&self, path: &str) -> Option<PathParams> {
        let captures = self.regex.captures(path)?;

        let params = self
            .regex
            .capture_names()
            .flatten()
            .filter_map(|name| captures.name(name).map(|value| (name.to_string(), value.as_str().to_string())))
            .collect();

        Some(PathParams::new(params))
    }
}

impl fmt::Debug for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PathPattern").field(&self.raw).finish()
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn strip_anchors(raw: &str) -> &str {
    let body = raw.strip_prefix('^').unwrap_or(raw);

    match body.strip_suffix('$') {
        Some(stripped) if !is_escaped(stripped) => stripped,
        _ => body,
    }
}

/// Whether the character following `prefix` is escaped, i.e. `prefix` ends with an odd number
/// of backslashes.
fn is_escaped(prefix: &str) -> bool {
    prefix.bytes().rev().take_while(|b| *b == b'\\').count() % 2 == 1
}
