//! Path matching logic.
//!
//! # Responsibilities
//! - Match path prefix (case-sensitive, literal)
//! - Match path against a compiled regex
//!
//! # Design Decisions
//! - Only the path is inspected; query strings never influence matching
//! - Regexes are compiled once at startup

use regex::Regex;

/// Trait for matching request paths against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the path matches this condition.
    fn matches(&self, path: &str) -> bool;
}

/// Matches the request path prefix.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }
}

/// Matches the request path against a regular expression.
#[derive(Debug, Clone)]
pub struct PathPatternMatcher {
    pattern: Regex,
}

impl PathPatternMatcher {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }
}

impl Matcher for PathPatternMatcher {
    fn matches(&self, path: &str) -> bool {
        self.pattern.is_match(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_matcher() {
        let matcher = PathPrefixMatcher::new("/api/");

        assert!(matcher.matches("/api/v1"));
        assert!(!matcher.matches("/api"));
        assert!(!matcher.matches("/images"));
        assert!(!matcher.matches("/API/v1"));
    }

    #[test]
    fn test_pattern_matcher() {
        let matcher =
            PathPatternMatcher::new(r"^/resources/scada-symbols/(?:system|tenant)/[^/]+$").unwrap();

        assert!(matcher.matches("/resources/scada-symbols/tenant/abc"));
        assert!(matcher.matches("/resources/scada-symbols/system/pump.svg"));
        assert!(!matcher.matches("/resources/scada-symbols/customer/abc"));
        assert!(!matcher.matches("/resources/scada-symbols/tenant/abc/def"));
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        assert!(PathPatternMatcher::new("(").is_err());
    }
}
