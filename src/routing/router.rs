//! Proxy rule lookup and SPA fallback exclusions.
//!
//! # Responsibilities
//! - Store compiled proxy rules in registration order
//! - Look up the first rule matching a path for a forwarding mode
//! - Decide whether a path is excluded from the history fallback
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan, first match wins
//! - Proxy disabled → empty table, nothing is ever forwarded

use crate::config::{ForwardMode, GatewayConfig, ProxyRuleConfig, ValidationError};
use crate::routing::matcher::{Matcher, PathPatternMatcher, PathPrefixMatcher};

/// A compiled forwarding rule.
#[derive(Debug)]
pub struct ProxyRule {
    matcher: Box<dyn Matcher>,
    mode: ForwardMode,
    label: String,
}

impl ProxyRule {
    /// Compile the rule at position `index` of the configured list.
    ///
    /// Exactly one of `prefix` or `pattern` must be set; a prefix must be absolute.
    pub fn compile(index: usize, config: &ProxyRuleConfig) -> Result<Self, ValidationError> {
        let (matcher, label): (Box<dyn Matcher>, String) = match (&config.prefix, &config.pattern) {
            (Some(prefix), None) if prefix.starts_with('/') => {
                (Box::new(PathPrefixMatcher::new(prefix.clone())), prefix.clone())
            }
            (Some(prefix), None) => {
                return Err(ValidationError::RelativePrefix {
                    index,
                    prefix: prefix.clone(),
                })
            }
            (None, Some(pattern)) => {
                let matcher = PathPatternMatcher::new(pattern).map_err(|e| ValidationError::InvalidPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })?;
                (Box::new(matcher), pattern.clone())
            }
            _ => return Err(ValidationError::AmbiguousRule(index)),
        };
        Ok(Self {
            matcher,
            mode: config.mode,
            label,
        })
    }

    pub fn mode(&self) -> ForwardMode {
        self.mode
    }

    /// The configured prefix or pattern, for logs and metrics.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn matches(&self, path: &str) -> bool {
        self.matcher.matches(path)
    }
}

/// Ordered, immutable set of proxy rules.
#[derive(Debug, Default)]
pub struct RuleTable {
    rules: Vec<ProxyRule>,
}

impl RuleTable {
    /// Build the table from configuration. Empty when the proxy is disabled.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, ValidationError> {
        if !config.upstream.enable_proxy {
            return Ok(Self::default());
        }
        let rules = config
            .proxy
            .rules
            .iter()
            .enumerate()
            .map(|(index, rule)| ProxyRule::compile(index, rule))
            .collect::<Result<Vec<_>, _>>()?;

        for rule in &rules {
            tracing::debug!(rule = %rule.label(), mode = ?rule.mode(), "Proxy rule installed");
        }
        Ok(Self { rules })
    }

    /// First rule of the given mode whose matcher accepts `path`.
    pub fn match_path(&self, path: &str, mode: ForwardMode) -> Option<&ProxyRule> {
        self.rules
            .iter()
            .filter(|rule| rule.mode == mode)
            .find(|rule| rule.matches(path))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Paths that must never be answered with the fallback document.
#[derive(Debug, Default)]
pub struct FallbackExclusions {
    patterns: Vec<PathPatternMatcher>,
}

impl FallbackExclusions {
    pub fn from_patterns(patterns: &[String]) -> Result<Self, regex::Error> {
        let patterns = patterns
            .iter()
            .map(|p| PathPatternMatcher::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(path))
    }
}
