//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path, upgrade headers)
//!     → router.rs (proxy rule lookup for the request's mode)
//!     → matcher.rs (evaluate prefix / regex)
//!     → Return: matched ProxyRule or NoMatch
//!
//! Rule Compilation (at startup):
//!     ProxyRuleConfig[]
//!     → Compile matchers (prefix, regex)
//!     → Freeze as immutable RuleTable
//! ```
//!
//! # Design Decisions
//! - Rules compiled at startup, immutable at runtime
//! - Deterministic: same input always matches same rule
//! - First match wins (registration order)

pub mod matcher;
pub mod router;

pub use router::{FallbackExclusions, ProxyRule, RuleTable};
