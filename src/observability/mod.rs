//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request, proxy and connection events
//!     → logging.rs (tracing subscriber, pretty or JSON lines on stdout)
//!     → metrics.rs (counters and gauges through the `metrics` facade)
//!
//! Optional: Prometheus exporter scraping the facade
//! ```
//!
//! # Design Decisions
//! - Every request span carries its request ID
//! - Nothing is recorded until an exporter is installed

pub mod logging;
pub mod metrics;
