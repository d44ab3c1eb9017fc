//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Resolve config → Wire registry, static server, proxy rules → Bind listener
//!
//! Shutdown (shutdown.rs):
//!     Trigger latch → Drain connections → Close listener → Exit with status
//!
//! Signals (signals.rs):
//!     SIGINT/SIGTERM/SIGUSR1/SIGUSR2 → Shutdown with status 0
//!     Panic → Shutdown with status 1
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listeners
//! - Ordered shutdown: drain, stop accept, wait for close
//! - One latch, so concurrent triggers never drain twice

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownRequest};
pub use signals::{install_panic_hook, install_signal_handlers, EXIT_FAILURE, EXIT_REQUESTED};
pub use startup::Gateway;
