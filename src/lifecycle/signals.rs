//! OS signal and fault handling.
//!
//! # Responsibilities
//! - Register handlers for SIGINT, SIGTERM, SIGUSR1 and SIGUSR2
//! - Route a panic in any task to the same shutdown path
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Each handler fires at most once; repeats are absorbed by the latch
//! - Signals exit with status 0, panics with status 1

use std::panic;

use crate::lifecycle::Shutdown;

/// Exit status for a requested termination.
pub const EXIT_REQUESTED: i32 = 0;
/// Exit status for startup errors and uncaught faults.
pub const EXIT_FAILURE: i32 = 1;

/// Spawn one listener task per termination signal.
///
/// Must be called from within a Tokio runtime.
#[cfg(unix)]
pub fn install_signal_handlers(shutdown: &Shutdown) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let kinds = [
        ("SIGINT", SignalKind::interrupt()),
        ("SIGTERM", SignalKind::terminate()),
        ("SIGUSR1", SignalKind::user_defined1()),
        ("SIGUSR2", SignalKind::user_defined2()),
    ];

    for (name, kind) in kinds {
        let mut stream = signal(kind)?;
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if stream.recv().await.is_some() {
                tracing::info!(signal = name, "Signal received");
                shutdown.trigger(name, EXIT_REQUESTED);
            }
        });
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn install_signal_handlers(shutdown: &Shutdown) -> std::io::Result<()> {
    let shutdown = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!(signal = "ctrl-c", "Signal received");
            shutdown.trigger("ctrl-c", EXIT_REQUESTED);
        }
    });
    Ok(())
}

/// Chain a panic hook that requests shutdown with [`EXIT_FAILURE`].
///
/// The previously installed hook still runs first.
pub fn install_panic_hook(shutdown: Shutdown) {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        previous(info);
        tracing::error!(panic = %info, "Uncaught fault");
        shutdown.trigger("panic", EXIT_FAILURE);
    }));
}
