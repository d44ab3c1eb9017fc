//! Shutdown coordination for the gateway.
//!
//! Every shutdown source (signals, the panic hook, tests) calls
//! [`Shutdown::trigger`]. Only the first call is recorded; the supervisor
//! waits on [`Shutdown::wait`] and runs the drain exactly once.

use std::sync::Arc;
use tokio::sync::watch;

/// Why the gateway is stopping and what status the process exits with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownRequest {
    pub reason: &'static str,
    pub status: i32,
}

/// One-shot shutdown latch.
///
/// Cloning shares the latch.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<Option<ShutdownRequest>>>,
}

impl Shutdown {
    /// Create a new, untriggered latch.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Request shutdown. Returns `true` only for the call that set the latch.
    pub fn trigger(&self, reason: &'static str, status: i32) -> bool {
        let fired = self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(ShutdownRequest { reason, status });
            true
        });

        if fired {
            tracing::info!(reason, status, "Shutdown requested");
        } else {
            tracing::debug!(reason, "Shutdown already in progress, ignoring");
        }
        fired
    }

    /// The recorded request, if shutdown has been triggered.
    pub fn requested(&self) -> Option<ShutdownRequest> {
        *self.tx.borrow()
    }

    /// Wait until shutdown is triggered.
    pub async fn wait(&self) -> ShutdownRequest {
        let mut rx = self.tx.subscribe();
        loop {
            if let Some(request) = *rx.borrow_and_update() {
                return request;
            }
            // The sender lives in `self`, so the channel cannot close here.
            if rx.changed().await.is_err() {
                return ShutdownRequest {
                    reason: "latch dropped",
                    status: 1,
                };
            }
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
