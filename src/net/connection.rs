//! Connection registry and drain control.
//!
//! # Responsibilities
//! - Register every accepted socket while the gateway is running
//! - Deregister each socket exactly once, when its last handle is dropped
//! - Force-close every registered socket on drain
//! - Track the Running → Draining → Stopped state machine
//!
//! The registry lock guards both the state and the connection table, so a
//! socket is either registered before the drain snapshot (and gets closed)
//! or refused after it. Nothing slips between the two.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;

use crate::observability::metrics;

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Gateway shutdown state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    /// Accepting and serving connections.
    Running,
    /// No new connections; registered ones are being force-closed.
    Draining,
    /// Listener closed, process exit requested.
    Stopped,
}

#[derive(Debug)]
struct TrackedConnection {
    peer: SocketAddr,
    close_tx: watch::Sender<bool>,
}

#[derive(Debug)]
struct Table {
    state: ShutdownState,
    connections: HashMap<ConnectionId, TrackedConnection>,
}

#[derive(Debug)]
struct Shared {
    table: Mutex<Table>,
    next_id: AtomicU64,
    live: watch::Sender<usize>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, live: usize) {
        self.live.send_replace(live);
        metrics::set_active_connections(live);
    }
}

/// Tracks open transport connections for forced draining.
///
/// Cheap to clone; all clones share one table.
#[derive(Debug, Clone)]
pub struct ConnectionRegistry {
    shared: Arc<Shared>,
}

impl ConnectionRegistry {
    /// Create an empty registry in the Running state.
    pub fn new() -> Self {
        let (live, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                table: Mutex::new(Table {
                    state: ShutdownState::Running,
                    connections: HashMap::new(),
                }),
                next_id: AtomicU64::new(1),
                live,
            }),
        }
    }

    /// Register a freshly accepted socket.
    ///
    /// Returns `None` once draining has begun; the caller must drop the socket.
    pub fn register(&self, peer: SocketAddr) -> Option<ConnectionHandle> {
        let mut table = self.shared.lock();
        if table.state != ShutdownState::Running {
            return None;
        }

        let id = ConnectionId(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        let (close_tx, close_rx) = watch::channel(false);
        table.connections.insert(id, TrackedConnection { peer, close_tx });
        self.shared.publish(table.connections.len());

        tracing::trace!(connection_id = %id, peer_addr = %peer, "Connection registered");

        Some(ConnectionHandle {
            guard: Arc::new(ConnectionGuard {
                id,
                peer,
                shared: Arc::clone(&self.shared),
            }),
            close_rx,
        })
    }

    /// Get current registered connection count.
    pub fn active_count(&self) -> usize {
        self.shared.lock().connections.len()
    }

    pub fn state(&self) -> ShutdownState {
        self.shared.lock().state
    }

    /// Enter Draining and signal every registered connection to close.
    ///
    /// Returns the number of connections signalled. Only the first call does
    /// any work; later calls return 0.
    pub fn drain(&self) -> usize {
        let mut table = self.shared.lock();
        if table.state != ShutdownState::Running {
            return 0;
        }
        table.state = ShutdownState::Draining;

        for (id, conn) in &table.connections {
            tracing::debug!(connection_id = %id, peer_addr = %conn.peer, "Closing connection");
            conn.close_tx.send_replace(true);
        }
        table.connections.len()
    }

    /// Wait until every registered connection has reported closure.
    ///
    /// With a grace period, gives up after it elapses and returns false.
    pub async fn wait_closed(&self, grace: Option<Duration>) -> bool {
        let mut live = self.shared.live.subscribe();
        let empty = async move { live.wait_for(|n| *n == 0).await.is_ok() };
        match grace {
            Some(grace) => tokio::time::timeout(grace, empty).await.unwrap_or(false),
            None => empty.await,
        }
    }

    /// Move Draining → Stopped. No effect in any other state.
    pub fn mark_stopped(&self) {
        let mut table = self.shared.lock();
        if table.state == ShutdownState::Draining {
            table.state = ShutdownState::Stopped;
        }
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Deregisters its connection when dropped.
#[derive(Debug)]
struct ConnectionGuard {
    id: ConnectionId,
    peer: SocketAddr,
    shared: Arc<Shared>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let mut table = self.shared.lock();
        if table.connections.remove(&self.id).is_some() {
            self.shared.publish(table.connections.len());
        }
        tracing::trace!(connection_id = %self.id, peer_addr = %self.peer, "Connection closed");
    }
}

/// A registered connection's membership plus its close signal.
///
/// Clones share membership: the connection stays registered until every
/// clone is gone. Whatever owns the socket (the HTTP connection task, or a
/// WebSocket relay after an upgrade) holds a clone.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    guard: Arc<ConnectionGuard>,
    close_rx: watch::Receiver<bool>,
}

impl ConnectionHandle {
    /// Get this connection's ID.
    pub fn id(&self) -> ConnectionId {
        self.guard.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.guard.peer
    }

    /// Whether a drain has asked this connection to close.
    pub fn is_closing(&self) -> bool {
        *self.close_rx.borrow()
    }

    /// Resolves once a drain asks this connection to close.
    pub async fn closing(&self) {
        let mut rx = self.close_rx.clone();
        let _ = rx.wait_for(|closing| *closing).await;
    }
}
