//! The gateway's listening socket.
//!
//! # Responsibilities
//! - Bind the configured `address:port`
//! - Hand accepted sockets to the accept loop
//! - Cap concurrent connections with a slot semaphore
//!
//! A slot is taken before `accept` is called, so once the cap is reached new
//! clients queue in the kernel backlog instead of being accepted and dropped.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to accept: {0}")]
    Accept(#[source] io::Error),
}

/// Bound TCP listener with a connection cap.
#[derive(Debug)]
pub struct Listener {
    socket: TcpListener,
    slots: Arc<Semaphore>,
    max_connections: usize,
}

impl Listener {
    /// Bind to `address` (host names are resolved) allowing at most
    /// `max_connections` sockets open at once.
    pub async fn bind(address: &str, max_connections: usize) -> Result<Self, ListenerError> {
        let bind_error = |source| ListenerError::Bind {
            address: address.to_string(),
            source,
        };
        let socket = TcpListener::bind(address).await.map_err(bind_error)?;
        let local_addr = socket.local_addr().map_err(bind_error)?;

        tracing::info!(address = %local_addr, max_connections, "Listener bound");

        Ok(Self {
            socket,
            slots: Arc::new(Semaphore::new(max_connections)),
            max_connections,
        })
    }

    /// Wait for a free slot, then for the next client.
    ///
    /// The returned slot must live as long as the connection does.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr, ConnectionPermit), ListenerError> {
        // The semaphore is private and never closed, so this cannot fail in practice.
        let slot = Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|e| ListenerError::Accept(io::Error::other(e)))?;

        let (stream, peer) = self.socket.accept().await.map_err(ListenerError::Accept)?;
        tracing::debug!(
            peer_addr = %peer,
            free_slots = self.slots.available_permits(),
            "Connection accepted"
        );

        Ok((stream, peer, ConnectionPermit { _slot: slot }))
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Slots not currently held by a connection.
    pub fn available_permits(&self) -> usize {
        self.slots.available_permits()
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }
}

/// One connection slot; released on drop, even if the connection task panics.
#[derive(Debug)]
pub struct ConnectionPermit {
    _slot: OwnedSemaphorePermit,
}
