//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Client socket
//!     → listener.rs (slot semaphore, accept)
//!     → connection.rs (register, or drop when draining)
//!     → http::server (serve until done or told to close)
//!
//! Registry states:
//!     Running → Draining → Stopped
//! ```
//!
//! # Design Decisions
//! - The registry is an owned value handed to the accept loop, never a global
//! - One lock covers state and membership so a drain cannot miss a socket

pub mod connection;
pub mod listener;

pub use connection::{ConnectionHandle, ConnectionId, ConnectionRegistry, ShutdownState};
pub use listener::{ConnectionPermit, Listener, ListenerError};
