//! The seam between a loader and the connection it rides on.
//!
//! Connection management (sockets, reconnect backoff, pipelining) lives
//! behind [`ScriptTransport`]. A loader only needs three things from it:
//! lifecycle signals, a "connected right now" flag, and batched command
//! execution with ordered replies.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::command::{Command, Reply};

/// Lifecycle signal emitted by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The link came up (initially or after a drop).
    Connected,
    /// The link went down.
    Disconnected,
    /// A connection-level error. Command failures are reported on the
    /// command itself, so loaders deliberately ignore this signal.
    Error(String),
}

/// Errors raised by the transport layer while executing a batch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// No live connection to send the batch on.
    #[error("Transport is not connected")]
    NotConnected,

    /// The connection failed while the batch was in flight.
    #[error("Transport I/O error: {0}")]
    Io(String),

    /// The store answered with something the transport could not frame.
    #[error("Transport protocol error: {0}")]
    Protocol(String),
}

/// Connection to a store that caches scripts by hash.
#[async_trait]
pub trait ScriptTransport: Send + Sync {
    /// Whether the link is up at this instant.
    fn is_connected(&self) -> bool;

    /// Subscribe to lifecycle signals emitted from now on.
    fn subscribe(&self) -> broadcast::Receiver<TransportEvent>;

    /// Execute `commands` as one batch, returning one reply per command
    /// in the same order.
    async fn exec(&self, commands: Vec<Command>) -> Result<Vec<Reply>, TransportError>;
}
