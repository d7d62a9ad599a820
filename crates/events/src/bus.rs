//! In-process state bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`StateBus`] fans every [`StateChange`] out to any number of
//! subscribers. Each loader owns exactly one bus and is its only
//! publisher, so subscribers observe transitions in the order the
//! loader applied them.

use chrono::{DateTime, Utc};
use scriptcache_core::LoaderState;
use serde::Serialize;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// StateChange
// ---------------------------------------------------------------------------

/// A loader moved from `previous` to `next`.
///
/// Never constructed with `previous == next`; the publisher suppresses
/// self-transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StateChange {
    pub previous: LoaderState,
    pub next: LoaderState,

    /// When the transition was applied (UTC).
    pub timestamp: DateTime<Utc>,
}

impl StateChange {
    pub fn new(previous: LoaderState, next: LoaderState) -> Self {
        Self {
            previous,
            next,
            timestamp: Utc::now(),
        }
    }

    /// The `(previous, next)` pair without the timestamp.
    pub fn pair(&self) -> (LoaderState, LoaderState) {
        (self.previous, self.next)
    }
}

// ---------------------------------------------------------------------------
// StateBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
pub const DEFAULT_CAPACITY: usize = 256;

/// Fan-out channel for [`StateChange`]s.
///
/// When the buffer is full the oldest un-consumed changes are dropped
/// and slow receivers observe `RecvError::Lagged`.
#[derive(Debug, Clone)]
pub struct StateBus {
    sender: broadcast::Sender<StateChange>,
}

impl StateBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish a change to all current subscribers.
    ///
    /// With no subscribers the change is silently dropped.
    pub fn publish(&self, change: StateChange) {
        // Ignore the SendError — it only means there are zero receivers.
        let _ = self.sender.send(change);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for StateBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Receive changes until one lands on `target`, returning that change.
///
/// Lagged gaps are skipped over. Returns `None` once the bus is closed
/// without `target` having been reached.
pub async fn wait_for_state(
    receiver: &mut broadcast::Receiver<StateChange>,
    target: LoaderState,
) -> Option<StateChange> {
    loop {
        match receiver.recv().await {
            Ok(change) if change.next == target => return Some(change),
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!(skipped = n, target = %target, "State receiver lagged while waiting");
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
