//! Logging observer for state changes.
//!
//! [`StateLogger`] subscribes to a [`StateBus`](crate::bus::StateBus)
//! and writes every received [`StateChange`] to the tracing output. It
//! runs as a long-lived background task and exits when the bus is
//! dropped.

use tokio::sync::broadcast;

use crate::bus::StateChange;

/// Background service that logs loader state changes.
pub struct StateLogger;

impl StateLogger {
    /// Run the logging loop until the channel closes.
    ///
    /// Returns the number of changes logged.
    pub async fn run(mut receiver: broadcast::Receiver<StateChange>) -> usize {
        let mut logged = 0;
        loop {
            match receiver.recv().await {
                Ok(change) => {
                    tracing::info!(
                        previous = %change.previous,
                        next = %change.next,
                        "Script loader state changed"
                    );
                    logged += 1;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "State logger lagged, some changes were not logged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::debug!("State bus closed, logger shutting down");
                    break;
                }
            }
        }
        logged
    }
}
