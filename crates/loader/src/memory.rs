//! In-process store for development and tests.
//!
//! [`MemoryStore`] implements [`ScriptTransport`] over a plain hash map
//! and answers the script commands the way a real store would: `SCRIPT
//! EXISTS` yields an array of `0`/`1`, `SCRIPT LOAD` yields the SHA-1
//! of the body, `SCRIPT FLUSH` drops everything. Connection signals are
//! injected by hand with [`connect`](MemoryStore::connect) and
//! [`disconnect`](MemoryStore::disconnect).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use scriptcache_core::hashing::script_digest;
use tokio::sync::{broadcast, RwLock};

use crate::command::{Command, Reply};
use crate::transport::{ScriptTransport, TransportError, TransportEvent};

/// Broadcast channel capacity for lifecycle signals.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Counts of script commands the store has executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandStats {
    pub exists: u64,
    pub loads: u64,
    pub flushes: u64,
}

/// Script cache held in memory.
pub struct MemoryStore {
    scripts: RwLock<HashMap<String, String>>,
    connected: AtomicBool,
    events: broadcast::Sender<TransportEvent>,
    /// Bodies containing this marker fail to "compile".
    reject_marker: Option<String>,
    /// Delay applied to every batch before it is answered.
    latency: Option<Duration>,
    exists_count: AtomicU64,
    load_count: AtomicU64,
    flush_count: AtomicU64,
}

impl MemoryStore {
    /// A store that starts out connected.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            scripts: RwLock::new(HashMap::new()),
            connected: AtomicBool::new(true),
            events,
            reject_marker: None,
            latency: None,
            exists_count: AtomicU64::new(0),
            load_count: AtomicU64::new(0),
            flush_count: AtomicU64::new(0),
        }
    }

    /// A store that starts out disconnected.
    pub fn disconnected() -> Self {
        let store = Self::new();
        store.connected.store(false, Ordering::SeqCst);
        store
    }

    /// Refuse any script whose body contains `marker`, as a store would
    /// refuse a body that does not compile.
    pub fn rejecting(mut self, marker: impl Into<String>) -> Self {
        self.reject_marker = Some(marker.into());
        self
    }

    /// Delay every batch by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Bring the link up and emit [`TransportEvent::Connected`].
    pub fn connect(&self) {
        self.connected.store(true, Ordering::SeqCst);
        tracing::debug!("Memory store connected");
        let _ = self.events.send(TransportEvent::Connected);
    }

    /// Take the link down and emit [`TransportEvent::Disconnected`].
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        tracing::debug!("Memory store disconnected");
        let _ = self.events.send(TransportEvent::Disconnected);
    }

    /// Emit a connection-level error signal without changing state.
    pub fn emit_error(&self, message: impl Into<String>) {
        let _ = self.events.send(TransportEvent::Error(message.into()));
    }

    /// Drop every cached script, as `SCRIPT FLUSH` would.
    pub async fn flush_scripts(&self) {
        self.scripts.write().await.clear();
    }

    pub async fn contains(&self, hash: &str) -> bool {
        self.scripts.read().await.contains_key(hash)
    }

    pub async fn script_count(&self) -> usize {
        self.scripts.read().await.len()
    }

    /// Number of live signal receivers.
    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    pub fn stats(&self) -> CommandStats {
        CommandStats {
            exists: self.exists_count.load(Ordering::SeqCst),
            loads: self.load_count.load(Ordering::SeqCst),
            flushes: self.flush_count.load(Ordering::SeqCst),
        }
    }

    pub fn reset_stats(&self) {
        self.exists_count.store(0, Ordering::SeqCst);
        self.load_count.store(0, Ordering::SeqCst);
        self.flush_count.store(0, Ordering::SeqCst);
    }

    // ---- private helpers ----

    async fn apply(&self, command: &Command) -> Reply {
        let args = command.args();
        match command.name().as_str() {
            "SCRIPT EXISTS" => {
                self.exists_count.fetch_add(1, Ordering::SeqCst);
                let scripts = self.scripts.read().await;
                Reply::Array(
                    args[2..]
                        .iter()
                        .map(|hash| Reply::Integer(i64::from(scripts.contains_key(hash))))
                        .collect(),
                )
            }
            "SCRIPT LOAD" => {
                self.load_count.fetch_add(1, Ordering::SeqCst);
                let Some(source) = args.get(2) else {
                    return Reply::Error(
                        "ERR wrong number of arguments for 'script|load' command".into(),
                    );
                };
                if let Some(marker) = self.reject_marker.as_deref() {
                    if source.contains(marker) {
                        return Reply::Error(format!(
                            "ERR Error compiling script (new function): user_script:1: unexpected symbol near '{marker}'"
                        ));
                    }
                }
                let hash = script_digest(source);
                self.scripts
                    .write()
                    .await
                    .insert(hash.clone(), source.clone());
                Reply::Bulk(hash)
            }
            "SCRIPT FLUSH" => {
                self.flush_count.fetch_add(1, Ordering::SeqCst);
                self.scripts.write().await.clear();
                Reply::Status("OK".into())
            }
            other => Reply::Error(format!("ERR unknown command '{other}'")),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScriptTransport for MemoryStore {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        self.events.subscribe()
    }

    async fn exec(&self, commands: Vec<Command>) -> Result<Vec<Reply>, TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
            // The link may have dropped while the batch was in flight.
            if !self.is_connected() {
                return Err(TransportError::Io("connection lost during batch".into()));
            }
        }

        let mut replies = Vec::with_capacity(commands.len());
        for command in &commands {
            replies.push(self.apply(command).await);
        }
        Ok(replies)
    }
}
