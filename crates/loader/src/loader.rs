//! Script loader: readiness state machine plus the ensure-loaded pass.
//!
//! [`ScriptLoader`] keeps every script in a [`ScriptRegistry`] cached on
//! the store behind a [`ScriptTransport`]. It tracks a [`LoaderState`],
//! publishes every change on a [`StateBus`], and follows the
//! transport's lifecycle: a disconnect drops it to `CLOSED`, a connect
//! lifts it to `CONNECTED` and kicks off an automatic reload.
//!
//! Concurrent [`load`](ScriptLoader::load) calls are not serialized.
//! Each pass works through the registry on its own and applies its own
//! final transition, so the last pass to settle decides the state.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::task::{Context, Poll};

use futures::stream::{FuturesUnordered, StreamExt};
use scriptcache_core::hashing::script_digest;
use scriptcache_core::script::validate_source;
use scriptcache_core::{CoreError, LoaderState, ScriptEntry};
use scriptcache_events::{StateBus, StateChange, StateLogger};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::config::LoaderConfig;
use crate::error::{LoadError, LoaderError};
use crate::primitives::{script_exists, script_load};
use crate::registry::ScriptRegistry;
use crate::report::{EntryOutcome, LoadReport};
use crate::transport::{ScriptTransport, TransportEvent};

/// Options for a single [`ScriptLoader::load`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Upload every script without asking whether the store has it.
    pub force: bool,
}

impl LoadOptions {
    pub fn forced() -> Self {
        Self { force: true }
    }
}

/// Keeps a registry of scripts loaded on a store.
///
/// Cheap to clone; all clones drive the same state machine. The
/// transport watcher stops once the last clone is dropped.
#[derive(Clone)]
pub struct ScriptLoader {
    inner: Arc<Inner>,
}

struct Inner {
    transport: Arc<dyn ScriptTransport>,
    registry: ScriptRegistry,
    state: Mutex<LoaderState>,
    bus: StateBus,
    config: LoaderConfig,
    runtime: Handle,
    /// Cancels the transport watcher when the loader goes away.
    _watcher: DropGuard,
}

/// Builder for [`ScriptLoader`].
#[derive(Default)]
pub struct ScriptLoaderBuilder {
    transport: Option<Arc<dyn ScriptTransport>>,
    registry: Option<ScriptRegistry>,
    config: LoaderConfig,
}

impl ScriptLoaderBuilder {
    pub fn transport(mut self, transport: Arc<dyn ScriptTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn registry(mut self, registry: ScriptRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate the parts, pick the initial state, and start watching
    /// the transport.
    ///
    /// Fails before any state exists if the transport or the registry
    /// is missing, or if called outside a Tokio runtime.
    pub fn build(self) -> Result<ScriptLoader, LoaderError> {
        let transport = self
            .transport
            .ok_or(CoreError::InvalidArgument("a transport is required"))?;
        let registry = self
            .registry
            .ok_or(CoreError::InvalidArgument("a script registry is required"))?;
        let runtime = Handle::try_current().map_err(|_| LoaderError::NoRuntime)?;

        // Subscribe before sampling `is_connected` so a connect racing
        // construction is still delivered to the watcher.
        let signals = transport.subscribe();
        let initial = LoaderState::initial(transport.is_connected());

        let bus = StateBus::new(self.config.event_capacity);
        if self.config.log_transitions {
            runtime.spawn(StateLogger::run(bus.subscribe()));
        }

        let cancel = CancellationToken::new();
        let inner = Arc::new(Inner {
            transport,
            registry,
            state: Mutex::new(initial),
            bus,
            config: self.config,
            runtime: runtime.clone(),
            _watcher: cancel.clone().drop_guard(),
        });

        runtime.spawn(watch_transport(Arc::downgrade(&inner), signals, cancel));

        tracing::debug!(state = %initial, "Script loader created");
        Ok(ScriptLoader { inner })
    }
}

impl ScriptLoader {
    pub fn builder() -> ScriptLoaderBuilder {
        ScriptLoaderBuilder::default()
    }

    /// Create a loader with the default configuration.
    pub fn create(
        transport: Arc<dyn ScriptTransport>,
        registry: ScriptRegistry,
    ) -> Result<Self, LoaderError> {
        Self::builder().transport(transport).registry(registry).build()
    }

    /// Current state.
    pub fn state(&self) -> LoaderState {
        self.inner.current_state()
    }

    /// The live registry shared with the caller.
    pub fn scripts(&self) -> &ScriptRegistry {
        &self.inner.registry
    }

    /// Subscribe to `(previous, next)` state changes from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.inner.bus.subscribe()
    }

    /// Make sure every registered script is cached on the store.
    ///
    /// The loader is `LOADING` by the time this returns; the pass itself
    /// runs in the background. Await the handle for the result, or drop
    /// it to let the pass finish unobserved.
    pub fn load(&self, options: LoadOptions) -> LoadHandle {
        Inner::start_pass(&self.inner, options)
    }
}

impl std::fmt::Debug for ScriptLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptLoader")
            .field("state", &self.state())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

/// Result of a [`ScriptLoader::load`] call, resolved once the pass settles.
#[must_use = "dropping a LoadHandle detaches the pass; await it to observe the result"]
pub struct LoadHandle {
    task: JoinHandle<Result<LoadReport, LoadError>>,
}

impl Future for LoadHandle {
    type Output = Result<LoadReport, LoadError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.task).poll(cx).map(|joined| match joined {
            Ok(result) => result,
            Err(e) => Err(LoadError::Aborted(e.to_string())),
        })
    }
}

impl Inner {
    fn current_state(&self) -> LoaderState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply a transition, publishing it unless it is a self-transition.
    ///
    /// The lock is held across publish so subscribers see changes in the
    /// order they were applied.
    fn set_state(&self, next: LoaderState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = *state;
        if previous == next {
            return;
        }
        *state = next;
        self.bus.publish(StateChange::new(previous, next));
        tracing::debug!(previous = %previous, next = %next, "Script loader state changed");
    }

    fn start_pass(this: &Arc<Self>, options: LoadOptions) -> LoadHandle {
        this.set_state(LoaderState::Loading);
        let inner = Arc::clone(this);
        let task = this
            .runtime
            .spawn(async move { inner.run_pass(options).await });
        LoadHandle { task }
    }

    /// Fan out one unit of work per entry, wait for all of them, then
    /// resolve the state.
    async fn run_pass(&self, options: LoadOptions) -> Result<LoadReport, LoadError> {
        let entries = self.registry.snapshot().await;
        tracing::debug!(scripts = entries.len(), force = options.force, "Load pass started");

        let mut pending: FuturesUnordered<_> = entries
            .into_iter()
            .map(|(name, entry)| async move {
                let outcome = self.ensure_entry(&name, entry, options.force).await;
                (name, outcome)
            })
            .collect();

        let mut report = LoadReport::default();
        let mut last_error = None;
        while let Some((name, outcome)) = pending.next().await {
            if let EntryOutcome::Failed(err) = &outcome {
                last_error = Some(err.clone());
            }
            report.record(name, outcome);
        }

        let Some(last) = last_error else {
            self.set_state(LoaderState::Ready);
            tracing::debug!(
                uploaded = report.uploaded(),
                present = report.already_present(),
                "Load pass finished"
            );
            return Ok(report);
        };

        self.set_state(LoaderState::initial(self.transport.is_connected()));
        let failed = report.failed();
        tracing::warn!(failed, last_error = %last, "Load pass finished with failures");
        Err(LoadError::Scripts {
            failed,
            last,
            report,
        })
    }

    async fn ensure_entry(&self, name: &str, entry: ScriptEntry, force: bool) -> EntryOutcome {
        if let Err(e) = validate_source(name, entry.source()) {
            tracing::warn!(script = %name, error = %e, "Skipping invalid script");
            return EntryOutcome::Failed(e.into());
        }

        if force {
            return self.upload(name, entry.source()).await;
        }

        let hash = match entry.hash() {
            Some(hash) => hash.to_string(),
            None => {
                let hash = script_digest(entry.source());
                self.registry.set_hash(name, entry.source(), &hash).await;
                hash
            }
        };

        match script_exists(self.transport.as_ref(), &hash).await {
            Ok(true) => return EntryOutcome::AlreadyPresent { hash },
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(script = %name, error = %e, "Existence check failed, uploading anyway");
            }
        }

        self.upload(name, entry.source()).await
    }

    /// Upload one body. On failure the entry's previous hash is left as is.
    async fn upload(&self, name: &str, source: &str) -> EntryOutcome {
        match script_load(self.transport.as_ref(), source).await {
            Ok(hash) => {
                if !self.registry.set_hash(name, source, &hash).await {
                    tracing::debug!(script = %name, "Entry changed during upload, hash not recorded");
                }
                EntryOutcome::Uploaded { hash }
            }
            Err(e) => {
                tracing::warn!(script = %name, error = %e, "Script upload failed");
                EntryOutcome::Failed(e)
            }
        }
    }
}

/// Follow transport lifecycle signals for as long as the loader lives.
async fn watch_transport(
    weak: Weak<Inner>,
    mut signals: broadcast::Receiver<TransportEvent>,
    cancel: CancellationToken,
) {
    loop {
        let signal = tokio::select! {
            _ = cancel.cancelled() => break,
            signal = signals.recv() => signal,
        };
        let Some(inner) = weak.upgrade() else {
            break;
        };

        match signal {
            Ok(TransportEvent::Connected) => on_connected(&inner),
            Ok(TransportEvent::Disconnected) => {
                tracing::info!("Transport disconnected");
                inner.set_state(LoaderState::Closed);
            }
            Ok(TransportEvent::Error(message)) => {
                // Connection-level errors are never propagated; each
                // command reports its own failure.
                tracing::trace!(error = %message, "Ignoring transport error signal");
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!(skipped = n, "Transport signals lagged, resyncing from link state");
                let connected = inner.transport.is_connected();
                let state = inner.current_state();
                if connected && state == LoaderState::Closed {
                    on_connected(&inner);
                } else if !connected {
                    inner.set_state(LoaderState::Closed);
                }
            }
            Err(broadcast::error::RecvError::Closed) => {
                tracing::debug!("Transport signal channel closed, watcher exiting");
                break;
            }
        }
    }
}

fn on_connected(inner: &Arc<Inner>) {
    tracing::info!("Transport connected");
    inner.set_state(LoaderState::Connected);

    if inner.config.reload_on_connect {
        let options = LoadOptions {
            force: inner.config.force_on_connect,
        };
        tracing::info!(force = options.force, "Reloading scripts after connect");
        // Fire and forget: the outcome shows up only as a state change.
        drop(Inner::start_pass(inner, options));
    }
}
