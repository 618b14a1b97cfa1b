//! Multiplexes many logical watches onto one watcher process.
//!
//! The process is started lazily by the first registration and stopped when
//! the last registration goes away. Lines from the process are routed into
//! the [`EventAggregator`]; each flush marker delivers one batch per watch.
//!
//! Create one [`WatchController`] at the composition root and share it by
//! cloning; clones refer to the same process and registry.

use std::path::PathBuf;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::aggregator::EventAggregator;
use super::events::{EventBatch, FileChange, WatchSink};
use super::registry::{WatchEntry, WatchRegistry};
use super::stats::{ControllerStats, ControllerStatsSnapshot};
use crate::error::TransportError;
use crate::protocol::{Command, EventKind, Incoming, WatchId};
use crate::transport::{LineTransport, TransportCallbacks, WatcherBinary};

/// Controller configuration.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Native watcher executable.
    pub binary: WatcherBinary,
    /// Name used for reader threads and log fields.
    pub process_name: String,
}

impl ControllerConfig {
    /// Configuration for the given binary.
    #[must_use]
    pub fn new(binary: WatcherBinary) -> Self {
        Self {
            binary,
            process_name: "watchmux".to_string(),
        }
    }
}

struct Process {
    transport: Arc<LineTransport>,
    generation: u64,
}

#[derive(Default)]
struct State {
    registry: WatchRegistry,
    aggregator: EventAggregator,
    process: Option<Process>,
    generation: u64,
}

struct Inner {
    config: ControllerConfig,
    state: Mutex<State>,
    stats: Arc<ControllerStats>,
}

/// Public entry point for registering watches.
#[derive(Clone)]
pub struct WatchController {
    inner: Arc<Inner>,
}

impl WatchController {
    /// Create a controller. No process is started until the first watch.
    #[must_use]
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(State::default()),
                stats: ControllerStats::new(),
            }),
        }
    }

    /// Register a watch and return its id.
    ///
    /// The controller keeps only a weak reference to `sink`. If the watcher
    /// process cannot be started the failure is logged and the id stays
    /// allocated; no events will arrive for it.
    pub fn register<S: WatchSink + 'static>(
        &self,
        root: impl Into<PathBuf>,
        patterns: Vec<String>,
        ignores: Vec<String>,
        events: Vec<EventKind>,
        sink: &Arc<S>,
    ) -> WatchId {
        let weak: Weak<S> = Arc::downgrade(sink);
        self.inner
            .register(root.into(), patterns, ignores, events, weak)
    }

    /// Remove a watch. Stops the process when no watch remains.
    pub fn unregister(&self, id: WatchId) {
        self.inner.unregister(id);
    }

    /// Register a watch and wrap it in a handle whose `destroy` unregisters.
    pub fn create_watch<S: WatchSink + 'static>(
        &self,
        root: impl Into<PathBuf>,
        patterns: Vec<String>,
        events: Vec<EventKind>,
        ignores: Vec<String>,
        sink: &Arc<S>,
    ) -> WatchHandle {
        let id = self.register(root, patterns, ignores, events, sink);
        WatchHandle {
            id,
            controller: Arc::downgrade(&self.inner),
        }
    }

    /// Whether a watcher process is currently attached.
    #[must_use]
    pub fn has_process(&self) -> bool {
        self.inner.state.lock().process.is_some()
    }

    /// Number of registered watches, including orphaned ones.
    #[must_use]
    pub fn watch_count(&self) -> usize {
        self.inner.state.lock().registry.len()
    }

    /// Number of events waiting for the next flush marker.
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.inner.state.lock().aggregator.pending_events()
    }

    /// Current activity counters.
    #[must_use]
    pub fn stats(&self) -> ControllerStatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// Feed one line as if it came from the watcher process.
    #[cfg(test)]
    fn route_line(&self, line: &str) {
        self.inner.route_line(line);
    }
}

impl std::fmt::Debug for WatchController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("WatchController")
            .field("config", &self.inner.config)
            .field("watches", &state.registry.len())
            .field("has_process", &state.process.is_some())
            .finish_non_exhaustive()
    }
}

/// Handle returned by [`WatchController::create_watch`].
#[must_use = "dropping the handle leaves the watch registered; call destroy()"]
#[derive(Debug)]
pub struct WatchHandle {
    id: WatchId,
    controller: Weak<Inner>,
}

impl WatchHandle {
    /// The watch id.
    #[must_use]
    pub const fn id(&self) -> WatchId {
        self.id
    }

    /// Unregister the watch. A no-op once the controller is gone.
    pub fn destroy(self) {
        if let Some(inner) = self.controller.upgrade() {
            inner.unregister(self.id);
        }
    }
}

impl Inner {
    fn register(
        self: &Arc<Self>,
        root: PathBuf,
        patterns: Vec<String>,
        ignores: Vec<String>,
        events: Vec<EventKind>,
        sink: Weak<dyn WatchSink>,
    ) -> WatchId {
        let (id, transport, request) = {
            let mut state = self.state.lock();
            let id = state
                .registry
                .insert(&root, patterns, ignores, events, sink);
            if state.process.is_none() {
                self.start_process(&mut state);
            }
            let request = state
                .registry
                .get(id)
                .map(|entry| entry.register_request(id));
            let transport = state.process.as_ref().map(|p| Arc::clone(&p.transport));
            (id, transport, request)
        };

        let (Some(transport), Some(request)) = (transport, request) else {
            tracing::error!(watch = %id, root = %root.display(), "Failed creating transport, watch is inactive");
            return id;
        };

        tracing::debug!(watch = %id, root = %root.display(), "Registering watch");
        self.send(&transport, &Command::Register(request));
        id
    }

    fn unregister(&self, id: WatchId) {
        let (transport, stopped) = {
            let mut state = self.state.lock();
            if state.registry.remove(id).is_none() {
                tracing::warn!(watch = %id, "Unregistering unknown watch");
                return;
            }
            let transport = state.process.as_ref().map(|p| Arc::clone(&p.transport));
            let stopped = if state.registry.is_empty() {
                state.aggregator.take();
                state.process.take()
            } else {
                None
            };
            (transport, stopped)
        };

        match transport {
            Some(transport) => self.send(&transport, &Command::Unregister(id)),
            None => tracing::error!(watch = %id, "Transport does not exist"),
        }

        if let Some(process) = stopped {
            process.transport.close();
            tracing::info!(generation = process.generation, "Last watch removed, watcher process stopped");
        }
    }

    fn start_process(self: &Arc<Self>, state: &mut State) {
        state.generation += 1;
        let generation = state.generation;
        let callbacks = Arc::new(ProcessCallbacks {
            inner: Arc::downgrade(self),
            generation,
        });

        match LineTransport::spawn(&self.config.process_name, &self.config.binary, callbacks) {
            Ok(transport) => {
                ControllerStats::bump(&self.stats.process_starts);
                tracing::info!(
                    generation,
                    program = %self.config.binary.program.display(),
                    "Watcher process started"
                );
                state.process = Some(Process {
                    transport: Arc::new(transport),
                    generation,
                });
            }
            Err(e) => {
                tracing::error!(
                    program = %self.config.binary.program.display(),
                    "Failed initializing watcher process: {e}"
                );
            }
        }
    }

    fn send(&self, transport: &LineTransport, command: &Command) {
        let result = command
            .to_line()
            .and_then(|line| transport.send(&line));
        if let Err(e) = result {
            tracing::error!(name = %self.config.process_name, "Failed to send command: {e}");
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.state
            .lock()
            .process
            .as_ref()
            .is_some_and(|p| p.generation == generation)
    }

    fn route_line(&self, line: &str) {
        ControllerStats::bump(&self.stats.lines_received);

        match Incoming::parse(line) {
            Ok(Incoming::Flush) => self.flush(),
            Ok(Incoming::Event {
                uid,
                kind,
                relative_path,
            }) => self.queue(uid, kind, &relative_path),
            Err(e) => {
                ControllerStats::bump(&self.stats.protocol_errors);
                tracing::warn!("{e}");
            }
        }
    }

    fn queue(&self, uid: WatchId, kind: EventKind, relative_path: &str) {
        let mut state = self.state.lock();
        let Some(root) = state.registry.get(uid).map(|entry| entry.root.clone()) else {
            tracing::debug!(watch = %uid, path = relative_path, "Event for unknown watch dropped");
            return;
        };
        state
            .aggregator
            .push(uid, FileChange::new(kind, &root, relative_path));
        ControllerStats::bump(&self.stats.events_queued);
    }

    /// Deliver every pending batch. Sinks are called without the state
    /// lock held so they may call back into the controller.
    fn flush(&self) {
        let deliveries: Vec<(WatchId, Option<Arc<dyn WatchSink>>, EventBatch)> = {
            let mut state = self.state.lock();
            let batches = state.aggregator.take();
            batches
                .into_iter()
                .map(|(id, batch)| {
                    let sink = state.registry.get(id).and_then(WatchEntry::sink);
                    (id, sink, batch)
                })
                .collect()
        };

        for (id, sink, batch) in deliveries {
            if let Some(sink) = sink {
                tracing::trace!(watch = %id, events = batch.len(), "Delivering batch");
                sink.notify(batch);
                ControllerStats::bump(&self.stats.batches_delivered);
            } else {
                ControllerStats::bump(&self.stats.batches_dropped);
                tracing::warn!(watch = %id, events = batch.len(), "Handler already deleted, batch dropped");
            }
        }
    }

    fn process_closed(
        &self,
        generation: u64,
        exit_code: Option<i32>,
        failure: Option<TransportError>,
    ) {
        ControllerStats::bump(&self.stats.process_exits);

        let (process, orphaned) = {
            let mut state = self.state.lock();
            if state
                .process
                .as_ref()
                .is_some_and(|p| p.generation == generation)
            {
                state.aggregator.take();
                (state.process.take(), state.registry.len())
            } else {
                (None, 0)
            }
        };

        match process {
            Some(process) => {
                process.transport.close();
                tracing::warn!(
                    generation,
                    ?exit_code,
                    orphaned,
                    ?failure,
                    "Watcher process ended"
                );
            }
            None => tracing::debug!(generation, ?exit_code, "Stopped watcher process exited"),
        }
    }
}

/// Transport callbacks bound to one process generation.
struct ProcessCallbacks {
    inner: Weak<Inner>,
    generation: u64,
}

impl TransportCallbacks for ProcessCallbacks {
    fn on_payload(&self, payload: &str) {
        if let Some(inner) = self.inner.upgrade() {
            if inner.is_current(self.generation) {
                inner.route_line(payload);
            }
        }
    }

    fn on_stderr_message(&self, message: &str) {
        tracing::error!(generation = self.generation, "Watcher process: {message}");
    }

    fn on_transport_close(&self, exit_code: Option<i32>, failure: Option<TransportError>) {
        if let Some(inner) = self.inner.upgrade() {
            inner.process_closed(self.generation, exit_code, failure);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[derive(Default)]
    struct RecordingSink {
        batches: Mutex<Vec<EventBatch>>,
    }

    impl WatchSink for RecordingSink {
        fn notify(&self, batch: EventBatch) {
            self.batches.lock().push(batch);
        }
    }

    impl RecordingSink {
        fn batches(&self) -> Vec<EventBatch> {
            self.batches.lock().clone()
        }
    }

    /// A controller whose binary never starts, so lines are fed by hand.
    fn offline_controller() -> WatchController {
        WatchController::new(ControllerConfig::new(WatcherBinary::new(
            "/nonexistent/rust-watcher",
        )))
    }

    fn watch(controller: &WatchController, root: &str, sink: &Arc<RecordingSink>) -> WatchId {
        controller.register(root, Vec::new(), Vec::new(), EventKind::ALL.to_vec(), sink)
    }

    fn change(kind: EventKind, root: &str, rel: &str) -> FileChange {
        FileChange::new(kind, Path::new(root), rel)
    }

    #[test]
    fn test_flush_delivers_one_batch_per_watch() {
        let controller = offline_controller();
        let sink1 = Arc::new(RecordingSink::default());
        let sink2 = Arc::new(RecordingSink::default());
        assert_eq!(watch(&controller, "/root1", &sink1), WatchId::new(1));
        assert_eq!(watch(&controller, "/root2", &sink2), WatchId::new(2));

        controller.route_line("1:change:a/b.txt");
        controller.route_line("1:create:a/c.txt");
        controller.route_line("2:delete:x.txt");
        assert!(sink1.batches().is_empty());
        controller.route_line("<flush>");

        assert_eq!(
            sink1.batches(),
            vec![vec![
                change(EventKind::Change, "/root1", "a/b.txt"),
                change(EventKind::Create, "/root1", "a/c.txt"),
            ]]
        );
        assert_eq!(
            sink2.batches(),
            vec![vec![change(EventKind::Delete, "/root2", "x.txt")]]
        );
        assert_eq!(controller.pending_events(), 0);
        assert_eq!(controller.stats().batches_delivered, 2);
    }

    #[test]
    fn test_garbage_line_changes_nothing() {
        let controller = offline_controller();
        let sink = Arc::new(RecordingSink::default());
        watch(&controller, "/root1", &sink);

        controller.route_line("1:change:keep.txt");
        controller.route_line("garbage");
        controller.route_line("1:renamed:x");
        assert_eq!(controller.pending_events(), 1);
        assert_eq!(controller.stats().protocol_errors, 2);

        controller.route_line("<flush>");
        assert_eq!(
            sink.batches(),
            vec![vec![change(EventKind::Change, "/root1", "keep.txt")]]
        );
    }

    #[test]
    fn test_empty_flush_notifies_nobody() {
        let controller = offline_controller();
        let sink = Arc::new(RecordingSink::default());
        watch(&controller, "/root1", &sink);

        controller.route_line("<flush>");
        assert!(sink.batches().is_empty());
        assert_eq!(controller.pending_events(), 0);
    }

    #[test]
    fn test_stale_sink_batch_is_dropped_and_cleared() {
        let controller = offline_controller();
        let sink = Arc::new(RecordingSink::default());
        let other = Arc::new(RecordingSink::default());
        watch(&controller, "/gone", &sink);
        watch(&controller, "/kept", &other);

        controller.route_line("1:change:a.txt");
        drop(sink);
        controller.route_line("<flush>");
        assert_eq!(controller.stats().batches_dropped, 1);
        assert_eq!(controller.pending_events(), 0);

        controller.route_line("2:create:b.txt");
        controller.route_line("<flush>");
        assert_eq!(
            other.batches(),
            vec![vec![change(EventKind::Create, "/kept", "b.txt")]]
        );
        assert_eq!(controller.stats().batches_dropped, 1);
    }

    #[test]
    fn test_events_for_unknown_watch_are_ignored() {
        let controller = offline_controller();
        controller.route_line("7:change:a.txt");
        controller.route_line("<flush>");
        assert_eq!(controller.pending_events(), 0);
        assert_eq!(controller.stats().events_queued, 0);
    }

    #[test]
    fn test_registration_survives_spawn_failure() {
        let controller = offline_controller();
        let sink = Arc::new(RecordingSink::default());
        let id = watch(&controller, "/root1", &sink);

        assert_eq!(id, WatchId::new(1));
        assert_eq!(controller.watch_count(), 1);
        assert!(!controller.has_process());
        assert_eq!(controller.stats().process_starts, 0);

        controller.unregister(id);
        assert_eq!(controller.watch_count(), 0);
    }

    #[test]
    fn test_sink_may_destroy_its_own_watch() {
        struct SelfDestruct {
            handle: Mutex<Option<WatchHandle>>,
            calls: Mutex<usize>,
        }

        impl WatchSink for SelfDestruct {
            fn notify(&self, _batch: EventBatch) {
                *self.calls.lock() += 1;
                if let Some(handle) = self.handle.lock().take() {
                    handle.destroy();
                }
            }
        }

        let controller = offline_controller();
        let sink = Arc::new(SelfDestruct {
            handle: Mutex::new(None),
            calls: Mutex::new(0),
        });
        let handle = controller.create_watch(
            "/root1",
            Vec::new(),
            EventKind::ALL.to_vec(),
            Vec::new(),
            &sink,
        );
        *sink.handle.lock() = Some(handle);

        controller.route_line("1:change:a.txt");
        controller.route_line("<flush>");
        assert_eq!(*sink.calls.lock(), 1);
        assert_eq!(controller.watch_count(), 0);
    }

    #[cfg(unix)]
    fn idle_controller() -> WatchController {
        WatchController::new(ControllerConfig::new(
            WatcherBinary::new("sh").with_args(["-c", "cat > /dev/null"]),
        ))
    }

    #[cfg(unix)]
    #[test]
    fn test_process_exists_iff_watches_exist() {
        let controller = idle_controller();
        let sink = Arc::new(RecordingSink::default());
        assert!(!controller.has_process());

        let a = watch(&controller, "/a", &sink);
        assert!(controller.has_process());
        let b = watch(&controller, "/b", &sink);
        assert!(controller.has_process());

        controller.unregister(a);
        assert!(controller.has_process());
        controller.unregister(b);
        assert!(!controller.has_process());

        let c = watch(&controller, "/c", &sink);
        assert!(controller.has_process());
        assert!(c > b);
        controller.unregister(c);
        assert!(!controller.has_process());
        assert_eq!(controller.stats().process_starts, 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_handle_destroy_stops_process() {
        let controller = idle_controller();
        let sink = Arc::new(RecordingSink::default());
        let handle = controller.create_watch(
            "/only",
            vec!["**/*".to_string()],
            vec![EventKind::Change],
            Vec::new(),
            &sink,
        );
        assert_eq!(handle.id(), WatchId::new(1));
        assert!(controller.has_process());

        handle.destroy();
        assert!(!controller.has_process());
        assert_eq!(controller.watch_count(), 0);
    }

    #[test]
    fn test_destroy_after_controller_dropped_is_noop() {
        let controller = offline_controller();
        let sink = Arc::new(RecordingSink::default());
        let handle = controller.create_watch("/r", Vec::new(), Vec::new(), Vec::new(), &sink);
        drop(controller);
        handle.destroy();
    }
}
