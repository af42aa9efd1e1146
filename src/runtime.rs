use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use generation_provider::{
    ExecutionResult, GenerationEvent, GenerationProvider, GenerationRequest, SandboxProvider,
    SandboxRequest,
};

use crate::app::{App, HostOps, Mode, RunId};

/// Event produced off the app thread and applied by the single writer.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeEvent {
    Generation(GenerationEvent),
    SandboxReady {
        run_id: RunId,
        result: ExecutionResult,
    },
    SandboxFailed {
        run_id: RunId,
        error: String,
    },
}

struct ActiveRun {
    run_id: RunId,
    cancel: Arc<AtomicBool>,
    join_handle: Option<JoinHandle<()>>,
}

pub struct GenerationRuntime {
    app: Arc<Mutex<App>>,
    pending_events: Arc<Mutex<VecDeque<RuntimeEvent>>>,
    events_ready: Condvar,
    next_run_id: AtomicU64,
    active_run: Mutex<Option<ActiveRun>>,
    sandboxes_in_flight: AtomicU64,
    render_requests: AtomicU64,
    auth_requests: AtomicU64,
    provider: Arc<dyn GenerationProvider>,
    sandbox: Arc<dyn SandboxProvider>,
}

impl GenerationRuntime {
    /// Creates a runtime that buffers worker events before applying them to `App`.
    ///
    /// Nothing drains the queue automatically: call
    /// [`GenerationRuntime::flush_pending_events`] (or
    /// [`GenerationRuntime::wait_for_events`] first) from the thread that owns
    /// rendering.
    pub fn new(
        app: Arc<Mutex<App>>,
        provider: Arc<dyn GenerationProvider>,
        sandbox: Arc<dyn SandboxProvider>,
    ) -> Arc<Self> {
        Arc::new(Self {
            app,
            pending_events: Arc::new(Mutex::new(VecDeque::new())),
            events_ready: Condvar::new(),
            next_run_id: AtomicU64::new(1),
            active_run: Mutex::new(None),
            sandboxes_in_flight: AtomicU64::new(0),
            render_requests: AtomicU64::new(0),
            auth_requests: AtomicU64::new(0),
            provider,
            sandbox,
        })
    }

    pub fn app(&self) -> &Arc<Mutex<App>> {
        &self.app
    }

    pub fn render_requests(&self) -> u64 {
        self.render_requests.load(Ordering::SeqCst)
    }

    pub fn auth_requests(&self) -> u64 {
        self.auth_requests.load(Ordering::SeqCst)
    }

    /// True while a generation or sandbox worker may still enqueue events.
    pub fn has_work_in_flight(&self) -> bool {
        self.lock_active_run().is_some()
            || self.sandboxes_in_flight.load(Ordering::SeqCst) > 0
            || !lock_unpoisoned(&self.pending_events).is_empty()
    }

    fn start_generation_internal(
        self: &Arc<Self>,
        mut request: GenerationRequest,
    ) -> Result<RunId, String> {
        let mut active_run = self.lock_active_run();

        // A superseded run keeps its worker; its events no longer match the
        // app's active run and are discarded.
        if let Some(previous) = active_run.take() {
            previous.cancel.store(true, Ordering::SeqCst);
        }

        let run_id = self.next_run_id.fetch_add(1, Ordering::SeqCst);
        request.run_id = run_id;
        let cancel = Arc::new(AtomicBool::new(false));
        let join_handle = self.spawn_worker(request, Arc::clone(&cancel))?;

        *active_run = Some(ActiveRun {
            run_id,
            cancel,
            join_handle: Some(join_handle),
        });

        Ok(run_id)
    }

    fn spawn_worker(
        self: &Arc<Self>,
        request: GenerationRequest,
        cancel: Arc<AtomicBool>,
    ) -> Result<JoinHandle<()>, String> {
        let run_id = request.run_id;
        let runtime = Arc::clone(self);
        thread::Builder::new()
            .name(format!("fragments-run-{run_id}"))
            .spawn(move || runtime.run_worker(request, cancel))
            .map_err(|error| format!("Failed to spawn generation worker: {error}"))
    }

    fn run_worker(self: Arc<Self>, request: GenerationRequest, cancel: Arc<AtomicBool>) {
        let run_id = request.run_id;
        self.wait_for_app_run_visibility(run_id);

        let terminal_emitted = Arc::new(AtomicBool::new(false));
        let terminal_emitted_for_emit = Arc::clone(&terminal_emitted);
        let runtime = Arc::clone(&self);
        let provider = Arc::clone(&self.provider);

        let mut emit = move |event: GenerationEvent| {
            if event.is_terminal() {
                terminal_emitted_for_emit.store(true, Ordering::SeqCst);
            }

            runtime.enqueue_event(RuntimeEvent::Generation(event));
        };
        let run_outcome = catch_unwind(AssertUnwindSafe(|| {
            provider.run(request, Arc::clone(&cancel), &mut emit)
        }));

        match run_outcome {
            Ok(Ok(())) => {}
            Ok(Err(error)) => emit(GenerationEvent::Failed { run_id, error }),
            Err(_) => emit(GenerationEvent::Failed {
                run_id,
                error: "Generation provider panicked".to_string(),
            }),
        }

        if !terminal_emitted.load(Ordering::SeqCst) && self.is_active_run_id(run_id) {
            emit(GenerationEvent::Failed {
                run_id,
                error: "Generation provider exited without terminal event".to_string(),
            });
        }
    }

    fn provision_sandbox_internal(self: &Arc<Self>, run_id: RunId, request: SandboxRequest) {
        self.sandboxes_in_flight.fetch_add(1, Ordering::SeqCst);
        let runtime = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name(format!("fragments-sandbox-{run_id}"))
            .spawn(move || {
                let sandbox = Arc::clone(&runtime.sandbox);
                let outcome = catch_unwind(AssertUnwindSafe(|| sandbox.provision(request)));
                let event = match outcome {
                    Ok(Ok(result)) => RuntimeEvent::SandboxReady { run_id, result },
                    Ok(Err(error)) => RuntimeEvent::SandboxFailed { run_id, error },
                    Err(_) => RuntimeEvent::SandboxFailed {
                        run_id,
                        error: "Sandbox provider panicked".to_string(),
                    },
                };
                runtime.enqueue_event(event);
                runtime.sandboxes_in_flight.fetch_sub(1, Ordering::SeqCst);
            });

        if let Err(error) = spawned {
            self.sandboxes_in_flight.fetch_sub(1, Ordering::SeqCst);
            self.enqueue_event(RuntimeEvent::SandboxFailed {
                run_id,
                error: format!("Failed to spawn sandbox worker: {error}"),
            });
        }
    }

    fn enqueue_event(&self, event: RuntimeEvent) {
        let mut queue = lock_unpoisoned(&self.pending_events);
        queue.push_back(event);
        self.events_ready.notify_all();
    }

    /// Blocks until an event is queued or `timeout` elapses. Returns whether
    /// events are waiting.
    pub fn wait_for_events(&self, timeout: Duration) -> bool {
        let queue = lock_unpoisoned(&self.pending_events);
        if !queue.is_empty() {
            return true;
        }

        match self.events_ready.wait_timeout(queue, timeout) {
            Ok((queue, _)) => !queue.is_empty(),
            Err(poisoned) => !poisoned.into_inner().0.is_empty(),
        }
    }

    fn drain_pending_events(self: &Arc<Self>) -> usize {
        let mut drained = 0usize;

        loop {
            let event = {
                let mut pending_events = lock_unpoisoned(&self.pending_events);
                pending_events.pop_front()
            };

            match event {
                Some(event) => {
                    self.apply_event(event);
                    drained += 1;
                }
                None => break,
            }
        }

        drained
    }

    /// Applies every queued event in arrival order and schedules a render.
    pub fn flush_pending_events(self: &Arc<Self>) -> usize {
        let drained = self.drain_pending_events();
        if drained > 0 {
            self.render_requests.fetch_add(1, Ordering::SeqCst);
        }

        drained
    }

    fn wait_for_app_run_visibility(&self, run_id: RunId) {
        for _ in 0..256 {
            let run_visible = {
                let app = lock_unpoisoned(&self.app);
                matches!(app.mode, Mode::Generating { run_id: current } if current == run_id)
            };

            if run_visible {
                return;
            }

            thread::yield_now();
        }
    }

    fn apply_event(self: &Arc<Self>, event: RuntimeEvent) {
        let mut host = Arc::clone(self);

        match event {
            RuntimeEvent::Generation(event) => {
                let run_id = event.run_id();
                let terminal = event.is_terminal();

                {
                    let mut app = lock_unpoisoned(&self.app);
                    match event {
                        GenerationEvent::Started { run_id } => app.on_generation_started(run_id),
                        GenerationEvent::Snapshot { run_id, snapshot } => {
                            app.on_generation_snapshot(run_id, snapshot)
                        }
                        GenerationEvent::Finished { run_id, object } => {
                            app.on_generation_finished(run_id, object, &mut host)
                        }
                        GenerationEvent::Failed { run_id, error } => {
                            app.on_generation_failed(run_id, &error)
                        }
                        GenerationEvent::Cancelled { run_id } => {
                            app.on_generation_cancelled(run_id)
                        }
                    }
                }

                if terminal {
                    self.clear_active_run_if_matching(run_id);
                }
            }
            RuntimeEvent::SandboxReady { run_id, result } => {
                lock_unpoisoned(&self.app).on_sandbox_ready(run_id, result);
            }
            RuntimeEvent::SandboxFailed { run_id, error } => {
                lock_unpoisoned(&self.app).on_sandbox_failed(run_id, &error);
            }
        }
    }

    fn clear_active_run_if_matching(&self, run_id: RunId) {
        let mut active_run = self.lock_active_run();
        let matches = active_run.as_ref().map(|active| active.run_id) == Some(run_id);
        if !matches {
            return;
        }

        let mut completed = match active_run.take() {
            Some(completed) => completed,
            None => return,
        };

        if let Some(join_handle) = completed.join_handle.take() {
            let is_current_thread = join_handle.thread().id() == thread::current().id();
            if !is_current_thread && join_handle.is_finished() {
                let _ = join_handle.join();
            }
        }
    }

    fn is_active_run_id(&self, run_id: RunId) -> bool {
        self.lock_active_run()
            .as_ref()
            .map(|active| active.run_id)
            == Some(run_id)
    }

    /// Sets the cancel flag and forgets the run. Idempotent.
    fn cancel_generation_internal(&self, run_id: RunId) {
        let mut active_run = self.lock_active_run();
        let matches = active_run.as_ref().map(|active| active.run_id) == Some(run_id);
        if !matches {
            return;
        }

        if let Some(cancelled) = active_run.take() {
            cancelled.cancel.store(true, Ordering::SeqCst);
            tracing::debug!(run_id, "generation cancel requested");
        }
    }

    fn lock_active_run(&self) -> MutexGuard<'_, Option<ActiveRun>> {
        lock_unpoisoned(&self.active_run)
    }
}

impl HostOps for Arc<GenerationRuntime> {
    fn start_generation(&mut self, request: GenerationRequest) -> Result<RunId, String> {
        self.start_generation_internal(request)
    }

    fn cancel_generation(&mut self, run_id: RunId) {
        self.cancel_generation_internal(run_id);
    }

    fn provision_sandbox(&mut self, run_id: RunId, request: SandboxRequest) {
        self.provision_sandbox_internal(run_id, request);
    }

    fn request_auth(&mut self) {
        self.auth_requests.fetch_add(1, Ordering::SeqCst);
    }

    fn request_render(&mut self) {
        self.render_requests.fetch_add(1, Ordering::SeqCst);
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
