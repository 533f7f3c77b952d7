//! Cancellable worker threads.
//!
//! A [`Worker`] runs one [`Task`] on a dedicated platform thread. Its
//! lifecycle is `NotStarted → Running → Finished` (or `Cancelled` when the
//! task body fails). Cancellation is cooperative: [`Worker::cancel`] raises
//! the thread's interruption flag and wakes any condition wait it is parked
//! in, and the task body is responsible for noticing and returning. A body
//! that never polls [`is_interrupted`](crate::is_interrupted) and never
//! waits simply never terminates; no platform offers a safe hard kill, and
//! this crate does not pretend to.
//!
//! The `started`/`finished`/`cancelled` flags are lock-free on purpose:
//! the polling join and the completion wrapper synchronize through them
//! and can never deadlock against whatever locks the task body itself
//! takes.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar as StdCondvar, Mutex as StdMutex, PoisonError};
use std::thread;
use std::time::Duration;

use log::{debug, trace, warn};
use portable_atomic::{AtomicBool, Ordering};

use crate::errors::{JoinError, SpawnError};
use crate::interrupt::{self, InterruptState};

pub mod builder;

pub use builder::WorkerBuilder;

/// How long a blocked `join` stays parked before re-checking the
/// completion flags. Bounded polling keeps a join from hanging forever on
/// a wakeup lost to adversarial scheduling; the worst case is this much
/// added latency.
const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Lifecycle of a [`Worker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Constructed, no platform thread yet.
    NotStarted,
    /// The task body is executing (or about to).
    Running,
    /// The task body returned normally.
    Finished,
    /// The task body failed; the worker counts as finished for joins.
    Cancelled,
}

/// A unit of deferred work: the body a worker thread executes.
///
/// Long-running bodies cooperate with cancellation by polling
/// [`is_interrupted`](crate::is_interrupted) between steps and by treating
/// an interrupted condition wait as the cue to return.
pub trait Task: Send + 'static {
    fn run(&mut self);
}

/// Any sendable closure is a task.
impl<F> Task for F
where
    F: FnMut() + Send + 'static,
{
    fn run(&mut self) {
        self()
    }
}

type TaskSlot = Arc<StdMutex<Option<Box<dyn Task>>>>;

/// State shared between the owning [`Worker`] handle and its thread.
struct WorkerShared {
    name: Option<String>,
    started: AtomicBool,
    finished: AtomicBool,
    cancelled: AtomicBool,
    interrupt: Arc<InterruptState>,
    /// Private completion monitor for the polling join. Deliberately not
    /// the public `Lock`: a join must never contend with whatever the task
    /// body does with its own locks.
    done: StdMutex<bool>,
    done_signal: StdCondvar,
    failure: StdMutex<Option<String>>,
}

impl WorkerShared {
    fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("worker")
    }
}

/// A single task on a dedicated, cancellable platform thread.
///
/// The owning application holds the `Worker`; dropping it while the thread
/// runs abandons the thread (it keeps running to completion detached).
/// `Worker` is `Sync`, so a shared reference is enough to start, cancel,
/// join and inspect it from any thread.
pub struct Worker {
    shared: Arc<WorkerShared>,
    stack_size: Option<usize>,
    task: TaskSlot,
    platform: StdMutex<Option<thread::JoinHandle<()>>>,
}

impl Worker {
    /// Worker in the `NotStarted` state; nothing runs until
    /// [`start`](Self::start).
    pub fn new<T: Task>(task: T) -> Self {
        WorkerBuilder::new().build(task)
    }

    /// Builder for a worker that needs a thread name or stack size.
    pub fn builder() -> WorkerBuilder {
        WorkerBuilder::new()
    }

    pub(crate) fn from_parts(
        name: Option<String>,
        stack_size: Option<usize>,
        task: Box<dyn Task>,
    ) -> Self {
        Self {
            shared: Arc::new(WorkerShared {
                name,
                started: AtomicBool::new(false),
                finished: AtomicBool::new(false),
                cancelled: AtomicBool::new(false),
                interrupt: Arc::new(InterruptState::new()),
                done: StdMutex::new(false),
                done_signal: StdCondvar::new(),
                failure: StdMutex::new(None),
            }),
            stack_size,
            task: Arc::new(StdMutex::new(Some(task))),
            platform: StdMutex::new(None),
        }
    }

    /// Start the worker.
    ///
    /// Idempotent: a second call, or a call on a worker that already ran to
    /// completion, does nothing and returns `Ok`. At most one platform
    /// thread is ever created per worker. If the platform refuses to create
    /// the thread the start is rolled back — no thread exists, the worker
    /// is startable again — and the refusal is returned.
    pub fn start(&self) -> Result<(), SpawnError> {
        let shared = &self.shared;
        if shared.cancelled.load(Ordering::SeqCst) || shared.finished.load(Ordering::SeqCst) {
            return Ok(());
        }
        if shared
            .started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(());
        }

        let mut platform = thread::Builder::new();
        if let Some(name) = &shared.name {
            platform = platform.name(name.clone());
        }
        if let Some(stack_size) = self.stack_size {
            platform = platform.stack_size(stack_size);
        }

        let run_shared = Arc::clone(shared);
        let task_slot = Arc::clone(&self.task);
        match platform.spawn(move || run_wrapper(run_shared, task_slot)) {
            Ok(handle) => {
                trace!("{} started", shared.label());
                *self
                    .platform
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = Some(handle);
                Ok(())
            }
            Err(err) => {
                shared.started.store(false, Ordering::SeqCst);
                Err(SpawnError::Os(err))
            }
        }
    }

    /// Request cancellation of a running worker.
    ///
    /// Advisory: the interruption flag is raised and any condition wait the
    /// worker is parked in is woken; the task body decides when to exit,
    /// and the transition to a terminal state happens only once it does.
    /// A no-op in every other state.
    pub fn cancel(&self) {
        let shared = &self.shared;
        if !shared.started.load(Ordering::SeqCst)
            || shared.finished.load(Ordering::SeqCst)
            || shared.cancelled.load(Ordering::SeqCst)
        {
            return;
        }
        debug!("{} cancellation requested", shared.label());
        shared.interrupt.set();
    }

    /// Block until the worker terminates.
    ///
    /// Returns `Ok` immediately for a worker that was never started or has
    /// already finished. Otherwise parks on the completion monitor for at
    /// most 100ms at a time and re-checks the lock-free flags on every
    /// wake, so a missed completion signal can delay the join but never
    /// hang it. If the calling thread is itself interrupted, the join stops
    /// with [`JoinError::Interrupted`] and the worker is left untouched.
    pub fn join(&self) -> Result<(), JoinError> {
        let shared = &self.shared;
        if !shared.started.load(Ordering::SeqCst)
            || shared.finished.load(Ordering::SeqCst)
            || shared.cancelled.load(Ordering::SeqCst)
        {
            return Ok(());
        }
        let caller = interrupt::current();
        let mut done = shared.done.lock().unwrap_or_else(PoisonError::into_inner);
        while !shared.finished.load(Ordering::SeqCst) && !shared.cancelled.load(Ordering::SeqCst) {
            if caller.is_set() {
                return Err(JoinError::Interrupted);
            }
            let (guard, _timed_out) = shared
                .done_signal
                .wait_timeout(done, JOIN_POLL_INTERVAL)
                .unwrap_or_else(PoisonError::into_inner);
            done = guard;
        }
        Ok(())
    }

    /// Whether the worker has started and not yet terminated.
    ///
    /// Lock-free; safe to call from any thread, including the task body.
    pub fn is_running(&self) -> bool {
        let shared = &self.shared;
        shared.started.load(Ordering::SeqCst)
            && !shared.finished.load(Ordering::SeqCst)
            && !shared.cancelled.load(Ordering::SeqCst)
    }

    /// Current lifecycle state, derived from the lock-free flags.
    pub fn state(&self) -> WorkerState {
        let shared = &self.shared;
        if shared.cancelled.load(Ordering::SeqCst) {
            WorkerState::Cancelled
        } else if shared.finished.load(Ordering::SeqCst) {
            WorkerState::Finished
        } else if shared.started.load(Ordering::SeqCst) {
            WorkerState::Running
        } else {
            WorkerState::NotStarted
        }
    }

    /// Message retained from a task body that failed, if any.
    ///
    /// Diagnostic only: a caller that needs the real failure cause captures
    /// it inside its own task body.
    pub fn failure(&self) -> Option<String> {
        self.shared
            .failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Identifier of the platform thread, once started.
    pub fn thread_id(&self) -> Option<thread::ThreadId> {
        self.platform
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|handle| handle.thread().id())
    }

    /// Name given at build time, if any.
    pub fn name(&self) -> Option<&str> {
        self.shared.name.as_deref()
    }
}

/// Body of every worker thread: install the interruption state, run the
/// task with failures contained, record the terminal state, wake joiners.
fn run_wrapper(shared: Arc<WorkerShared>, task_slot: TaskSlot) {
    interrupt::adopt(Arc::clone(&shared.interrupt));
    trace!("{} running", shared.label());

    let task = task_slot
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
    let outcome = match task {
        Some(mut task) => panic::catch_unwind(AssertUnwindSafe(move || task.run())),
        None => Ok(()),
    };

    if let Err(payload) = outcome {
        let message = panic_message(payload);
        warn!("{} task failed: {}", shared.label(), message);
        *shared
            .failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(message);
        shared.cancelled.store(true, Ordering::SeqCst);
    }

    // Publish completion, then wake joiners under the completion monitor so
    // a joiner between its flag check and its park cannot miss the signal.
    let mut done = shared.done.lock().unwrap_or_else(PoisonError::into_inner);
    shared.finished.store(true, Ordering::SeqCst);
    *done = true;
    shared.done_signal.notify_all();
    drop(done);
    trace!("{} finished", shared.label());
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "task panicked".to_string()
    }
}
