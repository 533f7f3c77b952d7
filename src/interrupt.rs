//! Cooperative interruption support.
//!
//! Cancellation in this crate is a request, never a preemption: every thread
//! carries an interruption flag, and a running task observes it at its own
//! check points ([`is_interrupted`]) and at every condition variable wait.
//! Raising the flag also wakes the wait the target thread is currently
//! parked in, so a cancelled worker never hangs inside
//! [`CondVar::wait`](crate::sync::CondVar::wait).

use std::cell::RefCell;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use portable_atomic::{AtomicBool, Ordering};

use crate::sync::condvar::WaitQueue;

/// Per-thread interruption state.
///
/// Shared between the thread it belongs to (through the thread-local set up
/// by [`adopt`]) and whoever may interrupt that thread — a worker's owner
/// via [`Worker::cancel`](crate::worker::Worker::cancel).
pub(crate) struct InterruptState {
    flag: AtomicBool,
    /// Wait queue the owning thread is currently parked in, if any.
    parked_in: StdMutex<Option<Arc<WaitQueue>>>,
}

impl InterruptState {
    pub(crate) fn new() -> Self {
        Self {
            flag: AtomicBool::new(false),
            parked_in: StdMutex::new(None),
        }
    }

    pub(crate) fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Request interruption: raise the flag, then wake any wait the thread
    /// is parked in. The flag is published before the wake, so a woken
    /// waiter always observes it.
    pub(crate) fn set(&self) {
        self.flag.store(true, Ordering::SeqCst);
        let parked = self
            .parked_in
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(queue) = parked {
            queue.wake_all();
        }
    }

    pub(crate) fn enter_wait(&self, queue: &Arc<WaitQueue>) {
        *self.parked_in.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(queue));
    }

    pub(crate) fn leave_wait(&self) {
        *self.parked_in.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

thread_local! {
    static CURRENT: RefCell<Option<Arc<InterruptState>>> = const { RefCell::new(None) };
}

/// Interruption state of the calling thread.
///
/// Worker threads get theirs installed by [`adopt`] before the task body
/// runs; any other thread (the host's main loop, a test) gets a fresh one
/// on first use so it can wait on condition variables too.
pub(crate) fn current() -> Arc<InterruptState> {
    CURRENT.with(|slot| {
        Arc::clone(
            slot.borrow_mut()
                .get_or_insert_with(|| Arc::new(InterruptState::new())),
        )
    })
}

/// Install `state` as the calling thread's interruption state. Called once
/// at the top of a worker thread, before the task body runs.
pub(crate) fn adopt(state: Arc<InterruptState>) {
    CURRENT.with(|slot| *slot.borrow_mut() = Some(state));
}

/// Whether the calling thread has been asked to stop.
///
/// This is the poll a task body places before and after blocking work; it is
/// what makes cooperative cancellation make progress. The flag is sticky:
/// once a worker has been cancelled it stays interrupted for the rest of its
/// run, so a body that re-checks after cleanup still sees the request.
pub fn is_interrupted() -> bool {
    current().is_set()
}
