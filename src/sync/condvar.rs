//! Monitor-pattern condition variable.
//!
//! A [`CondVar`] is bound to exactly one [`Lock`]. A thread holding that
//! lock can suspend on the condition variable; the lock is fully released
//! (all reentrant hold levels) while the thread is parked and taken back,
//! at the same hold count, before the wait returns — on every return path,
//! including timeout and interruption.
//!
//! Every return from a wait may be spurious. Callers keep their predicate
//! in a loop:
//!
//! ```
//! # use cooperative_threads::{CondVar, Lock};
//! # use std::sync::atomic::{AtomicBool, Ordering};
//! # let lock = Lock::new();
//! # let ready = CondVar::new();
//! # ready.bind(&lock).unwrap();
//! # let signalled = AtomicBool::new(true);
//! lock.acquire();
//! while !signalled.load(Ordering::SeqCst) {
//!     ready.wait(&lock).unwrap();
//! }
//! lock.release().unwrap();
//! ```

use std::sync::{Arc, Condvar as StdCondvar, Mutex as StdMutex, MutexGuard, OnceLock, PoisonError};
use std::thread;
use std::time::Duration;

use crate::errors::CondVarError;
use crate::interrupt;
use crate::sync::lock::{Lock, LockCore};

/// Parking spot for waiters: a waiter count behind the wait mutex and the
/// platform condition variable the waiters actually sleep on.
///
/// Also reachable from a thread's interruption state, so a cancellation can
/// wake the thread out of the wait it is parked in.
pub(crate) struct WaitQueue {
    waiters: StdMutex<usize>,
    parked: StdCondvar,
}

impl WaitQueue {
    fn new() -> Self {
        Self {
            waiters: StdMutex::new(0),
            parked: StdCondvar::new(),
        }
    }

    fn lock_waiters(&self) -> MutexGuard<'_, usize> {
        self.waiters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wake every parked waiter. The wait mutex is taken first: a waiter
    /// holds it from registration until it is actually parked, so the
    /// notification cannot slip into that window and get lost.
    pub(crate) fn wake_all(&self) {
        drop(self.lock_waiters());
        self.parked.notify_all();
    }

    fn wake_one(&self) {
        drop(self.lock_waiters());
        self.parked.notify_one();
    }
}

struct CondVarCore {
    queue: Arc<WaitQueue>,
    bound: OnceLock<Arc<LockCore>>,
}

/// Condition variable bound once to a [`Lock`].
///
/// Clones share the same wait queue and the same binding.
#[derive(Clone)]
pub struct CondVar {
    core: Arc<CondVarCore>,
}

impl CondVar {
    /// Create an unbound condition variable. Waits and signals fail with
    /// [`CondVarError::Unbound`] until [`bind`](Self::bind) is called.
    pub fn new() -> Self {
        Self {
            core: Arc::new(CondVarCore {
                queue: Arc::new(WaitQueue::new()),
                bound: OnceLock::new(),
            }),
        }
    }

    /// One-time association with `lock`. Calling it a second time fails
    /// with [`CondVarError::AlreadyBound`]; the first binding stands.
    pub fn bind(&self, lock: &Lock) -> Result<(), CondVarError> {
        self.core
            .bound
            .set(Arc::clone(lock.core()))
            .map_err(|_| CondVarError::AlreadyBound)
    }

    /// Suspend the calling thread until signalled, woken spuriously, or
    /// interrupted.
    ///
    /// The caller must hold `lock`, which must be the bound lock. The lock
    /// is fully released while parked and held again (at the same reentrant
    /// hold count) when this returns, whatever the outcome. An interruption
    /// pending before the call fails immediately with
    /// [`CondVarError::Interrupted`], lock untouched; one arriving during
    /// the wait wakes it promptly and reports the same error after the lock
    /// has been reacquired.
    pub fn wait(&self, lock: &Lock) -> Result<(), CondVarError> {
        self.wait_inner(lock, None)
    }

    /// As [`wait`](Self::wait), but also returns once `timeout` has elapsed
    /// even absent a signal. The timeout is a minimum bound; scheduling may
    /// extend it, never shorten it.
    ///
    /// A timed-out return is indistinguishable from a spurious wakeup by
    /// design — the caller's predicate decides what to do next.
    pub fn wait_timeout(&self, lock: &Lock, timeout: Duration) -> Result<(), CondVarError> {
        self.wait_inner(lock, Some(timeout))
    }

    fn wait_inner(&self, lock: &Lock, timeout: Option<Duration>) -> Result<(), CondVarError> {
        let bound = self.core.bound.get().ok_or(CondVarError::Unbound)?;
        if !Arc::ptr_eq(bound, lock.core()) {
            return Err(CondVarError::WrongLock);
        }
        let me = thread::current().id();
        let state = interrupt::current();
        let queue = &self.core.queue;

        let mut waiters = queue.lock_waiters();
        *waiters += 1;
        state.enter_wait(queue);

        // Re-checked under the wait mutex: an interruption raised before
        // this point must fail the wait before the lock is ever released.
        // The interrupter publishes the flag before taking the wait mutex
        // to wake us, so exactly one side wins this race.
        if state.is_set() {
            *waiters -= 1;
            state.leave_wait();
            return Err(CondVarError::Interrupted);
        }

        let holds = match bound.release_all(me) {
            Ok(holds) => holds,
            Err(_) => {
                *waiters -= 1;
                state.leave_wait();
                return Err(CondVarError::NotOwner);
            }
        };

        // A single park is enough: a return without a signal is a spurious
        // wakeup, which the contract already makes the caller handle.
        waiters = match timeout {
            Some(timeout) => {
                let (guard, _timed_out) = queue
                    .parked
                    .wait_timeout(waiters, timeout)
                    .unwrap_or_else(PoisonError::into_inner);
                guard
            }
            None => queue
                .parked
                .wait(waiters)
                .unwrap_or_else(PoisonError::into_inner),
        };
        *waiters -= 1;
        state.leave_wait();
        drop(waiters);

        bound.reacquire(me, holds);

        if state.is_set() {
            return Err(CondVarError::Interrupted);
        }
        Ok(())
    }

    /// Wake at most one parked waiter; a no-op when none are parked.
    ///
    /// Serialized against the waiters' park through the wait mutex, so a
    /// signal sent after a waiter has entered its wait is never lost. No
    /// ordering among multiple waiters is promised. Holding the bound lock
    /// while signalling is conventional, not required.
    pub fn signal(&self) -> Result<(), CondVarError> {
        self.core.bound.get().ok_or(CondVarError::Unbound)?;
        self.core.queue.wake_one();
        Ok(())
    }

    /// Wake every currently parked waiter; each re-contends for the lock on
    /// its way out of the wait, one at a time.
    pub fn broadcast(&self) -> Result<(), CondVarError> {
        self.core.bound.get().ok_or(CondVarError::Unbound)?;
        self.core.queue.wake_all();
        Ok(())
    }

    /// Advisory: whether any thread is parked in a wait right now.
    pub fn has_waiters(&self) -> bool {
        *self.core.queue.lock_waiters() > 0
    }
}

impl Default for CondVar {
    fn default() -> Self {
        Self::new()
    }
}
