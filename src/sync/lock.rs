//! Reentrant mutual exclusion.
//!
//! [`Lock`] layers counted reentrancy and explicit `acquire`/`release`
//! pairing over the platform mutex: the owning thread may acquire again
//! without deadlocking itself, and must release once per acquire. Explicit
//! pairing (instead of a scoped guard) is what a scripting host needs when
//! lock and unlock are driven by separate script operations.

use std::sync::{Arc, Condvar as StdCondvar, Mutex as StdMutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use crate::errors::LockError;

#[derive(Default)]
struct OwnerState {
    owner: Option<ThreadId>,
    holds: u32,
}

/// Shared body of a [`Lock`]: ownership bookkeeping behind a platform
/// mutex, plus a parking spot for contending acquirers.
pub(crate) struct LockCore {
    state: StdMutex<OwnerState>,
    /// Notified whenever the lock becomes free again.
    available: StdCondvar,
}

impl LockCore {
    fn new() -> Self {
        Self {
            state: StdMutex::new(OwnerState::default()),
            available: StdCondvar::new(),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, OwnerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn acquire(&self) {
        let me = thread::current().id();
        let mut st = self.lock_state();
        if st.owner == Some(me) {
            st.holds += 1;
            return;
        }
        while st.owner.is_some() {
            st = self
                .available
                .wait(st)
                .unwrap_or_else(PoisonError::into_inner);
        }
        st.owner = Some(me);
        st.holds = 1;
    }

    fn try_acquire(&self) -> bool {
        let me = thread::current().id();
        let mut st = self.lock_state();
        match st.owner {
            Some(owner) if owner == me => {
                st.holds += 1;
                true
            }
            Some(_) => false,
            None => {
                st.owner = Some(me);
                st.holds = 1;
                true
            }
        }
    }

    fn release(&self) -> Result<(), LockError> {
        let me = thread::current().id();
        let mut st = self.lock_state();
        if st.owner != Some(me) {
            return Err(LockError::NotOwner);
        }
        st.holds -= 1;
        if st.holds == 0 {
            st.owner = None;
            drop(st);
            self.available.notify_one();
        }
        Ok(())
    }

    pub(crate) fn is_held_by(&self, id: ThreadId) -> bool {
        self.lock_state().owner == Some(id)
    }

    /// Give up every hold level at once, returning the count so a condition
    /// wait can restore it afterwards. Fails without side effects if the
    /// caller is not the owner.
    pub(crate) fn release_all(&self, me: ThreadId) -> Result<u32, LockError> {
        let mut st = self.lock_state();
        if st.owner != Some(me) {
            return Err(LockError::NotOwner);
        }
        let holds = st.holds;
        st.owner = None;
        st.holds = 0;
        drop(st);
        self.available.notify_one();
        Ok(holds)
    }

    /// Block until the lock is free, then take it back at the saved hold
    /// count. Counterpart of [`release_all`](Self::release_all).
    pub(crate) fn reacquire(&self, me: ThreadId, holds: u32) {
        let mut st = self.lock_state();
        while st.owner.is_some() {
            st = self
                .available
                .wait(st)
                .unwrap_or_else(PoisonError::into_inner);
        }
        st.owner = Some(me);
        st.holds = holds;
    }
}

/// Exclusive lock with counted reentrancy.
///
/// At most one thread holds the lock at a time. The holder may acquire
/// again without self-deadlock and owes one [`release`](Lock::release) per
/// acquire. A release followed by another thread's acquire orders memory:
/// everything written while holding the lock is visible to the next holder.
///
/// Cloning yields another handle to the same underlying lock, which is how
/// the lock is shared between the host and its workers.
#[derive(Clone)]
pub struct Lock {
    core: Arc<LockCore>,
}

impl Lock {
    /// Create an unowned lock.
    pub fn new() -> Self {
        Self {
            core: Arc::new(LockCore::new()),
        }
    }

    /// Block until the calling thread holds the lock.
    pub fn acquire(&self) {
        self.core.acquire();
    }

    /// Non-blocking acquire attempt; never suspends the caller.
    ///
    /// Returns `true` when the lock was free or already held by the calling
    /// thread (taking one more hold level), `false` when another thread
    /// holds it.
    pub fn try_acquire(&self) -> bool {
        self.core.try_acquire()
    }

    /// Give up one hold level; the final level frees the lock and wakes one
    /// parked acquirer.
    ///
    /// Fails with [`LockError::NotOwner`] when the calling thread does not
    /// hold the lock; nothing changes in that case.
    pub fn release(&self) -> Result<(), LockError> {
        self.core.release()
    }

    /// Whether the calling thread currently holds this lock.
    pub fn is_held_by_current_thread(&self) -> bool {
        self.core.is_held_by(thread::current().id())
    }

    pub(crate) fn core(&self) -> &Arc<LockCore> {
        &self.core
    }
}

impl Default for Lock {
    fn default() -> Self {
        Self::new()
    }
}
