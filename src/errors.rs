//! Error handling for the threading primitives.
//!
//! Every fallible operation returns a tagged result with one variant per
//! distinct cause: misuse of a primitive's contract is reported at the call
//! site, interruption is a recoverable condition the caller is expected to
//! handle, and a task failure never appears here at all — it is contained by
//! the worker wrapper and recorded as the `Cancelled` state.

use thiserror::Error;

/// Result type for threading operations.
pub type ThreadResult<T> = Result<T, ThreadError>;

/// Umbrella error type covering all threading operations.
#[derive(Debug, Error)]
pub enum ThreadError {
    /// Worker spawning errors.
    #[error("spawn error: {0}")]
    Spawn(#[from] SpawnError),
    /// Worker joining errors.
    #[error("join error: {0}")]
    Join(#[from] JoinError),
    /// Lock errors.
    #[error("lock error: {0}")]
    Lock(#[from] LockError),
    /// Condition variable errors.
    #[error("condition variable error: {0}")]
    CondVar(#[from] CondVarError),
}

impl ThreadError {
    /// True if this error reports an interruption rather than a bug.
    ///
    /// Interruption is the normal outcome of cancelling a worker that is
    /// blocked in a wait or a join; callers recover from it.
    pub fn is_interruption(&self) -> bool {
        matches!(
            self,
            ThreadError::Join(JoinError::Interrupted)
                | ThreadError::CondVar(CondVarError::Interrupted)
        )
    }

    /// True if this error reports an out-of-contract call.
    pub fn is_misuse(&self) -> bool {
        match self {
            ThreadError::Lock(LockError::NotOwner) => true,
            ThreadError::CondVar(e) => !matches!(e, CondVarError::Interrupted),
            _ => false,
        }
    }
}

/// Errors that can occur when starting a worker.
#[derive(Debug, Error)]
pub enum SpawnError {
    /// The operating system refused to create the thread.
    #[error("the platform failed to create the thread: {0}")]
    Os(#[from] std::io::Error),
}

/// Errors that can occur when joining a worker.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum JoinError {
    /// The joining thread was itself asked to stop before the worker
    /// terminated. The worker's state is untouched; joining again later is
    /// fine.
    #[error("join was interrupted before the worker terminated")]
    Interrupted,
}

/// Errors that can occur when releasing a [`Lock`](crate::sync::Lock).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LockError {
    /// `release` was called by a thread that does not hold the lock.
    /// Nothing was released.
    #[error("release called by a thread that does not hold the lock")]
    NotOwner,
}

/// Errors that can occur on [`CondVar`](crate::sync::CondVar) operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CondVarError {
    /// The waiting thread was interrupted, before or while suspended. The
    /// bound lock is held again by the time the caller sees this.
    #[error("wait was interrupted by a cancellation request")]
    Interrupted,
    /// `wait` was called by a thread that does not hold the bound lock.
    /// The wait never suspended.
    #[error("wait called without holding the bound lock")]
    NotOwner,
    /// The condition variable has not been bound to a lock yet.
    #[error("condition variable is not bound to a lock")]
    Unbound,
    /// `bind` was called on an already-bound condition variable.
    #[error("condition variable is already bound to a lock")]
    AlreadyBound,
    /// The lock passed to `wait` is not the lock this condition variable
    /// was bound to.
    #[error("wait called with a lock other than the bound one")]
    WrongLock,
}
