#![deny(unsafe_code)]
#![forbid(unreachable_pub)]

//! Cancellable worker threads, reentrant locks and condition variables.
//!
//! This is the concurrency layer a scripting host embeds to run
//! user-defined work off its main loop: one [`Worker`] per task on a
//! dedicated platform thread, a reentrant [`Lock`] shared between the host
//! and the task body, and a [`CondVar`] bound to that lock for suspending
//! until the other side makes progress.
//!
//! # Quick Start
//!
//! ```
//! use std::time::Duration;
//! use cooperative_threads::{CondVar, Lock, Worker};
//!
//! let lock = Lock::new();
//! let work_ready = CondVar::new();
//! work_ready.bind(&lock).unwrap();
//!
//! let (task_lock, task_ready) = (lock.clone(), work_ready.clone());
//! let worker = Worker::builder().name("loader").build(move || {
//!     task_lock.acquire();
//!     while !cooperative_threads::is_interrupted() {
//!         // Park until the host hands over work; a bounded wait keeps the
//!         // cancellation poll fresh even if no signal ever comes.
//!         match task_ready.wait_timeout(&task_lock, Duration::from_millis(50)) {
//!             Ok(()) => break,
//!             Err(_interrupted) => break,
//!         }
//!     }
//!     task_lock.release().unwrap();
//! });
//!
//! worker.start().unwrap();
//! worker.cancel();
//! worker.join().unwrap();
//! assert!(!worker.is_running());
//! ```
//!
//! # Cancellation model
//!
//! Cancellation is cooperative. [`Worker::cancel`] raises the worker
//! thread's interruption flag and wakes the condition wait it is parked in,
//! if any; the task body observes the request — through
//! [`is_interrupted`] at its own check points, or as
//! [`CondVarError::Interrupted`] from a wait — and returns. Nothing is ever
//! killed preemptively, so a body that never checks and never waits never
//! terminates. Failures inside the body are contained the same way: the
//! wrapper catches them, parks the worker in the `Cancelled` state and
//! never lets them cross the thread boundary.
//!
//! # What this crate is not
//!
//! No thread pool, no work stealing, no async task graph, no cross-process
//! anything. One task, one thread, plus the two primitives the host
//! composes as it sees fit.

pub mod errors;
pub mod interrupt;
pub mod sync;
pub mod worker;

#[cfg(test)]
mod tests;

// ============================================================================
// Public API
// ============================================================================

// Synchronization primitives
pub use sync::{CondVar, Lock};

// Workers
pub use worker::{Task, Worker, WorkerBuilder, WorkerState};

// Errors
pub use errors::{CondVarError, JoinError, LockError, SpawnError, ThreadError, ThreadResult};

// Interruption polling
pub use interrupt::is_interrupted;
