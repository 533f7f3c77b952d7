//! Synchronization primitives: the reentrant [`Lock`] and the
//! [`CondVar`] bound to it.
//!
//! These are the two public coordination tools a task body composes with its
//! host: the host and the worker share a `Lock` around their common state,
//! and a `CondVar` lets whichever side is waiting for the other suspend
//! without spinning. The worker lifecycle itself never depends on them.

pub mod condvar;
pub mod lock;

pub use condvar::CondVar;
pub use lock::Lock;
