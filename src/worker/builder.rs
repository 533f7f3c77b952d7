//! Builder for configuring a worker before it exists.

use super::{Task, Worker};

/// Fluent configuration for a [`Worker`].
///
/// Everything is optional; `WorkerBuilder::new().build(task)` is the same
/// as [`Worker::new`].
pub struct WorkerBuilder {
    name: Option<String>,
    stack_size: Option<usize>,
}

impl WorkerBuilder {
    pub fn new() -> Self {
        Self {
            name: None,
            stack_size: None,
        }
    }

    /// Name for the platform thread; also used in log events.
    pub fn name<T: Into<String>>(mut self, name: T) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Stack size in bytes for the platform thread.
    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Finish: a worker in the `NotStarted` state holding `task`.
    pub fn build<T: Task>(self, task: T) -> Worker {
        Worker::from_parts(self.name, self.stack_size, Box::new(task))
    }
}

impl Default for WorkerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
