use std::thread::{self, JoinHandle};

use crate::error::{Error, Result};

/// A background check started once and joined when its result is needed.
///
/// Workers run on plain threads and do blocking I/O. `join` hands back the
/// worker's own result, so callers get the error itself instead of a bare
/// success flag.
pub struct TaskHandle<T> {
    name: &'static str,
    inner: Inner<T>,
}

enum Inner<T> {
    Running(JoinHandle<Result<T>>),
    Ready(Result<T>),
}

impl<T: Send + 'static> TaskHandle<T> {
    pub fn spawn<F>(name: &'static str, f: F) -> Self
    where
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        log::debug!("starting background task {}", name);
        TaskHandle {
            name,
            inner: Inner::Running(thread::spawn(f)),
        }
    }
}

impl<T> TaskHandle<T> {
    /// A handle that is already complete, used when there is nothing to wait for.
    pub fn ready(name: &'static str, result: Result<T>) -> Self {
        TaskHandle {
            name,
            inner: Inner::Ready(result),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// True once `join` would return without blocking.
    pub fn is_finished(&self) -> bool {
        match &self.inner {
            Inner::Running(h) => h.is_finished(),
            Inner::Ready(_) => true,
        }
    }

    /// Block until the task is done and take its result.
    pub fn join(self) -> Result<T> {
        match self.inner {
            Inner::Ready(result) => result,
            Inner::Running(h) => h
                .join()
                .unwrap_or_else(|_| Err(Error::state(format!("task {} panicked", self.name)))),
        }
    }
}
