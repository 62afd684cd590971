//! Shared libzmq context.

use std::fmt;

use crate::error::{Error, Result};

/// Reference-counted libzmq context.
///
/// Every socket keeps its context alive. Cloning is cheap; there is no
/// process-wide default context.
#[derive(Clone)]
pub struct Context {
    inner: zmq::Context,
}

impl Context {
    /// Create a context with libzmq's default single I/O thread.
    pub fn new() -> Self {
        Self {
            inner: zmq::Context::new(),
        }
    }

    /// Create a context with `threads` background I/O threads.
    pub fn with_io_threads(threads: i32) -> Result<Self> {
        let inner = zmq::Context::new();
        inner
            .set_io_threads(threads)
            .map_err(|e| Error::option("io_threads", e))?;
        Ok(Self { inner })
    }

    /// Number of background I/O threads.
    pub fn io_threads(&self) -> Result<i32> {
        self.inner
            .get_io_threads()
            .map_err(|e| Error::option("io_threads", e))
    }

    pub(crate) fn raw(&self) -> &zmq::Context {
        &self.inner
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context").finish_non_exhaustive()
    }
}
