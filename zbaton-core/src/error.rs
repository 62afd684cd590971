//! zbaton Core Error Types
//!
//! Failures of the reactor contract and of the readiness waiter.

use std::io;
use thiserror::Error;

use crate::interest::Interest;
use crate::reactor::Token;

/// Error type for reactor registration and readiness waiting
#[derive(Error, Debug)]
pub enum ReactorError {
    /// The reactor thread has stopped
    #[error("Reactor is shut down")]
    Shutdown,

    /// The token does not name a live registration
    #[error("Unknown reactor registration {0}")]
    UnknownToken(Token),

    /// A second task tried to wait on an interest that already has a waiter
    #[error("A task is already waiting for {0} readiness on this socket")]
    SlotBusy(Interest),

    /// The waiter has no reactor registration
    #[error("Readiness waiter is not attached to a reactor")]
    Detached,

    /// IO error while setting up or signalling the reactor
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, ReactorError>;

impl ReactorError {
    /// Check if this error means the calling convention broke its
    /// one-waiter-per-interest contract.
    #[must_use]
    pub const fn is_misuse(&self) -> bool {
        matches!(self, Self::SlotBusy(_))
    }
}
