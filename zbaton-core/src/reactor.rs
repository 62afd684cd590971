//! The reactor contract.
//!
//! A reactor watches raw descriptors and calls back with a [`Readiness`] mask
//! when one becomes readable or writable. Dispatch is one-shot per interest:
//! the bits that fired are removed from the registration before the callback
//! runs, so a descriptor that stays ready does not spin the loop. Whoever wants
//! another notification re-arms with [`Reactor::set_interest`].
//!
//! Callbacks run on the reactor's own thread with no reactor lock held, so a
//! callback may call back into the reactor.

use std::fmt;
use std::os::unix::io::RawFd;
use std::sync::Arc;
use std::task::Waker;
use std::time::Instant;

use crate::error::Result;
use crate::interest::Readiness;

/// Callback invoked by the reactor with the mask that fired.
pub type ReadyCallback = Arc<dyn Fn(Readiness) + Send + Sync>;

/// Handle to one descriptor registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(pub u64);

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle to one pending [`Reactor::wake_at`] timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// Event-driven descriptor watcher.
pub trait Reactor: Send + Sync {
    /// Start watching `fd`. An empty `interest` registers the descriptor
    /// without polling it until [`Reactor::set_interest`] arms it.
    fn register(&self, fd: RawFd, interest: Readiness, callback: ReadyCallback) -> Result<Token>;

    /// Replace the set of interests watched for `token`.
    fn set_interest(&self, token: Token, interest: Readiness) -> Result<()>;

    /// Stop watching. The callback is never invoked after this returns.
    fn deregister(&self, token: Token) -> Result<()>;

    /// Wake `waker` once `deadline` has passed.
    ///
    /// Used by suspension primitives that cannot block a thread to implement
    /// their timeouts. A wait that ends early cancels its timer with
    /// [`Reactor::cancel_timer`].
    fn wake_at(&self, deadline: Instant, waker: Waker) -> TimerId;

    /// Drop a timer that has not fired yet. Unknown or fired ids are ignored.
    fn cancel_timer(&self, id: TimerId);
}
