//! Blocking-style operation engine.
//!
//! Every logical send or receive is a loop of non-blocking attempts:
//!
//! ```text
//! attempt ──▶ value / fatal error ──▶ return
//!    │
//!    └─▶ would block ──▶ deadline passed? ──▶ Timeout
//!                              │
//!                              └─▶ suspend until ready (or Timeout) ──▶ attempt
//! ```
//!
//! [`settle`] is the decision step. The synchronous driver
//! ([`perform_with_retry`]) and the async operations both loop over it and
//! differ only in how they suspend.

use std::time::{Duration, Instant};
use tracing::trace;
use zbaton_core::interest::Interest;

use crate::error::{Error, Result};
use crate::handle::{Attempt, AttemptError, SocketHandle};

/// Absolute deadline for an optional relative timeout.
pub(crate) fn deadline_after(timeout: Option<Duration>) -> Option<Instant> {
    timeout.map(|t| Instant::now().checked_add(t).unwrap_or_else(far_future))
}

fn far_future() -> Instant {
    // About 30 years; Instant has no MAX.
    Instant::now() + Duration::from_secs(86_400 * 365 * 30)
}

/// `zmq::poll` timeout in milliseconds: -1 without a deadline, rounded up
/// so a wait never ends just before its deadline.
pub(crate) fn poll_timeout_ms(deadline: Option<Instant>) -> i64 {
    match deadline {
        None => -1,
        Some(deadline) => {
            let left = deadline.saturating_duration_since(Instant::now());
            i64::try_from(left.as_nanos().div_ceil(1_000_000)).unwrap_or(i64::MAX)
        }
    }
}

/// What the retry loop does after an attempt.
#[derive(Debug)]
pub(crate) enum Flow<T> {
    /// The operation is over
    Done(Result<T>),
    /// Suspend on readiness, then attempt again
    Wait,
}

/// Decide what follows a single attempt.
pub(crate) fn settle<T>(attempt: Attempt<T>, deadline: Option<Instant>) -> Flow<T> {
    match attempt {
        Ok(value) => Flow::Done(Ok(value)),
        Err(AttemptError::Fatal(err)) => Flow::Done(Err(err)),
        Err(AttemptError::WouldBlock) => match deadline {
            Some(deadline) if Instant::now() >= deadline => {
                trace!("[ENGINE] would block past deadline");
                Flow::Done(Err(Error::Timeout))
            }
            _ => Flow::Wait,
        },
    }
}

/// Synchronous retry loop.
///
/// With a deadline every attempt is forced non-blocking, so a blocking
/// socket cannot overrun it inside libzmq. `suspend` returns `Err(Timeout)`
/// when its wait ends at the deadline.
pub(crate) fn perform_with_retry<T>(
    handle: &mut SocketHandle,
    interest: Interest,
    deadline: Option<Instant>,
    mut attempt: impl FnMut(&mut SocketHandle, bool) -> Attempt<T>,
    mut suspend: impl FnMut(&SocketHandle, Interest, Option<Instant>) -> Result<()>,
) -> Result<T> {
    let force_dontwait = deadline.is_some();
    loop {
        match settle(attempt(handle, force_dontwait), deadline) {
            Flow::Done(result) => return result,
            Flow::Wait => {
                trace!("[ENGINE] {} would block, suspending", interest);
                suspend(handle, interest, deadline)?;
            }
        }
    }
}
