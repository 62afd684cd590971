//! Calling conventions.
//!
//! A convention decides how a socket waits when an attempt would block:
//!
//! | Convention   | Reactor  | Suspends by                                   |
//! |--------------|----------|-----------------------------------------------|
//! | [`Blocking`] | none     | `zmq::poll` on the socket, on the caller       |
//! | [`Parked`]   | required | parking the thread on a [`ParkBaton`]          |
//! | [`Async`]    | required | returning `Pending` from an [`AsyncBaton`] poll|
//!
//! Everything else (attempts, retries, multi-frame assembly) is shared.

use std::sync::Arc;
use std::time::Instant;
use tracing::trace;
use zbaton_core::prelude::*;

use crate::error::{Error, Result};
use crate::handle::SocketHandle;

mod sealed {
    pub trait Sealed {}
}

/// Marker for a calling convention. Sealed.
pub trait Convention: sealed::Sealed + Send + Sized + 'static {
    /// Name used in logs.
    const NAME: &'static str;

    /// Per-socket wait slots.
    type Slots: Default + Send;
}

/// Conventions whose operations are plain blocking calls.
pub trait SyncConvention: Convention {
    /// Wait until `interest` may be ready, or fail with `Timeout` at the
    /// deadline.
    #[doc(hidden)]
    fn suspend(
        handle: &SocketHandle,
        slots: &mut Self::Slots,
        interest: Interest,
        deadline: Option<Instant>,
    ) -> Result<()>;
}

/// Lazily created wait slots, one baton per interest.
pub struct WaitSlots<B> {
    read: Option<Arc<B>>,
    write: Option<Arc<B>>,
}

impl<B> Default for WaitSlots<B> {
    fn default() -> Self {
        Self {
            read: None,
            write: None,
        }
    }
}

impl<B: Default> WaitSlots<B> {
    /// The baton for `interest`, created on first use.
    pub fn get(&mut self, interest: Interest) -> Arc<B> {
        let slot = match interest {
            Interest::Read => &mut self.read,
            Interest::Write => &mut self.write,
        };
        Arc::clone(slot.get_or_insert_with(|| Arc::new(B::default())))
    }
}

/// Direct calls on the caller's thread, no reactor.
///
/// A blocking socket without a deadline makes a plain blocking libzmq call.
/// A non-blocking socket without a deadline never waits: would-block is
/// reported as `Timeout` straight away.
#[derive(Debug)]
pub enum Blocking {}

/// Threads that park until the reactor thread resumes them.
#[derive(Debug)]
pub enum Parked {}

/// Futures woken by the reactor thread, executor-agnostic.
#[derive(Debug)]
pub enum Async {}

impl sealed::Sealed for Blocking {}
impl sealed::Sealed for Parked {}
impl sealed::Sealed for Async {}

impl Convention for Blocking {
    const NAME: &'static str = "blocking";
    type Slots = ();
}

impl Convention for Parked {
    const NAME: &'static str = "parked";
    type Slots = WaitSlots<ParkBaton>;
}

impl Convention for Async {
    const NAME: &'static str = "async";
    type Slots = WaitSlots<AsyncBaton>;
}

impl SyncConvention for Blocking {
    fn suspend(
        handle: &SocketHandle,
        _slots: &mut (),
        interest: Interest,
        deadline: Option<Instant>,
    ) -> Result<()> {
        if handle.is_nonblocking() && deadline.is_none() {
            return Err(Error::Timeout);
        }
        if !handle.poll_wait(interest, deadline)? {
            trace!("[ENGINE] poll for {} ended without readiness", interest);
        }
        Ok(())
    }
}

impl SyncConvention for Parked {
    fn suspend(
        handle: &SocketHandle,
        slots: &mut WaitSlots<ParkBaton>,
        interest: Interest,
        deadline: Option<Instant>,
    ) -> Result<()> {
        let waiter = handle.waiter()?;
        let baton = slots.get(interest);
        if waiter.arm(interest, baton.clone())? == Arm::Ready {
            return Ok(());
        }
        // Readiness that arrived before the slot was armed.
        match handle.events() {
            Ok(ready) if ready.has(interest) => {
                waiter.release(interest);
                return Ok(());
            }
            Ok(_) => {}
            Err(e) => {
                waiter.release(interest);
                return Err(e);
            }
        }
        trace!("[WAITER] parking for {}", interest);
        let outcome = baton.wait(deadline);
        waiter.release(interest);
        match outcome {
            WaitOutcome::Posted => Ok(()),
            WaitOutcome::TimedOut => Err(Error::Timeout),
        }
    }
}
