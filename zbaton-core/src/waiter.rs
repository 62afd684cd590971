//! Readiness waiter: reactor edges in, exactly-one resumptions out.
//!
//! Each socket owns one [`ReadinessWaiter`] with two slots, one per
//! [`Interest`]. A slot moves through
//!
//! ```text
//!   Idle ──arm──▶ Registered ──on_ready──▶ Ready ──release/arm──▶ Idle
//!    │                                        ▲
//!    └──────────────on_ready──────────────────┘  (transient, nobody waiting)
//! ```
//!
//! Invariants:
//! - At most one baton per slot. Arming a `Registered` slot is refused.
//! - A fired slot posts its baton once; readiness is a level, never counted.
//! - The reactor interest mask mirrors the set of `Registered` slots. It is
//!   widened on `arm` and narrowed by the reactor's one-shot dispatch.
//!
//! The waiter does not know how a task sleeps. Callers arm a slot with any
//! [`Baton`], probe the socket once more, and then block or await on their
//! own baton type.

use parking_lot::Mutex;
use std::os::unix::io::RawFd;
use std::sync::Arc;
use std::task::Waker;
use std::time::Instant;
use tracing::{debug, trace};

use crate::baton::Baton;
use crate::error::{ReactorError, Result};
use crate::interest::{Interest, Readiness};
use crate::reactor::{ReadyCallback, Reactor, TimerId, Token};

/// State of one wait slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Nobody waiting, nothing recorded
    Idle,
    /// A task is suspended on this slot's baton
    Registered,
    /// The reactor fired for this interest since the last check
    Ready,
}

/// What a registered descriptor's readiness means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    /// Readable means readable and writable means writable.
    Direct,
    /// A notification mailbox (libzmq's `ZMQ_FD`): it only ever turns
    /// readable, and any edge means "socket state changed, check again".
    /// Every registered slot fires on an edge.
    Mailbox,
}

impl SignalKind {
    /// Descriptor interest needed to serve the given slot interests.
    const fn descriptor_mask(self, wanted: Readiness) -> Readiness {
        match self {
            Self::Direct => wanted,
            Self::Mailbox => {
                if wanted.is_empty() {
                    Readiness::EMPTY
                } else {
                    Readiness::READABLE
                }
            }
        }
    }

    /// Slot interests woken by a descriptor event.
    const fn woken(self, fired: Readiness) -> Readiness {
        match self {
            Self::Direct => fired,
            Self::Mailbox => {
                if fired.is_empty() {
                    Readiness::EMPTY
                } else {
                    Readiness::ALL
                }
            }
        }
    }
}

/// Result of [`ReadinessWaiter::arm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arm {
    /// Readiness was already recorded; retry without suspending.
    Ready,
    /// The baton is registered; suspend on it.
    Parked,
}

struct Slot {
    state: SlotState,
    baton: Option<Arc<dyn Baton>>,
}

impl Slot {
    const fn new() -> Self {
        Self {
            state: SlotState::Idle,
            baton: None,
        }
    }

    fn fire(&mut self) {
        match self.state {
            SlotState::Registered => {
                self.state = SlotState::Ready;
                if let Some(baton) = self.baton.take() {
                    baton.post();
                }
            }
            SlotState::Idle => self.state = SlotState::Ready,
            SlotState::Ready => {}
        }
    }

    fn clear(&mut self) {
        self.state = SlotState::Idle;
        self.baton = None;
    }
}

struct Registration {
    reactor: Arc<dyn Reactor>,
    token: Token,
}

struct Inner {
    read: Slot,
    write: Slot,
    kind: SignalKind,
    registration: Option<Registration>,
    /// Mirror of the descriptor interest currently armed in the reactor
    armed: Readiness,
}

impl Inner {
    fn slot_mut(&mut self, interest: Interest) -> &mut Slot {
        match interest {
            Interest::Read => &mut self.read,
            Interest::Write => &mut self.write,
        }
    }

    fn slot(&self, interest: Interest) -> &Slot {
        match interest {
            Interest::Read => &self.read,
            Interest::Write => &self.write,
        }
    }

    fn registered(&self) -> Readiness {
        let mut wanted = Readiness::EMPTY;
        for interest in Interest::ALL {
            if self.slot(interest).state == SlotState::Registered {
                wanted |= Readiness::from(interest);
            }
        }
        wanted
    }

    /// Widen the reactor interest to cover every registered slot.
    fn sync_interest(&mut self) -> Result<()> {
        let wanted = self.kind.descriptor_mask(self.registered());
        let desired = self.armed.union(wanted);
        if desired == self.armed {
            return Ok(());
        }
        let registration = self.registration.as_ref().ok_or(ReactorError::Detached)?;
        registration.reactor.set_interest(registration.token, desired)?;
        trace!(token = %registration.token, from = %self.armed, to = %desired, "[WAITER] re-armed");
        self.armed = desired;
        Ok(())
    }
}

/// Per-socket readiness state machine shared with the reactor callback.
pub struct ReadinessWaiter {
    inner: Mutex<Inner>,
}

impl ReadinessWaiter {
    /// Create a detached waiter.
    pub fn new(kind: SignalKind) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner {
                read: Slot::new(),
                write: Slot::new(),
                kind,
                registration: None,
                armed: Readiness::EMPTY,
            }),
        })
    }

    /// Register `fd` with `reactor`, initially with no interest armed.
    ///
    /// The reactor only holds a weak reference back to the waiter.
    pub fn attach(self: &Arc<Self>, reactor: Arc<dyn Reactor>, fd: RawFd) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.registration.is_some() {
            return Ok(());
        }
        let weak = Arc::downgrade(self);
        let callback: ReadyCallback = Arc::new(move |fired| {
            if let Some(waiter) = weak.upgrade() {
                waiter.on_ready(fired);
            }
        });
        let token = reactor.register(fd, Readiness::EMPTY, callback)?;
        debug!(fd, token = %token, "[WAITER] attached to reactor");
        inner.registration = Some(Registration { reactor, token });
        inner.armed = Readiness::EMPTY;
        Ok(())
    }

    /// Remove the reactor registration and forget every slot.
    ///
    /// Idempotent. After this returns the reactor never calls back.
    pub fn detach(&self) -> Result<()> {
        let registration = {
            let mut inner = self.inner.lock();
            inner.read.clear();
            inner.write.clear();
            inner.armed = Readiness::EMPTY;
            inner.registration.take()
        };
        if let Some(registration) = registration {
            debug!(token = %registration.token, "[WAITER] detached from reactor");
            registration.reactor.deregister(registration.token)?;
        }
        Ok(())
    }

    /// Returns true while registered with a reactor.
    pub fn is_attached(&self) -> bool {
        self.inner.lock().registration.is_some()
    }

    /// Register `baton` as the waiter for `interest`.
    ///
    /// Returns [`Arm::Ready`] (and goes back to `Idle`) when readiness was
    /// recorded since the last check. The caller must [`release`] the slot
    /// once it stops waiting, however the wait ends.
    ///
    /// [`release`]: ReadinessWaiter::release
    pub fn arm(&self, interest: Interest, baton: Arc<dyn Baton>) -> Result<Arm> {
        let mut inner = self.inner.lock();
        if inner.registration.is_none() {
            return Err(ReactorError::Detached);
        }
        let slot = inner.slot_mut(interest);
        match slot.state {
            SlotState::Ready => {
                slot.clear();
                trace!(%interest, "[WAITER] readiness already recorded");
                return Ok(Arm::Ready);
            }
            SlotState::Registered => return Err(ReactorError::SlotBusy(interest)),
            SlotState::Idle => {}
        }
        baton.reset();
        slot.state = SlotState::Registered;
        slot.baton = Some(baton);
        if let Err(e) = inner.sync_interest() {
            inner.slot_mut(interest).clear();
            return Err(e);
        }
        trace!(%interest, "[WAITER] slot registered");
        Ok(Arm::Parked)
    }

    /// Stop waiting on `interest`: resumed, timed out or cancelled.
    ///
    /// The reactor interest is left armed; the next waiter reuses it.
    pub fn release(&self, interest: Interest) {
        self.inner.lock().slot_mut(interest).clear();
    }

    /// Reactor callback.
    pub fn on_ready(&self, fired: Readiness) {
        let mut inner = self.inner.lock();
        // One-shot dispatch: the reactor already dropped these bits.
        inner.armed = inner.armed.difference(fired);
        let woken = inner.kind.woken(fired);
        for interest in Interest::ALL {
            if woken.has(interest) {
                inner.slot_mut(interest).fire();
            }
        }
        trace!(%fired, %woken, "[WAITER] reactor fired");
    }

    /// Ask the reactor to wake `waker` at `deadline`.
    pub fn wake_at(&self, deadline: Instant, waker: Waker) -> Result<TimerId> {
        let reactor = self.reactor()?;
        Ok(reactor.wake_at(deadline, waker))
    }

    /// Cancel a timer from [`ReadinessWaiter::wake_at`]. A no-op once detached.
    pub fn cancel_timer(&self, id: TimerId) {
        if let Ok(reactor) = self.reactor() {
            reactor.cancel_timer(id);
        }
    }

    // Timer calls go to the reactor outside the waiter lock.
    fn reactor(&self) -> Result<Arc<dyn Reactor>> {
        let inner = self.inner.lock();
        let registration = inner.registration.as_ref().ok_or(ReactorError::Detached)?;
        Ok(Arc::clone(&registration.reactor))
    }

    /// Current state of one slot.
    pub fn state(&self, interest: Interest) -> SlotState {
        self.inner.lock().slot(interest).state
    }

    /// Descriptor interest currently armed in the reactor.
    pub fn armed(&self) -> Readiness {
        self.inner.lock().armed
    }

    /// Registration token, if attached.
    pub fn token(&self) -> Option<Token> {
        self.inner.lock().registration.as_ref().map(|r| r.token)
    }
}

impl std::fmt::Debug for ReadinessWaiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ReadinessWaiter")
            .field("read", &inner.read.state)
            .field("write", &inner.write.state)
            .field("kind", &inner.kind)
            .field("armed", &inner.armed)
            .field("token", &inner.registration.as_ref().map(|r| r.token))
            .finish()
    }
}
