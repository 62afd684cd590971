//! Suspension primitives.
//!
//! A baton is the wait slot a suspended task sleeps on. The readiness waiter
//! only ever calls [`Baton::post`] and [`Baton::reset`]; how the task actually
//! sleeps is the baton's business:
//!
//! - [`ParkBaton`] parks the calling thread on a condition variable.
//! - [`AsyncBaton`] stores a task waker and is polled from a future.
//!
//! A post is a level, not a count: posting twice before anyone waits leaves a
//! single pending post.

use futures::task::{ArcWake, AtomicWaker};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

/// Suspend/resume capability handed to the readiness waiter.
pub trait Baton: Send + Sync {
    /// Release the task waiting on this baton (or the next one to wait).
    fn post(&self);

    /// Drop a pending post that nobody consumed.
    fn reset(&self);
}

/// How a wait on a [`ParkBaton`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The baton was posted
    Posted,
    /// The deadline passed first
    TimedOut,
}

/// Condvar-based baton for threads that block until the reactor posts.
#[derive(Debug, Default)]
pub struct ParkBaton {
    /// true = post pending
    posted: Mutex<bool>,
    cond: Condvar,
}

impl ParkBaton {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block the calling thread until posted or until `deadline`.
    ///
    /// A pending post is consumed without blocking.
    pub fn wait(&self, deadline: Option<Instant>) -> WaitOutcome {
        let mut posted = self.posted.lock();
        loop {
            if *posted {
                *posted = false;
                return WaitOutcome::Posted;
            }
            match deadline {
                Some(deadline) => {
                    if self.cond.wait_until(&mut posted, deadline).timed_out() {
                        if *posted {
                            *posted = false;
                            return WaitOutcome::Posted;
                        }
                        return WaitOutcome::TimedOut;
                    }
                }
                None => self.cond.wait(&mut posted),
            }
        }
    }

    /// Returns true if a post is pending.
    pub fn is_posted(&self) -> bool {
        *self.posted.lock()
    }
}

impl Baton for ParkBaton {
    fn post(&self) {
        {
            let mut posted = self.posted.lock();
            *posted = true;
        }
        self.cond.notify_one();
    }

    fn reset(&self) {
        *self.posted.lock() = false;
    }
}

/// Waker-based baton for futures.
///
/// `Arc<AsyncBaton>` is itself a waker source (see [`ArcWake`]): waking it
/// re-polls the waiting future without posting, which is how deadline timers
/// get the future to notice its timeout.
#[derive(Debug, Default)]
pub struct AsyncBaton {
    posted: AtomicBool,
    waker: AtomicWaker,
}

impl AsyncBaton {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a pending post, or register the task to be woken by the next.
    pub fn poll_posted(&self, cx: &mut Context<'_>) -> Poll<()> {
        if self.posted.swap(false, Ordering::AcqRel) {
            return Poll::Ready(());
        }
        self.waker.register(cx.waker());
        // A post may have landed between the check and the registration.
        if self.posted.swap(false, Ordering::AcqRel) {
            return Poll::Ready(());
        }
        Poll::Pending
    }

    /// Wake the registered task without posting.
    pub fn nudge(&self) {
        self.waker.wake();
    }

    /// Returns true if a post is pending.
    pub fn is_posted(&self) -> bool {
        self.posted.load(Ordering::Acquire)
    }
}

impl Baton for AsyncBaton {
    fn post(&self) {
        self.posted.store(true, Ordering::Release);
        self.waker.wake();
    }

    fn reset(&self) {
        self.posted.store(false, Ordering::Release);
    }
}

impl ArcWake for AsyncBaton {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.nudge();
    }
}
