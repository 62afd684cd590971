//! Multi-frame message protocol engine (sans-IO).
//!
//! [`Assembly`] decides, frame by frame, what a multi-frame receive does next
//! and when it is complete. It never touches a socket; the sync and async
//! drivers feed it the `more` flag of each received frame and the error of
//! each failed receive.
//!
//! Three shapes:
//! - `exact(n)`: exactly `n` frames. Ending early is `UnexpectedEnd`, more
//!   frames after the last is `UnexpectedContinuation`.
//! - `whole`: frames until `more` is unset.
//! - `drain`: frames until none is available in time.
//!
//! Only the first frame of `exact`/`whole` honours the timeout. Once a
//! message has started, its remaining frames are already queued by libzmq.
//!
//! [`MoreFlags`] is the send-side counterpart: it tags each outgoing frame
//! with the `more` flag it must be sent with.

use std::iter::Peekable;
use std::time::Duration;

use crate::error::{Error, ProtocolError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Exact(usize),
    Whole,
    Drain,
}

/// What the driver should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    /// Receive one frame with this timeout (`None` = wait indefinitely)
    Receive(Option<Duration>),
    /// The message is complete
    Complete,
}

/// Progress of one multi-frame receive.
#[derive(Debug, Clone)]
pub(crate) struct Assembly {
    shape: Shape,
    timeout: Option<Duration>,
    received: usize,
    done: bool,
}

impl Assembly {
    pub(crate) fn exact(count: usize, timeout: Option<Duration>) -> Self {
        Self::new(Shape::Exact(count), timeout)
    }

    pub(crate) fn whole(timeout: Option<Duration>) -> Self {
        Self::new(Shape::Whole, timeout)
    }

    /// Without a timeout, a drain only takes what is already queued.
    pub(crate) fn drain(timeout: Option<Duration>) -> Self {
        Self::new(Shape::Drain, Some(timeout.unwrap_or(Duration::ZERO)))
    }

    fn new(shape: Shape, timeout: Option<Duration>) -> Self {
        Self {
            shape,
            timeout,
            received: 0,
            done: false,
        }
    }

    /// Frames accepted so far.
    pub(crate) fn received(&self) -> usize {
        self.received
    }

    pub(crate) fn next(&self) -> Step {
        if self.done {
            return Step::Complete;
        }
        match self.shape {
            Shape::Exact(count) if self.received >= count => Step::Complete,
            Shape::Exact(_) | Shape::Whole if self.received > 0 => Step::Receive(None),
            _ => Step::Receive(self.timeout),
        }
    }

    /// Account for one received frame and its `more` flag.
    pub(crate) fn observe(&mut self, more: bool) -> Result<()> {
        self.received += 1;
        match self.shape {
            Shape::Exact(expected) => {
                if self.received < expected && !more {
                    self.done = true;
                    return Err(ProtocolError::UnexpectedEnd {
                        received: self.received,
                        expected,
                    }
                    .into());
                }
                if self.received == expected {
                    self.done = true;
                    if more {
                        return Err(ProtocolError::UnexpectedContinuation { expected }.into());
                    }
                }
            }
            Shape::Whole => self.done = !more,
            Shape::Drain => {}
        }
        Ok(())
    }

    /// Account for a failed receive. Returns `Ok` if the assembly absorbed
    /// it as its end condition.
    pub(crate) fn interrupted(&mut self, err: Error) -> Result<()> {
        self.done = true;
        match (self.shape, err) {
            (Shape::Drain, Error::Timeout) => Ok(()),
            (_, err) => Err(err),
        }
    }
}

/// Pairs each frame with the `more` flag it is sent with: set on every
/// frame but the last, and on the last only when `last_more` is set.
pub(crate) struct MoreFlags<I: Iterator> {
    frames: Peekable<I>,
    last_more: bool,
}

impl<I: Iterator> MoreFlags<I> {
    pub(crate) fn new(frames: impl IntoIterator<IntoIter = I>, last_more: bool) -> Self {
        Self {
            frames: frames.into_iter().peekable(),
            last_more,
        }
    }
}

impl<I: Iterator> Iterator for MoreFlags<I> {
    type Item = (I::Item, bool);

    fn next(&mut self) -> Option<Self::Item> {
        let frame = self.frames.next()?;
        let more = self.last_more || self.frames.peek().is_some();
        Some((frame, more))
    }
}
