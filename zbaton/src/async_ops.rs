//! Future-based operations for [`Async`] sockets.
//!
//! The operations mirror the blocking ones but suspend by returning
//! `Pending`. They need no particular executor: the reactor thread wakes the
//! task's own waker, and deadlines are reactor timers.
//!
//! Dropping a pending operation releases its wait slot and cancels its
//! deadline timer. Dropping a multi-frame send between frames leaves the
//! socket poisoned, so the next send fails with [`Error::Poisoned`] instead
//! of extending the half-sent message. Dropped before its first frame was
//! accepted, it leaves the socket usable.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tracing::{trace, warn};
use zbaton_core::prelude::*;

use crate::convention::Async;
use crate::engine::{deadline_after, settle, Flow};
use crate::error::{Error, Result};
use crate::handle::SocketHandle;
use crate::message::Message;
use crate::multipart::{Assembly, MoreFlags, Step};
use crate::socket::Socket;

/// Waits for one readiness notification of one interest.
struct ReadinessWait<'a> {
    handle: &'a mut SocketHandle,
    baton: Arc<AsyncBaton>,
    interest: Interest,
    deadline: Option<Instant>,
    armed: bool,
    timer: Option<TimerId>,
}

impl<'a> ReadinessWait<'a> {
    fn new(
        handle: &'a mut SocketHandle,
        baton: Arc<AsyncBaton>,
        interest: Interest,
        deadline: Option<Instant>,
    ) -> Self {
        Self {
            handle,
            baton,
            interest,
            deadline,
            armed: false,
            timer: None,
        }
    }

    fn release(&mut self) {
        let timer = self.timer.take();
        if !self.armed && timer.is_none() {
            return;
        }
        if let Ok(waiter) = self.handle.waiter() {
            if let Some(id) = timer {
                waiter.cancel_timer(id);
            }
            if self.armed {
                waiter.release(self.interest);
            }
        }
        self.armed = false;
    }

    /// Arm the slot. `Ok(true)` means readiness is already there.
    fn arm(&mut self, cx: &mut Context<'_>) -> Result<bool> {
        let waiter = self.handle.waiter()?;
        if waiter.arm(self.interest, self.baton.clone())? == Arm::Ready {
            return Ok(true);
        }
        self.armed = true;

        // Readiness that arrived before the slot was armed.
        if self.handle.events()?.has(self.interest) {
            return Ok(true);
        }
        // Register the task before any timer can nudge it.
        if self.baton.poll_posted(cx).is_ready() {
            return Ok(true);
        }
        if let Some(deadline) = self.deadline {
            let id = waiter.wake_at(deadline, futures::task::waker(Arc::clone(&self.baton)))?;
            self.timer = Some(id);
        }
        trace!("[WAITER] task suspended for {}", self.interest);
        Ok(false)
    }
}

impl Future for ReadinessWait<'_> {
    type Output = Result<()>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if !this.armed {
            match this.arm(cx) {
                Ok(false) => {}
                Ok(true) => {
                    this.release();
                    return Poll::Ready(Ok(()));
                }
                Err(err) => {
                    this.release();
                    return Poll::Ready(Err(err));
                }
            }
        } else if this.baton.poll_posted(cx).is_ready() {
            this.release();
            return Poll::Ready(Ok(()));
        }

        if this.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            this.release();
            return Poll::Ready(Err(Error::Timeout));
        }
        Poll::Pending
    }
}

impl Drop for ReadinessWait<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

impl Socket<Async> {
    async fn wait(&mut self, interest: Interest, deadline: Option<Instant>) -> Result<()> {
        let baton = self.slots.get(interest);
        ReadinessWait::new(&mut self.handle, baton, interest, deadline).await
    }

    /// Receive one frame, waiting at most `timeout` (`None` = indefinitely).
    pub async fn recv_one(&mut self, timeout: Option<Duration>) -> Result<Message> {
        let deadline = deadline_after(timeout);
        loop {
            match settle(self.handle.recv_raw(true), deadline) {
                Flow::Done(result) => return result,
                Flow::Wait => self.wait(Interest::Read, deadline).await?,
            }
        }
    }

    /// Send one frame as the last (or only) frame of a message.
    pub async fn send_one(&mut self, frame: impl AsRef<[u8]>) -> Result<usize> {
        self.handle.check_poison()?;
        self.send_frame(frame.as_ref(), false).await
    }

    /// Send one frame with more to follow.
    pub async fn send_more(&mut self, frame: impl AsRef<[u8]>) -> Result<usize> {
        self.handle.check_poison()?;
        self.send_frame(frame.as_ref(), true).await
    }

    async fn send_frame(&mut self, frame: &[u8], more: bool) -> Result<usize> {
        loop {
            match settle(self.handle.send_raw(frame, more, true), None) {
                Flow::Done(result) => return result,
                Flow::Wait => self.wait(Interest::Write, None).await?,
            }
        }
    }

    async fn run_assembly(
        &mut self,
        assembly: &mut Assembly,
        mut sink: impl FnMut(usize, Message),
    ) -> Result<()> {
        loop {
            match assembly.next() {
                Step::Complete => return Ok(()),
                Step::Receive(timeout) => match self.recv_one(timeout).await {
                    Ok(frame) => {
                        let more = self.handle.has_more();
                        sink(assembly.received(), frame);
                        assembly.observe(more)?;
                    }
                    Err(err) => assembly.interrupted(err)?,
                },
            }
        }
    }

    /// Receive exactly `frames.len()` frames of one message into `frames`.
    ///
    /// Only the first frame waits for `timeout`. Frames received before an
    /// error stay in `frames`.
    pub async fn recv_into(&mut self, frames: &mut [Message], timeout: Option<Duration>) -> Result<()> {
        let mut assembly = Assembly::exact(frames.len(), timeout);
        self.run_assembly(&mut assembly, |index, frame| frames[index] = frame)
            .await
    }

    /// Receive a message of exactly `N` frames.
    pub async fn recv_array<const N: usize>(&mut self, timeout: Option<Duration>) -> Result<[Message; N]> {
        let mut frames: [Message; N] = std::array::from_fn(|_| Message::new());
        self.recv_into(&mut frames, timeout).await?;
        Ok(frames)
    }

    /// Receive every frame of the next message.
    ///
    /// If a frame after the first fails, the frames received so far are
    /// discarded and the error returned.
    pub async fn recv_multiple(&mut self, timeout: Option<Duration>) -> Result<Vec<Message>> {
        let mut frames = Vec::new();
        let mut assembly = Assembly::whole(timeout);
        let result = self
            .run_assembly(&mut assembly, |_, frame| frames.push(frame))
            .await;
        if let Err(err) = result {
            if !frames.is_empty() {
                warn!("[ENGINE] discarding {} frames of a failed receive: {}", frames.len(), err);
            }
            return Err(err);
        }
        Ok(frames)
    }

    /// Receive frames until none arrives within `timeout`.
    ///
    /// Without a timeout only frames that are already queued are taken.
    pub async fn drain(&mut self, timeout: Option<Duration>) -> Result<Vec<Message>> {
        let mut frames = Vec::new();
        let mut assembly = Assembly::drain(timeout);
        let result = self
            .run_assembly(&mut assembly, |_, frame| frames.push(frame))
            .await;
        if let Err(err) = result {
            if !frames.is_empty() {
                warn!("[ENGINE] discarding {} drained frames: {}", frames.len(), err);
            }
            return Err(err);
        }
        Ok(frames)
    }

    /// Send frames as one message. Returns the total bytes sent.
    pub async fn send_multiple<F: AsRef<[u8]>>(&mut self, frames: &[F]) -> Result<usize> {
        self.send_frames(frames, false).await
    }

    /// Send frames with more to follow after the last one.
    pub async fn send_multiple_more<F: AsRef<[u8]>>(&mut self, frames: &[F]) -> Result<usize> {
        self.send_frames(frames, true).await
    }

    /// Send any sequence of frames; the last carries `has_more`.
    ///
    /// Stops at the first failing frame. Frames already sent are not
    /// retracted; if any was, the socket stays poisoned, as it does when
    /// this future is dropped between frames.
    pub async fn send_frames<I>(&mut self, frames: I, has_more: bool) -> Result<usize>
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        self.handle.begin_sequence()?;
        let mut total = 0;
        let mut sent = 0;
        for (frame, more) in MoreFlags::new(frames, has_more) {
            match self.send_frame(frame.as_ref(), more).await {
                Ok(bytes) => {
                    if more {
                        self.handle.mid_sequence();
                    }
                    total += bytes;
                    sent += 1;
                }
                Err(err) => {
                    if sent > 0 {
                        warn!("[ENGINE] multi-frame send failed after {} frames: {}", sent, err);
                    }
                    return Err(err);
                }
            }
        }
        self.handle.end_sequence();
        Ok(total)
    }

    /// Send `value` as a single JSON frame.
    #[cfg(feature = "serde")]
    pub async fn send_json<T: serde::Serialize>(&mut self, value: &T) -> Result<usize> {
        let frame = Message::from_json(value)?;
        self.send_one(&frame).await
    }

    /// Receive one frame and parse it as JSON.
    #[cfg(feature = "serde")]
    pub async fn recv_json<T: serde::de::DeserializeOwned>(&mut self, timeout: Option<Duration>) -> Result<T> {
        self.recv_one(timeout).await?.read_json()
    }
}
