//! Blocking-style operations for [`Blocking`](crate::Blocking) and
//! [`Parked`](crate::Parked) sockets.
//!
//! Each call returns once the operation completed, failed, or hit its
//! timeout. How the caller waits in between is up to the convention.

use std::time::Duration;
use tracing::warn;
use zbaton_core::interest::Interest;

use crate::convention::SyncConvention;
use crate::engine::{deadline_after, perform_with_retry};
use crate::error::Result;
use crate::message::Message;
use crate::multipart::{Assembly, MoreFlags, Step};
use crate::socket::Socket;

impl<C: SyncConvention> Socket<C> {
    /// Receive one frame, waiting at most `timeout` (`None` = indefinitely).
    ///
    /// Check [`has_more`](Socket::has_more) afterwards for continuation.
    pub fn recv_one(&mut self, timeout: Option<Duration>) -> Result<Message> {
        let slots = &mut self.slots;
        perform_with_retry(
            &mut self.handle,
            Interest::Read,
            deadline_after(timeout),
            |handle, force| handle.recv_raw(force),
            |handle, interest, deadline| C::suspend(handle, slots, interest, deadline),
        )
    }

    /// Send one frame as the last (or only) frame of a message.
    pub fn send_one(&mut self, frame: impl AsRef<[u8]>) -> Result<usize> {
        self.handle.check_poison()?;
        self.send_frame(frame.as_ref(), false)
    }

    /// Send one frame with more to follow.
    pub fn send_more(&mut self, frame: impl AsRef<[u8]>) -> Result<usize> {
        self.handle.check_poison()?;
        self.send_frame(frame.as_ref(), true)
    }

    fn send_frame(&mut self, frame: &[u8], more: bool) -> Result<usize> {
        let slots = &mut self.slots;
        perform_with_retry(
            &mut self.handle,
            Interest::Write,
            None,
            |handle, force| handle.send_raw(frame, more, force),
            |handle, interest, deadline| C::suspend(handle, slots, interest, deadline),
        )
    }

    fn run_assembly(
        &mut self,
        assembly: &mut Assembly,
        mut sink: impl FnMut(usize, Message),
    ) -> Result<()> {
        loop {
            match assembly.next() {
                Step::Complete => return Ok(()),
                Step::Receive(timeout) => match self.recv_one(timeout) {
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
    pub fn recv_into(&mut self, frames: &mut [Message], timeout: Option<Duration>) -> Result<()> {
        let mut assembly = Assembly::exact(frames.len(), timeout);
        self.run_assembly(&mut assembly, |index, frame| frames[index] = frame)
    }

    /// Receive a message of exactly `N` frames.
    pub fn recv_array<const N: usize>(&mut self, timeout: Option<Duration>) -> Result<[Message; N]> {
        let mut frames: [Message; N] = std::array::from_fn(|_| Message::new());
        self.recv_into(&mut frames, timeout)?;
        Ok(frames)
    }

    /// Receive every frame of the next message.
    ///
    /// If a frame after the first fails, the frames received so far are
    /// discarded and the error returned.
    pub fn recv_multiple(&mut self, timeout: Option<Duration>) -> Result<Vec<Message>> {
        let mut frames = Vec::new();
        let mut assembly = Assembly::whole(timeout);
        if let Err(err) = self.run_assembly(&mut assembly, |_, frame| frames.push(frame)) {
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
    pub fn drain(&mut self, timeout: Option<Duration>) -> Result<Vec<Message>> {
        let mut frames = Vec::new();
        let mut assembly = Assembly::drain(timeout);
        if let Err(err) = self.run_assembly(&mut assembly, |_, frame| frames.push(frame)) {
            if !frames.is_empty() {
                warn!("[ENGINE] discarding {} drained frames: {}", frames.len(), err);
            }
            return Err(err);
        }
        Ok(frames)
    }

    /// Send frames as one message. Returns the total bytes sent.
    pub fn send_multiple<F: AsRef<[u8]>>(&mut self, frames: &[F]) -> Result<usize> {
        self.send_frames(frames, false)
    }

    /// Send frames with more to follow after the last one.
    pub fn send_multiple_more<F: AsRef<[u8]>>(&mut self, frames: &[F]) -> Result<usize> {
        self.send_frames(frames, true)
    }

    /// Send any sequence of frames; the last carries `has_more`.
    ///
    /// Stops at the first failing frame. Frames already sent are not
    /// retracted; if any was, the socket stays poisoned.
    pub fn send_frames<I>(&mut self, frames: I, has_more: bool) -> Result<usize>
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        self.handle.begin_sequence()?;
        let mut total = 0;
        let mut sent = 0;
        for (frame, more) in MoreFlags::new(frames, has_more) {
            match self.send_frame(frame.as_ref(), more) {
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
    pub fn send_json<T: serde::Serialize>(&mut self, value: &T) -> Result<usize> {
        let frame = Message::from_json(value)?;
        self.send_one(&frame)
    }

    /// Receive one frame and parse it as JSON.
    #[cfg(feature = "serde")]
    pub fn recv_json<T: serde::de::DeserializeOwned>(&mut self, timeout: Option<Duration>) -> Result<T> {
        self.recv_one(timeout)?.read_json()
    }
}
