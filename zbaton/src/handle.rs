//! Socket handle adapter.
//!
//! [`SocketHandle`] owns exactly one native libzmq socket and exposes it as
//! a set of single, non-blocking attempts:
//! - `send_raw` / `recv_raw` return "would block" as a distinguished outcome
//!   that only the retry engine ever sees
//! - `events` probes `ZMQ_EVENTS` with zero timeout
//! - options, keep-alive, CURVE keys and endpoints are thin typed wrappers
//!
//! A handle with a reactor is registered through its [`ReadinessWaiter`] for
//! the socket's notification descriptor (`ZMQ_FD`). The registration lives
//! exactly as long as the native socket.

use hashbrown::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace, warn};
use zbaton_core::prelude::*;

use crate::config::{KeepAlive, SocketConfig};
use crate::context::Context;
use crate::engine::poll_timeout_ms;
use crate::error::{Error, Result};
use crate::keys::{KeyPair, PublicKey};
use crate::message::Message;
use crate::options::{self, OptionValue, SocketOption};
use crate::socket_type::SocketType;
use crate::types::{Role, SocketUrl};

/// Outcome of a single non-blocking attempt that did not produce a value.
#[derive(Debug)]
pub(crate) enum AttemptError {
    /// EAGAIN/EINTR: nothing happened, wait and retry
    WouldBlock,
    /// Anything else ends the operation
    Fatal(Error),
}

impl From<Error> for AttemptError {
    fn from(err: Error) -> Self {
        Self::Fatal(err)
    }
}

pub(crate) type Attempt<T> = std::result::Result<T, AttemptError>;

/// Map a libzmq send/recv errno onto an attempt outcome.
fn classify(code: zmq::Error) -> AttemptError {
    match code {
        zmq::Error::EAGAIN | zmq::Error::EINTR => AttemptError::WouldBlock,
        zmq::Error::ETERM | zmq::Error::ENOTSOCK => AttemptError::Fatal(Error::Closed),
        other => AttemptError::Fatal(Error::transport(other)),
    }
}

fn to_poll_events(interest: Interest) -> zmq::PollEvents {
    match interest {
        Interest::Read => zmq::POLLIN,
        Interest::Write => zmq::POLLOUT,
    }
}

fn to_readiness(events: zmq::PollEvents) -> Readiness {
    let mut readiness = Readiness::EMPTY;
    if events.contains(zmq::POLLIN) {
        readiness |= Readiness::READABLE;
    }
    if events.contains(zmq::POLLOUT) {
        readiness |= Readiness::WRITABLE;
    }
    readiness
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandleState {
    /// Constructed without a context
    Empty,
    Open,
    Closed,
}

/// Exclusive owner of one native socket.
pub struct SocketHandle {
    kind: SocketType,
    role: Role,
    state: HandleState,
    socket: Option<zmq::Socket>,
    nonblocking: bool,
    key_pair: Option<KeyPair>,
    peer_keys: HashMap<SocketUrl, PublicKey>,
    waiter: Option<Arc<ReadinessWaiter>>,
    /// `ZMQ_RCVMORE` of the last successful receive
    more: bool,
    /// A multi-frame send is (or was left) in progress
    poisoned: bool,
}

impl SocketHandle {
    /// Create the native socket and apply `config`.
    ///
    /// With a reactor the socket is forced non-blocking and its notification
    /// descriptor is registered with an empty interest.
    pub fn open(
        ctx: &Context,
        kind: SocketType,
        role: Role,
        config: &SocketConfig,
        reactor: Option<Arc<dyn Reactor>>,
    ) -> Result<Self> {
        let socket = ctx.raw().socket(kind.to_zmq()).map_err(Error::Init)?;

        if let Some(linger) = config.linger {
            let ms = i64::try_from(linger.as_millis()).unwrap_or(i64::MAX);
            options::set(&socket, SocketOption::Linger, &OptionValue::Int(ms))?;
        }
        if let Some(hwm) = config.send_hwm {
            options::set(&socket, SocketOption::SendHwm, &hwm.into())?;
        }
        if let Some(hwm) = config.recv_hwm {
            options::set(&socket, SocketOption::RecvHwm, &hwm.into())?;
        }
        if let Some(identity) = &config.identity {
            options::set(&socket, SocketOption::Identity, &identity.as_bytes().into())?;
        }
        for prefix in &config.subscriptions {
            options::set(&socket, SocketOption::Subscribe, &prefix.as_slice().into())?;
        }

        let mut handle = Self {
            kind,
            role,
            state: HandleState::Open,
            socket: Some(socket),
            nonblocking: config.nonblocking || reactor.is_some(),
            key_pair: None,
            peer_keys: HashMap::new(),
            waiter: None,
            more: false,
            poisoned: false,
        };

        if let Some(pair) = &config.key_pair {
            handle.apply_key_pair(pair.clone())?;
        }

        if let Some(reactor) = reactor {
            let fd = handle.socket()?.get_fd().map_err(Error::Init)?;
            let waiter = ReadinessWaiter::new(SignalKind::Mailbox);
            waiter.attach(reactor, fd)?;
            handle.waiter = Some(waiter);
        }

        debug!(
            "[SOCKET] Opened {} {} socket (nonblocking={}, reactor={})",
            kind,
            role,
            handle.nonblocking,
            handle.waiter.is_some()
        );
        Ok(handle)
    }

    /// A handle with no native socket. Every operation fails with `Closed`.
    pub fn empty(kind: SocketType, role: Role) -> Self {
        Self {
            kind,
            role,
            state: HandleState::Empty,
            socket: None,
            nonblocking: false,
            key_pair: None,
            peer_keys: HashMap::new(),
            waiter: None,
            more: false,
            poisoned: false,
        }
    }

    pub fn kind(&self) -> SocketType {
        self.kind
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_open(&self) -> bool {
        self.state == HandleState::Open
    }

    pub fn is_nonblocking(&self) -> bool {
        self.nonblocking
    }

    /// Whether the last received frame announced more frames.
    pub fn has_more(&self) -> bool {
        self.more
    }

    pub fn key_pair(&self) -> Option<&KeyPair> {
        self.key_pair.as_ref()
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub(crate) fn waiter(&self) -> Result<&Arc<ReadinessWaiter>> {
        if !self.is_open() {
            return Err(Error::Closed);
        }
        self.waiter
            .as_ref()
            .ok_or(Error::Reactor(ReactorError::Detached))
    }

    fn socket(&self) -> Result<&zmq::Socket> {
        self.socket.as_ref().ok_or(Error::Closed)
    }

    /// One send attempt. `force_dontwait` overrides a blocking socket.
    pub(crate) fn send_raw(&mut self, frame: &[u8], more: bool, force_dontwait: bool) -> Attempt<usize> {
        let socket = self.socket()?;
        let mut flags = 0;
        if more {
            flags |= zmq::SNDMORE;
        }
        if self.nonblocking || force_dontwait {
            flags |= zmq::DONTWAIT;
        }
        socket.send(frame, flags).map_err(classify)?;
        trace!("[SOCKET] sent {} bytes (more={})", frame.len(), more);
        Ok(frame.len())
    }

    /// One receive attempt. Caches `has_more` on success.
    pub(crate) fn recv_raw(&mut self, force_dontwait: bool) -> Attempt<Message> {
        let socket = self.socket()?;
        let flags = if self.nonblocking || force_dontwait {
            zmq::DONTWAIT
        } else {
            0
        };
        let msg = socket.recv_msg(flags).map_err(classify)?;
        self.more = msg.get_more();
        trace!("[SOCKET] received {} bytes (more={})", msg.len(), self.more);
        Ok(Message::copy_from_slice(&msg))
    }

    /// Zero-timeout readiness probe.
    ///
    /// Reading `ZMQ_EVENTS` also processes pending commands, which resets
    /// the notification descriptor.
    pub fn events(&self) -> Result<Readiness> {
        let events = self.socket()?.get_events().map_err(|code| match classify(code) {
            AttemptError::Fatal(err) => err,
            AttemptError::WouldBlock => Error::transport(code),
        })?;
        Ok(to_readiness(events))
    }

    /// Wait on the socket itself with `zmq::poll`, without a reactor.
    ///
    /// Returns true if `interest` became ready before `deadline`.
    pub(crate) fn poll_wait(&self, interest: Interest, deadline: Option<Instant>) -> Result<bool> {
        let socket = self.socket()?;
        let mut items = [socket.as_poll_item(to_poll_events(interest))];
        match zmq::poll(&mut items, poll_timeout_ms(deadline)) {
            Ok(_) => {}
            Err(zmq::Error::EINTR) => return Ok(false),
            Err(code) => {
                return Err(match classify(code) {
                    AttemptError::Fatal(err) => err,
                    AttemptError::WouldBlock => Error::transport(code),
                })
            }
        }
        Ok(!(items[0].get_revents() & to_poll_events(interest)).is_empty())
    }

    /// Enter a multi-frame send. Fails if an earlier one was abandoned.
    ///
    /// Nothing is marked yet: until a frame is accepted the socket is still
    /// at a message boundary.
    pub(crate) fn begin_sequence(&mut self) -> Result<()> {
        self.check_poison()
    }

    /// A frame with more to follow was accepted. The socket stays poisoned
    /// until the sequence ends.
    pub(crate) fn mid_sequence(&mut self) {
        self.poisoned = true;
    }

    /// Leave a multi-frame send that completed.
    pub(crate) fn end_sequence(&mut self) {
        self.poisoned = false;
    }

    pub(crate) fn check_poison(&self) -> Result<()> {
        if self.poisoned {
            return Err(Error::Poisoned);
        }
        Ok(())
    }

    /// Deregister, drop the native socket. Idempotent.
    pub fn close(&mut self) {
        if self.state != HandleState::Open {
            self.state = HandleState::Closed;
            return;
        }
        if let Some(waiter) = self.waiter.take() {
            if let Err(e) = waiter.detach() {
                warn!("[SOCKET] Failed to deregister {} socket: {}", self.kind, e);
            }
        }
        self.socket = None;
        self.more = false;
        self.state = HandleState::Closed;
        debug!("[SOCKET] Closed {} {} socket", self.kind, self.role);
    }

    pub fn set_option(&self, option: SocketOption, value: impl Into<OptionValue>) -> Result<()> {
        options::set(self.socket()?, option, &value.into())
    }

    pub fn get_option(&self, option: SocketOption) -> Result<OptionValue> {
        options::get(self.socket()?, option)
    }

    /// Apply TCP keep-alive settings.
    ///
    /// Stops at the first option libzmq rejects. Options set before the
    /// failure stay applied.
    pub fn set_keep_alive(&self, keep_alive: KeepAlive) -> Result<()> {
        let socket = self.socket()?;
        let enabled = OptionValue::Int(i64::from(keep_alive.enabled));
        options::set(socket, SocketOption::TcpKeepAlive, &enabled)?;
        if let Some(idle) = keep_alive.idle {
            options::set(socket, SocketOption::TcpKeepAliveIdle, &secs(idle))?;
        }
        if let Some(count) = keep_alive.count {
            options::set(socket, SocketOption::TcpKeepAliveCount, &OptionValue::Int(count.into()))?;
        }
        if let Some(interval) = keep_alive.interval {
            options::set(socket, SocketOption::TcpKeepAliveInterval, &secs(interval))?;
        }
        Ok(())
    }

    /// Install a long-term CURVE key pair. A server role also becomes the
    /// CURVE server.
    pub fn apply_key_pair(&mut self, pair: KeyPair) -> Result<()> {
        let socket = self.socket()?;
        if zmq::has("curve") != Some(true) {
            return Err(Error::crypto("libzmq was built without CURVE support"));
        }
        socket
            .set_curve_secretkey(&pair.secret().to_bytes())
            .map_err(crypto_failure("secret key"))?;
        socket
            .set_curve_publickey(pair.public().as_bytes())
            .map_err(crypto_failure("public key"))?;
        if self.role == Role::Server {
            socket.set_curve_server(true).map_err(crypto_failure("server mode"))?;
        }
        debug!("[SOCKET] CURVE key pair {} applied", pair.public());
        self.key_pair = Some(pair);
        Ok(())
    }

    /// Remember the server key expected at `url`; used by the next connect.
    pub fn set_peer_public_key(&mut self, url: SocketUrl, key: PublicKey) -> Result<()> {
        if !self.is_open() {
            return Err(Error::Closed);
        }
        self.peer_keys.insert(url, key);
        Ok(())
    }

    /// Forget the server key for `url`, returning it if one was set.
    pub fn clear_peer_public_key(&mut self, url: &SocketUrl) -> Result<Option<PublicKey>> {
        if !self.is_open() {
            return Err(Error::Closed);
        }
        Ok(self.peer_keys.remove(url))
    }

    pub fn peer_public_key(&self, url: &SocketUrl) -> Option<&PublicKey> {
        self.peer_keys.get(url)
    }

    fn require_role(&self, op: &'static str, role: Role) -> Result<()> {
        if self.role != role {
            return Err(Error::Role {
                op,
                role: self.role,
            });
        }
        Ok(())
    }

    pub fn bind(&self, url: &SocketUrl) -> Result<()> {
        self.require_role("bind", Role::Server)?;
        self.socket()?
            .bind(url.as_str())
            .map_err(|e| Error::endpoint(url.as_str(), e))?;
        debug!("[SOCKET] {} bound to {}", self.kind, url);
        Ok(())
    }

    pub fn unbind(&self, url: &SocketUrl) -> Result<()> {
        self.require_role("unbind", Role::Server)?;
        self.socket()?
            .unbind(url.as_str())
            .map_err(|e| Error::endpoint(url.as_str(), e))?;
        debug!("[SOCKET] {} unbound from {}", self.kind, url);
        Ok(())
    }

    /// Connect, first installing the server key registered for `url`.
    pub fn connect(&self, url: &SocketUrl) -> Result<()> {
        self.require_role("connect", Role::Client)?;
        let socket = self.socket()?;
        if let Some(server_key) = self.peer_keys.get(url) {
            if self.key_pair.is_none() {
                return Err(Error::crypto(format!(
                    "connecting to {url} with a server key requires a client key pair"
                )));
            }
            socket
                .set_curve_serverkey(server_key.as_bytes())
                .map_err(|e| Error::crypto(format!("server key for {url}: {e}")))?;
        }
        socket
            .connect(url.as_str())
            .map_err(|e| Error::endpoint(url.as_str(), e))?;
        debug!("[SOCKET] {} connected to {}", self.kind, url);
        Ok(())
    }

    pub fn disconnect(&self, url: &SocketUrl) -> Result<()> {
        self.require_role("disconnect", Role::Client)?;
        self.socket()?
            .disconnect(url.as_str())
            .map_err(|e| Error::endpoint(url.as_str(), e))?;
        debug!("[SOCKET] {} disconnected from {}", self.kind, url);
        Ok(())
    }
}

fn crypto_failure(what: &'static str) -> impl Fn(zmq::Error) -> Error {
    move |e| Error::crypto(format!("{what}: {e}"))
}

fn secs(duration: std::time::Duration) -> OptionValue {
    OptionValue::Int(i64::try_from(duration.as_secs()).unwrap_or(i64::MAX))
}

impl Drop for SocketHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for SocketHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketHandle")
            .field("kind", &self.kind)
            .field("role", &self.role)
            .field("state", &self.state)
            .field("nonblocking", &self.nonblocking)
            .field("more", &self.more)
            .field("poisoned", &self.poisoned)
            .field("waiter", &self.waiter)
            .finish_non_exhaustive()
    }
}
