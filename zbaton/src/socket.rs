//! Socket façade, generic over its calling convention.
//!
//! ```text
//! Socket<Blocking>   recv_one(..) -> Result<Message>          zmq::poll on caller
//! Socket<Parked>     recv_one(..) -> Result<Message>          thread parks, reactor resumes
//! Socket<Async>      recv_one(..).await -> Result<Message>    future woken by reactor
//! ```
//!
//! The role picked at construction decides which endpoint traits work:
//! [`Bindable`] on servers, [`Connectable`] on clients.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use zbaton_core::reactor::Reactor;

use crate::config::{KeepAlive, SocketConfig};
use crate::context::Context;
use crate::convention::{Async, Blocking, Convention, Parked};
use crate::error::Result;
use crate::handle::SocketHandle;
use crate::keys::{KeyPair, PublicKey};
use crate::options::{OptionValue, SocketOption};
use crate::socket_type::SocketType;
use crate::types::{IntoSocketUrl, Role};

/// A ZeroMQ socket driven by calling convention `C`.
///
/// Operations take `&mut self`: one socket is never used by two callers at
/// once, and a multi-frame send cannot interleave with another send.
pub struct Socket<C: Convention> {
    pub(crate) handle: SocketHandle,
    pub(crate) slots: C::Slots,
    _convention: PhantomData<fn() -> C>,
}

/// Socket making direct calls on the caller's thread.
pub type BlockingSocket = Socket<Blocking>;

/// Socket whose calls park the thread until the reactor resumes it.
pub type ParkedSocket = Socket<Parked>;

/// Socket whose calls are futures woken by the reactor.
pub type AsyncSocket = Socket<Async>;

impl<C: Convention> Socket<C> {
    fn from_handle(handle: SocketHandle) -> Self {
        Self {
            handle,
            slots: C::Slots::default(),
            _convention: PhantomData,
        }
    }

    /// A socket without a native resource; every operation returns `Closed`.
    pub fn empty(kind: SocketType, role: Role) -> Self {
        Self::from_handle(SocketHandle::empty(kind, role))
    }

    pub fn kind(&self) -> SocketType {
        self.handle.kind()
    }

    pub fn role(&self) -> Role {
        self.handle.role()
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_open()
    }

    pub fn is_nonblocking(&self) -> bool {
        self.handle.is_nonblocking()
    }

    /// Whether the last received frame announced more frames.
    pub fn has_more(&self) -> bool {
        self.handle.has_more()
    }

    pub fn key_pair(&self) -> Option<&KeyPair> {
        self.handle.key_pair()
    }

    /// Close the socket and drop its reactor registration. Idempotent.
    pub fn close(&mut self) {
        self.handle.close();
    }

    pub fn set_option(&self, option: SocketOption, value: impl Into<OptionValue>) -> Result<()> {
        self.handle.set_option(option, value)
    }

    pub fn get_option(&self, option: SocketOption) -> Result<OptionValue> {
        self.handle.get_option(option)
    }

    /// Apply TCP keep-alive settings, stopping at the first failure.
    pub fn set_keep_alive(&self, keep_alive: KeepAlive) -> Result<()> {
        self.handle.set_keep_alive(keep_alive)
    }

    /// Install a long-term CURVE key pair.
    pub fn set_key_pair(&mut self, pair: KeyPair) -> Result<()> {
        self.handle.apply_key_pair(pair)
    }

    /// Borrow the underlying handle.
    pub fn handle(&self) -> &SocketHandle {
        &self.handle
    }
}

impl Socket<Blocking> {
    /// Open a socket without a reactor.
    pub fn new(ctx: &Context, kind: SocketType, role: Role, config: SocketConfig) -> Result<Self> {
        SocketHandle::open(ctx, kind, role, &config, None).map(Self::from_handle)
    }
}

impl Socket<Parked> {
    /// Open a non-blocking socket registered with `reactor`.
    pub fn new(
        ctx: &Context,
        kind: SocketType,
        role: Role,
        config: SocketConfig,
        reactor: Arc<dyn Reactor>,
    ) -> Result<Self> {
        SocketHandle::open(ctx, kind, role, &config, Some(reactor)).map(Self::from_handle)
    }
}

impl Socket<Async> {
    /// Open a non-blocking socket registered with `reactor`.
    pub fn new(
        ctx: &Context,
        kind: SocketType,
        role: Role,
        config: SocketConfig,
        reactor: Arc<dyn Reactor>,
    ) -> Result<Self> {
        SocketHandle::open(ctx, kind, role, &config, Some(reactor)).map(Self::from_handle)
    }
}

impl<C: Convention> fmt::Debug for Socket<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Socket")
            .field("convention", &C::NAME)
            .field("handle", &self.handle)
            .finish()
    }
}

/// Endpoint operations of server sockets.
pub trait Bindable {
    /// Accept connections at `url`.
    fn bind(&mut self, url: impl IntoSocketUrl) -> Result<()>;

    /// Stop accepting connections at `url`.
    fn unbind(&mut self, url: impl IntoSocketUrl) -> Result<()>;
}

/// Endpoint operations of client sockets.
pub trait Connectable {
    /// Connect to `url`, authenticating it with its registered server key.
    fn connect(&mut self, url: impl IntoSocketUrl) -> Result<()>;

    fn disconnect(&mut self, url: impl IntoSocketUrl) -> Result<()>;

    /// Expect `key` as the CURVE server key of `url` on the next connect.
    fn set_peer_public_key(&mut self, url: impl IntoSocketUrl, key: PublicKey) -> Result<()>;

    /// Forget the server key of `url`.
    fn clear_peer_public_key(&mut self, url: impl IntoSocketUrl) -> Result<Option<PublicKey>>;
}

impl<C: Convention> Bindable for Socket<C> {
    fn bind(&mut self, url: impl IntoSocketUrl) -> Result<()> {
        self.handle.bind(&url.into_socket_url()?)
    }

    fn unbind(&mut self, url: impl IntoSocketUrl) -> Result<()> {
        self.handle.unbind(&url.into_socket_url()?)
    }
}

impl<C: Convention> Connectable for Socket<C> {
    fn connect(&mut self, url: impl IntoSocketUrl) -> Result<()> {
        self.handle.connect(&url.into_socket_url()?)
    }

    fn disconnect(&mut self, url: impl IntoSocketUrl) -> Result<()> {
        self.handle.disconnect(&url.into_socket_url()?)
    }

    fn set_peer_public_key(&mut self, url: impl IntoSocketUrl, key: PublicKey) -> Result<()> {
        let url = url.into_socket_url()?;
        if self.handle.role() != Role::Client {
            return Err(crate::error::Error::Role {
                op: "set_peer_public_key",
                role: self.handle.role(),
            });
        }
        self.handle.set_peer_public_key(url, key)
    }

    fn clear_peer_public_key(&mut self, url: impl IntoSocketUrl) -> Result<Option<PublicKey>> {
        let url = url.into_socket_url()?;
        if self.handle.role() != Role::Client {
            return Err(crate::error::Error::Role {
                op: "clear_peer_public_key",
                role: self.handle.role(),
            });
        }
        self.handle.clear_peer_public_key(&url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn assert_send<T: Send>() {}

    #[test]
    fn test_sockets_are_send() {
        assert_send::<BlockingSocket>();
        assert_send::<ParkedSocket>();
        assert_send::<AsyncSocket>();
    }

    #[test]
    fn test_empty_socket() {
        let mut socket = BlockingSocket::empty(SocketType::Req, Role::Client);
        assert!(!socket.is_open());
        assert!(matches!(socket.connect("inproc://nowhere"), Err(Error::Closed)));
        socket.close();
        assert!(!socket.is_open());
    }

    #[test]
    fn test_url_validation_before_role() {
        let mut socket = BlockingSocket::empty(SocketType::Rep, Role::Server);
        assert!(matches!(socket.bind("bogus"), Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_peer_key_requires_client_role() {
        let ctx = Context::new();
        let mut server = BlockingSocket::new(
            &ctx,
            SocketType::Router,
            Role::Server,
            SocketConfig::new().with_linger(std::time::Duration::ZERO),
        )
        .unwrap();
        let key = *KeyPair::generate().public();
        assert!(matches!(
            server.set_peer_public_key("tcp://127.0.0.1:9", key),
            Err(Error::Role { op: "set_peer_public_key", role: Role::Server })
        ));
    }
}
