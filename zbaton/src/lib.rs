//! # zbaton
//!
//! Blocking-style calls over non-blocking ZeroMQ sockets.
//!
//! A socket is opened with one of three calling conventions and exposes the
//! same operations under each:
//!
//! - **`Socket<Blocking>`**: direct calls, waits with `zmq::poll` on the
//!   caller's thread
//! - **`Socket<Parked>`**: the calling thread parks until a reactor thread
//!   reports readiness
//! - **`Socket<Async>`**: operations are futures woken by the reactor; any
//!   executor works
//!
//! Underneath, every operation is a loop of non-blocking attempts. A "would
//! block" suspends the caller on the socket's readiness waiter until the
//! reactor fires, then the attempt is retried. Multi-frame messages are
//! assembled by a sans-IO state machine shared by all conventions.
//!
//! ## Crates
//!
//! - **`zbaton-core`**: reactor contract, batons, readiness waiter (no libzmq)
//! - **`zbaton`**: libzmq adapter, poll reactor, public API (this crate)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use zbaton::prelude::*;
//!
//! # fn main() -> zbaton::Result<()> {
//! let ctx = Context::new();
//! let reactor = PollReactor::spawn()?;
//!
//! let mut server = ParkedSocket::new(&ctx, SocketType::Pair, Role::Server,
//!     SocketConfig::new(), reactor.clone())?;
//! server.bind("tcp://127.0.0.1:5555")?;
//!
//! let mut client = ParkedSocket::new(&ctx, SocketType::Pair, Role::Client,
//!     SocketConfig::new(), reactor)?;
//! client.connect("tcp://127.0.0.1:5555")?;
//!
//! client.send_multiple(&["hello", "world"])?;
//! let [hello, world] = server.recv_array::<2>(Some(Duration::from_secs(1)))?;
//! assert_eq!(hello, "hello");
//! assert_eq!(world, "world");
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - **`serde`**: `send_json` / `recv_json` and JSON frame helpers

#![warn(clippy::all)]
#![deny(unsafe_code)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

mod async_ops;
mod sync_ops;

pub mod config;
pub mod context;
pub mod convention;
pub mod dev_tracing;
pub(crate) mod engine;
pub mod error;
pub mod handle;
pub mod keys;
pub mod message;
pub(crate) mod multipart;
pub mod options;
pub mod poll_reactor;
pub mod socket;
pub mod socket_type;
pub mod types;

pub use bytes::Bytes;
pub use zbaton_core::{baton, interest, reactor, waiter, ReactorError};

pub use config::{KeepAlive, SocketConfig};
pub use context::Context;
pub use convention::{Async, Blocking, Convention, Parked, SyncConvention};
pub use error::{Error, ProtocolError, Result};
pub use keys::{KeyPair, PublicKey, SecretKey};
pub use message::Message;
pub use options::{OptionValue, SocketOption};
pub use poll_reactor::PollReactor;
pub use socket::{AsyncSocket, Bindable, BlockingSocket, Connectable, ParkedSocket, Socket};
pub use socket_type::SocketType;
pub use types::{Identity, IntoSocketUrl, Role, SocketUrl, Transport};

/// Everything needed to open sockets and use them.
///
/// ```rust
/// use zbaton::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        AsyncSocket, Bindable, BlockingSocket, Connectable, Context, Error, KeepAlive, KeyPair,
        Message, ParkedSocket, PollReactor, PublicKey, ReactorError, Result, Role, Socket,
        SocketConfig, SocketOption, SocketType, SocketUrl,
    };
    pub use zbaton_core::reactor::Reactor;
}
