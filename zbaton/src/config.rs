//! Socket construction parameters.
//!
//! [`SocketConfig`] collects everything applied once when the native socket
//! is created. Options that may change during the socket's life go through
//! [`crate::options`] instead.

use std::time::Duration;

use crate::keys::KeyPair;
use crate::types::Identity;

/// Parameters applied when a socket is opened.
///
/// # Examples
///
/// ```
/// use zbaton::SocketConfig;
/// use std::time::Duration;
///
/// let config = SocketConfig::new()
///     .nonblocking(true)
///     .with_linger(Duration::ZERO)
///     .with_recv_hwm(100);
/// assert!(config.is_nonblocking());
/// ```
#[derive(Debug, Clone, Default)]
pub struct SocketConfig {
    /// Routing identity (`ZMQ_IDENTITY`)
    pub identity: Option<Identity>,

    /// Long-term CURVE key pair. A server role runs as CURVE server.
    pub key_pair: Option<KeyPair>,

    /// Every send/receive attempt uses `DONTWAIT`.
    ///
    /// Sockets driven by a reactor are always non-blocking.
    pub nonblocking: bool,

    /// Linger period on close (`ZMQ_LINGER`)
    ///
    /// - `None`: libzmq default (wait forever)
    /// - `Some(Duration::ZERO)`: discard pending messages on close
    pub linger: Option<Duration>,

    /// Send high water mark in messages (`ZMQ_SNDHWM`)
    pub send_hwm: Option<i32>,

    /// Receive high water mark in messages (`ZMQ_RCVHWM`)
    pub recv_hwm: Option<i32>,

    /// Topic prefixes subscribed on SUB sockets (`ZMQ_SUBSCRIBE`)
    pub subscriptions: Vec<Vec<u8>>,
}

impl SocketConfig {
    /// Create a config with libzmq defaults and blocking mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the routing identity.
    #[must_use]
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Set the CURVE key pair.
    #[must_use]
    pub fn with_key_pair(mut self, key_pair: KeyPair) -> Self {
        self.key_pair = Some(key_pair);
        self
    }

    /// Enable or disable non-blocking mode.
    #[must_use]
    pub fn nonblocking(mut self, nonblocking: bool) -> Self {
        self.nonblocking = nonblocking;
        self
    }

    /// Set the linger period.
    #[must_use]
    pub fn with_linger(mut self, linger: Duration) -> Self {
        self.linger = Some(linger);
        self
    }

    /// Set the send high water mark.
    #[must_use]
    pub fn with_send_hwm(mut self, hwm: i32) -> Self {
        self.send_hwm = Some(hwm);
        self
    }

    /// Set the receive high water mark.
    #[must_use]
    pub fn with_recv_hwm(mut self, hwm: i32) -> Self {
        self.recv_hwm = Some(hwm);
        self
    }

    /// Subscribe to a topic prefix (SUB sockets only). An empty prefix
    /// matches everything.
    #[must_use]
    pub fn with_subscription(mut self, prefix: impl Into<Vec<u8>>) -> Self {
        self.subscriptions.push(prefix.into());
        self
    }

    pub fn is_nonblocking(&self) -> bool {
        self.nonblocking
    }
}

/// TCP keep-alive settings.
///
/// Unset fields keep the operating system default.
///
/// ```
/// use zbaton::KeepAlive;
/// use std::time::Duration;
///
/// let keep_alive = KeepAlive::enabled()
///     .with_idle(Duration::from_secs(30))
///     .with_count(3);
/// assert_eq!(keep_alive.idle, Some(Duration::from_secs(30)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeepAlive {
    pub enabled: bool,
    /// Idle time before the first probe (`ZMQ_TCP_KEEPALIVE_IDLE`)
    pub idle: Option<Duration>,
    /// Unanswered probes before the peer is dropped (`ZMQ_TCP_KEEPALIVE_CNT`)
    pub count: Option<u32>,
    /// Time between probes (`ZMQ_TCP_KEEPALIVE_INTVL`)
    pub interval: Option<Duration>,
}

impl KeepAlive {
    /// Keep-alive on, everything else at the OS default.
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    /// Keep-alive explicitly off.
    pub fn disabled() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_idle(mut self, idle: Duration) -> Self {
        self.idle = Some(idle);
        self
    }

    #[must_use]
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }
}
