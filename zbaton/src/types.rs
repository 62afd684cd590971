//! Strongly typed socket parameters.
//!
//! - [`SocketUrl`]: a validated endpoint URL
//! - [`Identity`]: the routing identity announced to peers
//! - [`Role`]: whether a socket binds or connects

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Transport named by a [`SocketUrl`] scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    /// `tcp://host:port`
    Tcp,
    /// `ipc:///path/to/socket`
    Ipc,
    /// `inproc://name`
    Inproc,
    /// `pgm://interface;address:port`
    Pgm,
    /// `epgm://interface;address:port`
    Epgm,
}

impl Transport {
    const ALL: [Transport; 5] = [
        Transport::Tcp,
        Transport::Ipc,
        Transport::Inproc,
        Transport::Pgm,
        Transport::Epgm,
    ];

    /// URL scheme without the `://` separator.
    pub const fn scheme(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Ipc => "ipc",
            Self::Inproc => "inproc",
            Self::Pgm => "pgm",
            Self::Epgm => "epgm",
        }
    }
}

/// Endpoint URL accepted by bind/connect.
///
/// Only the scheme and a non-empty address are checked here; libzmq parses
/// the address itself, so `tcp://*:5555` and `tcp://eth0:5555` are fine.
///
/// ```
/// use zbaton::types::{SocketUrl, Transport};
///
/// let url: SocketUrl = "tcp://127.0.0.1:5555".parse().unwrap();
/// assert_eq!(url.transport(), Transport::Tcp);
/// assert_eq!(url.address(), "127.0.0.1:5555");
/// assert!("http://example.com".parse::<SocketUrl>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SocketUrl {
    url: String,
    transport: Transport,
}

impl SocketUrl {
    /// Parse and validate an endpoint URL.
    pub fn parse(s: &str) -> Result<Self> {
        s.parse()
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    /// The part after `scheme://`.
    pub fn address(&self) -> &str {
        &self.url[self.transport.scheme().len() + 3..]
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }
}

impl FromStr for SocketUrl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (scheme, address) = s
            .split_once("://")
            .ok_or_else(|| Error::InvalidUrl(s.to_string()))?;
        let transport = Transport::ALL
            .into_iter()
            .find(|t| t.scheme() == scheme)
            .ok_or_else(|| Error::InvalidUrl(s.to_string()))?;
        if address.is_empty() {
            return Err(Error::InvalidUrl(s.to_string()));
        }
        Ok(Self {
            url: s.to_string(),
            transport,
        })
    }
}

impl TryFrom<&str> for SocketUrl {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        s.parse()
    }
}

impl TryFrom<String> for SocketUrl {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl fmt::Display for SocketUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// Conversion into a validated [`SocketUrl`], accepted by endpoint
/// operations.
pub trait IntoSocketUrl {
    fn into_socket_url(self) -> Result<SocketUrl>;
}

impl IntoSocketUrl for SocketUrl {
    fn into_socket_url(self) -> Result<SocketUrl> {
        Ok(self)
    }
}

impl IntoSocketUrl for &SocketUrl {
    fn into_socket_url(self) -> Result<SocketUrl> {
        Ok(self.clone())
    }
}

impl IntoSocketUrl for &str {
    fn into_socket_url(self) -> Result<SocketUrl> {
        self.parse()
    }
}

impl IntoSocketUrl for String {
    fn into_socket_url(self) -> Result<SocketUrl> {
        self.parse()
    }
}

impl IntoSocketUrl for &String {
    fn into_socket_url(self) -> Result<SocketUrl> {
        self.parse()
    }
}

/// Socket routing identity (`ZMQ_IDENTITY`), 1 to 255 bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(Vec<u8>);

impl Identity {
    /// Maximum identity length accepted by libzmq.
    pub const MAX_LEN: usize = 255;

    /// Wrap identity bytes, rejecting empty or oversized values.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() || bytes.len() > Self::MAX_LEN {
            return Err(Error::option("identity", zmq::Error::EINVAL));
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Whether a socket accepts connections or initiates them.
///
/// Chosen at construction; endpoint operations check it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Binds and unbinds endpoints
    Server,
    /// Connects to and disconnects from endpoints
    Client,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::Client => "client",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
