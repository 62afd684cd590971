//! zbaton Error Types
//!
//! Every public operation returns [`Result`]. "Would block" never shows up
//! here: it is an internal outcome that the retry loop turns into a wait.

use thiserror::Error;
use zbaton_core::ReactorError;

use crate::types::Role;

/// Multi-frame and transport protocol violations.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The peer ended the message before the expected frame count
    #[error("Message ended after {received} of {expected} frames")]
    UnexpectedEnd { received: usize, expected: usize },

    /// More frames followed the last expected one
    #[error("More frames follow the expected {expected}")]
    UnexpectedContinuation { expected: usize },

    /// libzmq failed the send/receive
    #[error("Transport error: {0}")]
    Transport(zmq::Error),
}

/// Main error type for zbaton operations
#[derive(Error, Debug)]
pub enum Error {
    /// No progress before the deadline
    #[error("Operation timed out")]
    Timeout,

    /// The socket was closed, never opened, or its context terminated
    #[error("Socket closed")]
    Closed,

    /// Framing or transport failure
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A socket option could not be set or read
    #[error("Socket option {option} failed: {code}")]
    SocketOption {
        option: &'static str,
        code: zmq::Error,
    },

    /// Keys were malformed or CURVE is unavailable
    #[error("CURVE configuration error: {0}")]
    CryptoConfig(String),

    /// The native socket could not be created
    #[error("Socket creation failed: {0}")]
    Init(zmq::Error),

    /// Endpoint operation not allowed for this role
    #[error("{op} is not available on a {role} socket")]
    Role { op: &'static str, role: Role },

    /// bind/unbind/connect/disconnect failed
    #[error("Endpoint {url} failed: {source}")]
    Endpoint {
        url: String,
        #[source]
        source: zmq::Error,
    },

    /// The URL does not name a supported transport
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),

    /// Reactor registration or readiness waiting failed
    #[error("Reactor error: {0}")]
    Reactor(#[from] ReactorError),

    /// A multi-frame send was abandoned half way
    #[error("Socket poisoned by an interrupted multi-frame send")]
    Poisoned,

    /// A frame could not be decoded into the requested type
    #[error("Decode error: {0}")]
    Decode(String),
}

/// Result type alias for zbaton operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a transport error from a libzmq errno
    pub const fn transport(code: zmq::Error) -> Self {
        Self::Protocol(ProtocolError::Transport(code))
    }

    /// Create a socket option error
    pub const fn option(option: &'static str, code: zmq::Error) -> Self {
        Self::SocketOption { option, code }
    }

    /// Create an endpoint error
    pub fn endpoint(url: impl Into<String>, source: zmq::Error) -> Self {
        Self::Endpoint {
            url: url.into(),
            source,
        }
    }

    /// Create a CURVE configuration error
    pub fn crypto(msg: impl Into<String>) -> Self {
        Self::CryptoConfig(msg.into())
    }

    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Check if the socket is still usable after this error.
    ///
    /// A timed-out operation leaves buffered data intact; a multi-frame
    /// mismatch leaves the socket at a message boundary or with the rest of
    /// the message still queued.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Timeout
                | Self::Protocol(ProtocolError::UnexpectedEnd { .. })
                | Self::Protocol(ProtocolError::UnexpectedContinuation { .. })
                | Self::SocketOption { .. }
                | Self::Role { .. }
                | Self::Endpoint { .. }
                | Self::InvalidUrl(_)
                | Self::Decode(_)
        )
    }

    /// Check if the socket can no longer be used
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Closed | Self::Poisoned | Self::Init(_))
    }
}
