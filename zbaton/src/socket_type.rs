//! ZeroMQ socket kinds.

use std::fmt;

/// ZeroMQ socket types supported by the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketType {
    /// Exclusive bidirectional link
    Pair,
    /// Publisher
    Pub,
    /// Subscriber
    Sub,
    /// Strict request side of request-reply
    Req,
    /// Strict reply side of request-reply
    Rep,
    /// Asynchronous request-reply, load balanced
    Dealer,
    /// Routes messages by peer identity
    Router,
    /// Fan-in receiver
    Pull,
    /// Fan-out sender
    Push,
    /// Publisher that sees subscriptions
    XPub,
    /// Subscriber that sends subscriptions as messages
    XSub,
    /// Raw TCP
    Stream,
}

impl SocketType {
    /// Get the socket type as a string name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pair => "PAIR",
            Self::Pub => "PUB",
            Self::Sub => "SUB",
            Self::Req => "REQ",
            Self::Rep => "REP",
            Self::Dealer => "DEALER",
            Self::Router => "ROUTER",
            Self::Pull => "PULL",
            Self::Push => "PUSH",
            Self::XPub => "XPUB",
            Self::XSub => "XSUB",
            Self::Stream => "STREAM",
        }
    }

    /// The `zmq` crate's socket type.
    pub const fn to_zmq(self) -> zmq::SocketType {
        match self {
            Self::Pair => zmq::PAIR,
            Self::Pub => zmq::PUB,
            Self::Sub => zmq::SUB,
            Self::Req => zmq::REQ,
            Self::Rep => zmq::REP,
            Self::Dealer => zmq::DEALER,
            Self::Router => zmq::ROUTER,
            Self::Pull => zmq::PULL,
            Self::Push => zmq::PUSH,
            Self::XPub => zmq::XPUB,
            Self::XSub => zmq::XSUB,
            Self::Stream => zmq::STREAM,
        }
    }

    /// Check if this socket type can talk to the given peer type.
    pub const fn is_compatible(self, peer: SocketType) -> bool {
        matches!(
            (self, peer),
            (Self::Pair, Self::Pair)
                | (Self::Pub | Self::XPub, Self::Sub | Self::XSub)
                | (Self::Sub | Self::XSub, Self::Pub | Self::XPub)
                | (Self::Req, Self::Rep | Self::Router)
                | (Self::Rep, Self::Req | Self::Dealer)
                | (Self::Dealer, Self::Rep | Self::Router | Self::Dealer)
                | (Self::Router, Self::Req | Self::Dealer | Self::Router)
                | (Self::Push, Self::Pull)
                | (Self::Pull, Self::Push)
        )
    }

    /// Returns false for kinds that never send (SUB, PULL).
    pub const fn can_send(self) -> bool {
        !matches!(self, Self::Sub | Self::Pull)
    }

    /// Returns false for kinds that never receive (PUB, PUSH).
    pub const fn can_recv(self) -> bool {
        !matches!(self, Self::Pub | Self::Push)
    }
}

impl fmt::Display for SocketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
