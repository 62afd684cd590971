//! Typed socket option pass-through.
//!
//! [`SocketOption`] names the libzmq options the adapter exposes and
//! [`OptionValue`] carries their value. Every failure is reported as
//! [`Error::SocketOption`] with the option name and errno:
//! - a value of the wrong kind, or an integer out of range, is `EINVAL`
//! - reading a write-only option (subscriptions, ROUTER_MANDATORY, CONFLATE)
//!   is `EINVAL`
//! - anything libzmq itself rejects keeps libzmq's errno

use std::fmt;

use crate::error::{Error, Result};

/// Socket options reachable through `set_option`/`get_option`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketOption {
    /// `ZMQ_LINGER`, milliseconds (-1 = forever)
    Linger,
    /// `ZMQ_SNDHWM`, messages
    SendHwm,
    /// `ZMQ_RCVHWM`, messages
    RecvHwm,
    /// `ZMQ_SNDTIMEO`, milliseconds
    SendTimeout,
    /// `ZMQ_RCVTIMEO`, milliseconds
    RecvTimeout,
    /// `ZMQ_TCP_KEEPALIVE`, -1/0/1
    TcpKeepAlive,
    /// `ZMQ_TCP_KEEPALIVE_IDLE`, seconds
    TcpKeepAliveIdle,
    /// `ZMQ_TCP_KEEPALIVE_CNT`
    TcpKeepAliveCount,
    /// `ZMQ_TCP_KEEPALIVE_INTVL`, seconds
    TcpKeepAliveInterval,
    /// `ZMQ_RECONNECT_IVL`, milliseconds
    ReconnectInterval,
    /// `ZMQ_RECONNECT_IVL_MAX`, milliseconds
    ReconnectIntervalMax,
    /// `ZMQ_SNDBUF`, bytes
    SendBuffer,
    /// `ZMQ_RCVBUF`, bytes
    RecvBuffer,
    /// `ZMQ_MAXMSGSIZE`, bytes (-1 = unlimited)
    MaxMessageSize,
    /// `ZMQ_IMMEDIATE`
    Immediate,
    /// `ZMQ_IPV6`
    Ipv6,
    /// `ZMQ_IDENTITY`
    Identity,
    /// `ZMQ_SUBSCRIBE` (write-only)
    Subscribe,
    /// `ZMQ_UNSUBSCRIBE` (write-only)
    Unsubscribe,
    /// `ZMQ_ROUTER_MANDATORY` (write-only)
    RouterMandatory,
    /// `ZMQ_CONFLATE` (write-only)
    Conflate,
}

impl SocketOption {
    /// libzmq-style option name, used in errors and logs.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Linger => "linger",
            Self::SendHwm => "sndhwm",
            Self::RecvHwm => "rcvhwm",
            Self::SendTimeout => "sndtimeo",
            Self::RecvTimeout => "rcvtimeo",
            Self::TcpKeepAlive => "tcp_keepalive",
            Self::TcpKeepAliveIdle => "tcp_keepalive_idle",
            Self::TcpKeepAliveCount => "tcp_keepalive_cnt",
            Self::TcpKeepAliveInterval => "tcp_keepalive_intvl",
            Self::ReconnectInterval => "reconnect_ivl",
            Self::ReconnectIntervalMax => "reconnect_ivl_max",
            Self::SendBuffer => "sndbuf",
            Self::RecvBuffer => "rcvbuf",
            Self::MaxMessageSize => "maxmsgsize",
            Self::Immediate => "immediate",
            Self::Ipv6 => "ipv6",
            Self::Identity => "identity",
            Self::Subscribe => "subscribe",
            Self::Unsubscribe => "unsubscribe",
            Self::RouterMandatory => "router_mandatory",
            Self::Conflate => "conflate",
        }
    }

    /// Returns true for options libzmq does not let you read back.
    pub const fn is_write_only(self) -> bool {
        matches!(
            self,
            Self::Subscribe | Self::Unsubscribe | Self::RouterMandatory | Self::Conflate
        )
    }

    fn invalid(self) -> Error {
        Error::option(self.name(), zmq::Error::EINVAL)
    }

    fn fail(self) -> impl Fn(zmq::Error) -> Error {
        move |code| Error::option(self.name(), code)
    }
}

impl fmt::Display for SocketOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value of a [`SocketOption`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Int(i64),
    Bool(bool),
    Bytes(Vec<u8>),
}

impl OptionValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(v) => Some(v),
            _ => None,
        }
    }
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for OptionValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<Vec<u8>> for OptionValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<&[u8]> for OptionValue {
    fn from(v: &[u8]) -> Self {
        Self::Bytes(v.to_vec())
    }
}

fn int32(option: SocketOption, value: &OptionValue) -> Result<i32> {
    match value {
        OptionValue::Int(v) => i32::try_from(*v).map_err(|_| option.invalid()),
        _ => Err(option.invalid()),
    }
}

fn boolean(option: SocketOption, value: &OptionValue) -> Result<bool> {
    value.as_bool().ok_or_else(|| option.invalid())
}

fn bytes(option: SocketOption, value: &OptionValue) -> Result<&[u8]> {
    value.as_bytes().ok_or_else(|| option.invalid())
}

/// Apply `value` to `socket`.
pub(crate) fn set(socket: &zmq::Socket, option: SocketOption, value: &OptionValue) -> Result<()> {
    use SocketOption as O;

    let fail = option.fail();
    match option {
        O::Linger => socket.set_linger(int32(option, value)?),
        O::SendHwm => socket.set_sndhwm(int32(option, value)?),
        O::RecvHwm => socket.set_rcvhwm(int32(option, value)?),
        O::SendTimeout => socket.set_sndtimeo(int32(option, value)?),
        O::RecvTimeout => socket.set_rcvtimeo(int32(option, value)?),
        O::TcpKeepAlive => socket.set_tcp_keepalive(int32(option, value)?),
        O::TcpKeepAliveIdle => socket.set_tcp_keepalive_idle(int32(option, value)?),
        O::TcpKeepAliveCount => socket.set_tcp_keepalive_cnt(int32(option, value)?),
        O::TcpKeepAliveInterval => socket.set_tcp_keepalive_intvl(int32(option, value)?),
        O::ReconnectInterval => socket.set_reconnect_ivl(int32(option, value)?),
        O::ReconnectIntervalMax => socket.set_reconnect_ivl_max(int32(option, value)?),
        O::SendBuffer => socket.set_sndbuf(int32(option, value)?),
        O::RecvBuffer => socket.set_rcvbuf(int32(option, value)?),
        O::MaxMessageSize => match value {
            OptionValue::Int(v) => socket.set_maxmsgsize(*v),
            _ => return Err(option.invalid()),
        },
        O::Immediate => socket.set_immediate(boolean(option, value)?),
        O::Ipv6 => socket.set_ipv6(boolean(option, value)?),
        O::Identity => socket.set_identity(bytes(option, value)?),
        O::Subscribe => socket.set_subscribe(bytes(option, value)?),
        O::Unsubscribe => socket.set_unsubscribe(bytes(option, value)?),
        O::RouterMandatory => socket.set_router_mandatory(boolean(option, value)?),
        O::Conflate => socket.set_conflate(boolean(option, value)?),
    }
    .map_err(fail)
}

/// Read the current value of `option` from `socket`.
pub(crate) fn get(socket: &zmq::Socket, option: SocketOption) -> Result<OptionValue> {
    use SocketOption as O;

    let fail = option.fail();
    let int = |r: zmq::Result<i32>| r.map(OptionValue::from).map_err(option.fail());
    match option {
        O::Linger => int(socket.get_linger()),
        O::SendHwm => int(socket.get_sndhwm()),
        O::RecvHwm => int(socket.get_rcvhwm()),
        O::SendTimeout => int(socket.get_sndtimeo()),
        O::RecvTimeout => int(socket.get_rcvtimeo()),
        O::TcpKeepAlive => int(socket.get_tcp_keepalive()),
        O::TcpKeepAliveIdle => int(socket.get_tcp_keepalive_idle()),
        O::TcpKeepAliveCount => int(socket.get_tcp_keepalive_cnt()),
        O::TcpKeepAliveInterval => int(socket.get_tcp_keepalive_intvl()),
        O::ReconnectInterval => int(socket.get_reconnect_ivl()),
        O::ReconnectIntervalMax => int(socket.get_reconnect_ivl_max()),
        O::SendBuffer => int(socket.get_sndbuf()),
        O::RecvBuffer => int(socket.get_rcvbuf()),
        O::MaxMessageSize => socket.get_maxmsgsize().map(OptionValue::Int).map_err(fail),
        O::Immediate => socket.is_immediate().map(OptionValue::Bool).map_err(fail),
        O::Ipv6 => socket.is_ipv6().map(OptionValue::Bool).map_err(fail),
        O::Identity => socket.get_identity().map(OptionValue::Bytes).map_err(fail),
        O::Subscribe | O::Unsubscribe | O::RouterMandatory | O::Conflate => Err(option.invalid()),
    }
}
