//! zbaton Core
//!
//! This crate contains the convention-agnostic building blocks that turn
//! edge-triggered reactor notifications into task resumption:
//! - Read/write interest masks (`interest`)
//! - The reactor contract a socket registers with (`reactor`)
//! - Suspension primitives: thread-parking and waker-based batons (`baton`)
//! - The per-socket readiness state machine (`waiter`)
//! - Error types (`error`)
//!
//! Nothing in here knows about libzmq. The `zbaton` crate plugs a ZeroMQ
//! socket and a poll-based reactor thread into these pieces.

#![deny(unsafe_code)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod baton;
pub mod error;
pub mod interest;
pub mod reactor;
pub mod waiter;

pub use error::{ReactorError, Result};

// Keep it minimal to avoid API lock-in.
pub mod prelude {
    pub use crate::baton::{AsyncBaton, Baton, ParkBaton, WaitOutcome};
    pub use crate::error::ReactorError;
    pub use crate::interest::{Interest, Readiness};
    pub use crate::reactor::{ReadyCallback, Reactor, TimerId, Token};
    pub use crate::waiter::{Arm, ReadinessWaiter, SignalKind, SlotState};
}
