//! Readiness interests and masks.
//!
//! An [`Interest`] names what a suspended task waits for on one socket. A
//! [`Readiness`] mask is what the reactor is asked to watch, and what it
//! reports back when a descriptor fires.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// What a suspended task is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interest {
    /// The socket has a frame to receive
    Read,
    /// The socket can accept a frame to send
    Write,
}

impl Interest {
    /// Both interests, read first.
    pub const ALL: [Interest; 2] = [Interest::Read, Interest::Write];

    /// Get the interest as a string name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

impl fmt::Display for Interest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bitmask of {readable, writable}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Readiness(u8);

impl Readiness {
    /// Nothing is wanted / nothing fired.
    pub const EMPTY: Self = Self(0);
    /// Readable.
    pub const READABLE: Self = Self(0b01);
    /// Writable.
    pub const WRITABLE: Self = Self(0b10);
    /// Readable and writable.
    pub const ALL: Self = Self(0b11);

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns true if `interest` is part of this mask.
    #[inline]
    pub const fn has(self, interest: Interest) -> bool {
        self.0 & Self::from_interest(interest).0 != 0
    }

    #[inline]
    pub const fn is_readable(self) -> bool {
        self.has(Interest::Read)
    }

    #[inline]
    pub const fn is_writable(self) -> bool {
        self.has(Interest::Write)
    }

    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[inline]
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Bits of `self` that are not in `other`.
    #[inline]
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    pub const fn from_interest(interest: Interest) -> Self {
        match interest {
            Interest::Read => Self::READABLE,
            Interest::Write => Self::WRITABLE,
        }
    }
}

impl From<Interest> for Readiness {
    fn from(interest: Interest) -> Self {
        Self::from_interest(interest)
    }
}

impl BitOr for Readiness {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for Readiness {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.is_readable(), self.is_writable()) {
            (false, false) => f.write_str("-"),
            (true, false) => f.write_str("r"),
            (false, true) => f.write_str("w"),
            (true, true) => f.write_str("rw"),
        }
    }
}
