//! # Client References
//!
//! The engine never owns clients. It only remembers who they are.

use std::fmt;

/// Non-owning reference to an externally managed client.
///
/// Identity and lookup only: the entity never decides a client's lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClientId(pub u64);

impl ClientId {
    /// Returns the raw identifier.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client#{}", self.0)
    }
}

impl From<u64> for ClientId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}
