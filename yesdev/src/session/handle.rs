//! Session handle identifier.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of one opened handle on the device.
///
/// Handles are allocated by [`SessionRegistry::open`](super::SessionRegistry::open)
/// and never reused within a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionHandle(u64);

impl SessionHandle {
    /// Wrap a raw handle number.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw handle number.
    pub fn as_raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
