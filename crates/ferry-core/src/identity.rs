//! Host identity
//!
//! Hosts are addressed by a dense integer, which is also the row/column
//! they occupy in population-sized tables such as the encounter matrix.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Address of a host in the network
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[display("n{_0}")]
pub struct HostId(pub u32);

impl HostId {
    /// Create a host id from its address
    pub fn new(address: u32) -> Self {
        Self(address)
    }

    /// The address as a table index
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for HostId {
    fn from(address: u32) -> Self {
        Self(address)
    }
}
