//! Messages and their per-strategy routing metadata
//!
//! Messages are owned by the node's message store; routers only read and
//! write the [`RoutingMetadata`] attached to them. The metadata is a
//! tagged variant with one arm per strategy, so a message created for one
//! strategy cannot silently be treated as belonging to another.

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::error::RoutingError;
use crate::identity::HostId;

/// Simulated time in seconds
pub type SimTime = f64;

/// Unique identifier of a message
#[derive(Debug, Display, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MessageId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// How a transfer to a peer is justified by the geometric strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferScheme {
    /// Hand the message over completely (peer is within range of the destination)
    Full,
    /// Split the replica budget between sender and receiver
    Halve,
    /// Give away a single replica
    Single,
    /// Do not transfer
    NoTransfer,
}

impl TransferScheme {
    /// Whether this scheme results in a transfer at all
    pub fn is_transfer(&self) -> bool {
        !matches!(self, TransferScheme::NoTransfer)
    }
}

/// Strategy-specific routing state attached to a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RoutingMetadata {
    /// Created outside of any strategy
    #[default]
    Unassigned,
    /// Geometric replication: replica budget and the rule behind the in-flight transfer
    Geometric {
        replicas: u32,
        pending_scheme: Option<TransferScheme>,
    },
    /// Predictability-gated spraying: replica budget only
    Prophet { replicas: u32 },
    /// Encounter utility forwarding carries no budget
    Encounter,
}

impl RoutingMetadata {
    /// Short name of the variant, used in contract-violation errors
    pub fn kind(&self) -> &'static str {
        match self {
            RoutingMetadata::Unassigned => "unassigned",
            RoutingMetadata::Geometric { .. } => "geometric",
            RoutingMetadata::Prophet { .. } => "prophet",
            RoutingMetadata::Encounter => "encounter",
        }
    }

    /// Remaining replica budget, if the variant tracks one
    pub fn replicas(&self) -> Option<u32> {
        match self {
            RoutingMetadata::Geometric { replicas, .. } | RoutingMetadata::Prophet { replicas } => {
                Some(*replicas)
            }
            RoutingMetadata::Unassigned | RoutingMetadata::Encounter => None,
        }
    }
}

/// A message carried through the network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message id
    pub id: MessageId,
    /// Originating host
    pub from: HostId,
    /// Final destination
    pub to: HostId,
    /// Size in bytes
    pub size: u64,
    /// Time-to-live in minutes, if limited
    pub ttl: Option<u32>,
    /// Simulated creation time
    pub created_at: SimTime,
    /// Routing state owned by the strategy that created the message
    pub metadata: RoutingMetadata,
}

impl Message {
    /// Create a new message without routing metadata
    pub fn new(id: impl Into<MessageId>, from: HostId, to: HostId, size: u64) -> Self {
        Self {
            id: id.into(),
            from,
            to,
            size,
            ttl: None,
            created_at: 0.0,
            metadata: RoutingMetadata::Unassigned,
        }
    }

    /// Set the creation time
    pub fn created_at(mut self, time: SimTime) -> Self {
        self.created_at = time;
        self
    }

    /// Whether the message outlived its TTL at `now`
    pub fn is_expired(&self, now: SimTime) -> bool {
        match self.ttl {
            Some(minutes) => now - self.created_at > f64::from(minutes) * 60.0,
            None => false,
        }
    }

    fn violation(&self, expected: &'static str) -> RoutingError {
        RoutingError::ContractViolation {
            message: self.id.clone(),
            expected,
            found: self.metadata.kind(),
        }
    }

    /// Geometric replica budget and pending scheme
    pub fn geometric(&self) -> Result<(u32, Option<TransferScheme>), RoutingError> {
        match &self.metadata {
            RoutingMetadata::Geometric {
                replicas,
                pending_scheme,
            } => Ok((*replicas, *pending_scheme)),
            _ => Err(self.violation("geometric")),
        }
    }

    /// Overwrite the geometric state
    pub fn set_geometric(
        &mut self,
        replicas: u32,
        pending_scheme: Option<TransferScheme>,
    ) -> Result<(), RoutingError> {
        match &mut self.metadata {
            RoutingMetadata::Geometric {
                replicas: r,
                pending_scheme: p,
            } => {
                *r = replicas;
                *p = pending_scheme;
                Ok(())
            }
            _ => Err(self.violation("geometric")),
        }
    }

    /// Mark the scheme justifying the next transfer attempt
    pub fn set_pending_scheme(&mut self, scheme: Option<TransferScheme>) -> Result<(), RoutingError> {
        let (replicas, _) = self.geometric()?;
        self.set_geometric(replicas, scheme)
    }

    /// Prophet replica budget
    pub fn prophet_replicas(&self) -> Result<u32, RoutingError> {
        match &self.metadata {
            RoutingMetadata::Prophet { replicas } => Ok(*replicas),
            _ => Err(self.violation("prophet")),
        }
    }

    /// Overwrite the prophet replica budget
    pub fn set_prophet_replicas(&mut self, replicas: u32) -> Result<(), RoutingError> {
        match &mut self.metadata {
            RoutingMetadata::Prophet { replicas: r } => {
                *r = replicas;
                Ok(())
            }
            _ => Err(self.violation("prophet")),
        }
    }

    /// Check the message belongs to the encounter strategy
    pub fn expect_encounter(&self) -> Result<(), RoutingError> {
        match &self.metadata {
            RoutingMetadata::Encounter => Ok(()),
            _ => Err(self.violation("encounter")),
        }
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}
