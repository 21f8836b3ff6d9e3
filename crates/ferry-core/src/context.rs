//! The node a router runs on
//!
//! Routers never own messages, connections, or positions. Everything they
//! need from the surrounding simulator is requested through
//! [`NodeContext`], which is implemented by the simulator for one node at
//! a time.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::geometry::Coord;
use crate::identity::HostId;
use crate::message::{Message, MessageId, SimTime};
use crate::traits::RoutingStrategy;

/// A live contact between two hosts
///
/// Read-only from the router's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    /// Host that brought the connection up
    pub from: HostId,
    /// Host at the other end
    pub to: HostId,
}

impl Connection {
    pub fn new(from: HostId, to: HostId) -> Self {
        Self { from, to }
    }

    /// The endpoint that is not `host`
    pub fn other(&self, host: HostId) -> HostId {
        if self.from == host { self.to } else { self.from }
    }

    /// Whether `host` is one of the endpoints
    pub fn involves(&self, host: HostId) -> bool {
        self.from == host || self.to == host
    }
}

impl std::fmt::Display for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}<->{}", self.from, self.to)
    }
}

/// Result of asking the node to start a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    /// Transfer started; completion is reported later
    Started,
    /// One of the endpoints is already transferring
    Busy,
    /// The receiver refused the message (already has it, no room, ...)
    Denied,
}

impl TransferStatus {
    pub fn is_started(&self) -> bool {
        matches!(self, TransferStatus::Started)
    }
}

/// Services a node offers to the router running on it
pub trait NodeContext {
    /// The host this context belongs to
    fn local(&self) -> HostId;

    /// Current simulated time in seconds
    fn now(&self) -> SimTime;

    /// Every host in the network
    fn hosts(&self) -> Vec<HostId>;

    /// Current connections of the local host, oldest first
    fn connections(&self) -> Vec<Connection>;

    /// Whether the local host has anything to send and anyone to send it to
    fn can_start_transfer(&self) -> bool;

    /// Whether `host` currently has a transfer in progress on any connection
    fn is_transferring(&self, host: HostId) -> bool;

    /// Whether `host` holds (or has already received) message `id`
    fn has_message(&self, host: HostId, id: &MessageId) -> bool;

    /// Snapshot of the local buffer in the node's queueing order
    fn messages(&self) -> Vec<Message>;

    /// Mutable access to a message in the local buffer
    fn message_mut(&mut self, id: &MessageId) -> Option<&mut Message>;

    /// Try to start a transfer of a message to its final destination
    ///
    /// Returns true if such a transfer was started.
    fn exchange_deliverable(&mut self) -> bool;

    /// Start transferring message `id` over `connection` (non-blocking)
    fn start_transfer(&mut self, id: &MessageId, connection: &Connection) -> TransferStatus;

    /// Radio range of `host`
    fn radio_range(&self, host: HostId) -> f64;

    /// Current position of `host`
    fn position(&self, host: HostId) -> Coord;

    /// Next waypoint of `host`, if it has planned movement
    fn next_waypoint(&self, host: HostId) -> Option<Coord>;

    /// The routing strategy running on `host`
    fn strategy_of(&self, host: HostId) -> Option<Arc<dyn RoutingStrategy>>;
}
