//! In-memory world for testing routers
//!
//! [`MockWorld`] plays the part of the simulator: it owns host positions,
//! message buffers, connections, and in-flight transfers, and hands each
//! router a [`NodeContext`] view of its own node.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ferry_core::{Coord, HostId, Message, MockWorld};
//!
//! let mut world = MockWorld::new();
//! world.add_host(HostId(0), Coord::new(0.0, 0.0), 10.0);
//! world.add_host(HostId(1), Coord::new(5.0, 0.0), 10.0);
//! world.register(Arc::new(router_a));
//! world.register(Arc::new(router_b));
//!
//! world.create_message(HostId(0), Message::new("M1", HostId(0), HostId(1), 100))?;
//! world.connect(HostId(0), HostId(1))?;
//! world.tick(HostId(0))?;
//! let done = world.complete_transfers()?;
//! ```
//!
//! Transfers started during a tick stay in flight until
//! [`complete_transfers`](MockWorld::complete_transfers) is called.
//! Disconnecting a pair cancels its transfer without any callback.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use tracing::trace;

use crate::context::{Connection, NodeContext, TransferStatus};
use crate::error::RoutingError;
use crate::geometry::Coord;
use crate::identity::HostId;
use crate::info::RoutingInfo;
use crate::message::{Message, MessageId, SimTime};
use crate::traits::{RoutingStrategy, TickOutcome};

/// A host in the mock world
#[derive(Debug, Clone)]
pub struct MockHost {
    /// Current position
    pub position: Coord,
    /// Radio range
    pub radio_range: f64,
    /// Next waypoint, if the host is moving
    pub waypoint: Option<Coord>,
    /// Whether the host accepts incoming transfers
    pub accepting: bool,
    buffer: Vec<Message>,
    delivered: HashSet<MessageId>,
}

impl MockHost {
    fn new(position: Coord, radio_range: f64) -> Self {
        Self {
            position,
            radio_range,
            waypoint: None,
            accepting: true,
            buffer: Vec::new(),
            delivered: HashSet::new(),
        }
    }

    fn holds(&self, id: &MessageId) -> bool {
        self.delivered.contains(id) || self.buffer.iter().any(|m| &m.id == id)
    }
}

/// A transfer that has started but not completed
#[derive(Debug, Clone)]
struct InFlight {
    connection: Connection,
    sender: HostId,
    receiver: HostId,
    message: Message,
}

/// A transfer that completed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedTransfer {
    pub message: MessageId,
    pub from: HostId,
    pub to: HostId,
    /// The receiver was the final destination
    pub delivered: bool,
}

/// In-memory simulator state
#[derive(Default)]
pub struct MockWorld {
    now: SimTime,
    hosts: BTreeMap<HostId, MockHost>,
    connections: Vec<Connection>,
    in_flight: Vec<InFlight>,
    strategies: HashMap<HostId, Arc<dyn RoutingStrategy>>,
    completed: Vec<CompletedTransfer>,
}

impl MockWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a host at `position` with the given radio range
    pub fn add_host(&mut self, id: HostId, position: Coord, radio_range: f64) {
        self.hosts.insert(id, MockHost::new(position, radio_range));
    }

    pub fn host(&self, id: HostId) -> Option<&MockHost> {
        self.hosts.get(&id)
    }

    pub fn host_mut(&mut self, id: HostId) -> Option<&mut MockHost> {
        self.hosts.get_mut(&id)
    }

    pub fn host_ids(&self) -> Vec<HostId> {
        self.hosts.keys().copied().collect()
    }

    pub fn set_position(&mut self, id: HostId, position: Coord) {
        if let Some(host) = self.hosts.get_mut(&id) {
            host.position = position;
        }
    }

    pub fn set_waypoint(&mut self, id: HostId, waypoint: Option<Coord>) {
        if let Some(host) = self.hosts.get_mut(&id) {
            host.waypoint = waypoint;
        }
    }

    pub fn set_accepting(&mut self, id: HostId, accepting: bool) {
        if let Some(host) = self.hosts.get_mut(&id) {
            host.accepting = accepting;
        }
    }

    /// Register the router running on its host
    pub fn register(&mut self, strategy: Arc<dyn RoutingStrategy>) {
        self.strategies.insert(strategy.host(), strategy);
    }

    /// Register `strategy` on `host`, even if it was built for another host
    ///
    /// Lets one router instance serve several hosts.
    pub fn register_as(&mut self, host: HostId, strategy: Arc<dyn RoutingStrategy>) {
        self.strategies.insert(host, strategy);
    }

    pub fn strategy(&self, host: HostId) -> Option<Arc<dyn RoutingStrategy>> {
        self.strategies.get(&host).cloned()
    }

    fn require_strategy(&self, host: HostId) -> Result<Arc<dyn RoutingStrategy>, RoutingError> {
        self.strategy(host).ok_or(RoutingError::NoStrategy(host))
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    pub fn set_time(&mut self, now: SimTime) {
        self.now = now;
    }

    pub fn advance(&mut self, seconds: SimTime) {
        self.now += seconds;
    }

    /// A [`NodeContext`] for `host`
    pub fn node(&mut self, host: HostId) -> NodeView<'_> {
        NodeView { world: self, host }
    }

    /// Create a message on `host`, letting its router annotate it
    pub fn create_message(&mut self, host: HostId, message: Message) -> Result<MessageId, RoutingError> {
        let strategy = self.require_strategy(host)?;
        let message = strategy.on_message_created(message.created_at(self.now));
        let id = message.id.clone();
        self.insert_message(host, message);
        Ok(id)
    }

    /// Put a message straight into a buffer, bypassing the router
    pub fn insert_message(&mut self, host: HostId, message: Message) {
        if let Some(h) = self.hosts.get_mut(&host) {
            h.buffer.push(message);
        }
    }

    /// Drop a message from a buffer (eviction)
    pub fn remove_message(&mut self, host: HostId, id: &MessageId) -> Option<Message> {
        let h = self.hosts.get_mut(&host)?;
        let pos = h.buffer.iter().position(|m| &m.id == id)?;
        Some(h.buffer.remove(pos))
    }

    /// Drop every message whose TTL ran out, returning how many were dropped
    pub fn drop_expired(&mut self) -> usize {
        let now = self.now;
        let mut dropped = 0;
        for host in self.hosts.values_mut() {
            let before = host.buffer.len();
            host.buffer.retain(|m| !m.is_expired(now));
            dropped += before - host.buffer.len();
        }
        dropped
    }

    pub fn buffer(&self, host: HostId) -> &[Message] {
        self.hosts
            .get(&host)
            .map(|h| h.buffer.as_slice())
            .unwrap_or(&[])
    }

    pub fn message(&self, host: HostId, id: &MessageId) -> Option<&Message> {
        self.buffer(host).iter().find(|m| &m.id == id)
    }

    /// Every transfer completed so far
    pub fn completed(&self) -> &[CompletedTransfer] {
        &self.completed
    }

    pub fn is_delivered(&self, id: &MessageId) -> bool {
        self.completed.iter().any(|c| c.delivered && &c.message == id)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_connected(&self, a: HostId, b: HostId) -> bool {
        self.connections
            .iter()
            .any(|c| c.involves(a) && c.involves(b))
    }

    /// Bring up a connection and notify both routers
    pub fn connect(&mut self, a: HostId, b: HostId) -> Result<(), RoutingError> {
        if a == b || self.is_connected(a, b) {
            return Ok(());
        }
        self.connections.push(Connection::new(a, b));
        trace!(from = %a, to = %b, "connection up");

        for (host, peer) in [(a, b), (b, a)] {
            if let Some(strategy) = self.strategy(host) {
                let view = self.node(host);
                strategy.on_contact_up(&view, peer)?;
            }
        }
        Ok(())
    }

    /// Tear down a connection, cancelling any transfer on it
    pub fn disconnect(&mut self, a: HostId, b: HostId) {
        let before = self.connections.len();
        self.connections.retain(|c| !(c.involves(a) && c.involves(b)));
        if self.connections.len() == before {
            return;
        }
        self.in_flight
            .retain(|t| !(t.connection.involves(a) && t.connection.involves(b)));
        trace!(from = %a, to = %b, "connection down");

        for (host, peer) in [(a, b), (b, a)] {
            if let Some(strategy) = self.strategy(host) {
                let view = self.node(host);
                strategy.on_contact_down(&view, peer);
            }
        }
    }

    /// Connect every pair within radio range and drop pairs that drifted apart
    pub fn refresh_contacts(&mut self) -> Result<(), RoutingError> {
        let ids = self.host_ids();
        for (i, &a) in ids.iter().enumerate() {
            for &b in &ids[i + 1..] {
                let (ha, hb) = (&self.hosts[&a], &self.hosts[&b]);
                let range = ha.radio_range.min(hb.radio_range);
                let in_range = ha.position.distance(&hb.position) <= range;
                match (in_range, self.is_connected(a, b)) {
                    (true, false) => self.connect(a, b)?,
                    (false, true) => self.disconnect(a, b),
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// Run one decision round for `host`
    pub fn tick(&mut self, host: HostId) -> Result<TickOutcome, RoutingError> {
        let strategy = self.require_strategy(host)?;
        let mut view = self.node(host);
        strategy.on_tick(&mut view)
    }

    /// Run one decision round for every host with a router
    pub fn tick_all(&mut self) -> Result<Vec<(HostId, TickOutcome)>, RoutingError> {
        let mut outcomes = Vec::new();
        for host in self.host_ids() {
            if self.strategies.contains_key(&host) {
                outcomes.push((host, self.tick(host)?));
            }
        }
        Ok(outcomes)
    }

    /// Finish every in-flight transfer, receiver first, then sender
    ///
    /// A failing callback consumes its own transfer; the ones after it stay
    /// in flight.
    pub fn complete_transfers(&mut self) -> Result<Vec<CompletedTransfer>, RoutingError> {
        let mut pending = std::mem::take(&mut self.in_flight).into_iter();
        let mut done = Vec::with_capacity(pending.len());

        while let Some(transfer) = pending.next() {
            match self.finish_transfer(transfer) {
                Ok(record) => done.push(record),
                Err(e) => {
                    self.in_flight.extend(pending);
                    return Err(e);
                }
            }
        }
        Ok(done)
    }

    fn finish_transfer(&mut self, transfer: InFlight) -> Result<CompletedTransfer, RoutingError> {
        let id = transfer.message.id.clone();
        let received = match self.strategy(transfer.receiver) {
            Some(strategy) => strategy.on_message_received(transfer.message, transfer.sender)?,
            None => transfer.message,
        };

        let delivered = received.to == transfer.receiver;
        if let Some(host) = self.hosts.get_mut(&transfer.receiver) {
            if delivered {
                host.delivered.insert(id.clone());
            } else if !host.holds(&id) {
                host.buffer.push(received);
            }
        }

        if let Some(strategy) = self.strategy(transfer.sender) {
            let mut view = self.node(transfer.sender);
            strategy.on_transfer_done(&mut view, &transfer.connection, &id)?;
        }

        trace!(message = %id, from = %transfer.sender, to = %transfer.receiver, delivered, "transfer complete");
        let record = CompletedTransfer {
            message: id,
            from: transfer.sender,
            to: transfer.receiver,
            delivered,
        };
        self.completed.push(record.clone());
        Ok(record)
    }

    /// Diagnostics report of the router on `host`
    pub fn diagnostics(&mut self, host: HostId) -> Option<RoutingInfo> {
        let strategy = self.strategy(host)?;
        let view = self.node(host);
        Some(strategy.diagnostics(&view))
    }
}

/// [`NodeContext`] for one host of a [`MockWorld`]
pub struct NodeView<'a> {
    world: &'a mut MockWorld,
    host: HostId,
}

impl NodeView<'_> {
    fn local_host(&self) -> Option<&MockHost> {
        self.world.hosts.get(&self.host)
    }
}

impl NodeContext for NodeView<'_> {
    fn local(&self) -> HostId {
        self.host
    }

    fn now(&self) -> SimTime {
        self.world.now
    }

    fn hosts(&self) -> Vec<HostId> {
        self.world.host_ids()
    }

    fn connections(&self) -> Vec<Connection> {
        self.world
            .connections
            .iter()
            .filter(|c| c.involves(self.host))
            .copied()
            .collect()
    }

    fn can_start_transfer(&self) -> bool {
        let has_messages = self.local_host().is_some_and(|h| !h.buffer.is_empty());
        has_messages && self.world.connections.iter().any(|c| c.involves(self.host))
    }

    fn is_transferring(&self, host: HostId) -> bool {
        self.world
            .in_flight
            .iter()
            .any(|t| t.connection.involves(host))
    }

    fn has_message(&self, host: HostId, id: &MessageId) -> bool {
        self.world.hosts.get(&host).is_some_and(|h| h.holds(id))
    }

    fn messages(&self) -> Vec<Message> {
        self.local_host()
            .map(|h| h.buffer.clone())
            .unwrap_or_default()
    }

    fn message_mut(&mut self, id: &MessageId) -> Option<&mut Message> {
        self.world
            .hosts
            .get_mut(&self.host)?
            .buffer
            .iter_mut()
            .find(|m| &m.id == id)
    }

    fn exchange_deliverable(&mut self) -> bool {
        for connection in self.connections() {
            let peer = connection.other(self.host);
            let deliverable: Vec<MessageId> = self
                .messages()
                .into_iter()
                .filter(|m| m.to == peer)
                .map(|m| m.id)
                .collect();
            for id in deliverable {
                if self.start_transfer(&id, &connection).is_started() {
                    return true;
                }
            }
        }
        false
    }

    fn start_transfer(&mut self, id: &MessageId, connection: &Connection) -> TransferStatus {
        if !connection.involves(self.host) {
            return TransferStatus::Denied;
        }
        let receiver = connection.other(self.host);
        if self.is_transferring(self.host) || self.is_transferring(receiver) {
            return TransferStatus::Busy;
        }
        let accepts = self
            .world
            .hosts
            .get(&receiver)
            .is_some_and(|h| h.accepting && !h.holds(id));
        if !accepts {
            return TransferStatus::Denied;
        }
        let Some(message) = self.local_host().and_then(|h| h.buffer.iter().find(|m| &m.id == id)).cloned() else {
            return TransferStatus::Denied;
        };

        trace!(message = %id, from = %self.host, to = %receiver, "transfer started");
        self.world.in_flight.push(InFlight {
            connection: *connection,
            sender: self.host,
            receiver,
            message,
        });
        TransferStatus::Started
    }

    fn radio_range(&self, host: HostId) -> f64 {
        self.world
            .hosts
            .get(&host)
            .map(|h| h.radio_range)
            .unwrap_or(0.0)
    }

    fn position(&self, host: HostId) -> Coord {
        self.world
            .hosts
            .get(&host)
            .map(|h| h.position)
            .unwrap_or_default()
    }

    fn next_waypoint(&self, host: HostId) -> Option<Coord> {
        self.world.hosts.get(&host)?.waypoint
    }

    fn strategy_of(&self, host: HostId) -> Option<Arc<dyn RoutingStrategy>> {
        self.world.strategy(host)
    }
}
