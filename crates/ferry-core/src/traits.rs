//! Core traits for Ferry
//!
//! ## Key Traits
//!
//! - [`RoutingStrategy`]: Forwarding decisions made once per tick per node
//! - [`PredictabilitySource`]: Narrow capability for exchanging delivery predictability

use crate::context::{Connection, NodeContext};
use crate::error::RoutingError;
use crate::identity::HostId;
use crate::info::RoutingInfo;
use crate::message::{Message, MessageId, SimTime, TransferScheme};

/// What a tick ended with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing to do: no messages, no connections, or already transferring
    Idle,
    /// A final-hop delivery was started by the shared pre-step
    DirectDelivery,
    /// A strategy-selected transfer was started
    Started {
        message: MessageId,
        peer: HostId,
        scheme: Option<TransferScheme>,
    },
    /// Every candidate was refused (possibly zero candidates)
    Exhausted { attempted: usize },
}

impl TickOutcome {
    /// Whether any transfer was started this tick
    pub fn started_transfer(&self) -> bool {
        matches!(
            self,
            TickOutcome::DirectDelivery | TickOutcome::Started { .. }
        )
    }
}

/// A forwarding strategy
///
/// All methods take `&self`: a router's mutable state lives behind its own
/// locks, so peers can read each other's tables during a contact.
pub trait RoutingStrategy: Send + Sync {
    /// Strategy name for logs and reports
    fn name(&self) -> &'static str;

    /// The host this router runs on
    fn host(&self) -> HostId;

    /// A connection to `peer` came up
    fn on_contact_up(&self, ctx: &dyn NodeContext, peer: HostId) -> Result<(), RoutingError>;

    /// A connection to `peer` went down; any transfer on it is cancelled
    fn on_contact_down(&self, _ctx: &dyn NodeContext, _peer: HostId) {}

    /// Run one decision round
    fn on_tick(&self, ctx: &mut dyn NodeContext) -> Result<TickOutcome, RoutingError>;

    /// Attach this strategy's metadata to a freshly created message
    fn on_message_created(&self, message: Message) -> Message;

    /// Adjust the receiver's copy of a message after a completed transfer
    fn on_message_received(&self, message: Message, from: HostId) -> Result<Message, RoutingError>;

    /// Adjust the sender's copy after the transfer of `id` over `connection` completed
    fn on_transfer_done(
        &self,
        ctx: &mut dyn NodeContext,
        connection: &Connection,
        id: &MessageId,
    ) -> Result<(), RoutingError>;

    /// Nested report of the router's state
    fn diagnostics(&self, ctx: &dyn NodeContext) -> RoutingInfo;

    /// Delivery predictability exposed to peers, if this strategy keeps any
    fn predictability_source(&self) -> Option<&dyn PredictabilitySource> {
        None
    }
}

/// Delivery predictability as seen by peers
pub trait PredictabilitySource: Send + Sync {
    /// Predictability for reaching `destination`, aged to `now`
    fn predictability_for(&self, destination: HostId, now: SimTime) -> f64;

    /// Every known destination with its predictability, aged to `now`
    fn predictabilities(&self, now: SimTime) -> Vec<(HostId, f64)>;
}

/// Whether two routers share one routing context
///
/// Compares router *instances*, not hosts: two distinct router objects are
/// always distinct contexts even when they run the same strategy.
pub fn same_routing_context(a: &dyn RoutingStrategy, b: &dyn RoutingStrategy) -> bool {
    std::ptr::addr_eq(a as *const dyn RoutingStrategy, b as *const dyn RoutingStrategy)
}
