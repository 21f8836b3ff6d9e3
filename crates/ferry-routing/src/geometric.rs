//! Geometric replication
//!
//! A message travels toward its destination in replicas. On every contact
//! the sender compares its own heading with the peer's:
//!
//! - **theta**: half-angle under which the destination's radio disc is seen,
//!   `atan(range / distance)`
//! - **alpha**: angle between the node's heading (toward its next waypoint)
//!   and the direction of the destination; undefined for a node with no
//!   planned movement
//! - **score**: `(theta - alpha) / theta`, or `-inf` when alpha is undefined
//!
//! From these the sender picks a [`TransferScheme`]:
//!
//! | condition                              | scheme |
//! |----------------------------------------|--------|
//! | peer inside the destination's range    | FULL   |
//! | peer scores higher than the sender     | HALVE  |
//! | peer's alpha below `3 * theta`         | SINGLE |
//! | otherwise                              | NONE   |

use ferry_core::{
    Connection, ConfigError, HostId, Message, MessageId, NodeContext, RoutingError,
    RoutingInfo, RoutingMetadata, RoutingStrategy, Settings, TickOutcome, TransferScheme,
};
use tracing::{debug, trace, warn};

use crate::candidate::{TransferCandidate, attempt_in_order, begin_tick};
use crate::config::{GeometricConfig, RouterSettings};

/// How a node is oriented with respect to a destination
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bearing {
    pub theta: f64,
    pub alpha: Option<f64>,
}

impl Bearing {
    /// Bearing of `node` toward `destination`
    pub fn of(ctx: &dyn NodeContext, node: HostId, destination: HostId) -> Self {
        let here = ctx.position(node);
        let target = ctx.position(destination);

        let theta = (ctx.radio_range(destination) / here.distance(&target)).atan();
        let alpha = ctx.next_waypoint(node).and_then(|waypoint| {
            let alpha = (here.slope_to(&waypoint).atan() - here.slope_to(&target).atan()).abs();
            (!alpha.is_nan()).then_some(alpha)
        });

        Self { theta, alpha }
    }

    pub fn score(&self) -> f64 {
        match self.alpha {
            Some(alpha) => (self.theta - alpha) / self.theta,
            None => f64::NEG_INFINITY,
        }
    }
}

/// Scheme for handing a message to a peer, given both bearings
pub fn decide(peer_in_range: bool, local: Bearing, peer: Bearing) -> TransferScheme {
    if peer_in_range {
        return TransferScheme::Full;
    }
    if peer.score() > local.score() {
        return TransferScheme::Halve;
    }
    match peer.alpha {
        Some(alpha) if alpha < 3.0 * peer.theta => TransferScheme::Single,
        _ => TransferScheme::NoTransfer,
    }
}

/// Scheme for handing a message bound to `destination` from `local` to `peer`
pub fn select_scheme(
    ctx: &dyn NodeContext,
    local: HostId,
    peer: HostId,
    destination: HostId,
) -> TransferScheme {
    let peer_distance = ctx.position(peer).distance(&ctx.position(destination));
    if peer_distance < ctx.radio_range(destination) {
        return TransferScheme::Full;
    }
    decide(
        false,
        Bearing::of(ctx, local, destination),
        Bearing::of(ctx, peer, destination),
    )
}

/// Replicas the receiver holds after a transfer under `scheme`
pub fn receiver_share(replicas: u32, scheme: Option<TransferScheme>) -> u32 {
    match scheme {
        Some(TransferScheme::Halve) => replicas.div_ceil(2),
        Some(TransferScheme::Full) => replicas,
        Some(TransferScheme::Single) | Some(TransferScheme::NoTransfer) | None => 1,
    }
}

/// Replicas the sender keeps after a transfer under `scheme`
pub fn sender_share(replicas: u32, scheme: Option<TransferScheme>) -> u32 {
    match scheme {
        Some(TransferScheme::Halve) => replicas / 2,
        Some(TransferScheme::Full) => 0,
        Some(TransferScheme::Single) => replicas.saturating_sub(1),
        Some(TransferScheme::NoTransfer) | None => replicas,
    }
}

/// Replicates messages according to sender/peer/destination geometry
pub struct GeometricReplicationRouter {
    host: HostId,
    config: GeometricConfig,
    settings: RouterSettings,
}

impl GeometricReplicationRouter {
    pub fn new(host: HostId, config: GeometricConfig, settings: RouterSettings) -> Self {
        Self {
            host,
            config,
            settings,
        }
    }

    /// Build from the `[GeometricRouter]` and `[Router]` namespaces
    pub fn from_settings(host: HostId, settings: &Settings) -> Result<Self, ConfigError> {
        let config = GeometricConfig::from_settings(settings)?;
        for warning in config.validate() {
            warn!(host = %host, %warning, "Questionable geometric configuration");
        }
        Ok(Self::new(host, config, RouterSettings::from_settings(settings)?))
    }

    pub fn config(&self) -> &GeometricConfig {
        &self.config
    }

    fn collect_candidates(&self, ctx: &dyn NodeContext) -> Result<Vec<TransferCandidate>, RoutingError> {
        let messages = ctx.messages();
        let mut budgets = Vec::with_capacity(messages.len());
        for message in &messages {
            let (replicas, _) = message.geometric().inspect_err(|e| {
                warn!(host = %self.host, error = %e, "Foreign message in geometric buffer");
            })?;
            budgets.push(replicas);
        }

        let mut candidates = Vec::new();
        for connection in ctx.connections() {
            let peer = connection.other(self.host);
            if ctx.is_transferring(peer) {
                trace!(host = %self.host, peer = %peer, "Peer busy, skipping");
                continue;
            }

            for (message, &replicas) in messages.iter().zip(&budgets) {
                if ctx.has_message(peer, &message.id) {
                    continue;
                }
                let scheme = select_scheme(ctx, self.host, peer, message.to);
                if !scheme.is_transfer() {
                    trace!(peer = %peer, message = %message.id, "No transfer scheme");
                    continue;
                }
                if replicas == 0 && scheme != TransferScheme::Full {
                    trace!(peer = %peer, message = %message.id, scheme = ?scheme, "Replica budget spent");
                    continue;
                }
                candidates.push(
                    TransferCandidate::new(message.id.clone(), connection, self.host).with_scheme(scheme),
                );
            }
        }
        Ok(candidates)
    }
}

/// Drop schemes left on messages whose transfer was cancelled
///
/// Does nothing while the node has a transfer in flight.
fn clear_stale_schemes(ctx: &mut dyn NodeContext) -> Result<(), RoutingError> {
    if ctx.is_transferring(ctx.local()) {
        return Ok(());
    }
    for message in ctx.messages() {
        if let Ok((_, Some(scheme))) = message.geometric() {
            debug!(host = %ctx.local(), message = %message.id, scheme = ?scheme, "Clearing stale scheme");
            mark_scheme(ctx, &message.id, None)?;
        }
    }
    Ok(())
}

fn mark_scheme(
    ctx: &mut dyn NodeContext,
    id: &MessageId,
    scheme: Option<TransferScheme>,
) -> Result<(), RoutingError> {
    match ctx.message_mut(id) {
        Some(message) => message.set_pending_scheme(scheme),
        None => Ok(()),
    }
}

impl RoutingStrategy for GeometricReplicationRouter {
    fn name(&self) -> &'static str {
        "geometric"
    }

    fn host(&self) -> HostId {
        self.host
    }

    fn on_contact_up(&self, _ctx: &dyn NodeContext, _peer: HostId) -> Result<(), RoutingError> {
        Ok(())
    }

    fn on_tick(&self, ctx: &mut dyn NodeContext) -> Result<TickOutcome, RoutingError> {
        clear_stale_schemes(ctx)?;
        if let Some(outcome) = begin_tick(ctx) {
            return Ok(outcome);
        }

        let candidates = self.collect_candidates(&*ctx)?;
        attempt_in_order(
            ctx,
            &candidates,
            |ctx, c| mark_scheme(ctx, &c.message, c.scheme),
            |ctx, c| mark_scheme(ctx, &c.message, None),
        )
    }

    fn on_message_created(&self, message: Message) -> Message {
        let mut message = self.settings.stamp(message);
        message.metadata = RoutingMetadata::Geometric {
            replicas: self.config.nrof_copies,
            pending_scheme: None,
        };
        message
    }

    fn on_message_received(&self, mut message: Message, from: HostId) -> Result<Message, RoutingError> {
        let (replicas, scheme) = message.geometric()?;
        let kept = receiver_share(replicas, scheme);
        message.set_geometric(kept, None)?;
        debug!(host = %self.host, from = %from, message = %message.id, scheme = ?scheme, replicas = kept, "Received");
        Ok(message)
    }

    fn on_transfer_done(
        &self,
        ctx: &mut dyn NodeContext,
        connection: &Connection,
        id: &MessageId,
    ) -> Result<(), RoutingError> {
        // Dropped from the buffer after the transfer started
        let Some(message) = ctx.message_mut(id) else {
            return Ok(());
        };
        let (replicas, scheme) = message.geometric()?;
        let left = sender_share(replicas, scheme);
        message.set_geometric(left, None)?;
        debug!(host = %self.host, peer = %connection.other(self.host), message = %id, scheme = ?scheme, replicas = left, "Transfer done");
        Ok(())
    }

    fn diagnostics(&self, ctx: &dyn NodeContext) -> RoutingInfo {
        let messages = ctx.messages();
        let mut carried = RoutingInfo::new(format!("{} message(s)", messages.len()));
        for message in &messages {
            let budget = message
                .metadata
                .replicas()
                .map_or_else(|| "?".to_string(), |n| n.to_string());
            carried.add_more_info(RoutingInfo::new(format!(
                "{} -> {} : {} replica(s)",
                message.id, message.to, budget
            )));
        }

        RoutingInfo::new(format!("{} @ {}", self.name(), self.host))
            .with(RoutingInfo::new(format!("nrof_copies : {}", self.config.nrof_copies)))
            .with(carried)
    }
}
