//! Encounter utility forwarding
//!
//! A peer is a good next hop for a message when it has met the destination
//! often relative to how far away it is:
//!
//! - `alpha(n) = encounters(dest, n) / total(dest)`, 0 while the destination
//!   has no encounters
//! - `beta(n) = distance(n, dest) / Σ distance(h, dest)` over every host
//! - `gamma(n) = alpha(n) / beta(n)`
//!
//! Peers with `gamma` above the threshold receive a copy. There is no
//! replica budget.

use std::collections::HashSet;
use std::sync::Arc;

use ferry_core::{
    Connection, ConfigError, HostId, Message, MessageId, NodeContext, RoutingError, RoutingInfo,
    RoutingMetadata, RoutingStrategy, Settings, TickOutcome, same_routing_context,
};
use tracing::{debug, trace, warn};

use crate::candidate::{TransferCandidate, attempt_plain, begin_tick};
use crate::config::{EncounterConfig, RouterSettings};
use crate::matrix::EncounterMatrix;

/// Share of the destination's encounters that were with `node`
pub fn encounter_alpha(matrix: &EncounterMatrix, destination: HostId, node: HostId) -> f64 {
    let total = matrix.total(destination);
    if total == 0 {
        return 0.0;
    }
    matrix.encounters(destination, node) as f64 / total as f64
}

/// Distance of `node` from `destination`, normalised over every host
///
/// `None` when every host sits on the destination.
pub fn distance_beta(ctx: &dyn NodeContext, node: HostId, destination: HostId) -> Option<f64> {
    let target = ctx.position(destination);
    let sum: f64 = ctx
        .hosts()
        .into_iter()
        .map(|h| ctx.position(h).distance(&target))
        .sum();
    if sum == 0.0 {
        return None;
    }
    Some(ctx.position(node).distance(&target) / sum)
}

/// Utility of `node` as a next hop toward `destination`, if defined
pub fn encounter_gamma(
    ctx: &dyn NodeContext,
    matrix: &EncounterMatrix,
    node: HostId,
    destination: HostId,
) -> Option<f64> {
    let beta = distance_beta(ctx, node, destination)?;
    let gamma = encounter_alpha(matrix, destination, node) / beta;
    (!gamma.is_nan()).then_some(gamma)
}

/// Forwards to peers whose encounter utility passes a threshold
pub struct EncounterUtilityRouter {
    host: HostId,
    config: EncounterConfig,
    settings: RouterSettings,
    matrix: Arc<EncounterMatrix>,
}

impl EncounterUtilityRouter {
    pub fn new(
        host: HostId,
        config: EncounterConfig,
        settings: RouterSettings,
        matrix: Arc<EncounterMatrix>,
    ) -> Self {
        Self {
            host,
            config,
            settings,
            matrix,
        }
    }

    /// Build from the `[EncounterRouter]` and `[Router]` namespaces
    pub fn from_settings(
        host: HostId,
        settings: &Settings,
        matrix: Arc<EncounterMatrix>,
    ) -> Result<Self, ConfigError> {
        let config = EncounterConfig::from_settings(settings)?;
        for warning in config.validate() {
            warn!(host = %host, %warning, "Questionable encounter configuration");
        }
        Ok(Self::new(host, config, RouterSettings::from_settings(settings)?, matrix))
    }

    pub fn matrix(&self) -> &Arc<EncounterMatrix> {
        &self.matrix
    }

    fn collect_candidates(&self, ctx: &dyn NodeContext) -> Result<Vec<TransferCandidate>, RoutingError> {
        let messages = ctx.messages();
        for message in &messages {
            message.expect_encounter().inspect_err(|e| {
                warn!(host = %ctx.local(), error = %e, "Foreign message in encounter buffer");
            })?;
        }

        let local = ctx.local();
        let connections = ctx.connections();
        let mut candidates = Vec::new();
        for message in &messages {
            let mut good_hops = HashSet::new();
            for connection in &connections {
                let peer = connection.other(local);
                match encounter_gamma(ctx, &self.matrix, peer, message.to) {
                    Some(gamma) if gamma > self.config.threshold => {
                        good_hops.insert(peer);
                    }
                    Some(gamma) => {
                        trace!(peer = %peer, message = %message.id, gamma, "Below threshold");
                    }
                    None => {
                        debug!(peer = %peer, message = %message.id, "Utility undefined, peer excluded");
                    }
                }
            }

            for connection in &connections {
                let peer = connection.other(local);
                if !good_hops.contains(&peer)
                    || ctx.is_transferring(peer)
                    || ctx.has_message(peer, &message.id)
                {
                    continue;
                }
                candidates.push(TransferCandidate::new(message.id.clone(), *connection, local));
            }
        }
        Ok(candidates)
    }
}

impl RoutingStrategy for EncounterUtilityRouter {
    fn name(&self) -> &'static str {
        "encounter"
    }

    fn host(&self) -> HostId {
        self.host
    }

    fn on_contact_up(&self, ctx: &dyn NodeContext, peer: HostId) -> Result<(), RoutingError> {
        let local = ctx.local();
        let same_context = ctx
            .strategy_of(peer)
            .is_some_and(|other| same_routing_context(self, other.as_ref()));
        self.matrix
            .record_contact(local, peer, ctx.hosts().len(), same_context)?;
        debug!(host = %local, peer = %peer, same_context, "Contact up");
        Ok(())
    }

    fn on_tick(&self, ctx: &mut dyn NodeContext) -> Result<TickOutcome, RoutingError> {
        if let Some(outcome) = begin_tick(ctx) {
            return Ok(outcome);
        }
        let candidates = self.collect_candidates(&*ctx)?;
        attempt_plain(ctx, &candidates)
    }

    fn on_message_created(&self, message: Message) -> Message {
        let mut message = self.settings.stamp(message);
        message.metadata = RoutingMetadata::Encounter;
        message
    }

    fn on_message_received(&self, message: Message, _from: HostId) -> Result<Message, RoutingError> {
        message.expect_encounter()?;
        Ok(message)
    }

    fn on_transfer_done(
        &self,
        ctx: &mut dyn NodeContext,
        _connection: &Connection,
        id: &MessageId,
    ) -> Result<(), RoutingError> {
        match ctx.message_mut(id) {
            Some(message) => message.expect_encounter(),
            None => Ok(()),
        }
    }

    fn diagnostics(&self, ctx: &dyn NodeContext) -> RoutingInfo {
        let local = ctx.local();
        let mut encounters = RoutingInfo::new(format!(
            "{} encounter(s) in total",
            self.matrix.total(local)
        ));
        for (peer, count) in self.matrix.row(local) {
            encounters.add_more_info(RoutingInfo::new(format!("{peer} : {count}")));
        }

        RoutingInfo::new(format!("{} @ {}", self.name(), local))
            .with(RoutingInfo::new(format!("{} message(s)", ctx.messages().len())))
            .with(encounters)
    }
}
