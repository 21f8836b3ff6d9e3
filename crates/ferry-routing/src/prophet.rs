//! Predictability-gated spraying
//!
//! Each message starts with a replica budget. A message is offered to a
//! peer only while the sender still holds more than one replica and the
//! peer's delivery predictability for the destination beats the sender's.
//! Offers go out best peer first; equal predictabilities fall back to the
//! node's queueing order.

use ferry_core::{
    Connection, ConfigError, HostId, Message, MessageId, NodeContext, PredictabilitySource,
    RoutingError, RoutingInfo, RoutingMetadata, RoutingStrategy, Settings, SimTime, TickOutcome,
};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::candidate::{TransferCandidate, attempt_plain, begin_tick};
use crate::config::{ProphetConfig, RouterSettings};
use crate::predictability::{PredictabilitySummary, PredictabilityTable};

/// Spray-and-wait router steered by delivery predictability
pub struct PredictiveProphetRouter {
    host: HostId,
    config: ProphetConfig,
    settings: RouterSettings,
    table: Mutex<PredictabilityTable>,
}

impl PredictiveProphetRouter {
    pub fn new(host: HostId, config: ProphetConfig, settings: RouterSettings) -> Self {
        Self {
            host,
            table: Mutex::new(PredictabilityTable::new(host, &config)),
            config,
            settings,
        }
    }

    /// Build from the `[ProphetRouter]` and `[Router]` namespaces
    pub fn from_settings(host: HostId, settings: &Settings) -> Result<Self, ConfigError> {
        let config = ProphetConfig::from_settings(settings)?;
        for warning in config.validate() {
            warn!(host = %host, %warning, "Questionable prophet configuration");
        }
        Ok(Self::new(host, config, RouterSettings::from_settings(settings)?))
    }

    pub fn config(&self) -> &ProphetConfig {
        &self.config
    }

    /// Own table aged to `now`, for exchange or inspection
    pub fn summary(&self, now: SimTime) -> PredictabilitySummary {
        self.table.lock().summary(now)
    }

    fn collect_candidates(&self, ctx: &dyn NodeContext) -> Result<Vec<TransferCandidate>, RoutingError> {
        let now = ctx.now();

        // (queue rank, message) for messages that still have replicas to spray
        let mut eligible = Vec::new();
        for (rank, message) in ctx.messages().into_iter().enumerate() {
            let replicas = message.prophet_replicas().inspect_err(|e| {
                warn!(host = %self.host, error = %e, "Foreign message in prophet buffer");
            })?;
            if replicas > 1 {
                eligible.push((rank, message));
            }
        }

        let mut ranked: Vec<(f64, usize, TransferCandidate)> = Vec::new();
        for connection in ctx.connections() {
            let peer = connection.other(self.host);
            if ctx.is_transferring(peer) {
                trace!(host = %self.host, peer = %peer, "Peer busy, skipping");
                continue;
            }
            let Some(peer_router) = ctx.strategy_of(peer) else {
                continue;
            };
            let Some(source) = peer_router.predictability_source() else {
                trace!(host = %self.host, peer = %peer, "Peer keeps no predictability");
                continue;
            };

            for (rank, message) in &eligible {
                if ctx.has_message(peer, &message.id) {
                    continue;
                }
                let theirs = source.predictability_for(message.to, now);
                let ours = self.predictability_for(message.to, now);
                if theirs > ours {
                    ranked.push((
                        theirs,
                        *rank,
                        TransferCandidate::new(message.id.clone(), connection, self.host),
                    ));
                } else {
                    trace!(peer = %peer, message = %message.id, theirs, ours, "Peer not better");
                }
            }
        }

        // Stable: equal keys keep enumeration order
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        Ok(ranked.into_iter().map(|(_, _, c)| c).collect())
    }
}

impl PredictabilitySource for PredictiveProphetRouter {
    fn predictability_for(&self, destination: HostId, now: SimTime) -> f64 {
        self.table.lock().get(destination, now)
    }

    fn predictabilities(&self, now: SimTime) -> Vec<(HostId, f64)> {
        self.table.lock().snapshot(now)
    }
}

impl RoutingStrategy for PredictiveProphetRouter {
    fn name(&self) -> &'static str {
        "prophet"
    }

    fn host(&self) -> HostId {
        self.host
    }

    fn on_contact_up(&self, ctx: &dyn NodeContext, peer: HostId) -> Result<(), RoutingError> {
        let now = ctx.now();
        // Read the peer before locking our own table; the peer may be us
        let peer_preds = ctx.strategy_of(peer).and_then(|router| {
            router
                .predictability_source()
                .map(|source| source.predictabilities(now))
        });

        let mut table = self.table.lock();
        table.encounter(peer, now);
        match peer_preds {
            Some(preds) => table.transitive(peer, &preds, now),
            None => debug!(host = %self.host, peer = %peer, "Peer offers no predictability, transitive step skipped"),
        }
        debug!(host = %self.host, peer = %peer, p = table.get(peer, now), "Contact up");
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
        message.metadata = RoutingMetadata::Prophet {
            replicas: self.config.nrof_copies,
        };
        message
    }

    fn on_message_received(&self, mut message: Message, from: HostId) -> Result<Message, RoutingError> {
        let replicas = message.prophet_replicas()?;
        let kept = if self.config.binary_mode {
            replicas.div_ceil(2)
        } else {
            1
        };
        message.set_prophet_replicas(kept)?;
        debug!(host = %self.host, from = %from, message = %message.id, replicas = kept, "Received");
        Ok(message)
    }

    fn on_transfer_done(
        &self,
        ctx: &mut dyn NodeContext,
        connection: &Connection,
        id: &MessageId,
    ) -> Result<(), RoutingError> {
        let Some(message) = ctx.message_mut(id) else {
            return Ok(());
        };
        let replicas = message.prophet_replicas()?;
        let left = if self.config.binary_mode {
            replicas / 2
        } else {
            replicas.saturating_sub(1)
        };
        message.set_prophet_replicas(left)?;
        debug!(host = %self.host, peer = %connection.other(self.host), message = %id, replicas = left, "Transfer done");
        Ok(())
    }

    fn diagnostics(&self, ctx: &dyn NodeContext) -> RoutingInfo {
        let preds = self.predictabilities(ctx.now());
        let mut table = RoutingInfo::new(format!("{} delivery prediction(s)", preds.len()));
        for (host, p) in preds {
            table.add_more_info(RoutingInfo::new(format!("{host} : {p:.6}")));
        }

        RoutingInfo::new(format!("{} @ {}", self.name(), self.host))
            .with(RoutingInfo::new(format!("{} message(s)", ctx.messages().len())))
            .with(table)
    }

    fn predictability_source(&self) -> Option<&dyn PredictabilitySource> {
        Some(self)
    }
}
