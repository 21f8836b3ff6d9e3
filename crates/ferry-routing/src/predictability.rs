//! Delivery predictability table
//!
//! Each predictive router keeps, per destination, an estimate `P ∈ [0, 1]`
//! of how likely it is to deliver there.
//!
//! Key concepts:
//! - **Encounter**: meeting B raises `P(B)` by `(1 - P) * P_init`
//! - **Transitivity**: meeting B also raises `P(C)` for every C that B
//!   knows, scaled by `P(B) * P_B(C) * beta`
//! - **Aging**: all entries decay by `gamma^k` where `k` is the number of
//!   (possibly fractional) time units since the last aging
//!
//! Aging is lazy: every read ages the table to the current simulated time
//! first. Two reads at the same instant see identical values.

use std::collections::BTreeMap;

use ferry_core::{HostId, SimTime};
use serde::{Deserialize, Serialize};

use crate::config::ProphetConfig;

/// Per-router delivery predictability table
#[derive(Debug, Clone)]
pub struct PredictabilityTable {
    host: HostId,
    preds: BTreeMap<HostId, f64>,
    last_aged: SimTime,
    initial_probability: f64,
    aging_constant: f64,
    transitivity_constant: f64,
    seconds_in_time_unit: f64,
}

impl PredictabilityTable {
    pub fn new(host: HostId, config: &ProphetConfig) -> Self {
        Self {
            host,
            preds: BTreeMap::new(),
            last_aged: 0.0,
            initial_probability: config.initial_probability,
            aging_constant: config.aging_constant,
            transitivity_constant: config.transitivity_constant,
            seconds_in_time_unit: f64::from(config.seconds_in_time_unit),
        }
    }

    pub fn host(&self) -> HostId {
        self.host
    }

    /// Time the table was last aged to
    pub fn last_aged(&self) -> SimTime {
        self.last_aged
    }

    /// Age every entry to `now`
    pub fn age(&mut self, now: SimTime) {
        let units = (now - self.last_aged) / self.seconds_in_time_unit;
        if units <= 0.0 {
            return;
        }

        let mult = self.aging_constant.powf(units);
        for p in self.preds.values_mut() {
            *p *= mult;
        }
        self.last_aged = now;
    }

    /// Predictability for `destination` at `now`; 0 for unknown destinations
    pub fn get(&mut self, destination: HostId, now: SimTime) -> f64 {
        self.age(now);
        self.preds.get(&destination).copied().unwrap_or(0.0)
    }

    /// Every entry aged to `now`, ordered by host
    pub fn snapshot(&mut self, now: SimTime) -> Vec<(HostId, f64)> {
        self.age(now);
        self.preds.iter().map(|(&h, &p)| (h, p)).collect()
    }

    /// Direct encounter with `peer`
    pub fn encounter(&mut self, peer: HostId, now: SimTime) {
        if peer == self.host {
            return;
        }
        let old = self.get(peer, now);
        self.preds
            .insert(peer, old + (1.0 - old) * self.initial_probability);
    }

    /// Transitive update through `peer`, whose table is `peer_preds`
    ///
    /// The local host's own entry is never written.
    pub fn transitive(&mut self, peer: HostId, peer_preds: &[(HostId, f64)], now: SimTime) {
        let via_peer = self.get(peer, now);
        for &(destination, p_peer) in peer_preds {
            if destination == self.host {
                continue;
            }
            let old = self.preds.get(&destination).copied().unwrap_or(0.0);
            let new = old + (1.0 - old) * via_peer * p_peer * self.transitivity_constant;
            self.preds.insert(destination, new);
        }
    }

    pub fn len(&self) -> usize {
        self.preds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.preds.is_empty()
    }

    /// Summary of the table aged to `now`
    pub fn summary(&mut self, now: SimTime) -> PredictabilitySummary {
        PredictabilitySummary {
            node: self.host,
            at: now,
            predictabilities: self.snapshot(now),
        }
    }
}

/// Snapshot of a predictability table for exchange between nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictabilitySummary {
    /// Node the table belongs to
    pub node: HostId,
    /// Time the values were aged to
    pub at: SimTime,
    /// Destination -> predictability
    pub predictabilities: Vec<(HostId, f64)>,
}

impl PredictabilitySummary {
    /// Compact binary encoding
    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }

    /// Predictability for `destination`, 0 if absent
    pub fn get(&self, destination: HostId) -> f64 {
        self.predictabilities
            .iter()
            .find(|(h, _)| *h == destination)
            .map_or(0.0, |(_, p)| *p)
    }
}
