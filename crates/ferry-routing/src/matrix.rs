//! Network-wide encounter counts
//!
//! One [`EncounterMatrix`] is shared by every encounter-utility router of a
//! simulation. `encounters(a, b)` counts contacts credited to `a` with `b`;
//! `total(a)` counts every contact credited to `a`.
//!
//! The matrix is sized to the host population on the first update and
//! indexed by host address.

use std::collections::BTreeMap;
use std::sync::Arc;

use ferry_core::{HostId, RoutingError};
use parking_lot::Mutex;
use tracing::trace;

#[derive(Debug, Default)]
struct MatrixState {
    size: usize,
    counts: Vec<u64>,
    totals: BTreeMap<HostId, u64>,
}

impl MatrixState {
    fn slot(&self, a: HostId, b: HostId) -> Option<usize> {
        let (a, b) = (a.index(), b.index());
        (a < self.size && b < self.size).then_some(a * self.size + b)
    }

    fn check(&self, host: HostId) -> Result<(), RoutingError> {
        if host.index() < self.size {
            Ok(())
        } else {
            Err(RoutingError::HostOutOfRange {
                host,
                population: self.size,
            })
        }
    }

    fn credit(&mut self, a: HostId, b: HostId) {
        if let Some(slot) = self.slot(a, b) {
            self.counts[slot] += 1;
        }
        *self.totals.entry(a).or_insert(0) += 1;
    }
}

/// Shared encounter-count matrix
#[derive(Debug, Default)]
pub struct EncounterMatrix {
    state: Mutex<MatrixState>,
}

impl EncounterMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh matrix ready to hand to every router
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Record a contact reported by `host` with `peer`
    ///
    /// With `same_context` false only the `host -> peer` direction is
    /// credited; the peer credits the other direction when it handles its
    /// own side of the contact. With `same_context` true both directions are
    /// credited at once.
    pub fn record_contact(
        &self,
        host: HostId,
        peer: HostId,
        population: usize,
        same_context: bool,
    ) -> Result<(), RoutingError> {
        let mut state = self.state.lock();
        if state.size == 0 {
            state.size = population;
            state.counts = vec![0; population * population];
        }
        state.check(host)?;
        state.check(peer)?;

        state.totals.entry(host).or_insert(0);
        state.totals.entry(peer).or_insert(0);

        state.credit(host, peer);
        if same_context {
            state.credit(peer, host);
        }
        trace!(host = %host, peer = %peer, same_context, "Encounter recorded");
        Ok(())
    }

    /// Contacts credited to `a` with `b`
    pub fn encounters(&self, a: HostId, b: HostId) -> u64 {
        let state = self.state.lock();
        state.slot(a, b).map_or(0, |slot| state.counts[slot])
    }

    /// Every contact credited to `host`
    pub fn total(&self, host: HostId) -> u64 {
        self.state.lock().totals.get(&host).copied().unwrap_or(0)
    }

    /// Whether `host` has a totals entry
    pub fn is_known(&self, host: HostId) -> bool {
        self.state.lock().totals.contains_key(&host)
    }

    /// Population the matrix was sized to, 0 before the first update
    pub fn population(&self) -> usize {
        self.state.lock().size
    }

    /// Nonzero encounter counts of `host`, ordered by peer
    pub fn row(&self, host: HostId) -> Vec<(HostId, u64)> {
        let state = self.state.lock();
        if host.index() >= state.size {
            return Vec::new();
        }
        let start = host.index() * state.size;
        state.counts[start..start + state.size]
            .iter()
            .enumerate()
            .filter(|(_, n)| **n > 0)
            .filter_map(|(i, n)| u32::try_from(i).ok().map(|i| (HostId(i), *n)))
            .collect()
    }
}
