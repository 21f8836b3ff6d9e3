//! Run statistics

use std::collections::HashMap;
use std::fmt;

use ferry_core::{CompletedTransfer, MessageId};

/// Counters collected over one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimStats {
    /// Strategy the run used
    pub strategy: String,
    pub messages_created: u64,
    pub messages_delivered: u64,
    /// Every completed transfer, final hops included
    pub messages_relayed: u64,
    pub messages_expired: u64,
    /// Transfers cancelled by a contact going down
    pub transfers_aborted: u64,
    /// Total delivery latency in seconds
    pub total_latency: f64,
    created_at: HashMap<MessageId, f64>,
}

impl SimStats {
    pub fn new(strategy: impl Into<String>) -> Self {
        Self {
            strategy: strategy.into(),
            ..Default::default()
        }
    }

    pub fn record_created(&mut self, id: MessageId, at: f64) {
        self.messages_created += 1;
        self.created_at.insert(id, at);
    }

    /// Count a completed transfer; the first delivery of a message sets its latency
    pub fn record_transfer(&mut self, transfer: &CompletedTransfer, now: f64) {
        self.messages_relayed += 1;
        if !transfer.delivered {
            return;
        }
        if let Some(created) = self.created_at.remove(&transfer.message) {
            self.messages_delivered += 1;
            self.total_latency += now - created;
        }
    }

    /// Share of created messages that reached their destination
    pub fn delivery_ratio(&self) -> f64 {
        if self.messages_created == 0 {
            return 0.0;
        }
        self.messages_delivered as f64 / self.messages_created as f64
    }

    /// Relays spent per delivered message beyond the delivering hop
    ///
    /// `None` while nothing was delivered.
    pub fn overhead_ratio(&self) -> Option<f64> {
        if self.messages_delivered == 0 {
            return None;
        }
        let delivered = self.messages_delivered as f64;
        Some((self.messages_relayed as f64 - delivered) / delivered)
    }

    pub fn average_latency(&self) -> Option<f64> {
        (self.messages_delivered > 0).then(|| self.total_latency / self.messages_delivered as f64)
    }
}

impl fmt::Display for SimStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== {} ===", self.strategy)?;
        writeln!(f, "  created:        {}", self.messages_created)?;
        writeln!(
            f,
            "  delivered:      {} ({:.1}%)",
            self.messages_delivered,
            self.delivery_ratio() * 100.0
        )?;
        writeln!(f, "  relayed:        {}", self.messages_relayed)?;
        writeln!(f, "  expired:        {}", self.messages_expired)?;
        writeln!(f, "  aborted:        {}", self.transfers_aborted)?;
        match self.overhead_ratio() {
            Some(ratio) => writeln!(f, "  overhead ratio: {ratio:.3}")?,
            None => writeln!(f, "  overhead ratio: n/a")?,
        }
        match self.average_latency() {
            Some(latency) => write!(f, "  avg latency:    {latency:.1}s"),
            None => write!(f, "  avg latency:    n/a"),
        }
    }
}
