//! Strategy selection

use std::str::FromStr;
use std::sync::Arc;

use ferry_core::{ConfigError, HostId, RoutingStrategy, Settings};

use crate::geometric::GeometricReplicationRouter;
use crate::matrix::EncounterMatrix;
use crate::prophet::PredictiveProphetRouter;
use crate::utility::EncounterUtilityRouter;

/// The available forwarding strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// Geometry-driven replication
    Geometric,
    /// Predictability-gated spraying
    Prophet,
    /// Encounter-utility forwarding
    Encounter,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [
        StrategyKind::Geometric,
        StrategyKind::Prophet,
        StrategyKind::Encounter,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::Geometric => "geometric",
            StrategyKind::Prophet => "prophet",
            StrategyKind::Encounter => "encounter",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown strategy '{s}' (expected geometric, prophet or encounter)"))
    }
}

/// Build the router of `kind` for `host`
///
/// Every encounter-utility router of one simulation must share `matrix`.
pub fn build_strategy(
    kind: StrategyKind,
    host: HostId,
    settings: &Settings,
    matrix: &Arc<EncounterMatrix>,
) -> Result<Arc<dyn RoutingStrategy>, ConfigError> {
    let router: Arc<dyn RoutingStrategy> = match kind {
        StrategyKind::Geometric => Arc::new(GeometricReplicationRouter::from_settings(host, settings)?),
        StrategyKind::Prophet => Arc::new(PredictiveProphetRouter::from_settings(host, settings)?),
        StrategyKind::Encounter => Arc::new(EncounterUtilityRouter::from_settings(
            host,
            settings,
            Arc::clone(matrix),
        )?),
    };
    Ok(router)
}
