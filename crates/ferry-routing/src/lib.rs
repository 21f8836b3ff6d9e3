//! # Ferry Routing
//!
//! Forwarding strategies for opportunistic networks.
//!
//! Every strategy implements [`RoutingStrategy`](ferry_core::RoutingStrategy)
//! and is driven once per tick by the node it runs on. A tick first tries
//! to hand messages straight to their destination; only when that starts
//! nothing does the strategy build its own candidates.
//!
//! ## Strategies
//!
//! - [`GeometricReplicationRouter`]: Picks a transfer scheme (FULL, HALVE,
//!   SINGLE, NONE) from the geometry of sender, peer, and destination
//! - [`PredictiveProphetRouter`]: Sprays a limited number of replicas to
//!   peers with higher delivery predictability
//! - [`EncounterUtilityRouter`]: Forwards to peers whose encounter history
//!   with the destination outweighs their distance from it
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ferry_core::{HostId, Settings};
//! use ferry_routing::{EncounterMatrix, StrategyKind, build_strategy};
//!
//! let settings = Settings::from_file("ferry.toml")?;
//! let matrix = EncounterMatrix::shared();
//! let router = build_strategy(StrategyKind::Prophet, HostId(0), &settings, &matrix)?;
//! ```
//!
//! ## Architecture
//!
//! - [`config`]: Typed configuration read from [`Settings`](ferry_core::Settings)
//! - [`candidate`]: Shared tick pre-step and the ordered attempt loop
//! - [`geometric`]: Transfer-scheme geometry and the geometric router
//! - [`predictability`]: Lazily aged delivery-predictability table
//! - [`prophet`]: Predictability-gated spray router
//! - [`matrix`]: Network-wide encounter counts
//! - [`utility`]: Encounter utility ("gamma") and its router
//! - [`strategy`]: Strategy selection and construction

pub mod candidate;
pub mod config;
pub mod geometric;
pub mod matrix;
pub mod predictability;
pub mod prophet;
pub mod strategy;
pub mod utility;

// Re-export main types
pub use candidate::TransferCandidate;
pub use config::{
    ConfigWarning, EncounterConfig, GeometricConfig, ProphetConfig, RouterSettings,
};
pub use geometric::{GeometricReplicationRouter, select_scheme};
pub use matrix::EncounterMatrix;
pub use predictability::{PredictabilitySummary, PredictabilityTable};
pub use prophet::PredictiveProphetRouter;
pub use strategy::{StrategyKind, build_strategy};
pub use utility::{EncounterUtilityRouter, encounter_gamma};
