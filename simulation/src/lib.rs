//! # Ferry Simulation
//!
//! A small driver for the Ferry forwarding strategies. Hosts wander a
//! square field under random-waypoint mobility, meet whenever they come
//! within radio range, and hand messages to each other according to one
//! chosen strategy.
//!
//! ## Architecture
//!
//! - **Mobility** (`mobility.rs`): Random-waypoint movement on a square field
//! - **Scenario** (`scenario.rs`): World setup and the per-tick loop
//! - **Stats** (`stats.rs`): Created/delivered/relayed counters and overhead
//!
//! ## Example
//!
//! ```rust,ignore
//! use ferry_routing::StrategyKind;
//! use ferry_sim::{Scenario, ScenarioConfig, default_settings};
//!
//! let config = ScenarioConfig {
//!     strategy: StrategyKind::Prophet,
//!     ..Default::default()
//! };
//! let mut scenario = Scenario::new(config, &default_settings())?;
//! let stats = scenario.run()?;
//! println!("{stats}");
//! ```

pub mod mobility;
pub mod scenario;
pub mod stats;

// Re-export main types
pub use mobility::RandomWaypoint;
pub use scenario::{Scenario, ScenarioConfig, default_settings, fill_defaults};
pub use stats::SimStats;
