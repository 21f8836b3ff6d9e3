//! # Ferry Core
//!
//! Core traits, types, and errors for the Ferry forwarding strategies.
//!
//! Ferry routers make local forwarding decisions for an opportunistic
//! (delay-tolerant) network: nodes meet during short pairwise radio
//! contacts and every node decides on its own which messages to hand to
//! the peer it just met. This crate holds everything the routers share
//! with the surrounding simulator.
//!
//! ## Key Traits
//!
//! - [`NodeContext`]: What a router may ask of (and do to) the node it runs on
//! - [`RoutingStrategy`]: The contract every forwarding strategy implements
//! - [`PredictabilitySource`]: Capability for peers exposing delivery predictability
//!
//! ## Key Types
//!
//! - [`HostId`]: Address of a host in the network
//! - [`Message`]: A carried message with typed [`RoutingMetadata`]
//! - [`Connection`]: A live contact between two hosts
//! - [`Settings`]: Namespaced configuration loaded from TOML
//! - [`RoutingInfo`]: Nested diagnostics report
//! - [`MockWorld`]: In-memory node context for tests and demos

pub mod context;
pub mod error;
pub mod geometry;
pub mod identity;
pub mod info;
pub mod message;
pub mod mock_world;
pub mod settings;
pub mod traits;

// Re-export main types
pub use context::*;
pub use error::*;
pub use geometry::*;
pub use identity::*;
pub use info::*;
pub use message::*;
pub use mock_world::*;
pub use settings::*;
pub use traits::*;
