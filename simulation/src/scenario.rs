//! Scenario setup and the simulation loop
//!
//! One step of a scenario:
//!
//! 1. Hosts move for `tick_seconds`
//! 2. Contacts are refreshed from radio range; a contact going down
//!    aborts the transfer on it
//! 3. Transfers started on the previous tick complete
//! 4. Expired messages are dropped
//! 5. A new message is created every `message_interval` ticks
//! 6. Every router runs one decision round

use std::sync::Arc;

use ferry_core::{
    ConfigError, Coord, FerryResult, HostId, Message, MockWorld, RoutingInfo, Settings,
};
use ferry_routing::config::{GEOMETRIC_NS, PROPHET_NS};
use ferry_routing::{EncounterMatrix, StrategyKind, build_strategy};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::mobility::RandomWaypoint;
use crate::stats::SimStats;

/// Scenario parameters
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    pub strategy: StrategyKind,
    pub hosts: u32,
    pub ticks: u64,
    /// Simulated seconds per tick
    pub tick_seconds: f64,
    /// Side length of the square field
    pub field_size: f64,
    pub radio_range: f64,
    pub min_speed: f64,
    pub max_speed: f64,
    /// Ticks between message creations; 0 disables traffic
    pub message_interval: u64,
    pub message_size: u64,
    pub seed: u64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Prophet,
            hosts: 40,
            ticks: 3_600,
            tick_seconds: 1.0,
            field_size: 1_000.0,
            radio_range: 50.0,
            min_speed: 0.5,
            max_speed: 1.5,
            message_interval: 30,
            message_size: 1_024,
            seed: 0,
        }
    }
}

/// Settings every router can start from
pub fn default_settings() -> Settings {
    let mut settings = Settings::new();
    fill_defaults(&mut settings);
    settings
}

/// Fill in the required router keys a loaded configuration left out
pub fn fill_defaults(settings: &mut Settings) {
    let defaults: [(&str, &str, toml::Value); 4] = [
        (GEOMETRIC_NS, "nrof_copies", 8i64.into()),
        (PROPHET_NS, "seconds_in_time_unit", 30i64.into()),
        (PROPHET_NS, "nrof_copies", 6i64.into()),
        (PROPHET_NS, "binary_mode", true.into()),
    ];
    for (namespace, key, value) in defaults {
        if !settings.contains(namespace, key) {
            settings.set(namespace, key, value);
        }
    }
}

/// A running simulation of one strategy
pub struct Scenario {
    config: ScenarioConfig,
    world: MockWorld,
    mobility: RandomWaypoint,
    traffic: StdRng,
    matrix: Arc<EncounterMatrix>,
    stats: SimStats,
    tick: u64,
}

impl Scenario {
    /// Build the world, place the hosts, and attach one router per host
    pub fn new(config: ScenarioConfig, settings: &Settings) -> Result<Self, ConfigError> {
        let mut world = MockWorld::new();
        for i in 0..config.hosts {
            world.add_host(HostId(i), Coord::default(), config.radio_range);
        }

        let matrix = EncounterMatrix::shared();
        for host in world.host_ids() {
            world.register(build_strategy(config.strategy, host, settings, &matrix)?);
        }

        let mut mobility = RandomWaypoint::new(
            config.field_size,
            config.min_speed,
            config.max_speed,
            config.seed,
        );
        mobility.place(&mut world);

        info!(
            strategy = %config.strategy,
            hosts = config.hosts,
            field = config.field_size,
            range = config.radio_range,
            "Scenario ready"
        );

        Ok(Self {
            traffic: StdRng::seed_from_u64(config.seed.wrapping_add(1)),
            stats: SimStats::new(config.strategy.name()),
            config,
            world,
            mobility,
            matrix,
            tick: 0,
        })
    }

    pub fn world(&self) -> &MockWorld {
        &self.world
    }

    pub fn stats(&self) -> &SimStats {
        &self.stats
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// The encounter matrix shared by encounter-utility routers
    pub fn matrix(&self) -> &Arc<EncounterMatrix> {
        &self.matrix
    }

    /// Advance one tick
    pub fn step(&mut self) -> FerryResult<()> {
        self.tick += 1;
        self.world.advance(self.config.tick_seconds);
        self.mobility.step(&mut self.world, self.config.tick_seconds);

        let in_flight = self.world.in_flight_count();
        self.world.refresh_contacts()?;
        self.stats.transfers_aborted += (in_flight - self.world.in_flight_count()) as u64;

        let now = self.world.now();
        for transfer in self.world.complete_transfers()? {
            self.stats.record_transfer(&transfer, now);
        }

        self.stats.messages_expired += self.world.drop_expired() as u64;

        if self.config.message_interval > 0 && self.tick % self.config.message_interval == 0 {
            self.create_message()?;
        }

        self.world.tick_all()?;
        Ok(())
    }

    fn create_message(&mut self) -> FerryResult<()> {
        if self.config.hosts < 2 {
            return Ok(());
        }
        let from = self.traffic.random_range(0..self.config.hosts);
        let mut to = self.traffic.random_range(0..self.config.hosts - 1);
        if to >= from {
            to += 1;
        }

        let id = format!("M{}", self.stats.messages_created + 1);
        let message = Message::new(id.as_str(), HostId(from), HostId(to), self.config.message_size);
        let id = self.world.create_message(HostId(from), message)?;
        debug!(message = %id, from, to, "Message created");
        self.stats.record_created(id, self.world.now());
        Ok(())
    }

    /// Run every remaining tick and return the final counters
    pub fn run(&mut self) -> FerryResult<SimStats> {
        while self.tick < self.config.ticks {
            self.step()?;
            if self.tick % 600 == 0 {
                info!(
                    tick = self.tick,
                    created = self.stats.messages_created,
                    delivered = self.stats.messages_delivered,
                    "Progress"
                );
            }
        }
        Ok(self.stats.clone())
    }

    /// Diagnostics of the router on `host`
    pub fn diagnostics(&mut self, host: HostId) -> Option<RoutingInfo> {
        self.world.diagnostics(host)
    }
}
