//! Random-waypoint mobility
//!
//! Every host picks a uniformly random point of the field and walks there
//! at its own speed, then picks the next one. The current target is
//! published as the host's waypoint so routers can read where it is heading.

use std::collections::BTreeMap;

use ferry_core::{Coord, HostId, MockWorld};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

/// Random-waypoint movement model on a `field_size` square
#[derive(Debug)]
pub struct RandomWaypoint {
    field_size: f64,
    min_speed: f64,
    max_speed: f64,
    speeds: BTreeMap<HostId, f64>,
    rng: StdRng,
}

impl RandomWaypoint {
    /// Speeds are in field units per second, drawn once per leg
    pub fn new(field_size: f64, min_speed: f64, max_speed: f64, seed: u64) -> Self {
        Self {
            field_size,
            min_speed: min_speed.min(max_speed),
            max_speed: max_speed.max(min_speed),
            speeds: BTreeMap::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn field_size(&self) -> f64 {
        self.field_size
    }

    /// A uniformly random point of the field
    pub fn random_point(&mut self) -> Coord {
        Coord::new(
            self.rng.random_range(0.0..=self.field_size),
            self.rng.random_range(0.0..=self.field_size),
        )
    }

    fn random_speed(&mut self) -> f64 {
        if self.max_speed > self.min_speed {
            self.rng.random_range(self.min_speed..self.max_speed)
        } else {
            self.min_speed
        }
    }

    /// Start a new leg for `host`
    fn next_leg(&mut self, world: &mut MockWorld, host: HostId) {
        let target = self.random_point();
        let speed = self.random_speed();
        self.speeds.insert(host, speed);
        world.set_waypoint(host, Some(target));
    }

    /// Place every host at a random point with a first waypoint
    pub fn place(&mut self, world: &mut MockWorld) {
        for host in world.host_ids() {
            let start = self.random_point();
            world.set_position(host, start);
            self.next_leg(world, host);
        }
    }

    /// Move every host for `seconds`
    pub fn step(&mut self, world: &mut MockWorld, seconds: f64) {
        for host in world.host_ids() {
            let speed = match self.speeds.get(&host) {
                Some(&speed) => speed,
                None => {
                    self.next_leg(world, host);
                    self.speeds.get(&host).copied().unwrap_or(self.min_speed)
                }
            };

            let arrived = match world.host_mut(host) {
                Some(h) => match h.waypoint {
                    Some(target) => h.position.step_toward(&target, speed * seconds),
                    None => true,
                },
                None => continue,
            };

            if arrived {
                trace!(host = %host, "Waypoint reached");
                self.next_leg(world, host);
            }
        }
    }
}
