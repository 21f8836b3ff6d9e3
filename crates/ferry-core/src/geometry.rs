//! Planar coordinates

use serde::{Deserialize, Serialize};

/// A point on the simulation plane
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Coord) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Slope of the line from this point to `other`
    ///
    /// Vertical lines give `±inf`; coincident points give NaN.
    pub fn slope_to(&self, other: &Coord) -> f64 {
        (other.y - self.y) / (other.x - self.x)
    }

    /// Move toward `target` by at most `step`, returning true on arrival
    pub fn step_toward(&mut self, target: &Coord, step: f64) -> bool {
        let remaining = self.distance(target);
        if remaining <= step {
            *self = *target;
            return true;
        }
        let ratio = step / remaining;
        self.x += (target.x - self.x) * ratio;
        self.y += (target.y - self.y) * ratio;
        false
    }
}

impl std::fmt::Display for Coord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2},{:.2})", self.x, self.y)
    }
}
