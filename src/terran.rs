//! The Terran: a single animal inhabitant of the world.

use crate::geometry::{Cell, Point};
use serde::{Deserialize, Serialize};

/// An agent owned by exactly one population
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Terran {
    // Position
    pub x: usize,
    pub y: usize,

    // Vital stats
    pub health: f64,
    pub energy: f64,
    pub social: f64,
    pub resources: f64,

    // Flags
    /// Set once the agent has defected to a rival population
    pub rogue: bool,
    pub infected: bool,

    /// Climate values this agent survives in (inclusive)
    pub temp_range: (f64, f64),
}

impl Terran {
    /// Create a healthy, rested and sociable agent
    pub fn new(x: usize, y: usize, temp_range: (f64, f64)) -> Self {
        Self {
            x,
            y,
            health: 1.0,
            energy: 1.0,
            social: 1.0,
            resources: 0.0,
            rogue: false,
            infected: false,
            temp_range,
        }
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    #[inline]
    pub fn cell(&self) -> Cell {
        (self.x, self.y)
    }

    #[inline]
    pub fn position(&self) -> Point {
        (self.x as f64, self.y as f64)
    }

    #[inline]
    pub fn move_to(&mut self, cell: Cell) {
        self.x = cell.0;
        self.y = cell.1;
    }

    /// Whether `climate` lies inside the survivable range
    #[inline]
    pub fn tolerates(&self, climate: f64) -> bool {
        climate >= self.temp_range.0 && climate <= self.temp_range.1
    }

    /// Lose energy, never below zero
    #[inline]
    pub fn spend_energy(&mut self, amount: f64) {
        self.energy = (self.energy - amount).max(0.0);
    }

    /// Lose social need, never below zero
    #[inline]
    pub fn lose_social(&mut self, amount: f64) {
        self.social = (self.social - amount).max(0.0);
    }

    #[inline]
    pub fn damage(&mut self, amount: f64) {
        self.health -= amount;
    }
}
