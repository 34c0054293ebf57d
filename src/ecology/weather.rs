//! Storms and the weather layer.
//!
//! Storms drift across the torus, decay every tick and are rasterized onto a
//! fresh weather layer after each update.

use crate::config::WeatherConfig;
use crate::ecology::noise::{self, Field};
use crate::error::Result;
use crate::geometry::{self, Point};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Lifecycle of a storm
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StormPhase {
    /// Spawned this tick, not yet advanced
    Forming,
    /// Moving and decaying
    Active,
    /// Fell below the removal threshold
    Removed,
}

/// A moving storm cell
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Storm {
    pub position: Point,
    pub velocity: Point,
    /// Starts at 1.0 and decays multiplicatively
    pub intensity: f64,
    /// Peak value of the storm core at full intensity
    pub strength: f64,
    pub phase: StormPhase,
    /// Ticks since spawn
    pub age: u64,
}

impl Storm {
    pub fn new(position: Point, velocity: Point, strength: f64) -> Self {
        Self {
            position,
            velocity,
            intensity: 1.0,
            strength,
            phase: StormPhase::Forming,
            age: 0,
        }
    }

    /// Move, decay and retire the storm once it drops below `threshold`
    pub fn advance(&mut self, size: usize, decay: f64, threshold: f64) -> StormPhase {
        if self.phase == StormPhase::Removed {
            return self.phase;
        }
        let moved = (
            self.position.0 + self.velocity.0,
            self.position.1 + self.velocity.1,
        );
        self.position = geometry::wrap_point(moved, size);
        self.intensity *= 1.0 - decay;
        self.age += 1;
        self.phase = if self.intensity < threshold {
            StormPhase::Removed
        } else {
            StormPhase::Active
        };
        self.phase
    }

    /// Value written at the storm's cell before smoothing
    #[inline]
    pub fn core_value(&self) -> f64 {
        self.strength * self.intensity
    }

    /// Grid cell under the storm's rounded position
    pub fn cell(&self, size: usize) -> (usize, usize) {
        geometry::wrap_cell(
            self.position.0.round() as i64,
            self.position.1.round() as i64,
            size,
        )
    }
}

/// Weather controller owning all active storms and the rasterized layer
#[derive(Clone, Debug)]
pub struct WeatherSystem {
    size: usize,
    config: WeatherConfig,
    storms: Vec<Storm>,
    weather: Field,
    /// Center weight of the 2D kernel, so a lone storm core keeps its value
    kernel_peak: f64,
}

impl WeatherSystem {
    pub fn new(size: usize, config: &WeatherConfig) -> Self {
        let kernel = noise::gaussian_kernel(config.storm_sigma);
        let center = kernel[kernel.len() / 2];
        Self {
            size,
            config: config.clone(),
            storms: Vec::new(),
            weather: Field::zeros((size, size)),
            kernel_peak: center * center,
        }
    }

    /// Advance storms, drop spent ones, maybe spawn one, then rebuild the layer
    pub fn update<R: Rng>(&mut self, rng: &mut R) -> Result<()> {
        let (size, decay, threshold) = (
            self.size,
            self.config.storm_decay,
            self.config.removal_threshold,
        );
        for storm in &mut self.storms {
            storm.advance(size, decay, threshold);
        }

        let before = self.storms.len();
        self.storms.retain(|s| s.phase != StormPhase::Removed);
        let removed = before - self.storms.len();
        if removed > 0 {
            log::debug!("{} storm(s) dissipated, {} active", removed, self.storms.len());
        }

        if rng.gen_bool(self.config.storm_chance) {
            self.spawn_storm(rng);
        }

        self.rasterize()
    }

    /// Spawn a storm at a random cell with a random drift
    pub fn spawn_storm<R: Rng>(&mut self, rng: &mut R) {
        let speed = self.config.storm_speed.abs();
        let (lo, hi) = self.config.storm_variance;
        let position = (
            rng.gen_range(0..self.size) as f64,
            rng.gen_range(0..self.size) as f64,
        );
        let velocity = (rng.gen_range(-speed..=speed), rng.gen_range(-speed..=speed));
        let strength = self.config.storm_intensity * rng.gen_range(lo..=hi);

        log::debug!(
            "Storm formed at ({:.0}, {:.0}) with strength {:.3}",
            position.0,
            position.1,
            strength
        );
        self.storms.push(Storm::new(position, velocity, strength));
    }

    /// Add a prepared storm (scripted scenarios, tests)
    pub fn add_storm(&mut self, storm: Storm) {
        self.storms.push(storm);
    }

    /// Rebuild the weather layer from the active storms
    pub fn rasterize(&mut self) -> Result<()> {
        let mut raster = Field::zeros((self.size, self.size));
        for storm in &self.storms {
            let (x, y) = storm.cell(self.size);
            raster[[y, x]] += storm.core_value();
        }

        let peak = self.kernel_peak;
        let mut weather = noise::gaussian_blur(&raster, self.config.storm_sigma)?;
        weather.mapv_inplace(|v| v / peak);

        // Keep only the locally significant storm cores
        let cutoff = self.config.mask_factor * weather.mean().unwrap_or(0.0);
        weather.mapv_inplace(|v| if v < cutoff { 0.0 } else { v });

        self.weather = weather;
        Ok(())
    }

    /// Closest active storm to `point` and its distance.
    ///
    /// Returns `(None, f64::INFINITY)` when no storm is active.
    pub fn closest_storm(&self, point: Point) -> (Option<&Storm>, f64) {
        let (idx, dist) = geometry::nearest(
            point,
            self.storms.iter().map(|s| s.position).enumerate(),
            self.size,
        );
        (idx.map(|i| &self.storms[i]), dist)
    }

    #[inline]
    pub fn intensity_at(&self, x: usize, y: usize) -> f64 {
        self.weather[[y % self.size, x % self.size]]
    }

    /// Health damage dealt at a cell to something resisting up to `resistance`
    #[inline]
    pub fn storm_damage(&self, x: usize, y: usize, resistance: f64) -> f64 {
        let intensity = self.intensity_at(x, y);
        if intensity > resistance {
            intensity
        } else {
            0.0
        }
    }

    pub fn weather(&self) -> &Field {
        &self.weather
    }

    pub fn storms(&self) -> &[Storm] {
        &self.storms
    }

    pub fn active_count(&self) -> usize {
        self.storms.len()
    }
}
