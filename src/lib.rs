//! # TERRA
//!
//! Artificial-life world simulator on a procedurally generated torus.
//!
//! ## Features
//!
//! - **Procedural**: Perlin terrain, blurred climate bands with cold poles, seeded vegetation
//! - **Weather**: drifting storms that decay and damage whoever they pass over
//! - **Agents**: Terrans forage, bond, breed, sicken, defect and fight
//! - **Configurable**: YAML configuration files
//! - **Reproducible**: Seeded random number generation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use terra::{Config, World};
//!
//! let config = Config::default();
//! let mut world = World::new(config).unwrap();
//!
//! world.run(1000).unwrap();
//!
//! println!("Population: {}", world.population());
//! println!("Storms: {}", world.weather().active_count());
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use terra::Config;
//!
//! let mut config = Config::default();
//! config.world.size = 32;
//! config.population.populations = 2;
//! config.weather.storm_chance = 0.05;
//! assert!(config.validate().is_ok());
//! ```
//!
//! ## Rendering
//!
//! A front end reads the layers and agent positions between ticks:
//!
//! ```rust,no_run
//! use terra::{Config, World};
//!
//! let mut world = World::new(Config::default()).unwrap();
//! world.step().unwrap();
//!
//! let height = world.grid().height();
//! let weather = world.weather().weather();
//! for population in world.populations() {
//!     let occupied = population.occupancy();
//!     println!("{:?} {:?} {}", height.dim(), weather.dim(), occupied.len());
//! }
//! ```

pub mod config;
pub mod ecology;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod population;
pub mod stats;
pub mod terran;
pub mod world;

// Re-export main types
pub use config::Config;
pub use error::{Result, SimError};
pub use grid::WorldGrid;
pub use population::Population;
pub use terran::Terran;
pub use world::World;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run a quick benchmark
pub fn benchmark(steps: u64, size: usize) -> Result<BenchmarkResult> {
    use std::time::Instant;

    let mut config = Config::default();
    config.world.size = size;

    let mut world = World::new(config)?;
    let initial_population = world.population();

    let start = Instant::now();
    world.run(steps)?;
    let elapsed = start.elapsed();

    Ok(BenchmarkResult {
        steps,
        size,
        initial_population,
        final_population: world.population(),
        elapsed_secs: elapsed.as_secs_f64(),
        steps_per_second: steps as f64 / elapsed.as_secs_f64(),
        storms: world.weather().active_count(),
    })
}

/// Benchmark result
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub steps: u64,
    pub size: usize,
    pub initial_population: usize,
    pub final_population: usize,
    pub elapsed_secs: f64,
    pub steps_per_second: f64,
    pub storms: usize,
}

impl std::fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Benchmark Results ===")?;
        writeln!(f, "Steps: {}", self.steps)?;
        writeln!(f, "Grid: {}x{}", self.size, self.size)?;
        writeln!(f, "Population: {} -> {}", self.initial_population, self.final_population)?;
        writeln!(f, "Time: {:.3}s", self.elapsed_secs)?;
        writeln!(f, "Speed: {:.1} steps/s", self.steps_per_second)?;
        writeln!(f, "Active storms: {}", self.storms)?;
        Ok(())
    }
}
