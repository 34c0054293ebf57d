//! World simulation engine - the tick driver.

use crate::config::Config;
use crate::ecology::rivalry::{self, RivalryReport};
use crate::ecology::weather::WeatherSystem;
use crate::error::{Result, SimError};
use crate::grid::WorldGrid;
use crate::population::{Population, TickReport};
use crate::stats::{Stats, StatsHistory};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// The simulation world
pub struct World {
    // Environment
    grid: WorldGrid,
    weather: WeatherSystem,

    // Inhabitants
    populations: Vec<Population>,
    spawned: bool,

    // State
    pub time: u64,

    // Configuration
    pub config: Config,

    // Statistics
    pub stats: Stats,
    pub stats_history: StatsHistory,

    // Random number generator (seeded for reproducibility)
    rng: ChaCha8Rng,
    seed: u64,
}

impl World {
    /// Create a new world with the given configuration
    pub fn new(config: Config) -> Result<Self> {
        let seed = rand::thread_rng().gen();
        Self::new_with_seed(config, seed)
    }

    /// Create a new world with a specific seed for reproducibility
    pub fn new_with_seed(config: Config, seed: u64) -> Result<Self> {
        config.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let grid = WorldGrid::generate(&config.world, seed, &mut rng)?;
        Self::assemble(config, grid, rng, seed)
    }

    /// Create a world on prepared terrain
    pub fn with_grid(config: Config, grid: WorldGrid, seed: u64) -> Result<Self> {
        config.validate()?;
        if grid.size() != config.world.size {
            return Err(SimError::DimensionMismatch {
                left: config.world.size,
                right: grid.size(),
            });
        }
        let rng = ChaCha8Rng::seed_from_u64(seed);
        Self::assemble(config, grid, rng, seed)
    }

    fn assemble(config: Config, grid: WorldGrid, rng: ChaCha8Rng, seed: u64) -> Result<Self> {
        let weather = WeatherSystem::new(grid.size(), &config.weather);
        let mut world = Self {
            grid,
            weather,
            populations: Vec::new(),
            spawned: false,
            time: 0,
            stats: Stats::new(),
            stats_history: StatsHistory::new(config.logging.stats_interval),
            config,
            rng,
            seed,
        };

        world.spawn_if_due()?;
        world
            .stats
            .update(&world.populations, &world.grid, &world.weather);

        log::info!(
            "World ready: {}x{}, seed {}, {} population(s)",
            world.grid.size(),
            world.grid.size(),
            seed,
            world.populations.len()
        );
        Ok(world)
    }

    /// Spawn populations once the terrain has had `spawn_delay` ticks to settle
    fn spawn_if_due(&mut self) -> Result<()> {
        if self.spawned || self.time < self.config.world.spawn_delay {
            return Ok(());
        }
        for id in 0..self.config.population.populations {
            let population =
                Population::spawn(id, &self.grid, &self.config.population, &mut self.rng)?;
            self.populations.push(population);
        }
        self.spawned = true;
        Ok(())
    }

    /// Main simulation step
    pub fn step(&mut self) -> Result<()> {
        self.spawn_if_due()?;

        // Phase 1: Regrowth
        self.grid.update();

        // Phase 2: Weather
        self.weather.update(&mut self.rng)?;

        // Phase 3: Every population, in order
        let mut tick = TickReport::default();
        for population in &mut self.populations {
            let report = population.update(&mut self.grid, &self.weather, &mut self.rng);
            tick.births += report.births;
            tick.deaths += report.deaths;
            tick.outbreaks += report.outbreaks;
        }

        // Phase 4: Rivalry between populations
        let rivalry = if self.config.rivalry.enabled {
            rivalry::apply(&mut self.populations, self.config.rivalry.rogue_energy)
        } else {
            RivalryReport::default()
        };

        // Phase 5: Statistics
        self.update_stats(tick, rivalry);

        self.time += 1;
        Ok(())
    }

    fn update_stats(&mut self, tick: TickReport, rivalry: RivalryReport) {
        self.stats.time = self.time;
        self.stats.births = tick.births;
        self.stats.deaths = tick.deaths + rivalry.casualties;
        self.stats.outbreaks = tick.outbreaks;
        self.stats.defections = rivalry.defections;
        self.stats.casualties = rivalry.casualties;
        self.stats
            .update(&self.populations, &self.grid, &self.weather);

        // Record history
        if self.time % self.config.logging.stats_interval == 0 {
            self.stats_history.record(self.stats.clone());
        }
    }

    /// Run simulation for specified number of steps
    pub fn run(&mut self, steps: u64) -> Result<()> {
        for _ in 0..steps {
            self.step()?;
        }
        Ok(())
    }

    /// Run simulation with callback for progress updates
    pub fn run_with_callback<F>(&mut self, steps: u64, mut callback: F) -> Result<()>
    where
        F: FnMut(&World, u64),
    {
        for i in 0..steps {
            self.step()?;
            callback(self, i);
        }
        Ok(())
    }

    pub fn grid(&self) -> &WorldGrid {
        &self.grid
    }

    pub fn weather(&self) -> &WeatherSystem {
        &self.weather
    }

    /// Scripted storms and similar interventions between ticks
    pub fn weather_mut(&mut self) -> &mut WeatherSystem {
        &mut self.weather
    }

    pub fn populations(&self) -> &[Population] {
        &self.populations
    }

    /// Whether the spawn delay has elapsed and populations exist
    pub fn is_spawned(&self) -> bool {
        self.spawned
    }

    /// Get current population count across all populations
    pub fn population(&self) -> usize {
        self.populations.iter().map(Population::len).sum()
    }

    /// Check if every population has died out
    pub fn is_extinct(&self) -> bool {
        self.spawned && self.population() == 0
    }

    /// Get seed for reproducibility
    pub fn seed(&self) -> u64 {
        self.seed
    }
}
