//! Configuration system for the TERRA simulation.
//!
//! Supports YAML configuration files with sensible defaults.

use crate::error::{Result, SimError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub world: WorldConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub population: PopulationConfig,
    #[serde(default)]
    pub rivalry: RivalryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How the height layer is generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeightMode {
    /// Perlin gradient noise
    Gradient,
    /// Scattered impulses blurred into hills
    Points,
}

/// Terrain, climate and vegetation generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Side length of the square toroidal grid
    pub size: usize,
    /// Fraction of cells receiving a seed impulse
    pub point_density: f64,
    /// Standard deviation of the Gaussian smoothing
    pub sigma: f64,
    /// Vegetation seed points as a fraction of the base point count
    pub vegetation_thickness: f64,
    /// Resource seed points as a fraction of the base point count
    pub resource_thickness: f64,
    /// Sustenance regrowth per tick
    pub v_rate: f64,
    /// Resource regrowth per tick
    pub r_rate: f64,
    /// Climate seed points as a fraction of the base point count
    pub climate_spawn_fraction: f64,
    /// Climate band in which vegetation may be seeded (exclusive bounds)
    pub vegetation_bounds: (f64, f64),
    /// Cells at or below this height are water
    pub water_level: f64,
    /// Each pole covers `size / polar_divisor` rows
    pub polar_divisor: usize,
    /// How the height layer is generated
    pub height_mode: HeightMode,
    /// Sampling frequency of the gradient noise (cells -> lattice units)
    pub height_frequency: f64,
    /// Ticks before populations are spawned
    pub spawn_delay: u64,
}

/// Storm spawning and decay
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Probability of spawning a storm each tick
    pub storm_chance: f64,
    /// Peak strength scale of a new storm
    pub storm_intensity: f64,
    /// Range of the random multiplier on `storm_intensity`
    pub storm_variance: (f64, f64),
    /// Fraction of intensity lost per tick
    pub storm_decay: f64,
    /// Maximum absolute velocity component
    pub storm_speed: f64,
    /// Gaussian spread of a storm on the weather layer
    pub storm_sigma: f64,
    /// Storms below this intensity are removed
    pub removal_threshold: f64,
    /// Cells below `mask_factor * mean(weather)` are cleared
    pub mask_factor: f64,
}

/// Agent behavior rates and thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Number of populations to spawn
    pub populations: usize,
    /// Initial agents per population
    pub initial_count: usize,
    /// Maximum offset of a new agent from the spawn point
    pub spawn_distance: i64,
    /// Survivable climate range of spawned agents
    pub temp_range: (f64, f64),
    /// Energy lost per tick
    pub decay: f64,
    /// Health lost when exhausted or isolated
    pub decay_health: f64,
    /// Social change per tick
    pub decay_social: f64,
    /// Energy required (and spent) by each parent to reproduce
    pub sex_threshold: f64,
    /// Below this social value an agent seeks company
    pub social_low: f64,
    /// Above this social value an agent explores away from others
    pub social_high: f64,
    /// Distance within which agents bond and mate
    pub bond_radius: f64,
    /// Distance over which an infection spreads
    pub disease_spread_radius: f64,
    /// Health lost per tick while infected
    pub disease_harm: f64,
    /// Probability per tick of an outbreak check
    pub disease_chance: f64,
    /// Radius around the centroid counted for overcrowding
    pub disease_radius: f64,
    /// Crowd size at which an outbreak starts
    pub disease_overpopulation: usize,
    /// Health lost per tick to drowning or bad climate
    pub hazard_damage: f64,
    /// Weather intensity tolerated without damage
    pub weather_resistance: f64,
    /// Births are skipped above this many agents
    pub max_population: usize,
}

/// Multi-population defection and combat
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RivalryConfig {
    /// Apply defection and combat when two or more populations exist
    pub enabled: bool,
    /// Stragglers at or below this energy defect to the rival population
    pub rogue_energy: f64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Steps between stats snapshots
    pub stats_interval: u64,
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            world: WorldConfig::default(),
            weather: WeatherConfig::default(),
            population: PopulationConfig::default(),
            rivalry: RivalryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            size: 64,
            point_density: 0.2,
            sigma: 3.0,
            vegetation_thickness: 0.2,
            resource_thickness: 0.2,
            v_rate: 0.01,
            r_rate: 0.005,
            climate_spawn_fraction: 0.05,
            vegetation_bounds: (0.2, 0.6),
            water_level: 0.5,
            polar_divisor: 8,
            height_mode: HeightMode::Gradient,
            height_frequency: 0.1,
            spawn_delay: 0,
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            storm_chance: 0.01,
            storm_intensity: 0.2,
            storm_variance: (0.8, 1.2),
            storm_decay: 0.05,
            storm_speed: 2.0,
            storm_sigma: 2.0,
            removal_threshold: 0.1,
            mask_factor: 1.2,
        }
    }
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            populations: 1,
            initial_count: 4,
            spawn_distance: 2,
            temp_range: (0.0, 1.0),
            decay: 0.1,
            decay_health: 0.25,
            decay_social: 0.005,
            sex_threshold: 0.4,
            social_low: 0.2,
            social_high: 0.8,
            bond_radius: 2.0,
            disease_spread_radius: 1.5,
            disease_harm: 0.05,
            disease_chance: 0.001,
            disease_radius: 3.0,
            disease_overpopulation: 8,
            hazard_damage: 0.1,
            weather_resistance: 0.0,
            max_population: 1000,
        }
    }
}

impl Default for RivalryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rogue_energy: 0.1,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            stats_interval: 50,
            log_level: "info".to_string(),
        }
    }
}

fn check_probability(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(SimError::InvalidConfig(format!(
            "{} must be in [0, 1], got {}",
            name, value
        )));
    }
    Ok(())
}

fn check_range(name: &str, range: (f64, f64)) -> Result<()> {
    if range.0 > range.1 {
        return Err(SimError::InvalidConfig(format!(
            "{} must be ordered (min <= max), got ({}, {})",
            name, range.0, range.1
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let w = &self.world;
        if w.size == 0 {
            return Err(SimError::InvalidConfig("size must be > 0".to_string()));
        }
        if w.sigma < 0.0 || self.weather.storm_sigma < 0.0 {
            return Err(SimError::InvalidConfig("sigma must be >= 0".to_string()));
        }
        if w.polar_divisor == 0 {
            return Err(SimError::InvalidConfig("polar_divisor must be > 0".to_string()));
        }
        check_probability("point_density", w.point_density)?;
        check_probability("water_level", w.water_level)?;
        check_range("vegetation_bounds", w.vegetation_bounds)?;

        let wx = &self.weather;
        check_probability("storm_chance", wx.storm_chance)?;
        check_range("storm_variance", wx.storm_variance)?;
        if !(0.0..1.0).contains(&wx.storm_decay) {
            return Err(SimError::InvalidConfig(format!(
                "storm_decay must be in [0, 1), got {}",
                wx.storm_decay
            )));
        }

        let p = &self.population;
        check_range("temp_range", p.temp_range)?;
        check_probability("disease_chance", p.disease_chance)?;
        if p.social_low > p.social_high {
            return Err(SimError::InvalidConfig(
                "social_low cannot exceed social_high".to_string(),
            ));
        }
        if p.initial_count > p.max_population {
            return Err(SimError::InvalidConfig(
                "initial_count cannot exceed max_population".to_string(),
            ));
        }
        if p.spawn_distance < 0 {
            return Err(SimError::InvalidConfig("spawn_distance must be >= 0".to_string()));
        }
        if self.logging.stats_interval == 0 {
            return Err(SimError::InvalidConfig("stats_interval must be > 0".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let loaded: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config.world.size, loaded.world.size);
        assert_eq!(loaded.world.height_mode, HeightMode::Gradient);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let yaml = r#"
world:
  size: 16
  point_density: 0.3
  sigma: 1.5
  vegetation_thickness: 0.2
  resource_thickness: 0.2
  v_rate: 0.02
  r_rate: 0.01
  climate_spawn_fraction: 0.05
  vegetation_bounds: [0.2, 0.6]
  water_level: 0.4
  polar_divisor: 8
  height_mode: points
  height_frequency: 0.1
  spawn_delay: 0
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.world.size, 16);
        assert_eq!(config.world.height_mode, HeightMode::Points);
        assert_eq!(config.population.initial_count, 4);
        assert!(config.rivalry.enabled);
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let mut config = Config::default();
        config.world.size = 24;
        config.save(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.world.size, 24);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = Config::default();
        config.world.size = 0;
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));

        let mut config = Config::default();
        config.weather.storm_chance = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.population.temp_range = (0.8, 0.2);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.weather.storm_decay = 1.0;
        assert!(config.validate().is_err());
    }
}
