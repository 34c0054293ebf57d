//! Statistics tracking for the simulation.

use crate::ecology::weather::WeatherSystem;
use crate::error::Result;
use crate::grid::WorldGrid;
use crate::population::Population;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Snapshot of one population
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PopulationStats {
    pub id: usize,
    /// Live agents
    pub count: usize,
    pub health_mean: f64,
    pub energy_mean: f64,
    pub social_mean: f64,
    /// Currently infected agents
    pub infected: usize,
    /// Agents that defected into this population
    pub rogue: usize,
}

impl PopulationStats {
    pub fn from_population(population: &Population) -> Self {
        let alive: Vec<_> = population.terrans().iter().filter(|t| t.is_alive()).collect();
        let mut stats = Self {
            id: population.id(),
            count: alive.len(),
            ..Self::default()
        };
        if alive.is_empty() {
            return stats;
        }

        let n = alive.len() as f64;
        stats.health_mean = alive.iter().map(|t| t.health).sum::<f64>() / n;
        stats.energy_mean = alive.iter().map(|t| t.energy).sum::<f64>() / n;
        stats.social_mean = alive.iter().map(|t| t.social).sum::<f64>() / n;
        stats.infected = alive.iter().filter(|t| t.infected).count();
        stats.rogue = alive.iter().filter(|t| t.rogue).count();
        stats
    }
}

/// Statistics snapshot for a simulation step
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Stats {
    /// Current simulation time
    pub time: u64,
    /// Live agents across all populations
    pub population: usize,
    /// Per-population breakdown
    pub populations: Vec<PopulationStats>,
    /// Births this step
    pub births: usize,
    /// Deaths this step (combat included)
    pub deaths: usize,
    /// Disease outbreaks this step
    pub outbreaks: usize,
    /// Agents that changed sides this step
    pub defections: usize,
    /// Agents killed in combat this step
    pub casualties: usize,
    /// Active storms
    pub storms: usize,
    /// Sustenance summed over the grid
    pub total_sustenance: f64,
    /// Resource summed over the grid
    pub total_resource: f64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refresh the state-derived fields; per-step counters are set by the caller
    pub fn update(&mut self, populations: &[Population], grid: &WorldGrid, weather: &WeatherSystem) {
        self.populations = populations
            .iter()
            .map(PopulationStats::from_population)
            .collect();
        self.population = self.populations.iter().map(|p| p.count).sum();
        self.storms = weather.active_count();
        self.total_sustenance = grid.total_sustenance();
        self.total_resource = grid.total_resource();
    }

    /// Format stats as a one-line summary
    pub fn summary(&self) -> String {
        let per_pop: Vec<String> = self
            .populations
            .iter()
            .map(|p| format!("{}:{}", p.id, p.count))
            .collect();
        let infected: usize = self.populations.iter().map(|p| p.infected).sum();
        format!(
            "T:{:6} | Pop:{:5} [{}] | +{} -{} | Sick:{:3} | Storms:{:2} | Food:{:.1}",
            self.time,
            self.population,
            per_pop.join(" "),
            self.births,
            self.deaths,
            infected,
            self.storms,
            self.total_sustenance
        )
    }
}

/// Historical statistics tracker
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StatsHistory {
    /// All recorded stats snapshots
    pub snapshots: Vec<Stats>,
    /// Recording interval
    pub interval: u64,
}

impl StatsHistory {
    pub fn new(interval: u64) -> Self {
        Self {
            snapshots: Vec::new(),
            interval,
        }
    }

    pub fn record(&mut self, stats: Stats) {
        self.snapshots.push(stats);
    }

    /// Snapshot recorded at or just before `time`
    pub fn get_at(&self, time: u64) -> Option<&Stats> {
        self.snapshots.iter().rev().find(|s| s.time <= time)
    }

    /// Total population over time
    pub fn population_series(&self) -> Vec<(u64, usize)> {
        self.snapshots
            .iter()
            .map(|s| (s.time, s.population))
            .collect()
    }

    /// Total sustenance over time
    pub fn sustenance_series(&self) -> Vec<(u64, f64)> {
        self.snapshots
            .iter()
            .map(|s| (s.time, s.total_sustenance))
            .collect()
    }

    /// Save history to a JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load history from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PopulationConfig, WeatherConfig};
    use crate::ecology::noise::Field;
    use crate::grid::GrowthRates;
    use crate::terran::Terran;

    #[test]
    fn test_stats_update() {
        let grid = WorldGrid::from_layers(
            0.5,
            GrowthRates {
                v_rate: 0.0,
                r_rate: 0.0,
            },
            Field::from_elem((8, 8), 1.0),
            Field::from_elem((8, 8), 0.5),
            Field::from_elem((8, 8), 0.5),
            Field::from_elem((8, 8), 1.0),
        )
        .unwrap();
        let weather = WeatherSystem::new(8, &WeatherConfig::default());

        let mut sick = Terran::new(1, 1, (0.0, 1.0));
        sick.infected = true;
        sick.energy = 0.5;
        let terrans = vec![sick, Terran::new(2, 2, (0.0, 1.0))];
        let pop = Population::with_terrans(0, &grid, &PopulationConfig::default(), terrans).unwrap();

        let mut stats = Stats::new();
        stats.update(&[pop], &grid, &weather);

        assert_eq!(stats.population, 2);
        assert_eq!(stats.populations[0].infected, 1);
        assert!((stats.populations[0].energy_mean - 0.75).abs() < 1e-12);
        assert!((stats.total_sustenance - 32.0).abs() < 1e-9);
        assert!(stats.summary().contains("Pop:    2"));
    }

    #[test]
    fn test_stats_history() {
        let mut history = StatsHistory::new(10);

        for i in 0..5 {
            let mut stats = Stats::new();
            stats.time = i * 10;
            stats.population = (i + 1) as usize * 100;
            stats.total_sustenance = 50.0 - i as f64;
            history.record(stats);
        }

        let series = history.population_series();
        assert_eq!(series.len(), 5);
        assert_eq!(series[0], (0, 100));
        assert_eq!(series[4], (40, 500));
        assert_eq!(history.get_at(25).map(|s| s.time), Some(20));
        assert_eq!(history.sustenance_series()[4], (40, 46.0));
    }

    #[test]
    fn test_history_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");

        let mut history = StatsHistory::new(5);
        history.record(Stats {
            time: 5,
            population: 7,
            ..Stats::default()
        });
        history.save(&path).unwrap();

        let loaded = StatsHistory::load(&path).unwrap();
        assert_eq!(loaded.population_series(), vec![(5, 7)]);
    }
}
