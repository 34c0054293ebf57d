//! A population of Terrans sharing one world, and the per-tick behavior pipeline.
//!
//! Each update runs, in order: an outbreak check, movement for every agent,
//! then metabolism, bonding, reproduction, contagion and hazards per agent.
//! Newborns join and the dead are removed only at the end of the tick, so
//! neighbor queries during the tick see a stable collection.

use crate::config::PopulationConfig;
use crate::ecology::weather::WeatherSystem;
use crate::error::{Result, SimError};
use crate::geometry::{self, Cell, Neighborhood, Point, CENTER};
use crate::grid::{SpatialIndex, WorldGrid};
use crate::terran::Terran;
use ndarray::{Array2, Array3};
use rand::Rng;

/// Random draws for a spawn point before falling back to a full scan
const SPAWN_ATTEMPTS: usize = 1000;

/// Random draws for each initial agent around the spawn point
const PLACEMENT_ATTEMPTS: usize = 100;

/// What happened to a population during one update
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub births: usize,
    pub deaths: usize,
    pub outbreaks: usize,
}

/// An ordered collection of agents and the rates that drive them
#[derive(Clone, Debug)]
pub struct Population {
    id: usize,
    size: usize,
    config: PopulationConfig,
    spawn_point: Cell,
    /// Neighbor differences of climate suitability, `[[y, x, k]]`
    climate_gradient: Array3<f64>,
    terrans: Vec<Terran>,
    last_report: TickReport,
}

impl Population {
    /// Spawn `initial_count` agents around a viable spawn point
    pub fn spawn<R: Rng>(
        id: usize,
        grid: &WorldGrid,
        config: &PopulationConfig,
        rng: &mut R,
    ) -> Result<Self> {
        // Rivals draw their own spawn point instead of sharing the center
        let spawn_point = find_spawn_point(grid, config.temp_range, id == 0, rng)?;
        let terrans = (0..config.initial_count)
            .map(|_| {
                let (x, y) = place_near(grid, spawn_point, config, rng);
                Terran::new(x, y, config.temp_range)
            })
            .collect();

        let mut population = Self::with_terrans(id, grid, config, terrans)?;
        population.spawn_point = spawn_point;

        log::info!(
            "Population {} spawned {} terrans around ({}, {})",
            id,
            population.len(),
            spawn_point.0,
            spawn_point.1
        );
        Ok(population)
    }

    /// Build a population from prepared agents; positions are wrapped onto the grid
    pub fn with_terrans(
        id: usize,
        grid: &WorldGrid,
        config: &PopulationConfig,
        terrans: Vec<Terran>,
    ) -> Result<Self> {
        let size = grid.size();
        let climate_gradient = climate_gradient(grid.climate(), config.temp_range)?;
        let terrans: Vec<Terran> = terrans
            .into_iter()
            .map(|mut t| {
                t.x %= size;
                t.y %= size;
                t
            })
            .collect();

        Ok(Self {
            id,
            size,
            config: config.clone(),
            spawn_point: (size / 2, size / 2),
            climate_gradient,
            terrans,
            last_report: TickReport::default(),
        })
    }

    /// Advance every agent by one tick
    pub fn update<R: Rng>(
        &mut self,
        grid: &mut WorldGrid,
        weather: &WeatherSystem,
        rng: &mut R,
    ) -> TickReport {
        let mut report = TickReport::default();
        if self.terrans.is_empty() {
            self.last_report = report;
            return report;
        }

        if self.outbreak(rng) {
            report.outbreaks = 1;
        }
        self.move_terrans(grid, weather);
        let newborns = self.manage_terrans(grid, weather);

        report.births = newborns.len();
        self.terrans.extend(newborns);
        report.deaths = self.prune();

        if report.births > 0 || report.deaths > 0 {
            log::debug!(
                "Population {}: {} born, {} died, {} alive",
                self.id,
                report.births,
                report.deaths,
                self.len()
            );
        }
        self.last_report = report;
        report
    }

    // ========================================================================
    // MOVEMENT
    // ========================================================================

    fn move_terrans(&mut self, grid: &WorldGrid, weather: &WeatherSystem) {
        let mut occupancy = SpatialIndex::from_positions(self.size, self.positions());

        for i in 0..self.terrans.len() {
            let from = self.terrans[i].cell();
            let target = self.choose_destination(i, grid, weather);
            if let Some(to) = free_land_near(target, i, grid, &occupancy) {
                if to != from {
                    occupancy.relocate(from, to, i);
                    self.terrans[i].move_to(to);
                }
            }
        }
    }

    /// Wrapped destination after gradient following and social/storm blending
    fn choose_destination(&self, i: usize, grid: &WorldGrid, weather: &WeatherSystem) -> Cell {
        let t = &self.terrans[i];
        let origin = t.position();
        let hood = Neighborhood::around(t.cell(), self.size);
        let mut dest = hood.candidates()[self.best_candidate(t, &hood, grid)].position;

        if let (Some(j), _) = self.nearest_other(i) {
            let other = geometry::unwrap_near(origin, self.terrans[j].position(), self.size);
            if t.social < self.config.social_low {
                dest = midpoint(dest, hood.path_toward(other).position);
            } else if t.social > self.config.social_high {
                dest = midpoint(dest, hood.path_away(other).position);
            }
        }

        // Storm avoidance goes last so it has the final say
        if weather.intensity_at(t.x, t.y) > 0.0 {
            if let (Some(storm), _) = weather.closest_storm(origin) {
                let eye = geometry::unwrap_near(origin, storm.position, self.size);
                dest = midpoint(dest, hood.path_away(eye).position);
            }
        }

        // Halves round away from the agent
        let dx = (dest.0 - origin.0).round() as i64;
        let dy = (dest.1 - origin.1).round() as i64;
        geometry::wrap_cell(t.x as i64 + dx, t.y as i64 + dy, self.size)
    }

    /// Index of the candidate with the best `(Δsustenance + Δclimate) / 2`; staying wins ties
    fn best_candidate(&self, t: &Terran, hood: &Neighborhood, grid: &WorldGrid) -> usize {
        let here = grid.sustenance_at(t.x, t.y);
        let score = |k: usize| {
            let (cx, cy) = hood.candidates()[k].cell;
            let d_sustenance = grid.sustenance_at(cx, cy) - here;
            let d_climate = self.climate_gradient[[t.y, t.x, k]];
            (d_sustenance + d_climate) / 2.0
        };

        let mut best = CENTER;
        let mut best_score = score(CENTER);
        for k in 0..hood.candidates().len() {
            let s = score(k);
            if s > best_score {
                best = k;
                best_score = s;
            }
        }
        best
    }

    // ========================================================================
    // METABOLISM, SOCIAL LIFE AND HAZARDS
    // ========================================================================

    fn manage_terrans(&mut self, grid: &mut WorldGrid, weather: &WeatherSystem) -> Vec<Terran> {
        let mut occupancy = SpatialIndex::from_positions(self.size, self.positions());
        let mut newborns = Vec::new();
        let mut capped = false;

        for i in 0..self.terrans.len() {
            if !self.terrans[i].is_alive() {
                continue;
            }
            self.metabolize(i, grid, weather);

            let (partner, dist) = self.nearest_other(i);
            self.socialize(i, dist);

            if let Some(j) = partner {
                if dist <= self.config.bond_radius && self.can_mate(i, j) {
                    let living = self.terrans.iter().filter(|t| t.is_alive()).count();
                    if living + newborns.len() >= self.config.max_population {
                        capped = true;
                    } else {
                        let next_idx = self.terrans.len() + newborns.len();
                        let child = self.mate(i, j, grid, &occupancy);
                        occupancy.insert(child.x, child.y, next_idx);
                        newborns.push(child);
                    }
                }
            }

            self.spread_infection(i, partner, dist);
            self.apply_hazards(i, grid);
        }

        if capped {
            log::warn!(
                "Population {} reached its cap of {}, births skipped",
                self.id,
                self.config.max_population
            );
        }
        newborns
    }

    fn metabolize(&mut self, i: usize, grid: &mut WorldGrid, weather: &WeatherSystem) {
        let decay = self.config.decay;
        let decay_health = self.config.decay_health;
        let resistance = self.config.weather_resistance;
        let t = &mut self.terrans[i];

        if t.energy < 1.0 && grid.sustenance_at(t.x, t.y) > 0.0 {
            t.energy += grid.consume_sustenance(t.x, t.y, 2.0 * decay);
        }
        if t.energy <= 0.0 {
            t.damage(decay_health);
        }
        t.damage(weather.storm_damage(t.x, t.y, resistance));
        t.spend_energy(decay);
    }

    fn socialize(&mut self, i: usize, nearest_dist: f64) {
        let PopulationConfig {
            bond_radius,
            decay_social,
            decay_health,
            ..
        } = self.config;
        let t = &mut self.terrans[i];

        if nearest_dist <= bond_radius {
            t.social += decay_social;
        } else {
            t.lose_social(decay_social);
        }
        // isolation
        if t.social <= 0.0 {
            t.damage(decay_health);
        }
    }

    fn can_mate(&self, i: usize, j: usize) -> bool {
        let th = self.config.sex_threshold;
        self.terrans[i].energy >= th && self.terrans[j].energy >= th
    }

    /// Charge both parents and create a child near `(x_i, y_j)`
    fn mate(&mut self, i: usize, j: usize, grid: &WorldGrid, occupancy: &SpatialIndex) -> Terran {
        let th = self.config.sex_threshold;
        self.terrans[i].spend_energy(th);
        self.terrans[j].spend_energy(th);

        let home = self.terrans[i].cell();
        let birthplace = (self.terrans[i].x, self.terrans[j].y);
        let (x, y) = free_land_near(birthplace, usize::MAX, grid, occupancy).unwrap_or(home);
        Terran::new(x, y, self.config.temp_range)
    }

    fn spread_infection(&mut self, i: usize, nearest: Option<usize>, nearest_dist: f64) {
        if !self.terrans[i].infected {
            return;
        }
        self.terrans[i].damage(self.config.disease_harm);
        if let Some(j) = nearest {
            if nearest_dist <= self.config.disease_spread_radius {
                self.terrans[j].infected = true;
            }
        }
    }

    /// Drowning and climate damage, each applied once per tick
    fn apply_hazards(&mut self, i: usize, grid: &WorldGrid) {
        let damage = self.config.hazard_damage;
        let t = &mut self.terrans[i];
        if !grid.is_land(t.x, t.y) {
            t.damage(damage);
        }
        if !t.tolerates(grid.climate_at(t.x, t.y)) {
            t.damage(damage);
        }
    }

    /// Maybe infect one agent when the crowd around the centroid is too dense
    pub fn outbreak<R: Rng>(&mut self, rng: &mut R) -> bool {
        if self.terrans.is_empty() || !rng.gen_bool(self.config.disease_chance) {
            return false;
        }
        let center = match self.centroid() {
            Some(c) => c,
            None => return false,
        };

        let cluster: Vec<usize> = self
            .terrans
            .iter()
            .enumerate()
            .filter(|(_, t)| {
                t.is_alive()
                    && geometry::torus_distance(t.position(), center, self.size)
                        <= self.config.disease_radius
            })
            .map(|(i, _)| i)
            .collect();
        if cluster.is_empty() || cluster.len() < self.config.disease_overpopulation {
            return false;
        }

        let victim = cluster[rng.gen_range(0..cluster.len())];
        self.terrans[victim].infected = true;
        log::debug!(
            "Outbreak in population {}: {} crowded, terran at ({}, {}) infected",
            self.id,
            cluster.len(),
            self.terrans[victim].x,
            self.terrans[victim].y
        );
        true
    }

    /// Remove dead agents, returns how many were removed
    pub fn prune(&mut self) -> usize {
        let before = self.terrans.len();
        self.terrans.retain(|t| t.is_alive());
        let removed = before - self.terrans.len();
        if removed > 0 && self.terrans.is_empty() {
            log::info!("Population {} went extinct", self.id);
        }
        removed
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// Nearest living agent other than `i`; `(None, INFINITY)` when alone
    pub fn nearest_other(&self, i: usize) -> (Option<usize>, f64) {
        let origin = self.terrans[i].position();
        geometry::nearest(
            origin,
            self.terrans
                .iter()
                .enumerate()
                .filter(|&(j, t)| j != i && t.is_alive())
                .map(|(j, t)| (j, t.position())),
            self.size,
        )
    }

    /// Mean position of living agents
    pub fn centroid(&self) -> Option<Point> {
        let (mut sx, mut sy, mut n) = (0.0, 0.0, 0usize);
        for t in self.terrans.iter().filter(|t| t.is_alive()) {
            sx += t.x as f64;
            sy += t.y as f64;
            n += 1;
        }
        if n == 0 {
            None
        } else {
            Some((sx / n as f64, sy / n as f64))
        }
    }

    /// Living agent farthest from the centroid
    pub fn straggler(&self) -> Option<usize> {
        let center = self.centroid()?;
        geometry::farthest(
            center,
            self.terrans
                .iter()
                .enumerate()
                .filter(|(_, t)| t.is_alive())
                .map(|(i, t)| (i, t.position())),
            self.size,
        )
        .0
    }

    /// Detach an agent, keeping the order of the rest
    pub fn remove(&mut self, idx: usize) -> Terran {
        self.terrans.remove(idx)
    }

    /// Take ownership of an agent from elsewhere
    pub fn adopt(&mut self, terran: Terran) {
        self.terrans.push(terran);
    }

    /// Ordered `(x, y)` of every agent
    pub fn positions(&self) -> Vec<Cell> {
        self.terrans.iter().map(Terran::cell).collect()
    }

    /// Occupancy bitmap, indexed `[[y, x]]`
    pub fn occupancy(&self) -> Array2<bool> {
        SpatialIndex::from_positions(self.size, self.positions()).bitmap()
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn terrans(&self) -> &[Terran] {
        &self.terrans
    }

    pub fn terrans_mut(&mut self) -> &mut [Terran] {
        &mut self.terrans
    }

    pub fn len(&self) -> usize {
        self.terrans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terrans.is_empty()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn spawn_point(&self) -> Cell {
        self.spawn_point
    }

    pub fn last_report(&self) -> TickReport {
        self.last_report
    }

    pub fn config(&self) -> &PopulationConfig {
        &self.config
    }
}

#[inline]
fn midpoint(a: Point, b: Point) -> Point {
    ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0)
}

/// First dry cell around `target` not held by anyone but `idx`, trying `target` itself first
fn free_land_near(
    target: Cell,
    idx: usize,
    grid: &WorldGrid,
    occupancy: &SpatialIndex,
) -> Option<Cell> {
    std::iter::once(target)
        .chain(geometry::area(target, grid.size()))
        .find(|&(x, y)| grid.is_land(x, y) && !occupancy.is_occupied_by_other(x, y, idx))
}

/// Suitability is highest where climate sits at the middle of the tolerance range
fn climate_gradient(climate: &Array2<f64>, temp_range: (f64, f64)) -> Result<Array3<f64>> {
    let mid = (temp_range.0 + temp_range.1) / 2.0;
    let suitability = climate.mapv(|c| -(c - mid).abs());
    geometry::gradient(&suitability)
}

fn is_viable(grid: &WorldGrid, (x, y): Cell, temp_range: (f64, f64), min_vegetation: f64) -> bool {
    let climate = grid.climate_at(x, y);
    grid.is_land(x, y)
        && climate >= temp_range.0
        && climate <= temp_range.1
        && grid.vegetation_at(x, y) >= min_vegetation
}

/// Dry, tolerable and well-vegetated cell, optionally trying the grid center first
pub fn find_spawn_point<R: Rng>(
    grid: &WorldGrid,
    temp_range: (f64, f64),
    try_center: bool,
    rng: &mut R,
) -> Result<Cell> {
    let size = grid.size();
    let min_vegetation = grid.max_vegetation() / 2.0;
    let viable = |cell: Cell| is_viable(grid, cell, temp_range, min_vegetation);

    let center = (size / 2, size / 2);
    if try_center && viable(center) {
        return Ok(center);
    }
    for _ in 0..SPAWN_ATTEMPTS {
        let cell = (rng.gen_range(0..size), rng.gen_range(0..size));
        if viable(cell) {
            return Ok(cell);
        }
    }
    (0..size)
        .flat_map(|y| (0..size).map(move |x| (x, y)))
        .find(|&cell| viable(cell))
        .ok_or(SimError::NoViableSpawn {
            attempts: SPAWN_ATTEMPTS + size * size,
        })
}

/// Random dry, tolerable cell within `spawn_distance` of `origin`, or `origin` itself
fn place_near<R: Rng>(
    grid: &WorldGrid,
    origin: Cell,
    config: &PopulationConfig,
    rng: &mut R,
) -> Cell {
    let d = config.spawn_distance;
    for _ in 0..PLACEMENT_ATTEMPTS {
        let (x, y) = geometry::wrap_cell(
            origin.0 as i64 + rng.gen_range(-d..=d),
            origin.1 as i64 + rng.gen_range(-d..=d),
            grid.size(),
        );
        let climate = grid.climate_at(x, y);
        if grid.is_land(x, y) && climate >= config.temp_range.0 && climate <= config.temp_range.1 {
            return (x, y);
        }
    }
    origin
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{WeatherConfig, WorldConfig};
    use crate::ecology::noise::Field;
    use crate::ecology::weather::Storm;
    use crate::grid::GrowthRates;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const SIZE: usize = 16;

    fn rates() -> GrowthRates {
        GrowthRates {
            v_rate: 0.0,
            r_rate: 0.0,
        }
    }

    /// All land, temperate, no food
    fn barren_grid() -> WorldGrid {
        WorldGrid::from_layers(
            0.5,
            rates(),
            Field::from_elem((SIZE, SIZE), 1.0),
            Field::from_elem((SIZE, SIZE), 0.5),
            Field::zeros((SIZE, SIZE)),
            Field::zeros((SIZE, SIZE)),
        )
        .unwrap()
    }

    fn calm_weather() -> WeatherSystem {
        WeatherSystem::new(
            SIZE,
            &WeatherConfig {
                storm_chance: 0.0,
                ..WeatherConfig::default()
            },
        )
    }

    fn quiet_config() -> PopulationConfig {
        PopulationConfig {
            decay: 0.0,
            disease_chance: 0.0,
            ..PopulationConfig::default()
        }
    }

    fn terran(x: usize, y: usize, energy: f64) -> Terran {
        Terran {
            energy,
            social: 0.5,
            ..Terran::new(x, y, (0.0, 1.0))
        }
    }

    #[test]
    fn test_spawn_on_viable_land() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let world = WorldConfig {
            size: 32,
            ..WorldConfig::default()
        };
        let grid = WorldGrid::generate(&world, 4, &mut rng).unwrap();
        let config = PopulationConfig::default();
        let pop = Population::spawn(0, &grid, &config, &mut rng).unwrap();

        assert_eq!(pop.len(), config.initial_count);
        let (sx, sy) = pop.spawn_point();
        assert!(grid.is_land(sx, sy));
        for t in pop.terrans() {
            assert!(grid.is_land(t.x, t.y));
            assert!(geometry::torus_distance(t.position(), (sx as f64, sy as f64), 32) <= 3.0);
        }
    }

    #[test]
    fn test_no_viable_spawn_on_water_world() {
        let grid = WorldGrid::from_layers(
            0.5,
            rates(),
            Field::zeros((8, 8)),
            Field::from_elem((8, 8), 0.5),
            Field::zeros((8, 8)),
            Field::zeros((8, 8)),
        )
        .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let result = Population::spawn(0, &grid, &PopulationConfig::default(), &mut rng);
        assert!(matches!(result, Err(SimError::NoViableSpawn { .. })));
    }

    #[test]
    fn test_dead_terrans_are_removed() {
        let mut grid = barren_grid();
        let weather = calm_weather();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let config = PopulationConfig {
            disease_harm: 0.1,
            ..quiet_config()
        };

        let mut sick = terran(2, 2, 0.2);
        sick.health = 0.05;
        sick.infected = true;
        let healthy = terran(10, 10, 0.2);
        let mut pop = Population::with_terrans(0, &grid, &config, vec![sick, healthy]).unwrap();

        let report = pop.update(&mut grid, &weather, &mut rng);
        assert_eq!(report.deaths, 1);
        assert_eq!(pop.len(), 1);
        assert_eq!(pop.terrans()[0].cell(), (10, 10));

        for _ in 0..5 {
            pop.update(&mut grid, &weather, &mut rng);
            assert!(pop.terrans().iter().all(|t| t.is_alive() && !t.infected));
        }
    }

    #[test]
    fn test_reproduction_conserves_energy() {
        let mut grid = barren_grid();
        let weather = calm_weather();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let config = quiet_config();

        let parents = vec![terran(5, 5, 0.5), terran(6, 5, 0.5)];
        let mut pop = Population::with_terrans(0, &grid, &config, parents).unwrap();
        let report = pop.update(&mut grid, &weather, &mut rng);

        assert_eq!(report.births, 1);
        assert_eq!(pop.len(), 3);
        for parent in &pop.terrans()[..2] {
            assert!((parent.energy - (0.5 - config.sex_threshold)).abs() < 1e-9);
        }
        let child = &pop.terrans()[2];
        assert_eq!(child.energy, 1.0);
        assert!(grid.is_land(child.x, child.y));
        assert!(!pop.positions()[..2].contains(&child.cell()));
    }

    #[test]
    fn test_no_reproduction_below_threshold_or_at_cap() {
        let mut grid = barren_grid();
        let weather = calm_weather();
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let tired = vec![terran(5, 5, 0.3), terran(6, 5, 0.9)];
        let mut pop = Population::with_terrans(0, &grid, &quiet_config(), tired).unwrap();
        assert_eq!(pop.update(&mut grid, &weather, &mut rng).births, 0);

        let config = PopulationConfig {
            max_population: 2,
            ..quiet_config()
        };
        let rested = vec![terran(5, 5, 0.9), terran(6, 5, 0.9)];
        let mut pop = Population::with_terrans(0, &grid, &config, rested).unwrap();
        assert_eq!(pop.update(&mut grid, &weather, &mut rng).births, 0);
        assert!(pop.terrans().iter().all(|t| t.energy == 0.9));
    }

    #[test]
    fn test_energy_floors_at_zero() {
        let mut grid = barren_grid();
        let weather = calm_weather();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let config = PopulationConfig {
            decay: 0.1,
            ..quiet_config()
        };

        let mut pop =
            Population::with_terrans(0, &grid, &config, vec![terran(3, 3, 0.05)]).unwrap();
        pop.update(&mut grid, &weather, &mut rng);
        assert_eq!(pop.terrans()[0].energy, 0.0);
        assert_eq!(pop.terrans()[0].health, 1.0);

        // exhausted: health pays instead
        pop.update(&mut grid, &weather, &mut rng);
        assert!((pop.terrans()[0].health - (1.0 - config.decay_health)).abs() < 1e-9);
    }

    #[test]
    fn test_infection_spreads_to_neighbor() {
        let mut grid = barren_grid();
        let weather = calm_weather();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let config = quiet_config();

        let mut carrier = terran(5, 5, 0.2);
        carrier.infected = true;
        let far = terran(12, 12, 0.2);
        let near = terran(6, 5, 0.2);
        let mut pop = Population::with_terrans(0, &grid, &config, vec![carrier, far, near]).unwrap();
        pop.update(&mut grid, &weather, &mut rng);

        let terrans = pop.terrans();
        assert!((terrans[0].health - (1.0 - config.disease_harm)).abs() < 1e-9);
        assert!(terrans[2].infected);
        assert!(!terrans[1].infected);
    }

    #[test]
    fn test_outbreak_needs_a_crowd() {
        let grid = barren_grid();
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let crowd: Vec<Terran> = [(5, 5), (6, 5), (5, 6), (6, 6)]
            .iter()
            .map(|&(x, y)| terran(x, y, 1.0))
            .collect();

        let sparse = PopulationConfig {
            disease_chance: 1.0,
            disease_overpopulation: 5,
            ..quiet_config()
        };
        let mut pop = Population::with_terrans(0, &grid, &sparse, crowd.clone()).unwrap();
        assert!(!pop.outbreak(&mut rng));

        let dense = PopulationConfig {
            disease_overpopulation: 4,
            ..sparse
        };
        let mut pop = Population::with_terrans(0, &grid, &dense, crowd).unwrap();
        assert!(pop.outbreak(&mut rng));
        assert_eq!(pop.terrans().iter().filter(|t| t.infected).count(), 1);
    }

    #[test]
    fn test_hazards_apply_once_per_cause() {
        let mut grid = WorldGrid::from_layers(
            0.5,
            rates(),
            Field::zeros((SIZE, SIZE)),
            Field::from_elem((SIZE, SIZE), 0.5),
            Field::zeros((SIZE, SIZE)),
            Field::zeros((SIZE, SIZE)),
        )
        .unwrap();
        let weather = calm_weather();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let config = quiet_config();

        let mut swimmer = terran(4, 4, 1.0);
        swimmer.temp_range = (0.0, 0.4);
        let mut pop = Population::with_terrans(0, &grid, &config, vec![swimmer]).unwrap();
        pop.update(&mut grid, &weather, &mut rng);

        // no dry cell to escape to: drowning plus bad climate
        let t = &pop.terrans()[0];
        assert_eq!(t.cell(), (4, 4));
        assert!((t.health - (1.0 - 2.0 * config.hazard_damage)).abs() < 1e-9);
    }

    #[test]
    fn test_moves_toward_sustenance() {
        let mut vegetation = Field::zeros((SIZE, SIZE));
        vegetation[[5, 6]] = 1.0;
        let mut grid = WorldGrid::from_layers(
            0.5,
            rates(),
            Field::from_elem((SIZE, SIZE), 1.0),
            Field::from_elem((SIZE, SIZE), 0.5),
            vegetation,
            Field::zeros((SIZE, SIZE)),
        )
        .unwrap();
        let weather = calm_weather();
        let mut rng = ChaCha8Rng::seed_from_u64(8);

        let mut pop =
            Population::with_terrans(0, &grid, &quiet_config(), vec![terran(5, 5, 0.5)]).unwrap();
        pop.update(&mut grid, &weather, &mut rng);
        assert_eq!(pop.terrans()[0].cell(), (6, 5));
    }

    #[test]
    fn test_occupied_destination_is_resolved_nearby() {
        let mut vegetation = Field::zeros((SIZE, SIZE));
        vegetation[[5, 6]] = 1.0;
        let mut grid = WorldGrid::from_layers(
            0.5,
            rates(),
            Field::from_elem((SIZE, SIZE), 1.0),
            Field::from_elem((SIZE, SIZE), 0.5),
            vegetation,
            Field::zeros((SIZE, SIZE)),
        )
        .unwrap();
        let weather = calm_weather();
        let mut rng = ChaCha8Rng::seed_from_u64(9);

        let terrans = vec![terran(5, 5, 0.5), terran(6, 5, 0.5)];
        let mut pop = Population::with_terrans(0, &grid, &quiet_config(), terrans).unwrap();
        pop.update(&mut grid, &weather, &mut rng);

        let positions = pop.positions();
        assert_eq!(positions[1], (6, 5));
        assert_ne!(positions[0], (6, 5));
    }

    #[test]
    fn test_flees_nearby_storm() {
        let mut grid = barren_grid();
        let mut weather = calm_weather();
        weather.add_storm(Storm::new((6.0, 6.0), (0.0, 0.0), 1.0));
        weather.rasterize().unwrap();
        assert!(weather.intensity_at(5, 5) > 0.0);

        let mut rng = ChaCha8Rng::seed_from_u64(10);
        let mut pop =
            Population::with_terrans(0, &grid, &quiet_config(), vec![terran(5, 5, 0.5)]).unwrap();
        pop.update(&mut grid, &weather, &mut rng);

        let t = &pop.terrans()[0];
        assert_eq!(t.cell(), (4, 4));
        assert!(t.health < 1.0);
    }

    #[test]
    fn test_lonely_terran_seeks_company_across_edge() {
        let mut grid = barren_grid();
        let weather = calm_weather();
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        let mut lonely = terran(0, 5, 0.2);
        lonely.social = 0.1;
        let friend = terran(SIZE - 3, 5, 0.2);
        let mut pop = Population::with_terrans(0, &grid, &quiet_config(), vec![lonely, friend]).unwrap();
        pop.update(&mut grid, &weather, &mut rng);

        // the friend is three cells west through the wrapped edge
        assert_eq!(pop.terrans()[0].cell(), (SIZE - 1, 5));
    }

    #[test]
    fn test_views() {
        let grid = barren_grid();
        let terrans = vec![terran(1, 2, 1.0), terran(3, 2, 1.0), terran(SIZE + 1, 1, 1.0)];
        let pop = Population::with_terrans(0, &grid, &quiet_config(), terrans).unwrap();

        assert_eq!(pop.positions(), vec![(1, 2), (3, 2), (1, 1)]);
        let occupancy = pop.occupancy();
        assert!(occupancy[[2, 1]] && occupancy[[2, 3]] && occupancy[[1, 1]]);
        assert_eq!(occupancy.iter().filter(|&&o| o).count(), 3);

        let (cx, cy) = pop.centroid().unwrap();
        assert!((cx - 5.0 / 3.0).abs() < 1e-9);
        assert!((cy - 5.0 / 3.0).abs() < 1e-9);
        assert_eq!(pop.straggler(), Some(1));
    }

    #[test]
    fn test_bonding_raises_social_and_solitude_lowers_it() {
        let mut grid = barren_grid();
        let weather = calm_weather();
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        let config = quiet_config();

        let terrans = vec![terran(5, 5, 0.2), terran(6, 5, 0.2), terran(12, 12, 0.2)];
        let mut pop = Population::with_terrans(0, &grid, &config, terrans).unwrap();
        pop.update(&mut grid, &weather, &mut rng);

        let terrans = pop.terrans();
        assert_eq!(pop.positions(), vec![(5, 5), (6, 5), (12, 12)]);
        for bonded in &terrans[..2] {
            assert!((bonded.social - (0.5 + config.decay_social)).abs() < 1e-12);
        }
        assert!((terrans[2].social - (0.5 - config.decay_social)).abs() < 1e-12);
        assert!(terrans.iter().all(|t| t.health == 1.0));
    }

    #[test]
    fn test_isolation_costs_health() {
        let mut grid = barren_grid();
        let weather = calm_weather();
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        let config = quiet_config();

        let mut hermit = terran(8, 8, 0.2);
        hermit.social = 0.0;
        let mut pop = Population::with_terrans(0, &grid, &config, vec![hermit]).unwrap();
        pop.update(&mut grid, &weather, &mut rng);

        let t = &pop.terrans()[0];
        assert_eq!(t.social, 0.0);
        assert!((t.health - (1.0 - config.decay_health)).abs() < 1e-12);
    }

    #[test]
    fn test_crowded_terrans_spread_out() {
        let mut grid = barren_grid();
        let weather = calm_weather();
        let mut rng = ChaCha8Rng::seed_from_u64(14);

        let mut a = terran(5, 5, 0.2);
        let mut b = terran(7, 5, 0.2);
        a.social = 1.0;
        b.social = 1.0;
        let mut pop = Population::with_terrans(0, &grid, &quiet_config(), vec![a, b]).unwrap();
        pop.update(&mut grid, &weather, &mut rng);

        // each steps halfway toward the cell farthest from the other
        assert_eq!(pop.positions(), vec![(4, 4), (8, 6)]);
    }

    #[test]
    fn test_birth_cap_ignores_the_dying() {
        let mut grid = barren_grid();
        let weather = calm_weather();
        let mut rng = ChaCha8Rng::seed_from_u64(15);
        let config = PopulationConfig {
            max_population: 3,
            ..quiet_config()
        };

        let mut dead = terran(12, 12, 0.9);
        dead.health = 0.0;
        let terrans = vec![dead, terran(5, 5, 0.9), terran(6, 5, 0.9)];
        let mut pop = Population::with_terrans(0, &grid, &config, terrans).unwrap();
        let report = pop.update(&mut grid, &weather, &mut rng);

        assert_eq!(report.births, 1);
        assert_eq!(report.deaths, 1);
        assert_eq!(pop.len(), 3);
    }
}
