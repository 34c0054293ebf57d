//! World layers on the toroidal grid and the per-population occupancy index.

use crate::config::{HeightMode, WorldConfig};
use crate::ecology::noise::{self, Field};
use crate::error::{Result, SimError};
use crate::geometry::Cell;
use ndarray::Array2;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Spatial index for fast agent lookups by position
#[derive(Clone, Debug)]
pub struct SpatialIndex {
    grid_size: usize,
    /// cells[y][x] contains indices of agents at that position
    cells: Vec<Vec<Vec<usize>>>,
}

impl SpatialIndex {
    /// Create a new spatial index for the given grid size
    pub fn new(grid_size: usize) -> Self {
        Self {
            grid_size,
            cells: vec![vec![Vec::new(); grid_size]; grid_size],
        }
    }

    /// Build an index from an ordered list of positions
    pub fn from_positions<I: IntoIterator<Item = Cell>>(grid_size: usize, positions: I) -> Self {
        let mut index = Self::new(grid_size);
        for (idx, (x, y)) in positions.into_iter().enumerate() {
            index.insert(x, y, idx);
        }
        index
    }

    /// Insert an agent index at the given position (wrapped onto the grid)
    #[inline]
    pub fn insert(&mut self, x: usize, y: usize, idx: usize) {
        let (x, y) = (x % self.grid_size, y % self.grid_size);
        self.cells[y][x].push(idx);
    }

    /// Remove an agent index from the given position
    #[inline]
    pub fn remove(&mut self, x: usize, y: usize, idx: usize) {
        let (x, y) = (x % self.grid_size, y % self.grid_size);
        self.cells[y][x].retain(|&i| i != idx);
    }

    /// Move an agent index between cells
    pub fn relocate(&mut self, from: Cell, to: Cell, idx: usize) {
        self.remove(from.0, from.1, idx);
        self.insert(to.0, to.1, idx);
    }

    /// Get all agent indices at a specific cell
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> &[usize] {
        &self.cells[y % self.grid_size][x % self.grid_size]
    }

    /// Check if a cell holds anyone other than `idx`
    #[inline]
    pub fn is_occupied_by_other(&self, x: usize, y: usize, idx: usize) -> bool {
        self.get(x, y).iter().any(|&i| i != idx)
    }

    /// Occupancy bitmap, indexed `[[y, x]]`
    pub fn bitmap(&self) -> Array2<bool> {
        Array2::from_shape_fn((self.grid_size, self.grid_size), |(y, x)| {
            !self.cells[y][x].is_empty()
        })
    }
}

/// Regrowth rates of the dynamic layers
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct GrowthRates {
    /// Sustenance regained per tick, up to vegetation capacity
    pub v_rate: f64,
    /// Resource regained per tick, up to 1
    pub r_rate: f64,
}

/// All per-cell layers of the world.
///
/// `height` and `climate` are static after generation. `sustenance` and
/// `resource` change every tick; agents only reach them through
/// [`WorldGrid::consume_sustenance`].
#[derive(Clone, Debug)]
pub struct WorldGrid {
    size: usize,
    water_level: f64,
    rates: GrowthRates,
    height: Field,
    climate: Field,
    vegetation: Field,
    sustenance: Field,
    resource: Field,
}

impl WorldGrid {
    /// Generate every layer from the configuration.
    ///
    /// Terrain (height) is reproducible from `seed`; the scattered layers draw from `rng`.
    pub fn generate<R: Rng>(config: &WorldConfig, seed: u64, rng: &mut R) -> Result<Self> {
        let size = config.size;
        if size == 0 {
            return Err(SimError::InvalidConfig("size must be > 0".to_string()));
        }
        let points = (config.point_density * (size * size) as f64) as usize;

        let height = match config.height_mode {
            HeightMode::Gradient => {
                noise::perlin_field(size, seed, config.height_frequency, config.sigma)?
            }
            HeightMode::Points => noise::generate(size, seed, points.max(1), config.sigma)?,
        };

        let climate = generate_climate(config, points, rng)?;

        // Vegetation and resources are only seeded on dry land inside the growing band
        let (lo, hi) = config.vegetation_bounds;
        let fertile: Vec<Cell> = (0..size)
            .flat_map(|y| (0..size).map(move |x| (x, y)))
            .filter(|&(x, y)| {
                let c = climate[[y, x]];
                height[[y, x]] > config.water_level && c > lo && c < hi
            })
            .collect();

        let veg_points = (points as f64 * config.vegetation_thickness).ceil() as usize;
        let res_points = (points as f64 * config.resource_thickness).ceil() as usize;
        let vegetation = seeded_layer(size, &fertile, veg_points, config.sigma, rng)?
            .map(|v| mask_water(v, &height, config.water_level));
        let resource = seeded_layer(size, &fertile, res_points, config.sigma / 2.0, rng)?;

        let vegetation = vegetation.unwrap_or_else(|| {
            log::warn!("No fertile cells: vegetation layer left empty");
            Field::zeros((size, size))
        });
        let resource = resource.unwrap_or_else(|| Field::zeros((size, size)));

        log::info!(
            "Generated {}x{} world: {} fertile cells, water level {:.2}",
            size,
            size,
            fertile.len(),
            config.water_level
        );

        Self::from_layers(
            config.water_level,
            GrowthRates {
                v_rate: config.v_rate,
                r_rate: config.r_rate,
            },
            height,
            climate,
            vegetation,
            resource,
        )
    }

    /// Assemble a grid from explicit layers; sustenance starts at capacity.
    ///
    /// All layers must be square and of the same size.
    pub fn from_layers(
        water_level: f64,
        rates: GrowthRates,
        height: Field,
        climate: Field,
        vegetation: Field,
        resource: Field,
    ) -> Result<Self> {
        let (rows, cols) = height.dim();
        if rows != cols {
            return Err(SimError::DimensionMismatch {
                left: rows,
                right: cols,
            });
        }
        for layer in [&climate, &vegetation, &resource] {
            let (r, c) = layer.dim();
            if r != rows || c != cols {
                return Err(SimError::DimensionMismatch {
                    left: rows,
                    right: r.max(c),
                });
            }
        }
        let vegetation = vegetation.mapv(|v| v.clamp(0.0, 1.0));
        let resource = resource.mapv(|v| v.clamp(0.0, 1.0));
        Ok(Self {
            size: rows,
            water_level,
            rates,
            sustenance: vegetation.clone(),
            height,
            climate,
            vegetation,
            resource,
        })
    }

    /// Advance one tick
    pub fn update(&mut self) {
        self.grow_vegetation();
    }

    /// Regrow sustenance toward capacity and resource toward 1 wherever resource remains
    pub fn grow_vegetation(&mut self) {
        let GrowthRates { v_rate, r_rate } = self.rates;
        ndarray::Zip::from(&mut self.sustenance)
            .and(&mut self.resource)
            .and(&self.vegetation)
            .for_each(|s, r, &cap| {
                if *r > 0.0 {
                    *s = (*s + v_rate).min(cap);
                    *r = (*r + r_rate).min(1.0);
                }
            });
    }

    /// Take up to `amount` sustenance from a cell, returns the amount taken
    #[inline]
    pub fn consume_sustenance(&mut self, x: usize, y: usize, amount: f64) -> f64 {
        let cell = &mut self.sustenance[[y % self.size, x % self.size]];
        let taken = cell.min(amount.max(0.0));
        *cell -= taken;
        taken
    }

    /// Overwrite sustenance everywhere with its capacity
    pub fn saturate(&mut self) {
        self.sustenance.assign(&self.vegetation);
    }

    #[inline]
    pub fn height_at(&self, x: usize, y: usize) -> f64 {
        self.height[[y % self.size, x % self.size]]
    }

    #[inline]
    pub fn climate_at(&self, x: usize, y: usize) -> f64 {
        self.climate[[y % self.size, x % self.size]]
    }

    #[inline]
    pub fn sustenance_at(&self, x: usize, y: usize) -> f64 {
        self.sustenance[[y % self.size, x % self.size]]
    }

    #[inline]
    pub fn vegetation_at(&self, x: usize, y: usize) -> f64 {
        self.vegetation[[y % self.size, x % self.size]]
    }

    #[inline]
    pub fn resource_at(&self, x: usize, y: usize) -> f64 {
        self.resource[[y % self.size, x % self.size]]
    }

    /// Strictly above the water level
    #[inline]
    pub fn is_land(&self, x: usize, y: usize) -> bool {
        self.height_at(x, y) > self.water_level
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn water_level(&self) -> f64 {
        self.water_level
    }

    pub fn height(&self) -> &Field {
        &self.height
    }

    pub fn climate(&self) -> &Field {
        &self.climate
    }

    pub fn vegetation(&self) -> &Field {
        &self.vegetation
    }

    pub fn sustenance(&self) -> &Field {
        &self.sustenance
    }

    pub fn resource(&self) -> &Field {
        &self.resource
    }

    /// Total sustenance in the grid
    pub fn total_sustenance(&self) -> f64 {
        self.sustenance.sum()
    }

    /// Total resource in the grid
    pub fn total_resource(&self) -> f64 {
        self.resource.sum()
    }

    /// Highest vegetation capacity
    pub fn max_vegetation(&self) -> f64 {
        self.vegetation.iter().copied().fold(0.0, f64::max)
    }
}

/// Random climate seeds, cooled poles, then a wider smoothing pass
fn generate_climate<R: Rng>(config: &WorldConfig, points: usize, rng: &mut R) -> Result<Field> {
    let size = config.size;
    let polar_rows = size / config.polar_divisor;
    let count = ((points as f64 * config.climate_spawn_fraction) as usize).max(1);

    // Seeds land outside the poles, which are flattened anyway
    let temperate = size.saturating_sub(2 * polar_rows).max(1);
    let mut seeds = Field::zeros((size, size));
    for _ in 0..count {
        let y = (polar_rows + rng.gen_range(0..temperate)) % size;
        let x = rng.gen_range(0..size);
        seeds[[y, x]] = rng.gen::<f64>().max(f64::EPSILON);
    }

    let mut climate = noise::gaussian_blur(&seeds, config.sigma)?;
    cool_poles(&mut climate, polar_rows);
    noise::smooth(&climate, config.sigma * 2.0)
}

/// Force the first and last `polar_rows` rows to zero
fn cool_poles(field: &mut Field, polar_rows: usize) {
    let size = field.nrows();
    for y in (0..polar_rows).chain(size.saturating_sub(polar_rows)..size) {
        field.row_mut(y).fill(0.0);
    }
}

/// Smoothed layer seeded on `candidates`; `None` when there is nothing to seed
fn seeded_layer<R: Rng>(
    size: usize,
    candidates: &[Cell],
    count: usize,
    sigma: f64,
    rng: &mut R,
) -> Result<Option<Field>> {
    if candidates.is_empty() || count == 0 {
        return Ok(None);
    }
    let impulses = noise::scatter_on(size, candidates, count, rng);
    Ok(Some(noise::smooth(&impulses, sigma)?))
}

/// Remove capacity below the water line
fn mask_water(mut layer: Field, height: &Field, water_level: f64) -> Field {
    ndarray::Zip::from(&mut layer).and(height).for_each(|v, &h| {
        if h <= water_level {
            *v = 0.0;
        }
    });
    layer
}
