//! Procedural scalar fields: gradient noise, scattered impulses, Gaussian
//! smoothing and range normalization.
//!
//! Every generated layer ends with [`normalize`], which refuses perfectly flat
//! fields instead of dividing by zero.

use crate::error::{Result, SimError};
use crate::geometry::wrap;
use ndarray::Array2;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

/// A square scalar layer, indexed `[[y, x]]`
pub type Field = Array2<f64>;

/// Kernel half-width in standard deviations
const TRUNCATE: f64 = 4.0;

/// Smallest `max - min` accepted by [`normalize`]
const FLAT_EPSILON: f64 = 1e-12;

// ============================================================================
// PERLIN NOISE
// ============================================================================

/// Classic 2D Perlin gradient noise
pub struct PerlinNoise {
    perm: [u8; 512],
}

impl PerlinNoise {
    /// Create a generator whose permutation table is shuffled from `seed`
    pub fn new(seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut p: Vec<u8> = (0..=255).collect();
        p.shuffle(&mut rng);

        let mut perm = [0u8; 512];
        for (i, slot) in perm.iter_mut().enumerate() {
            *slot = p[i & 255];
        }
        Self { perm }
    }

    /// Sample noise at `(x, y)`; values lie roughly in [-1, 1] and are 0 on lattice points
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        let x0 = x.floor();
        let y0 = y.floor();
        let xi = (x0 as i64 & 255) as usize;
        let yi = (y0 as i64 & 255) as usize;
        let xf = x - x0;
        let yf = y - y0;

        let u = fade(xf);
        let v = fade(yf);

        let p = &self.perm;
        let n00 = grad(p[p[xi] as usize + yi], xf, yf);
        let n01 = grad(p[p[xi] as usize + yi + 1], xf, yf - 1.0);
        let n11 = grad(p[p[xi + 1] as usize + yi + 1], xf - 1.0, yf - 1.0);
        let n10 = grad(p[p[xi + 1] as usize + yi], xf - 1.0, yf);

        let x1 = lerp(n00, n10, u);
        let x2 = lerp(n01, n11, u);
        lerp(x1, x2, v)
    }
}

/// Quintic fade curve `6t^5 - 15t^4 + 10t^3`
#[inline]
pub fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline]
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + t * (b - a)
}

/// Dot product of the corner gradient selected by `hash` with `(x, y)`
#[inline]
fn grad(hash: u8, x: f64, y: f64) -> f64 {
    match hash % 4 {
        0 => y,
        1 => -y,
        2 => x,
        _ => -x,
    }
}

// ============================================================================
// SMOOTHING AND NORMALIZATION
// ============================================================================

/// Normalized 1D Gaussian kernel truncated at `TRUNCATE` standard deviations
pub fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    if sigma <= 0.0 {
        return vec![1.0];
    }
    let radius = (TRUNCATE * sigma).ceil() as i64;
    let two_s2 = 2.0 * sigma * sigma;
    let mut kernel: Vec<f64> = (-radius..=radius)
        .map(|i| (-(i * i) as f64 / two_s2).exp())
        .collect();
    let sum: f64 = kernel.iter().sum();
    for k in &mut kernel {
        *k /= sum;
    }
    kernel
}

/// Isotropic Gaussian blur with toroidal wrap-around at the edges
pub fn gaussian_blur(field: &Field, sigma: f64) -> Result<Field> {
    if sigma <= 0.0 {
        return Ok(field.clone());
    }
    let (rows, cols) = field.dim();
    let kernel = gaussian_kernel(sigma);
    let radius = (kernel.len() / 2) as i64;

    // Horizontal pass
    let horizontal: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map_iter(|y| {
            let kernel = &kernel;
            (0..cols).map(move |x| {
                kernel
                    .iter()
                    .enumerate()
                    .map(|(k, w)| w * field[[y, wrap(x as i64 + k as i64 - radius, cols)]])
                    .sum::<f64>()
            })
        })
        .collect();
    let horizontal = Array2::from_shape_vec((rows, cols), horizontal)?;

    // Vertical pass
    let vertical: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map_iter(|y| {
            let kernel = &kernel;
            let horizontal = &horizontal;
            (0..cols).map(move |x| {
                kernel
                    .iter()
                    .enumerate()
                    .map(|(k, w)| w * horizontal[[wrap(y as i64 + k as i64 - radius, rows), x]])
                    .sum::<f64>()
            })
        })
        .collect();

    Ok(Array2::from_shape_vec((rows, cols), vertical)?)
}

/// Linearly map `field` from its own [min, max] onto `bounds`.
///
/// Fails with [`SimError::DegenerateField`] when the field is flat or non-finite.
pub fn normalize(field: &Field, bounds: (f64, f64)) -> Result<Field> {
    let min = field.iter().copied().fold(f64::INFINITY, f64::min);
    let max = field.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;
    if !span.is_finite() || span <= FLAT_EPSILON {
        return Err(SimError::DegenerateField { min, max });
    }
    let width = bounds.1 - bounds.0;
    Ok(field.mapv(|v| bounds.0 + (v - min) / span * width))
}

/// Gaussian blur followed by normalization onto [0, 1]
pub fn smooth(field: &Field, sigma: f64) -> Result<Field> {
    normalize(&gaussian_blur(field, sigma)?, (0.0, 1.0))
}

// ============================================================================
// GENERATORS
// ============================================================================

/// Scatter `count` impulses over uniformly random cells (with replacement).
///
/// `value` draws the amplitude of each impulse.
pub fn scatter<R, F>(size: usize, count: usize, rng: &mut R, mut value: F) -> Field
where
    R: Rng,
    F: FnMut(&mut R) -> f64,
{
    let mut field = Field::zeros((size, size));
    for _ in 0..count {
        let idx = rng.gen_range(0..size * size);
        field[[idx / size, idx % size]] = value(rng);
    }
    field
}

/// Scatter `count` unit impulses over the given candidate cells (with replacement)
pub fn scatter_on<R: Rng>(
    size: usize,
    candidates: &[(usize, usize)],
    count: usize,
    rng: &mut R,
) -> Field {
    let mut field = Field::zeros((size, size));
    if candidates.is_empty() {
        return field;
    }
    for _ in 0..count {
        let (x, y) = candidates[rng.gen_range(0..candidates.len())];
        field[[y, x]] = 1.0;
    }
    field
}

/// Sparse-point field: `point_count` unit impulses blurred by `sigma`, normalized to [0, 1].
///
/// Deterministic for a given `seed`.
pub fn generate(size: usize, seed: u64, point_count: usize, sigma: f64) -> Result<Field> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    sparse_field(size, point_count, sigma, &mut rng)
}

/// Sparse-point field drawn from a caller-provided RNG
pub fn sparse_field<R: Rng>(
    size: usize,
    point_count: usize,
    sigma: f64,
    rng: &mut R,
) -> Result<Field> {
    let impulses = scatter(size, point_count, rng, |_| 1.0);
    smooth(&impulses, sigma)
}

/// Perlin field sampled at `frequency` lattice units per cell, smoothed and normalized
pub fn perlin_field(size: usize, seed: u64, frequency: f64, sigma: f64) -> Result<Field> {
    let noise = PerlinNoise::new(seed);
    let data: Vec<f64> = (0..size)
        .into_par_iter()
        .flat_map_iter(|y| {
            let noise = &noise;
            (0..size).map(move |x| noise.sample(x as f64 * frequency, y as f64 * frequency))
        })
        .collect();
    let raw = Array2::from_shape_vec((size, size), data)?;
    smooth(&raw, sigma)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fade_endpoints() {
        assert_eq!(fade(0.0), 0.0);
        assert_eq!(fade(1.0), 1.0);
        assert!((fade(0.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_perlin_zero_on_lattice() {
        let noise = PerlinNoise::new(7);
        assert_eq!(noise.sample(3.0, 5.0), 0.0);
        let v = noise.sample(3.4, 5.7);
        assert!(v.abs() <= 1.0);
    }

    #[test]
    fn test_perlin_field_deterministic() {
        let a = perlin_field(24, 42, 0.1, 1.0).unwrap();
        let b = perlin_field(24, 42, 0.1, 1.0).unwrap();
        let c = perlin_field(24, 43, 0.1, 1.0).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_generated_field_in_unit_range() {
        let field = generate(32, 9, 40, 2.0).unwrap();
        let min = field.iter().copied().fold(f64::INFINITY, f64::min);
        let max = field.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        assert!((min - 0.0).abs() < 1e-12);
        assert!((max - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_kernel_sums_to_one() {
        let kernel = gaussian_kernel(3.0);
        assert_eq!(kernel.len(), 25);
        assert!((kernel.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_blur_preserves_mass_on_torus() {
        let mut field = Field::zeros((10, 10));
        field[[0, 0]] = 1.0;
        let blurred = gaussian_blur(&field, 1.5).unwrap();
        assert!((blurred.sum() - 1.0).abs() < 1e-9);
        // wraps: the opposite corner receives weight
        assert!(blurred[[9, 9]] > 0.0);
    }

    #[test]
    fn test_normalize_flat_field_fails() {
        let flat = Field::from_elem((4, 4), 0.3);
        assert!(matches!(
            normalize(&flat, (0.0, 1.0)),
            Err(SimError::DegenerateField { .. })
        ));
        assert!(smooth(&Field::zeros((4, 4)), 1.0).is_err());
    }

    #[test]
    fn test_normalize_idempotent() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let field = scatter(12, 30, &mut rng, |r| r.gen::<f64>());
        let bounds = (0.0, 1.0);
        let once = normalize(&field, bounds).unwrap();
        let twice = normalize(&once, bounds).unwrap();
        for (a, b) in once.iter().zip(twice.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_scatter_on_respects_candidates() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let field = scatter_on(8, &[(2, 3)], 10, &mut rng);
        assert_eq!(field[[3, 2]], 1.0);
        assert_eq!(field.sum(), 1.0);

        let empty = scatter_on(8, &[], 10, &mut rng);
        assert_eq!(empty.sum(), 0.0);
    }
}
