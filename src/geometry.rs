//! Toroidal geometry shared by the grid, the weather and the agents.
//!
//! Every coordinate that indexes a layer goes through [`wrap`], so the grid
//! behaves as a torus: leaving one edge re-enters on the opposite edge.

use crate::error::{Result, SimError};
use ndarray::{Array2, Array3};
use rayon::prelude::*;

/// Integer grid cell `(x, y)`, always inside `[0, size)`
pub type Cell = (usize, usize);

/// Continuous position `(x, y)`
pub type Point = (f64, f64);

/// Offsets of the 3x3 area, row-major; index [`CENTER`] is the origin itself
pub const AREA_OFFSETS: [(i64, i64); 9] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (0, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Index of the origin inside a 3x3 area
pub const CENTER: usize = 4;

/// Wrap a signed coordinate onto `[0, size)`.
#[inline]
pub fn wrap(coord: i64, size: usize) -> usize {
    let s = size as i64;
    (((coord % s) + s) % s) as usize
}

/// Wrap a signed position onto the grid.
#[inline]
pub fn wrap_cell(x: i64, y: i64, size: usize) -> Cell {
    (wrap(x, size), wrap(y, size))
}

/// Wrap a continuous position onto `[0, size)`.
#[inline]
pub fn wrap_point(p: Point, size: usize) -> Point {
    let s = size as f64;
    (p.0.rem_euclid(s), p.1.rem_euclid(s))
}

/// Shortest signed displacement from `a` to `b` along one wrapped axis.
#[inline]
pub fn torus_delta(a: f64, b: f64, size: usize) -> f64 {
    let s = size as f64;
    let d = (b - a).rem_euclid(s);
    if d > s / 2.0 {
        d - s
    } else {
        d
    }
}

/// Minimum-image Euclidean distance on the torus.
#[inline]
pub fn torus_distance(a: Point, b: Point, size: usize) -> f64 {
    let dx = torus_delta(a.0, b.0, size);
    let dy = torus_delta(a.1, b.1, size);
    (dx * dx + dy * dy).sqrt()
}

/// The image of `target` closest to `origin`, in unwrapped coordinates.
#[inline]
pub fn unwrap_near(origin: Point, target: Point, size: usize) -> Point {
    (
        origin.0 + torus_delta(origin.0, target.0, size),
        origin.1 + torus_delta(origin.1, target.1, size),
    )
}

/// Euclidean distance between two position vectors of equal arity.
pub fn euclidean(v1: &[f64], v2: &[f64]) -> Result<f64> {
    if v1.len() != v2.len() {
        return Err(SimError::DimensionMismatch {
            left: v1.len(),
            right: v2.len(),
        });
    }
    Ok(v1
        .iter()
        .zip(v2)
        .map(|(a, b)| (b - a) * (b - a))
        .sum::<f64>()
        .sqrt())
}

#[inline]
fn planar_distance(a: Point, b: Point) -> f64 {
    ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt()
}

/// One cell of a neighborhood
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    /// Wrapped grid cell
    pub cell: Cell,
    /// Unwrapped position (origin plus offset), used for blending and distances
    pub position: Point,
}

/// The 3x3 toroidal area around a cell
#[derive(Clone, Debug)]
pub struct Neighborhood {
    pub origin: Cell,
    candidates: [Candidate; 9],
}

impl Neighborhood {
    /// Build the area around `origin`, wrapping at the grid edges
    pub fn around(origin: Cell, size: usize) -> Self {
        let (ox, oy) = (origin.0 as i64, origin.1 as i64);
        let candidates = AREA_OFFSETS.map(|(dx, dy)| Candidate {
            cell: wrap_cell(ox + dx, oy + dy, size),
            position: ((ox + dx) as f64, (oy + dy) as f64),
        });
        Self { origin, candidates }
    }

    #[inline]
    pub fn candidates(&self) -> &[Candidate; 9] {
        &self.candidates
    }

    /// Candidate closest to `target` (given in the same unwrapped frame)
    pub fn path_toward(&self, target: Point) -> Candidate {
        let mut best = self.candidates[CENTER];
        let mut best_dist = f64::INFINITY;
        for c in &self.candidates {
            let dist = planar_distance(c.position, target);
            if dist < best_dist {
                best_dist = dist;
                best = *c;
            }
        }
        best
    }

    /// Candidate farthest from `target` (given in the same unwrapped frame)
    pub fn path_away(&self, target: Point) -> Candidate {
        let mut best = self.candidates[CENTER];
        let mut best_dist = f64::NEG_INFINITY;
        for c in &self.candidates {
            let dist = planar_distance(c.position, target);
            if dist > best_dist {
                best_dist = dist;
                best = *c;
            }
        }
        best
    }
}

/// The 3x3 wrapped area around `coords`, row-major.
pub fn area(coords: Cell, size: usize) -> [Cell; 9] {
    Neighborhood::around(coords, size).candidates.map(|c| c.cell)
}

/// Per-cell differences to the 3x3 neighbors: `out[[y, x, k]] = field[n_k] - field[[y, x]]`.
///
/// The field must be square, since the grid is.
pub fn gradient(field: &Array2<f64>) -> Result<Array3<f64>> {
    let (rows, cols) = field.dim();
    if rows != cols {
        return Err(SimError::DimensionMismatch {
            left: rows,
            right: cols,
        });
    }
    let size = rows;

    let data: Vec<f64> = (0..size)
        .into_par_iter()
        .flat_map_iter(|y| {
            (0..size).flat_map(move |x| {
                let here = field[[y, x]];
                area((x, y), size)
                    .into_iter()
                    .map(move |(nx, ny)| field[[ny, nx]] - here)
            })
        })
        .collect();

    Ok(Array3::from_shape_vec((size, size, 9), data)?)
}

/// Nearest point to `origin` on the torus.
///
/// Returns `(None, f64::INFINITY)` when `points` is empty; callers must branch on it.
pub fn nearest<I>(origin: Point, points: I, size: usize) -> (Option<usize>, f64)
where
    I: IntoIterator<Item = (usize, Point)>,
{
    let mut best = None;
    let mut best_dist = f64::INFINITY;
    for (idx, p) in points {
        let dist = torus_distance(origin, p, size);
        if dist < best_dist {
            best = Some(idx);
            best_dist = dist;
        }
    }
    (best, best_dist)
}

/// Farthest point from `origin` on the torus.
///
/// Returns `(None, f64::NEG_INFINITY)` when `points` is empty.
pub fn farthest<I>(origin: Point, points: I, size: usize) -> (Option<usize>, f64)
where
    I: IntoIterator<Item = (usize, Point)>,
{
    let mut best = None;
    let mut best_dist = f64::NEG_INFINITY;
    for (idx, p) in points {
        let dist = torus_distance(origin, p, size);
        if dist > best_dist {
            best = Some(idx);
            best_dist = dist;
        }
    }
    (best, best_dist)
}
