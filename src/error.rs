//! Error types for the simulation core.

use thiserror::Error;

/// Errors raised while building or stepping the world.
///
/// Per-tick arithmetic (regrowth, decay, clamping) is total and never produces
/// one of these; they come from field generation, configuration and caller bugs.
#[derive(Debug, Error)]
pub enum SimError {
    /// A field was perfectly flat, so min-max normalization would divide by zero.
    #[error("degenerate field: min {min} equals max {max}")]
    DegenerateField { min: f64, max: f64 },

    /// Two position vectors (or a field's axes) had different lengths.
    #[error("dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    /// A configuration value violated its precondition.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// No cell satisfies the spawn constraints of a population.
    #[error("no viable spawn point found after {attempts} attempts")]
    NoViableSpawn { attempts: usize },

    #[error("array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
