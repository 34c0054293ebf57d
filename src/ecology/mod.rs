//! Environmental systems of the world.
//!
//! This module contains:
//! - Procedural noise fields (terrain, climate, vegetation seeding)
//! - Weather (moving, decaying storms rasterized onto a layer)
//! - Rivalry between populations (defection and combat)

pub mod noise;
pub mod rivalry;
pub mod weather;

pub use noise::{Field, PerlinNoise};
pub use rivalry::{CombatOutcome, RivalryReport};
pub use weather::{Storm, StormPhase, WeatherSystem};
