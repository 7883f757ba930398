//! Suitability Signals
//!
//! Deterministic, model-free signals that feed the scoring engine:
//! - `temperature.rs` - (crop category, temperature) -> [0, 1]
//! - `affinity.rs` - crops historically grown per location and season
//! - `environment.rs` - per-factor environmental match breakdown

pub mod temperature;
pub mod affinity;
pub mod environment;

// Re-export public API
pub use temperature::{TemperatureRange, temperature_suitability, UNKNOWN_CROP_SUITABILITY, SUITABILITY_FLOOR};
pub use affinity::{AffinityLevel, AffinitySet, SeasonAffinityMap};
pub use environment::{EnvironmentalFactors, environmental_factors};
