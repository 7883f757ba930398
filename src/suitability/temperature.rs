//! Temperature Suitability
//!
//! Maps (crop category, temperature) to a score in [0, 1]. Inside the optimal
//! range the score falls linearly from 1.0 at the midpoint to 0.8 at either
//! boundary; outside it drops 0.05 per degree from 0.8, floored at 0.2.

use crate::crops::CropCategory;

/// Score for labels that resolve to no crop category
pub const UNKNOWN_CROP_SUITABILITY: f64 = 0.7;

/// Lowest score a temperature can produce
pub const SUITABILITY_FLOOR: f64 = 0.2;

const BOUNDARY_SCORE: f64 = 0.8;
const IN_RANGE_DROP: f64 = 0.2;
const OUT_OF_RANGE_DROP_PER_DEGREE: f64 = 0.05;

/// Optimal growing temperature range (deg C)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureRange {
    pub min: f64,
    pub max: f64,
}

impl TemperatureRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    pub fn contains(&self, temperature: f64) -> bool {
        self.min <= temperature && temperature <= self.max
    }

    /// Suitability of a temperature for this range
    pub fn suitability(&self, temperature: f64) -> f64 {
        if self.contains(temperature) {
            let half_width = ((self.max - self.min) / 2.0).max(f64::EPSILON);
            let distance = (temperature - self.midpoint()).abs() / half_width;
            1.0 - distance * IN_RANGE_DROP
        } else if temperature < self.min {
            let deficit = self.min - temperature;
            (BOUNDARY_SCORE - deficit * OUT_OF_RANGE_DROP_PER_DEGREE).max(SUITABILITY_FLOOR)
        } else {
            let excess = temperature - self.max;
            (BOUNDARY_SCORE - excess * OUT_OF_RANGE_DROP_PER_DEGREE).max(SUITABILITY_FLOOR)
        }
    }
}

/// Temperature suitability for an optional crop category
///
/// Unknown labels (fine-class crops outside the category table) score 0.7.
pub fn temperature_suitability(category: Option<CropCategory>, temperature: f64) -> f64 {
    match category {
        Some(category) => category.temperature_range().suitability(temperature),
        None => UNKNOWN_CROP_SUITABILITY,
    }
}
