//! Environmental Factor Breakdown
//!
//! Per-factor match percentages reported alongside every recommendation:
//! micronutrient sufficiency, NPK bands, weather (temperature suitability +
//! humidity band) and historical yield consistency.

use serde::Serialize;

use crate::features::FeatureInput;

/// Reported when no historical record backs the recommendation
pub const DEFAULT_HISTORICAL_SCORE: f64 = 70.0;

/// Environmental match breakdown (each 0-100)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentalFactors {
    pub soil_match: f64,
    pub npk_match: f64,
    pub weather_match: f64,
    pub historical_yield: f64,
}

/// Compute the breakdown for one crop
///
/// # Arguments
/// * `input` - Raw readings
/// * `temp_suitability` - Crop-specific temperature suitability (0-1)
/// * `yield_variation` - Historical (mean, std) yield for consistency scoring
pub fn environmental_factors(
    input: &FeatureInput,
    temp_suitability: f64,
    yield_variation: Option<(f64, f64)>,
) -> EnvironmentalFactors {
    EnvironmentalFactors {
        soil_match: round1(soil_match(input)),
        npk_match: round1(npk_match(input)),
        weather_match: round1(weather_match(input.avg_humidity, temp_suitability)),
        historical_yield: round1(historical_consistency(yield_variation)),
    }
}

fn soil_match(input: &FeatureInput) -> f64 {
    let score: f64 = [input.soil_zn, input.soil_fe, input.soil_cu, input.soil_mn]
        .iter()
        .map(|&value| {
            if value >= 50.0 {
                25.0
            } else if value >= 30.0 {
                15.0
            } else {
                0.0
            }
        })
        .sum();
    score.min(100.0)
}

fn npk_match(input: &FeatureInput) -> f64 {
    let mut score = 0.0;
    if (50.0..=200.0).contains(&input.soil_nitrogen) {
        score += 35.0;
    }
    if (10.0..=50.0).contains(&input.soil_phosphorus) {
        score += 35.0;
    }
    if (80.0..=250.0).contains(&input.soil_potassium) {
        score += 30.0;
    }
    score
}

fn weather_match(humidity: f64, temp_suitability: f64) -> f64 {
    let humidity_score = if (40.0..=80.0).contains(&humidity) {
        50.0
    } else if (30.0..=90.0).contains(&humidity) {
        30.0
    } else {
        0.0
    };
    (temp_suitability * 50.0 + humidity_score).min(100.0)
}

/// 100 - coefficient of variation (%), clamped to [50, 100]
fn historical_consistency(yield_variation: Option<(f64, f64)>) -> f64 {
    match yield_variation {
        Some((mean, std)) if mean > 0.0 && std.is_finite() => {
            let cv = std / mean;
            (100.0 - cv * 100.0).clamp(50.0, 100.0)
        }
        _ => DEFAULT_HISTORICAL_SCORE,
    }
}

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
