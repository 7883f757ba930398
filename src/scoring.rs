//! Scoring Engine
//!
//! Combines model probability, season affinity and temperature suitability into
//! one 0-100 suitability score per candidate, then ranks candidates.
//!
//! One pipeline serves every model generation. What differs between
//! generations (probability curve, bonus variant, adjustment factors) lives in
//! a `ScoringProfile` chosen once when artifacts are loaded.
//!
//! ```text
//! score = clamp(30 + curve(p) + bonus, 0, 100)
//! score = season_match ? min(100, score * m) + temp_suit * w : score * mismatch
//! score = temp_suit < 0.5 ? score * penalty : score
//! score = clamp(score, 0, 100), discarded when < 30
//! ```

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::crops::CropCategory;
use crate::features::{normalize_key, NormalizedInput};
use crate::suitability::{temperature_suitability, AffinitySet};

/// Constant added to every model-based score before adjustments
pub const BASE_SCORE: f64 = 30.0;

/// Candidates below this score are discarded
pub const MIN_SCORE: f64 = 30.0;

/// Rule-based score: 50 + 40 * temp_suit
pub const RULE_BASE_SCORE: f64 = 50.0;
pub const RULE_TEMPERATURE_WEIGHT: f64 = 40.0;

// ============================================================================
// Probability Curve
// ============================================================================

/// Probability -> points. Coarse models spread probability mass over 16
/// categories, fine models over ~124 raw crops, so the curves differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbabilityCurve {
    Coarse,
    Fine,
}

impl ProbabilityCurve {
    /// Coarse for <= 16 classes, Fine otherwise
    pub fn for_class_count(n_classes: usize) -> Self {
        if n_classes <= CropCategory::all().len() {
            ProbabilityCurve::Coarse
        } else {
            ProbabilityCurve::Fine
        }
    }

    pub fn points(&self, p: f64) -> f64 {
        match self {
            ProbabilityCurve::Coarse => {
                if p >= 0.3 {
                    65.0 + (p - 0.3) * 50.0
                } else if p >= 0.15 {
                    50.0 + (p - 0.15) * 100.0
                } else if p >= 0.05 {
                    30.0 + (p - 0.05) * 200.0
                } else {
                    p * 600.0
                }
            }
            ProbabilityCurve::Fine => (p * 500.0).min(50.0),
        }
    }
}

// ============================================================================
// Environmental Bonus
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentalBonus {
    /// Temperature +8 in [20,32] / +4 in [15,35]; humidity +7 in [50,75] / +3 in [40,80]
    FixedBands,
    /// 15 * temp_suit; humidity +5 in [50,75] / +3 in [40,80]
    TemperatureWeighted,
}

impl EnvironmentalBonus {
    pub fn points(&self, temperature: f64, humidity: f64, temp_suitability: f64) -> f64 {
        match self {
            EnvironmentalBonus::FixedBands => {
                let temperature_points = if (20.0..=32.0).contains(&temperature) {
                    8.0
                } else if (15.0..=35.0).contains(&temperature) {
                    4.0
                } else {
                    0.0
                };
                let humidity_points = if (50.0..=75.0).contains(&humidity) {
                    7.0
                } else if (40.0..=80.0).contains(&humidity) {
                    3.0
                } else {
                    0.0
                };
                temperature_points + humidity_points
            }
            EnvironmentalBonus::TemperatureWeighted => {
                let humidity_points = if (50.0..=75.0).contains(&humidity) {
                    5.0
                } else if (40.0..=80.0).contains(&humidity) {
                    3.0
                } else {
                    0.0
                };
                temp_suitability * 15.0 + humidity_points
            }
        }
    }
}

// ============================================================================
// Scoring Profile
// ============================================================================

/// Season match/mismatch factors
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeasonAdjustment {
    pub match_multiplier: f64,
    /// Points per unit of temperature suitability on a match
    pub match_temperature_weight: f64,
    pub mismatch_multiplier: f64,
}

/// Named scoring variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringVariant {
    /// Fixed-band bonus, x1.25 + 10 * temp_suit on match, x0.35 on mismatch, x0.8 penalty
    #[default]
    Standard,
    /// Temperature-weighted bonus, x1.3 on match, x0.4 on mismatch, x0.7 penalty
    SeasonAware,
}

impl ScoringVariant {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "standard" | "fixed_bands" => Some(ScoringVariant::Standard),
            "season_aware" | "temperature_weighted" => Some(ScoringVariant::SeasonAware),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoringProfile {
    pub variant: ScoringVariant,
    pub curve: ProbabilityCurve,
    pub bonus: EnvironmentalBonus,
    pub season: SeasonAdjustment,
    /// Temperature suitability below which the penalty applies
    pub low_temperature_threshold: f64,
    pub low_temperature_penalty: f64,
}

impl Default for ScoringProfile {
    fn default() -> Self {
        Self::new(ScoringVariant::Standard, ProbabilityCurve::Coarse)
    }
}

impl ScoringProfile {
    pub fn new(variant: ScoringVariant, curve: ProbabilityCurve) -> Self {
        match variant {
            ScoringVariant::Standard => Self {
                variant,
                curve,
                bonus: EnvironmentalBonus::FixedBands,
                season: SeasonAdjustment {
                    match_multiplier: 1.25,
                    match_temperature_weight: 10.0,
                    mismatch_multiplier: 0.35,
                },
                low_temperature_threshold: 0.5,
                low_temperature_penalty: 0.8,
            },
            ScoringVariant::SeasonAware => Self {
                variant,
                curve,
                bonus: EnvironmentalBonus::TemperatureWeighted,
                season: SeasonAdjustment {
                    match_multiplier: 1.3,
                    match_temperature_weight: 0.0,
                    mismatch_multiplier: 0.4,
                },
                low_temperature_threshold: 0.5,
                low_temperature_penalty: 0.7,
            },
        }
    }

    pub fn with_curve(mut self, curve: ProbabilityCurve) -> Self {
        self.curve = curve;
        self
    }

    /// Score one model class
    ///
    /// # Arguments
    /// * `label` - Class label from the encoder (category or raw crop name)
    /// * `probability` - Class probability from the classifier
    /// * `input` - Normalized input
    /// * `affinity` - Resolved season affinity set
    pub fn score_model_candidate(
        &self,
        label: &str,
        probability: f64,
        input: &NormalizedInput,
        affinity: &AffinitySet,
    ) -> Candidate {
        let category = CropCategory::from_label(label);
        let temp_suitability = temperature_suitability(category, input.temperature());
        let season_match = affinity.matches(category);

        let mut score = BASE_SCORE
            + self.curve.points(probability)
            + self.bonus.points(input.temperature(), input.humidity(), temp_suitability);
        score = score.clamp(0.0, 100.0);

        score = if season_match {
            (score * self.season.match_multiplier).min(100.0)
                + temp_suitability * self.season.match_temperature_weight
        } else {
            score * self.season.mismatch_multiplier
        };

        if temp_suitability < self.low_temperature_threshold {
            score *= self.low_temperature_penalty;
        }

        Candidate {
            label: label.to_string(),
            category,
            probability: Some(probability),
            score: score.clamp(0.0, 100.0),
            season_match,
            temp_suitability,
            source: CandidateSource::Model,
        }
    }
}

/// Rule-based candidate for a category: 50 + 40 * temp_suit
pub fn score_rule_candidate(category: CropCategory, temperature: f64, season_match: bool) -> Candidate {
    let temp_suitability = temperature_suitability(Some(category), temperature);
    Candidate {
        label: category.as_str().to_string(),
        category: Some(category),
        probability: None,
        score: (RULE_BASE_SCORE + RULE_TEMPERATURE_WEIGHT * temp_suitability).clamp(0.0, 100.0),
        season_match,
        temp_suitability,
        source: CandidateSource::Rules,
    }
}

// ============================================================================
// Candidates
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    Model,
    Rules,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub label: String,
    pub category: Option<CropCategory>,
    /// None for rule-based candidates
    pub probability: Option<f64>,
    pub score: f64,
    pub season_match: bool,
    pub temp_suitability: f64,
    pub source: CandidateSource,
}

impl Candidate {
    /// Key used to avoid recommending the same crop twice
    pub fn dedup_key(&self) -> String {
        match self.category {
            Some(category) => category.as_str().to_string(),
            None => normalize_key(&self.label),
        }
    }

    pub fn is_usable(&self) -> bool {
        self.score.is_finite() && self.score >= MIN_SCORE
    }
}

/// Season match first, then score descending. Stable, so ties keep insertion order.
pub fn rank(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        b.season_match
            .cmp(&a.season_match)
            .then_with(|| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureInput;
    use crate::season::Season;
    use crate::suitability::SeasonAffinityMap;
    use approx::assert_relative_eq;

    fn rabi_affinity() -> AffinitySet {
        SeasonAffinityMap::empty().resolve("PUNJAB", "LUDHIANA", Some(Season::Rabi))
    }

    #[test]
    fn test_coarse_curve_breakpoints() {
        let curve = ProbabilityCurve::Coarse;
        assert_relative_eq!(curve.points(0.0), 0.0);
        assert_relative_eq!(curve.points(0.04), 24.0, epsilon = 1e-9);
        assert_relative_eq!(curve.points(0.05), 30.0, epsilon = 1e-9);
        assert_relative_eq!(curve.points(0.15), 50.0, epsilon = 1e-9);
        assert_relative_eq!(curve.points(0.3), 65.0, epsilon = 1e-9);
        assert_relative_eq!(curve.points(1.0), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_fine_curve_caps_at_50() {
        let curve = ProbabilityCurve::Fine;
        assert_relative_eq!(curve.points(0.05), 25.0, epsilon = 1e-9);
        assert_relative_eq!(curve.points(0.5), 50.0);
        assert_eq!(ProbabilityCurve::for_class_count(16), ProbabilityCurve::Coarse);
        assert_eq!(ProbabilityCurve::for_class_count(124), ProbabilityCurve::Fine);
    }

    #[test]
    fn test_fixed_band_bonus() {
        let bonus = EnvironmentalBonus::FixedBands;
        assert_eq!(bonus.points(25.0, 60.0, 1.0), 15.0);
        assert_eq!(bonus.points(34.0, 78.0, 1.0), 7.0);
        assert_eq!(bonus.points(40.0, 95.0, 1.0), 0.0);
    }

    #[test]
    fn test_temperature_weighted_bonus() {
        let bonus = EnvironmentalBonus::TemperatureWeighted;
        assert_relative_eq!(bonus.points(25.0, 60.0, 0.8), 17.0, epsilon = 1e-9);
        assert_relative_eq!(bonus.points(25.0, 75.0, 0.0), 5.0);
    }

    #[test]
    fn test_temperature_weighted_humidity_bands() {
        let bonus = EnvironmentalBonus::TemperatureWeighted;
        assert_relative_eq!(bonus.points(25.0, 45.0, 0.0), 3.0);
        assert_relative_eq!(bonus.points(25.0, 80.0, 0.0), 3.0);
        assert_relative_eq!(bonus.points(25.0, 85.0, 0.0), 0.0);
        assert_relative_eq!(bonus.points(25.0, 35.0, 0.0), 0.0);
    }

    #[test]
    fn test_season_match_scoring() {
        // WHEAT at 17.5C: midpoint, temp_suit 1.0; bonus +4 (15-35) +7 (humidity 60)
        let input = FeatureInput::new("PUNJAB", "LUDHIANA", "RABI").with_temperature(17.5);
        let profile = ScoringProfile::default();
        let candidate = profile.score_model_candidate("CEREALS_WHEAT", 0.15, &input.normalized(), &rabi_affinity());

        // (30 + 50 + 11) * 1.25 = 113.75 -> 100, + 10 = 110 -> clamp 100
        assert!(candidate.season_match);
        assert_relative_eq!(candidate.temp_suitability, 1.0);
        assert_relative_eq!(candidate.score, 100.0);
        assert_eq!(candidate.source, CandidateSource::Model);
    }

    #[test]
    fn test_season_mismatch_always_lower() {
        let input = FeatureInput::new("PUNJAB", "LUDHIANA", "RABI").with_temperature(25.0);
        let normalized = input.normalized();
        let profile = ScoringProfile::default();
        let matched = profile.score_model_candidate("PULSES", 0.1, &normalized, &rabi_affinity());
        let kharif = SeasonAffinityMap::empty().resolve("PUNJAB", "LUDHIANA", Some(Season::Kharif));
        let kharif_only = SeasonAffinityMap::empty().resolve("PUNJAB", "LUDHIANA", Some(Season::WholeYear));
        let mismatched = profile.score_model_candidate("PULSES", 0.1, &normalized, &kharif_only);

        assert!(kharif.contains(CropCategory::Pulses));
        assert!(matched.season_match);
        assert!(!mismatched.season_match);
        assert!(mismatched.score < matched.score);

        // (30 + 40 + 15) * 0.35
        assert_relative_eq!(mismatched.score, 29.75, epsilon = 1e-9);
        assert!(!mismatched.is_usable());
    }

    #[test]
    fn test_low_temperature_penalty() {
        // WHEAT at 35C: 10 above range -> 0.3 suitability
        let input = FeatureInput::new("PUNJAB", "LUDHIANA", "RABI").with_temperature(35.0);
        let profile = ScoringProfile::default();
        let candidate = profile.score_model_candidate("CEREALS_WHEAT", 0.05, &input.normalized(), &rabi_affinity());

        // base 30 + 30 + 4 + 7 = 71 -> *1.25 = 88.75 + 3 = 91.75 -> *0.8 = 73.4
        assert_relative_eq!(candidate.temp_suitability, 0.3, epsilon = 1e-9);
        assert_relative_eq!(candidate.score, 73.4, epsilon = 1e-9);
    }

    #[test]
    fn test_season_aware_variant() {
        let input = FeatureInput::new("PUNJAB", "LUDHIANA", "RABI").with_temperature(17.5);
        let profile = ScoringProfile::new(ScoringVariant::SeasonAware, ProbabilityCurve::Coarse);
        let candidate = profile.score_model_candidate("CEREALS_WHEAT", 0.0, &input.normalized(), &rabi_affinity());

        // (30 + 0 + 15 + 5) * 1.3
        assert_relative_eq!(candidate.score, 65.0, epsilon = 1e-9);
    }

    #[test]
    fn test_fine_label_resolves_to_category() {
        let input = FeatureInput::new("PUNJAB", "LUDHIANA", "RABI").with_temperature(20.0);
        let profile = ScoringProfile::default().with_curve(ProbabilityCurve::Fine);
        let candidate = profile.score_model_candidate("Wheat", 0.02, &input.normalized(), &rabi_affinity());
        assert_eq!(candidate.category, Some(CropCategory::CerealsWheat));
        assert!(candidate.season_match);
        assert_eq!(candidate.dedup_key(), "CEREALS_WHEAT");

        let unknown = profile.score_model_candidate("Dragon fruit", 0.02, &input.normalized(), &rabi_affinity());
        assert_eq!(unknown.category, None);
        assert!(!unknown.season_match);
        assert_relative_eq!(unknown.temp_suitability, 0.7);
        assert_eq!(unknown.dedup_key(), "DRAGON FRUIT");
    }

    #[test]
    fn test_rule_score_range() {
        for &category in CropCategory::all() {
            for temperature in [-20.0, 0.0, 17.5, 28.0, 45.0, 80.0] {
                let candidate = score_rule_candidate(category, temperature, true);
                assert!(candidate.score >= 58.0 && candidate.score <= 90.0);
                assert_eq!(candidate.source, CandidateSource::Rules);
            }
        }
    }

    #[test]
    fn test_rank_season_first_then_score_stable() {
        let mk = |label: &str, score: f64, season_match: bool| Candidate {
            label: label.to_string(),
            category: CropCategory::from_label(label),
            probability: None,
            score,
            season_match,
            temp_suitability: 1.0,
            source: CandidateSource::Rules,
        };
        let mut candidates = vec![
            mk("COTTON", 95.0, false),
            mk("PULSES", 60.0, true),
            mk("OILSEEDS", 80.0, true),
            mk("SPICES", 60.0, true),
        ];
        rank(&mut candidates);
        let labels: Vec<_> = candidates.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["OILSEEDS", "PULSES", "SPICES", "COTTON"]);
    }
}
