//! Yield Estimator
//!
//! Produces an expected yield range (kg/hectare) for a ranked candidate. Sources
//! are tried from most to least specific and never combined beyond the
//! model/history blend:
//!
//! 1. Season profile for (location, season, category): mean * temp_suit +- std
//! 2. Yield regressor (log tonnes/ha), blended 40/60 with district history
//! 3. Static per-category base yield * temp_suit, +-30%
//!
//! Any failure yields the safe default 1000 / 2000 / 3000.

use serde::Serialize;
use tracing::warn;

use crate::crops::base_yield_for;
use crate::encoder::encode_yield_features;
use crate::error::ModelError;
use crate::features::NormalizedInput;
use crate::model::{ModelContext, RegressorInput};
use crate::scoring::Candidate;

pub const YIELD_UNIT: &str = "kg/hectare";

/// Floor for expected yield (kg/ha)
pub const MIN_EXPECTED_YIELD: f64 = 100.0;

/// Floor for the low end of a range (kg/ha)
pub const MIN_RANGE_YIELD: f64 = 50.0;

/// Model share of the model/history blend
const MODEL_WEIGHT: f64 = 0.4;

/// Yield range in kg/hectare, rounded to whole kilograms
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YieldRange {
    pub min: f64,
    pub max: f64,
    pub expected: f64,
    pub unit: String,
}

impl YieldRange {
    pub fn new(min: f64, max: f64, expected: f64) -> Self {
        Self { min, max, expected, unit: YIELD_UNIT.to_string() }
    }

    pub fn safe_default() -> Self {
        Self::new(1000.0, 3000.0, 2000.0)
    }

    /// Enforce expected >= 100, min >= 50, min <= expected <= max, then round
    fn guarded(self) -> Self {
        let expected = self.expected.max(MIN_EXPECTED_YIELD);
        let min = self.min.max(MIN_RANGE_YIELD).min(expected);
        let max = self.max.max(expected);
        Self::new(min.round(), max.round(), expected.round())
    }

    fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.expected.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum YieldSource {
    SeasonProfile,
    Model,
    ModelWithHistory,
    Rules,
    SafeDefault,
}

#[derive(Debug, Clone, PartialEq)]
pub struct YieldEstimate {
    pub range: YieldRange,
    pub source: YieldSource,
}

/// Estimates yields against one model context
pub struct YieldEstimator<'a> {
    context: &'a ModelContext,
}

impl<'a> YieldEstimator<'a> {
    pub fn new(context: &'a ModelContext) -> Self {
        Self { context }
    }

    /// Estimate the yield range for a candidate
    ///
    /// # Arguments
    /// * `candidate` - Scored candidate (label, category, temperature suitability)
    /// * `input` - Normalized input
    /// * `scaled` - Scaled classifier vector of this call, if the model ran
    pub fn estimate(&self, candidate: &Candidate, input: &NormalizedInput, scaled: Option<&[f64]>) -> YieldEstimate {
        let estimate = match self.try_estimate(candidate, input, scaled) {
            Ok(estimate) if estimate.range.is_finite() => estimate,
            Ok(_) => {
                warn!("Non-finite yield estimate for {}, using safe default", candidate.label);
                Self::safe_default()
            }
            Err(e) => {
                warn!("Yield prediction failed for {}: {}", candidate.label, e);
                Self::safe_default()
            }
        };

        YieldEstimate { range: estimate.range.guarded(), source: estimate.source }
    }

    fn safe_default() -> YieldEstimate {
        YieldEstimate { range: YieldRange::safe_default(), source: YieldSource::SafeDefault }
    }

    fn try_estimate(
        &self,
        candidate: &Candidate,
        input: &NormalizedInput,
        scaled: Option<&[f64]>,
    ) -> Result<YieldEstimate, ModelError> {
        let temp_suitability = candidate.temp_suitability;

        // 1. Season profile
        if let Some(category) = candidate.category {
            if let Some(profile) = self.context.season_profiles.get(&input.season_location_key(), category) {
                let expected = profile.yield_mean * temp_suitability;
                return Ok(YieldEstimate {
                    range: YieldRange::new(
                        (expected - profile.yield_std).max(MIN_EXPECTED_YIELD),
                        expected + profile.yield_std,
                        expected,
                    ),
                    source: YieldSource::SeasonProfile,
                });
            }
        }

        // 2. Regressor with optional district blend
        if let Some(tonnes) = self.predict_tonnes(candidate, input, scaled)? {
            return Ok(self.blend_with_history(candidate, input, tonnes));
        }

        // 3. Rule default
        let expected = base_yield_for(candidate.category) * temp_suitability;
        Ok(YieldEstimate {
            range: YieldRange::new(expected * 0.7, expected * 1.3, expected),
            source: YieldSource::Rules,
        })
    }

    /// Regressor prediction in tonnes/ha, None when no regressor applies
    fn predict_tonnes(
        &self,
        candidate: &Candidate,
        input: &NormalizedInput,
        scaled: Option<&[f64]>,
    ) -> Result<Option<f64>, ModelError> {
        let Some(artifacts) = &self.context.artifacts else {
            return Ok(None);
        };
        let Some(regressor) = &artifacts.regressor else {
            return Ok(None);
        };

        let log_yield = match artifacts.generation.regressor_input() {
            RegressorInput::CropFeatures => {
                let features = encode_yield_features(input, &artifacts.tables, &candidate.label);
                regressor.predict(&features)?
            }
            RegressorInput::ScaledClassifierFeatures => match scaled {
                Some(features) => regressor.predict(features)?,
                None => return Ok(None),
            },
        };

        let tonnes = libm::expm1(log_yield);
        if tonnes.is_finite() {
            Ok(Some(tonnes))
        } else {
            Err(ModelError::NonFinite)
        }
    }

    fn blend_with_history(&self, candidate: &Candidate, input: &NormalizedInput, tonnes: f64) -> YieldEstimate {
        let model_kg = tonnes * 1000.0;

        let (expected, min, max, source) =
            match self.context.district_profiles.get(&input.location_key(), &candidate.label) {
                Some(history) => {
                    let hist_avg = history.avg_yield * 1000.0;
                    let hist_min = history.min_yield.unwrap_or(tonnes * 0.7) * 1000.0;
                    let hist_max = history.max_yield.unwrap_or(tonnes * 1.3) * 1000.0;
                    (
                        MODEL_WEIGHT * model_kg + (1.0 - MODEL_WEIGHT) * hist_avg,
                        (model_kg * 0.8).min(hist_min),
                        (model_kg * 1.2).max(hist_max),
                        YieldSource::ModelWithHistory,
                    )
                }
                None => (model_kg, model_kg * 0.8, model_kg * 1.2, YieldSource::Model),
            };

        let expected = expected.max(MIN_EXPECTED_YIELD);
        let min = min.max(MIN_RANGE_YIELD);
        let max = max.max(expected * 1.1);

        YieldEstimate { range: YieldRange::new(min, max, expected), source }
    }
}

/// Historical (mean, std) backing a candidate, used for consistency scoring
pub fn historical_variation(
    context: &ModelContext,
    candidate: &Candidate,
    input: &NormalizedInput,
) -> Option<(f64, f64)> {
    if let Some(category) = candidate.category {
        if let Some(profile) = context.season_profiles.get(&input.season_location_key(), category) {
            return Some((profile.yield_mean, profile.yield_std));
        }
    }

    context
        .district_profiles
        .get(&input.location_key(), &candidate.label)
        .map(|h| (h.avg_yield, h.std_yield.unwrap_or(0.0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crops::CropCategory;
    use crate::encoder::EncoderTables;
    use crate::features::FeatureInput;
    use crate::model::{Classifier, ModelGeneration, Regressor, StandardScaler, TrainedArtifacts};
    use crate::profiles::{DistrictCropHistory, DistrictProfiles, SeasonProfiles, YieldProfile};
    use crate::scoring::score_rule_candidate;
    use std::sync::Arc;

    #[derive(Debug)]
    struct UniformClassifier;

    impl Classifier for UniformClassifier {
        fn n_features(&self) -> usize {
            21
        }
        fn n_classes(&self) -> usize {
            2
        }
        fn predict_proba(&self, _features: &[f64]) -> Result<Vec<f64>, ModelError> {
            Ok(vec![0.5, 0.5])
        }
    }

    #[derive(Debug)]
    struct ConstantRegressor(f64);

    impl Regressor for ConstantRegressor {
        fn n_features(&self) -> usize {
            20
        }
        fn predict(&self, _features: &[f64]) -> Result<f64, ModelError> {
            Ok(self.0)
        }
    }

    fn v2_context(log_yield: f64) -> ModelContext {
        let tables = EncoderTables {
            crop_classes: vec!["CEREALS_WHEAT".to_string(), "PULSES".to_string()].into(),
            ..EncoderTables::default()
        };
        let artifacts = TrainedArtifacts::new(
            ModelGeneration::V2,
            Arc::new(UniformClassifier),
            Some(Arc::new(ConstantRegressor(log_yield))),
            StandardScaler::identity(21),
            tables,
        )
        .unwrap();
        ModelContext::rule_based().with_artifacts(artifacts)
    }

    fn wheat(temperature: f64) -> Candidate {
        score_rule_candidate(CropCategory::CerealsWheat, temperature, true)
    }

    #[test]
    fn test_rule_default() {
        let context = ModelContext::rule_based();
        let input = FeatureInput::new("PUNJAB", "LUDHIANA", "RABI").with_temperature(17.5);
        let estimate = YieldEstimator::new(&context).estimate(&wheat(17.5), &input.normalized(), None);

        assert_eq!(estimate.source, YieldSource::Rules);
        assert_eq!(estimate.range, YieldRange::new(2450.0, 4550.0, 3500.0));
        assert_eq!(estimate.range.unit, "kg/hectare");
    }

    #[test]
    fn test_season_profile_first() {
        let mut profiles = SeasonProfiles::default();
        profiles.insert(
            "PUNJAB_LUDHIANA_RABI",
            CropCategory::CerealsWheat,
            YieldProfile { yield_mean: 4000.0, yield_std: 3950.0, avg_area: None, record_count: 8 },
        );
        let context = v2_context(1.0).with_season_profiles(profiles);
        let input = FeatureInput::new("Punjab", "Ludhiana", "Rabi").with_temperature(17.5);
        let estimate = YieldEstimator::new(&context).estimate(&wheat(17.5), &input.normalized(), None);

        assert_eq!(estimate.source, YieldSource::SeasonProfile);
        assert_eq!(estimate.range, YieldRange::new(100.0, 7950.0, 4000.0));
    }

    #[test]
    fn test_regressor_without_history() {
        // expm1(ln 4) = 3 tonnes
        let context = v2_context(4.0_f64.ln());
        let input = FeatureInput::new("PUNJAB", "LUDHIANA", "RABI");
        let estimate = YieldEstimator::new(&context).estimate(&wheat(20.0), &input.normalized(), None);

        assert_eq!(estimate.source, YieldSource::Model);
        assert_eq!(estimate.range, YieldRange::new(2400.0, 3600.0, 3000.0));
    }

    #[test]
    fn test_regressor_blended_with_history() {
        let mut districts = DistrictProfiles::default();
        districts.insert(
            "PUNJAB_LUDHIANA",
            "CEREALS_WHEAT",
            DistrictCropHistory { avg_yield: 4.0, min_yield: Some(3.0), max_yield: Some(4.2), std_yield: Some(0.4), num_records: 10 },
        );
        let context = v2_context(4.0_f64.ln()).with_district_profiles(districts);
        let input = FeatureInput::new("PUNJAB", "LUDHIANA", "RABI");
        let candidate = wheat(20.0);
        let estimate = YieldEstimator::new(&context).estimate(&candidate, &input.normalized(), None);

        // 0.4 * 3000 + 0.6 * 4000
        assert_eq!(estimate.source, YieldSource::ModelWithHistory);
        assert_eq!(estimate.range, YieldRange::new(2400.0, 4200.0, 3600.0));
        assert_eq!(historical_variation(&context, &candidate, &input.normalized()), Some((4.0, 0.4)));
    }

    #[test]
    fn test_tiny_model_yield_is_floored() {
        let context = v2_context(0.0);
        let input = FeatureInput::new("PUNJAB", "LUDHIANA", "RABI");
        let estimate = YieldEstimator::new(&context).estimate(&wheat(20.0), &input.normalized(), None);

        assert_eq!(estimate.range.expected, 100.0);
        assert!(estimate.range.min >= 50.0);
        assert!(estimate.range.max >= 110.0);
    }

    #[test]
    fn test_overflow_uses_safe_default() {
        let context = v2_context(1.0e6);
        let input = FeatureInput::new("PUNJAB", "LUDHIANA", "RABI");
        let estimate = YieldEstimator::new(&context).estimate(&wheat(20.0), &input.normalized(), None);

        assert_eq!(estimate.source, YieldSource::SafeDefault);
        assert_eq!(estimate.range, YieldRange::safe_default());
    }

    #[test]
    fn test_ranges_are_ordered() {
        let context = ModelContext::rule_based();
        for &category in CropCategory::all() {
            for temperature in [-10.0, 15.0, 30.0, 60.0] {
                let input = FeatureInput::default().with_temperature(temperature);
                let candidate = score_rule_candidate(category, temperature, true);
                let range = YieldEstimator::new(&context).estimate(&candidate, &input.normalized(), None).range;
                assert!(range.expected >= 100.0);
                assert!(range.min >= 50.0);
                assert!(range.min <= range.expected && range.expected <= range.max);
            }
        }
    }
}
