//! Crop Predictor
//!
//! Orchestrates one prediction:
//!
//! ```text
//! FeatureInput -> normalize -> resolve season affinity
//!   -> model available?  encode -> scale -> predict_proba -> score every class
//!      otherwise         rule-score the affinity set
//!   -> fewer than 5 usable? supplement with rule candidates (no duplicate category)
//!   -> rank -> top N -> yield + explanation + environmental factors
//! ```
//!
//! A model error on one call (shape mismatch, non-finite output) is logged and
//! that call alone is answered by the rule path. The context is never changed
//! by a failing call.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

use crate::crops::CropCategory;
use crate::encoder::FeatureSchema;
use crate::error::ModelError;
use crate::explanation::ExplanationGenerator;
use crate::features::{FeatureInput, NormalizedInput};
use crate::model::{ModelContext, ModelGeneration, TrainedArtifacts};
use crate::scoring::{rank, score_rule_candidate, Candidate, CandidateSource, ScoringProfile};
use crate::suitability::environment::round1;
use crate::suitability::{environmental_factors, AffinitySet, EnvironmentalFactors};
use crate::yield_estimate::{historical_variation, YieldEstimator, YieldRange};

/// Upper bound on recommendations per call
pub const MAX_RECOMMENDATIONS: usize = 5;

/// One recommended crop
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub crop_name: String,
    /// 0-100, one decimal
    pub suitability_score: f64,
    pub yield_prediction: YieldRange,
    pub explanation: String,
    pub environmental_factors: EnvironmentalFactors,
    pub season_match: bool,
    /// Percent, one decimal
    pub temperature_suitability: f64,
    pub source: CandidateSource,
}

/// Loaded model summary for status reporting
#[derive(Debug, Clone, Serialize)]
pub struct ModelStatus {
    pub model_available: bool,
    pub model_version: &'static str,
    pub generation: Option<ModelGeneration>,
    pub feature_schema: Option<FeatureSchema>,
    pub n_features: Option<usize>,
    pub n_classes: Option<usize>,
    pub has_yield_regressor: bool,
    pub scoring: ScoringProfile,
    pub affinity_locations: usize,
    pub season_profiles: usize,
    pub district_profiles: usize,
    pub model_dir: Option<PathBuf>,
    pub top_n: usize,
}

/// Crop recommendation engine over an immutable model context
#[derive(Debug, Clone)]
pub struct CropPredictor {
    context: Arc<ModelContext>,
    top_n: usize,
}

impl CropPredictor {
    pub fn new(context: ModelContext) -> Self {
        Self { context: Arc::new(context), top_n: MAX_RECOMMENDATIONS }
    }

    /// Rule-only predictor with default season sets
    pub fn rule_based() -> Self {
        Self::new(ModelContext::rule_based())
    }

    /// Limit the number of recommendations (1..=5)
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n.clamp(1, MAX_RECOMMENDATIONS);
        self
    }

    pub fn context(&self) -> &ModelContext {
        &self.context
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    /// "v3" / "v2" / "v1", or "rules" without a model
    pub fn model_version(&self) -> &'static str {
        self.context.generation().map(|g| g.as_str()).unwrap_or("rules")
    }

    pub fn status(&self) -> ModelStatus {
        let artifacts = self.context.artifacts.as_deref();
        ModelStatus {
            model_available: artifacts.is_some(),
            model_version: self.model_version(),
            generation: artifacts.map(|a| a.generation),
            feature_schema: artifacts.map(|a| a.schema),
            n_features: artifacts.map(|a| a.classifier.n_features()),
            n_classes: artifacts.map(|a| a.classifier.n_classes()),
            has_yield_regressor: artifacts.map(|a| a.regressor.is_some()).unwrap_or(false),
            scoring: self.context.scoring,
            affinity_locations: self.context.affinity.len(),
            season_profiles: self.context.season_profiles.len(),
            district_profiles: self.context.district_profiles.len(),
            model_dir: self.context.model_dir.clone(),
            top_n: self.top_n,
        }
    }

    /// Ranked recommendations for one input (at most `top_n`)
    pub fn predict(&self, input: &FeatureInput) -> Vec<Recommendation> {
        let normalized = input.normalized();
        let affinity = self.context.affinity.resolve(&normalized.state, &normalized.district, normalized.season);
        debug!(
            "Season {} crops for {}/{}: {} ({:?})",
            normalized.season_label,
            normalized.state,
            normalized.district,
            affinity.len(),
            affinity.level
        );

        let (mut candidates, scaled) = match &self.context.artifacts {
            Some(artifacts) => match self.score_with_model(artifacts, &normalized, &affinity) {
                Ok((candidates, scaled)) => (candidates, Some(scaled)),
                Err(e) => {
                    warn!("Model prediction failed, falling back to rules: {}", e);
                    (rule_candidates(&normalized, &affinity), None)
                }
            },
            None => (rule_candidates(&normalized, &affinity), None),
        };

        if candidates.len() < MAX_RECOMMENDATIONS {
            supplement(&mut candidates, rule_candidates(&normalized, &affinity));
        }

        rank(&mut candidates);
        candidates.truncate(self.top_n);

        let estimator = YieldEstimator::new(&self.context);
        candidates
            .iter()
            .map(|candidate| self.recommend(candidate, &normalized, &estimator, scaled.as_deref()))
            .collect()
    }

    /// Predictions for many inputs in parallel; output order matches input order
    pub fn predict_batch(&self, inputs: &[FeatureInput]) -> Vec<Vec<Recommendation>> {
        inputs.par_iter().map(|input| self.predict(input)).collect()
    }

    /// Score every classifier class, returning usable candidates and the scaled vector
    fn score_with_model(
        &self,
        artifacts: &TrainedArtifacts,
        input: &NormalizedInput,
        affinity: &AffinitySet,
    ) -> Result<(Vec<Candidate>, Vec<f64>), ModelError> {
        let district_yield = match artifacts.schema {
            FeatureSchema::Spread21 => self.context.district_profiles.district_yield_mean(&input.location_key()),
            _ => None,
        };

        let encoded = artifacts.schema.encode(input, &artifacts.tables, district_yield);
        let scaled = artifacts.scaler.transform(&encoded.values)?;
        let probabilities = artifacts.classifier.predict_proba(&scaled)?;

        if probabilities.is_empty() {
            return Err(ModelError::NoClasses);
        }
        if probabilities.iter().any(|p| !p.is_finite()) {
            return Err(ModelError::NonFinite);
        }

        let scoring = &self.context.scoring;
        let candidates = probabilities
            .iter()
            .enumerate()
            .filter_map(|(idx, &p)| {
                let label = artifacts.tables.crop_classes.decode(idx)?;
                Some(scoring.score_model_candidate(label, p, input, affinity))
            })
            .filter(|c| c.is_usable())
            .collect();

        Ok((candidates, scaled))
    }

    fn recommend(
        &self,
        candidate: &Candidate,
        input: &NormalizedInput,
        estimator: &YieldEstimator,
        scaled: Option<&[f64]>,
    ) -> Recommendation {
        let estimate = estimator.estimate(candidate, input, scaled);
        let history = historical_variation(&self.context, candidate, input);

        Recommendation {
            crop_name: candidate.label.clone(),
            suitability_score: round1(candidate.score),
            yield_prediction: estimate.range,
            explanation: ExplanationGenerator::generate(candidate, input, history.is_some()),
            environmental_factors: environmental_factors(input.raw, candidate.temp_suitability, history),
            season_match: candidate.season_match,
            temperature_suitability: round1(candidate.temp_suitability * 100.0),
            source: candidate.source,
        }
    }
}

/// Rule-based candidates for the affinity set
///
/// An empty set falls back to the season defaults. An unknown season has
/// none, so every category is scored without a season match and the result
/// is never empty.
fn rule_candidates(input: &NormalizedInput, affinity: &AffinitySet) -> Vec<Candidate> {
    let temperature = input.temperature();
    let mut candidates: Vec<Candidate> = match (affinity.is_empty(), input.season) {
        (false, _) => affinity
            .iter()
            .map(|category| score_rule_candidate(category, temperature, true))
            .collect(),
        (true, Some(season)) => season
            .default_crops()
            .iter()
            .map(|&category| score_rule_candidate(category, temperature, true))
            .collect(),
        (true, None) => CropCategory::all()
            .iter()
            .map(|&category| score_rule_candidate(category, temperature, false))
            .collect(),
    };

    candidates.retain(|c| c.is_usable());
    rank(&mut candidates);
    candidates
}

/// Append rule candidates whose crop category is not already present
fn supplement(candidates: &mut Vec<Candidate>, rules: Vec<Candidate>) {
    let mut present: HashSet<String> = candidates.iter().map(|c| c.dedup_key()).collect();
    for candidate in rules {
        if present.insert(candidate.dedup_key()) {
            candidates.push(candidate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::season::Season;
    use crate::suitability::{AffinityLevel, SeasonAffinityMap};

    #[test]
    fn test_rule_mode_rabi() {
        let predictor = CropPredictor::rule_based();
        let input = FeatureInput::new("PUNJAB", "LUDHIANA", "RABI").with_temperature(20.0);
        let recommendations = predictor.predict(&input);

        assert_eq!(recommendations.len(), 5);
        let rabi = Season::Rabi.default_crops();
        for rec in &recommendations {
            let category = CropCategory::from_label(&rec.crop_name).unwrap();
            assert!(rabi.contains(&category));
            assert!(rec.suitability_score >= 50.0 && rec.suitability_score <= 90.0);
            assert!(rec.season_match);
            assert_eq!(rec.source, CandidateSource::Rules);
        }
        // Sorted by score
        for pair in recommendations.windows(2) {
            assert!(pair[0].suitability_score >= pair[1].suitability_score);
        }
    }

    #[test]
    fn test_district_affinity_drives_rule_candidates() {
        let mut affinity = SeasonAffinityMap::empty();
        affinity.insert(Season::Kharif, "PUNJAB_LUDHIANA", &[CropCategory::CerealsRice, CropCategory::Cotton]);
        let predictor = CropPredictor::new(ModelContext::rule_based().with_affinity(affinity));

        let recommendations = predictor.predict(&FeatureInput::new("punjab", "ludhiana", "kharif"));
        let names: Vec<_> = recommendations.iter().map(|r| r.crop_name.as_str()).collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"CEREALS_RICE"));
        assert!(names.contains(&"COTTON"));
    }

    #[test]
    fn test_unknown_season_still_answers() {
        let predictor = CropPredictor::rule_based();
        let recommendations = predictor.predict(&FeatureInput::new("PUNJAB", "LUDHIANA", "MONSOON"));
        assert_eq!(recommendations.len(), 5);
        assert!(recommendations.iter().all(|r| !r.season_match));
    }

    #[test]
    fn test_empty_district_set_uses_season_defaults() {
        let input = FeatureInput::new("PUNJAB", "LUDHIANA", "RABI").with_temperature(20.0);
        let normalized = input.normalized();
        let empty = AffinitySet { crops: Default::default(), level: AffinityLevel::District };

        let candidates = rule_candidates(&normalized, &empty);
        assert_eq!(candidates.len(), Season::Rabi.default_crops().len());
        assert!(candidates.iter().all(|c| c.season_match));
    }

    #[test]
    fn test_empty_insert_keeps_predictions() {
        let mut affinity = SeasonAffinityMap::empty();
        affinity.insert(Season::Rabi, "PUNJAB_LUDHIANA", &[]);
        let predictor = CropPredictor::new(ModelContext::rule_based().with_affinity(affinity));

        let input = FeatureInput::new("PUNJAB", "LUDHIANA", "RABI").with_temperature(20.0);
        assert_eq!(predictor.predict(&input).len(), MAX_RECOMMENDATIONS);
    }

    #[test]
    fn test_top_n_is_capped() {
        let predictor = CropPredictor::rule_based().with_top_n(12);
        assert_eq!(predictor.top_n(), MAX_RECOMMENDATIONS);

        let predictor = CropPredictor::rule_based().with_top_n(2);
        assert_eq!(predictor.predict(&FeatureInput::default()).len(), 2);
    }

    #[test]
    fn test_recommendation_serializes_camel_case() {
        let predictor = CropPredictor::rule_based();
        let recommendations = predictor.predict(&FeatureInput::new("PUNJAB", "LUDHIANA", "RABI"));
        let json = serde_json::to_value(&recommendations[0]).unwrap();
        for key in [
            "cropName", "suitabilityScore", "yieldPrediction", "explanation",
            "environmentalFactors", "seasonMatch", "temperatureSuitability", "source",
        ] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(json["source"], "rules");
        assert_eq!(json["yieldPrediction"]["unit"], "kg/hectare");
        assert!(json["environmentalFactors"].get("npkMatch").is_some());
    }

    #[test]
    fn test_supplement_skips_present_categories() {
        let mut candidates = vec![score_rule_candidate(CropCategory::Pulses, 20.0, true)];
        candidates[0].label = "MOONG".to_string();
        supplement(
            &mut candidates,
            vec![
                score_rule_candidate(CropCategory::Pulses, 20.0, true),
                score_rule_candidate(CropCategory::Spices, 20.0, true),
            ],
        );
        let labels: Vec<_> = candidates.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["MOONG", "SPICES"]);
    }
}
