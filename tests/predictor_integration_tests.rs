// Predictor Integration Tests
//
// Purpose: Load artifacts from a model directory and run full predictions
// Run with: cargo test --test predictor_integration_tests

use approx::assert_relative_eq;
use crop_advisor_rust::model::{Classifier, ModelGeneration, StandardScaler, TrainedArtifacts};
use crop_advisor_rust::scoring::{CandidateSource, ScoringVariant};
use crop_advisor_rust::{
    CropCategory, CropPredictor, EncoderTables, FeatureInput, ModelContext, ModelError, Season,
    MAX_RECOMMENDATIONS,
};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

// ============================================================================
// Artifact Builders
// ============================================================================

fn write_json(dir: &Path, name: &str, value: &Value) {
    std::fs::write(dir.join(name), serde_json::to_string_pretty(value).unwrap()).unwrap();
}

fn category_names() -> Vec<&'static str> {
    CropCategory::all().iter().map(|c| c.as_str()).collect()
}

/// Leaf counts over the 16 categories from (category, count) pairs
fn counts(pairs: &[(CropCategory, f64)]) -> Vec<f64> {
    CropCategory::all()
        .iter()
        .map(|c| pairs.iter().find(|(p, _)| p == c).map(|(_, n)| *n).unwrap_or(0.0))
        .collect()
}

fn encoders(n_features: usize) -> Value {
    json!({
        "state_classes": ["BIHAR", "KERALA", "PUNJAB"],
        "district_classes": ["AMRITSAR", "LUDHIANA", "PATNA"],
        "season_classes": ["AUTUMN", "KHARIF", "RABI", "SUMMER", "WHOLE YEAR", "WINTER"],
        "crop_classes": category_names(),
        "feature_columns": (0..n_features).map(|i| format!("f{}", i)).collect::<Vec<_>>(),
    })
}

fn identity_scaler(n: usize) -> Value {
    json!({ "mean": vec![0.0; n], "scale": vec![1.0; n] })
}

/// V3 classifier: cool temperatures favour rabi cereals, warm favour rice/maize
fn write_v3(dir: &Path) {
    let cool = counts(&[
        (CropCategory::CerealsWheat, 6.0),
        (CropCategory::CerealsBarley, 2.0),
        (CropCategory::Pulses, 2.0),
    ]);
    let warm = counts(&[(CropCategory::CerealsRice, 7.0), (CropCategory::CerealsMaize, 3.0)]);

    write_json(dir, "crop_classifier_v3.json", &json!({
        "model_type": "random_forest",
        "n_features": 16,
        "n_classes": 16,
        "trees": [{ "nodes": [
            { "feature": 11, "threshold": 24.0, "left": 1, "right": 2 },
            { "feature": -1, "value": cool },
            { "feature": -1, "value": warm },
        ]}],
    }));
    write_json(dir, "scaler_v3.json", &identity_scaler(16));
    write_json(dir, "encoders_v3.json", &encoders(16));
}

fn rabi(temperature: f64) -> FeatureInput {
    FeatureInput::new("Punjab", "Ludhiana", "Rabi").with_temperature(temperature)
}

fn names(recommendations: &[crop_advisor_rust::Recommendation]) -> Vec<&str> {
    recommendations.iter().map(|r| r.crop_name.as_str()).collect()
}

// ============================================================================
// Rule Mode
// ============================================================================

#[test]
fn test_empty_model_dir_uses_rabi_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let predictor = CropPredictor::new(ModelContext::load(dir.path(), ScoringVariant::Standard));
    assert_eq!(predictor.model_version(), "rules");

    let mut input = FeatureInput::new("PUNJAB", "LUDHIANA", "RABI").with_temperature(20.0);
    input.soil_nitrogen = 120.0;
    let recommendations = predictor.predict(&input);

    assert!(!recommendations.is_empty());
    assert!(recommendations.len() <= MAX_RECOMMENDATIONS);
    for rec in &recommendations {
        let category = CropCategory::from_label(&rec.crop_name).unwrap();
        assert!(Season::Rabi.default_crops().contains(&category), "{} is not a rabi crop", rec.crop_name);
        assert!(rec.suitability_score >= 50.0 && rec.suitability_score <= 90.0);
        assert_eq!(rec.source, CandidateSource::Rules);
    }
}

#[test]
fn test_kharif_at_45c_stays_non_empty() {
    let predictor = CropPredictor::rule_based();
    let input = FeatureInput::new("PUNJAB", "LUDHIANA", "KHARIF").with_temperature(45.0);
    let recommendations = predictor.predict(&input);

    assert!(!recommendations.is_empty());
    assert!(recommendations.len() <= MAX_RECOMMENDATIONS);
    for rec in &recommendations {
        assert!(rec.suitability_score >= 58.0);
        assert!(rec.suitability_score < 90.0);
    }
}

#[test]
fn test_extreme_heat_floors_every_score() {
    let predictor = CropPredictor::rule_based();
    let recommendations = predictor.predict(&FeatureInput::new("PUNJAB", "LUDHIANA", "KHARIF").with_temperature(60.0));

    assert_eq!(recommendations.len(), MAX_RECOMMENDATIONS);
    for rec in &recommendations {
        assert_relative_eq!(rec.suitability_score, 58.0);
        assert_relative_eq!(rec.temperature_suitability, 20.0);
    }
}

#[test]
fn test_season_crop_map_loaded_without_model() {
    let dir = tempfile::tempdir().unwrap();
    write_json(dir.path(), "season_crop_map_v3.json", &json!({
        "Rabi": { "Punjab_Ludhiana": ["CEREALS_WHEAT", "Mustard", "Dragon fruit"] },
        "Monsoon": { "Punjab_Ludhiana": ["CEREALS_RICE"] },
    }));

    let predictor = CropPredictor::new(ModelContext::load(dir.path(), ScoringVariant::Standard));
    assert_eq!(predictor.model_version(), "rules");
    assert_eq!(predictor.status().affinity_locations, 1);

    let recommendations = predictor.predict(&rabi(18.0));
    let mut crops = names(&recommendations);
    crops.sort();
    assert_eq!(crops, vec!["CEREALS_WHEAT", "OILSEEDS"]);

    // Another district of the same state resolves through the state prefix
    let amritsar = FeatureInput::new("PUNJAB", "AMRITSAR", "RABI").with_temperature(18.0);
    assert_eq!(predictor.predict(&amritsar).len(), 2);
}

// ============================================================================
// Model Mode
// ============================================================================

#[test]
fn test_v3_model_ranks_cool_season_cereals() {
    let dir = tempfile::tempdir().unwrap();
    write_v3(dir.path());

    let predictor = CropPredictor::new(ModelContext::load(dir.path(), ScoringVariant::Standard));
    let status = predictor.status();
    assert_eq!(predictor.model_version(), "v3");
    assert_eq!(status.generation, Some(ModelGeneration::V3));
    assert_eq!(status.n_features, Some(16));
    assert!(!status.has_yield_regressor);

    let recommendations = predictor.predict(&rabi(15.0));
    assert_eq!(recommendations.len(), MAX_RECOMMENDATIONS);

    let top_three = &names(&recommendations)[..3];
    assert_eq!(top_three, &["CEREALS_WHEAT", "CEREALS_BARLEY", "PULSES"]);
    for rec in &recommendations {
        assert!(rec.season_match);
        assert!(rec.suitability_score >= 0.0 && rec.suitability_score <= 100.0);
        assert_eq!(rec.source, CandidateSource::Model);
    }
    assert_relative_eq!(recommendations[0].suitability_score, 100.0);
}

#[test]
fn test_v3_season_profile_drives_yield() {
    let dir = tempfile::tempdir().unwrap();
    write_v3(dir.path());
    write_json(dir.path(), "crop_profiles_v3.json", &json!({
        "PUNJAB_LUDHIANA_RABI": {
            "CEREALS_WHEAT": { "yield_mean": 4200.0, "yield_std": 300.0, "avg_area": 5000.0, "record_count": 14 }
        }
    }));

    let predictor = CropPredictor::new(ModelContext::load(dir.path(), ScoringVariant::Standard));
    let recommendations = predictor.predict(&rabi(15.0));
    let wheat = &recommendations[0];

    assert_eq!(wheat.crop_name, "CEREALS_WHEAT");
    assert_relative_eq!(wheat.temperature_suitability, 93.3);
    assert_eq!(wheat.yield_prediction.expected, 3920.0);
    assert_eq!(wheat.yield_prediction.min, 3620.0);
    assert_eq!(wheat.yield_prediction.max, 4220.0);
    assert_relative_eq!(wheat.environmental_factors.historical_yield, 92.9);
    assert!(wheat.explanation.ends_with("Based on historical data from your district."));

    // Barley has no profile and falls back to the static table
    let barley = recommendations.iter().find(|r| r.crop_name == "CEREALS_BARLEY").unwrap();
    assert_eq!(barley.yield_prediction.expected, 2800.0);
    assert_relative_eq!(barley.environmental_factors.historical_yield, 70.0);
}

#[test]
fn test_v2_regressor_blends_with_district_history() {
    let dir = tempfile::tempdir().unwrap();
    let mut leaf = counts(&[(CropCategory::CerealsWheat, 5.0), (CropCategory::Pulses, 3.0)]);
    for count in leaf.iter_mut() {
        *count += 1.0;
    }

    write_json(dir.path(), "crop_classifier_v2.json", &json!({
        "model_type": "random_forest",
        "n_features": 21,
        "n_classes": 16,
        "trees": [{ "nodes": [{ "feature": -1, "value": leaf }] }],
    }));
    write_json(dir.path(), "scaler_v2.json", &identity_scaler(21));
    write_json(dir.path(), "encoders_v2.json", &encoders(21));
    write_json(dir.path(), "yield_regressor_v2.json", &json!({
        "model_type": "gradient_boosting",
        "n_features": 20,
        "init": 0.0,
        "learning_rate": 1.0,
        "trees": [{ "nodes": [{ "feature": -1, "value": [4.0_f64.ln()] }] }],
    }));
    write_json(dir.path(), "district_profiles_v2.json", &json!({
        "PUNJAB_LUDHIANA": { "crops": { "CEREALS_WHEAT": { "avg_yield": 4.0, "num_records": 9 } } }
    }));

    let predictor = CropPredictor::new(ModelContext::load(dir.path(), ScoringVariant::Standard));
    assert_eq!(predictor.model_version(), "v2");
    assert!(predictor.status().has_yield_regressor);

    let recommendations = predictor.predict(&rabi(20.0));
    let wheat = &recommendations[0];
    assert_eq!(wheat.crop_name, "CEREALS_WHEAT");
    assert_eq!(wheat.yield_prediction.expected, 3600.0);
    assert_eq!(wheat.yield_prediction.min, 2100.0);
    assert_eq!(wheat.yield_prediction.max, 3960.0);
}

#[test]
fn test_newest_generation_wins() {
    let dir = tempfile::tempdir().unwrap();
    write_v3(dir.path());
    // A broken v2 set alongside must not matter
    std::fs::write(dir.path().join("crop_classifier_v2.json"), "{ not json").unwrap();
    write_json(dir.path(), "scaler_v2.json", &identity_scaler(21));
    write_json(dir.path(), "encoders_v2.json", &encoders(21));

    let context = ModelContext::load(dir.path(), ScoringVariant::Standard);
    assert_eq!(context.generation(), Some(ModelGeneration::V3));
}

// ============================================================================
// Degradation
// ============================================================================

#[test]
fn test_corrupt_classifier_degrades_to_rules() {
    let dir = tempfile::tempdir().unwrap();
    write_v3(dir.path());
    std::fs::write(dir.path().join("crop_classifier_v3.json"), "{\"model_type\": \"random_forest\"").unwrap();

    let predictor = CropPredictor::new(ModelContext::load(dir.path(), ScoringVariant::Standard));
    assert_eq!(predictor.model_version(), "rules");
    assert!(!predictor.predict(&rabi(20.0)).is_empty());
}

#[test]
fn test_schema_mismatch_rejects_generation() {
    let dir = tempfile::tempdir().unwrap();
    write_v3(dir.path());
    write_json(dir.path(), "encoders_v3.json", &encoders(15));

    let context = ModelContext::load(dir.path(), ScoringVariant::Standard);
    assert!(!context.is_model_available());
}

#[derive(Debug)]
struct NanClassifier;

impl Classifier for NanClassifier {
    fn n_features(&self) -> usize {
        16
    }
    fn n_classes(&self) -> usize {
        16
    }
    fn predict_proba(&self, _features: &[f64]) -> Result<Vec<f64>, ModelError> {
        Ok(vec![f64::NAN; 16])
    }
}

#[test]
fn test_model_failure_falls_back_for_that_call_only() {
    let tables: EncoderTables = serde_json::from_value(encoders(16)).unwrap();
    let artifacts = TrainedArtifacts::new(
        ModelGeneration::V3,
        Arc::new(NanClassifier),
        None,
        StandardScaler::identity(16),
        tables,
    )
    .unwrap();
    let predictor = CropPredictor::new(ModelContext::rule_based().with_artifacts(artifacts));

    let first = predictor.predict(&rabi(20.0));
    assert!(!first.is_empty());
    assert!(first.iter().all(|r| r.source == CandidateSource::Rules));

    // The model stays loaded
    assert_eq!(predictor.model_version(), "v3");
    assert_eq!(predictor.predict(&rabi(20.0)), first);
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_predictions_are_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    write_v3(dir.path());
    let predictor = CropPredictor::new(ModelContext::load(dir.path(), ScoringVariant::Standard));

    let input = rabi(22.0);
    assert_eq!(predictor.predict(&input), predictor.predict(&input));
}

#[test]
fn test_batch_matches_single_predictions() {
    let dir = tempfile::tempdir().unwrap();
    write_v3(dir.path());
    let predictor = CropPredictor::new(ModelContext::load(dir.path(), ScoringVariant::SeasonAware));

    let inputs: Vec<FeatureInput> = [
        ("PUNJAB", "LUDHIANA", "RABI", 14.0),
        ("BIHAR", "PATNA", "KHARIF", 31.0),
        ("KERALA", "ERNAKULAM", "WHOLE YEAR", 27.0),
        ("", "", "", 28.0),
    ]
    .iter()
    .map(|(s, d, season, t)| FeatureInput::new(s, d, season).with_temperature(*t))
    .collect();

    let batch = predictor.predict_batch(&inputs);
    assert_eq!(batch.len(), inputs.len());
    for (input, result) in inputs.iter().zip(&batch) {
        assert_eq!(&predictor.predict(input), result);
        assert!(!result.is_empty() && result.len() <= MAX_RECOMMENDATIONS);
    }
}
