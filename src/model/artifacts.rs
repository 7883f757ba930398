//! Model Artifacts
//!
//! Discovers and loads trained artifacts from a model directory. Generations
//! are probed newest first and the first complete one wins:
//!
//! | Generation | Schema | Classes | Regressor input |
//! |------------|--------|---------|-----------------|
//! | V3 | Historical16 | 16 categories | none (season profiles) |
//! | V2 | Spread21 | 16 categories | per-crop 20-field vector |
//! | V1 | Legacy15 | ~124 raw crops | scaled classifier vector |
//!
//! A missing or corrupt artifact is logged and skips that generation. If none
//! loads, the context runs in rule mode.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::encoder::{EncoderTables, FeatureSchema, YIELD_FEATURE_COUNT};
use crate::error::ArtifactError;
use crate::model::{Classifier, ForestClassifier, Regressor, StandardScaler, TreeRegressor};
use crate::profiles::{DistrictProfiles, SeasonProfiles};
use crate::scoring::{ProbabilityCurve, ScoringProfile, ScoringVariant};
use crate::suitability::SeasonAffinityMap;

/// Season -> location -> crop list map, loaded whenever present
pub const SEASON_CROP_MAP_FILE: &str = "season_crop_map_v3.json";

// ============================================================================
// Model Generations
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelGeneration {
    V3,
    V2,
    V1,
}

/// Which vector the yield regressor consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegressorInput {
    /// `encode_yield_features` for the candidate crop, unscaled
    CropFeatures,
    /// The scaled classifier vector
    ScaledClassifierFeatures,
}

struct GenerationFiles {
    classifier: &'static str,
    scaler: &'static str,
    encoders: &'static str,
    regressor: Option<&'static str>,
    district_profiles: Option<&'static str>,
    season_profiles: Option<&'static str>,
}

impl ModelGeneration {
    /// Probe order, newest first
    pub fn probe_order() -> [ModelGeneration; 3] {
        [ModelGeneration::V3, ModelGeneration::V2, ModelGeneration::V1]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelGeneration::V3 => "v3",
            ModelGeneration::V2 => "v2",
            ModelGeneration::V1 => "v1",
        }
    }

    pub fn schema(&self) -> FeatureSchema {
        match self {
            ModelGeneration::V3 => FeatureSchema::Historical16,
            ModelGeneration::V2 => FeatureSchema::Spread21,
            ModelGeneration::V1 => FeatureSchema::Legacy15,
        }
    }

    pub fn regressor_input(&self) -> RegressorInput {
        match self {
            ModelGeneration::V1 => RegressorInput::ScaledClassifierFeatures,
            _ => RegressorInput::CropFeatures,
        }
    }

    fn regressor_features(&self) -> usize {
        match self.regressor_input() {
            RegressorInput::CropFeatures => YIELD_FEATURE_COUNT,
            RegressorInput::ScaledClassifierFeatures => self.schema().len(),
        }
    }

    fn files(&self) -> GenerationFiles {
        match self {
            ModelGeneration::V3 => GenerationFiles {
                classifier: "crop_classifier_v3.json",
                scaler: "scaler_v3.json",
                encoders: "encoders_v3.json",
                regressor: None,
                district_profiles: None,
                season_profiles: Some("crop_profiles_v3.json"),
            },
            ModelGeneration::V2 => GenerationFiles {
                classifier: "crop_classifier_v2.json",
                scaler: "scaler_v2.json",
                encoders: "encoders_v2.json",
                regressor: Some("yield_regressor_v2.json"),
                district_profiles: Some("district_profiles_v2.json"),
                season_profiles: None,
            },
            ModelGeneration::V1 => GenerationFiles {
                classifier: "crop_classifier.json",
                scaler: "scaler.json",
                encoders: "encoders.json",
                regressor: Some("yield_regressor.json"),
                district_profiles: Some("district_profiles.json"),
                season_profiles: None,
            },
        }
    }

    /// Whether all required files of this generation exist in `dir`
    pub fn is_present(&self, dir: &Path) -> bool {
        let files = self.files();
        [files.classifier, files.scaler, files.encoders]
            .iter()
            .all(|f| dir.join(f).is_file())
    }
}

// ============================================================================
// Trained Artifacts
// ============================================================================

/// Classifier, optional regressor, scaler and encoder tables of one generation
#[derive(Debug, Clone)]
pub struct TrainedArtifacts {
    pub generation: ModelGeneration,
    pub schema: FeatureSchema,
    pub classifier: Arc<dyn Classifier>,
    pub regressor: Option<Arc<dyn Regressor>>,
    pub scaler: StandardScaler,
    pub tables: EncoderTables,
    pub curve: ProbabilityCurve,
}

impl TrainedArtifacts {
    /// Assemble artifacts, checking them against the generation's schema
    pub fn new(
        generation: ModelGeneration,
        classifier: Arc<dyn Classifier>,
        regressor: Option<Arc<dyn Regressor>>,
        scaler: StandardScaler,
        tables: EncoderTables,
    ) -> Result<Self, ArtifactError> {
        let schema = generation.schema();
        let mismatch = |artifact: &'static str, actual: usize| ArtifactError::SchemaMismatch {
            artifact,
            schema: schema.name(),
            expected: schema.len(),
            actual,
        };

        if let Some(columns) = &tables.feature_columns {
            if columns.len() != schema.len() {
                return Err(mismatch("encoder feature_columns", columns.len()));
            }
        }
        if classifier.n_features() != schema.len() {
            return Err(mismatch("classifier", classifier.n_features()));
        }
        if scaler.n_features() != schema.len() {
            return Err(mismatch("scaler", scaler.n_features()));
        }
        if tables.crop_classes.is_empty() || tables.crop_classes.len() != classifier.n_classes() {
            return Err(ArtifactError::ClassCount {
                classes: tables.crop_classes.len(),
                model_classes: classifier.n_classes(),
            });
        }

        // A regressor with the wrong width only loses yield predictions
        let regressor = match regressor {
            Some(r) if r.n_features() != generation.regressor_features() => {
                warn!(
                    "Ignoring {} yield regressor: expects {} features, got {}",
                    generation.as_str(),
                    generation.regressor_features(),
                    r.n_features()
                );
                None
            }
            other => other,
        };

        let curve = ProbabilityCurve::for_class_count(classifier.n_classes());

        Ok(Self { generation, schema, classifier, regressor, scaler, tables, curve })
    }

    /// Load one generation from `dir`
    pub fn load(generation: ModelGeneration, dir: &Path) -> Result<Self, ArtifactError> {
        let files = generation.files();

        let classifier = ForestClassifier::load(&dir.join(files.classifier))?;
        let scaler = StandardScaler::load(&dir.join(files.scaler))?;
        let tables = load_tables(&dir.join(files.encoders))?;

        let regressor: Option<Arc<dyn Regressor>> = match files.regressor.map(|f| dir.join(f)) {
            Some(path) if path.is_file() => match TreeRegressor::load(&path) {
                Ok(r) => Some(Arc::new(r)),
                Err(e) => {
                    warn!("Failed to load yield regressor {:?}: {}", path, e);
                    None
                }
            },
            _ => None,
        };

        Self::new(generation, Arc::new(classifier), regressor, scaler, tables)
    }
}

fn load_tables(path: &Path) -> Result<EncoderTables, ArtifactError> {
    let json = crate::model::forest::read_artifact(path)?;
    serde_json::from_str(&json).map_err(|source| ArtifactError::Parse { path: path.to_path_buf(), source })
}

// ============================================================================
// Model Context
// ============================================================================

/// Everything a prediction reads. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct ModelContext {
    pub artifacts: Option<Arc<TrainedArtifacts>>,
    pub affinity: SeasonAffinityMap,
    pub season_profiles: SeasonProfiles,
    pub district_profiles: DistrictProfiles,
    pub scoring: ScoringProfile,
    pub model_dir: Option<PathBuf>,
}

impl ModelContext {
    /// Rule-only context with default season sets
    pub fn rule_based() -> Self {
        Self::default()
    }

    /// Probe `dir` for artifacts, newest generation first
    ///
    /// Never fails: missing or corrupt artifacts degrade to rule mode.
    pub fn load(dir: &Path, variant: ScoringVariant) -> Self {
        let mut context = Self {
            model_dir: Some(dir.to_path_buf()),
            scoring: ScoringProfile::new(variant, ProbabilityCurve::Coarse),
            ..Self::default()
        };

        let affinity_path = dir.join(SEASON_CROP_MAP_FILE);
        if affinity_path.is_file() {
            match SeasonAffinityMap::load(&affinity_path) {
                Ok(map) => {
                    info!("Loaded season crop map ({} seasons)", map.len());
                    context.affinity = map;
                }
                Err(e) => warn!("Failed to load season crop map: {:#}", e),
            }
        }

        for generation in ModelGeneration::probe_order() {
            if !generation.is_present(dir) {
                debug!("No {} artifacts in {:?}", generation.as_str(), dir);
                continue;
            }

            match TrainedArtifacts::load(generation, dir) {
                Ok(artifacts) => {
                    info!(
                        "Loaded {} model: {} features, {} classes, regressor: {}",
                        generation.as_str(),
                        artifacts.schema.len(),
                        artifacts.classifier.n_classes(),
                        artifacts.regressor.is_some()
                    );
                    context.load_profiles(generation, dir);
                    context.scoring = context.scoring.with_curve(artifacts.curve);
                    context.artifacts = Some(Arc::new(artifacts));
                    return context;
                }
                Err(e) => warn!("Skipping {} model: {}", generation.as_str(), e),
            }
        }

        warn!("No trained model found in {:?}, using rule-based predictions", dir);
        context
    }

    fn load_profiles(&mut self, generation: ModelGeneration, dir: &Path) {
        let files = generation.files();

        if let Some(path) = files.season_profiles.map(|f| dir.join(f)).filter(|p| p.is_file()) {
            match SeasonProfiles::load(&path) {
                Ok(profiles) => {
                    info!("Loaded crop profiles ({} locations)", profiles.len());
                    self.season_profiles = profiles;
                }
                Err(e) => warn!("Failed to load crop profiles: {:#}", e),
            }
        }

        if let Some(path) = files.district_profiles.map(|f| dir.join(f)).filter(|p| p.is_file()) {
            match DistrictProfiles::load(&path) {
                Ok(profiles) => {
                    info!("Loaded district profiles ({} districts)", profiles.len());
                    self.district_profiles = profiles;
                }
                Err(e) => warn!("Failed to load district profiles: {:#}", e),
            }
        }
    }

    pub fn with_artifacts(mut self, artifacts: TrainedArtifacts) -> Self {
        self.scoring = self.scoring.with_curve(artifacts.curve);
        self.artifacts = Some(Arc::new(artifacts));
        self
    }

    pub fn with_affinity(mut self, affinity: SeasonAffinityMap) -> Self {
        self.affinity = affinity;
        self
    }

    pub fn with_season_profiles(mut self, profiles: SeasonProfiles) -> Self {
        self.season_profiles = profiles;
        self
    }

    pub fn with_district_profiles(mut self, profiles: DistrictProfiles) -> Self {
        self.district_profiles = profiles;
        self
    }

    pub fn with_scoring(mut self, variant: ScoringVariant) -> Self {
        let curve = self.scoring.curve;
        self.scoring = ScoringProfile::new(variant, curve);
        self
    }

    pub fn generation(&self) -> Option<ModelGeneration> {
        self.artifacts.as_ref().map(|a| a.generation)
    }

    pub fn is_model_available(&self) -> bool {
        self.artifacts.is_some()
    }
}
