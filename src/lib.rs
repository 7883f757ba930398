//! Crop Advisor Rust Implementation
//!
//! Crop recommendation and yield prediction for a location, season and set of
//! soil/weather readings. A trained tree-ensemble classifier is blended with a
//! deterministic rule-based fallback so a ranked list is always produced.
//!
//! Module layout:
//! - `encoder`: Feature schemas and categorical encoding
//! - `suitability/`: Temperature suitability, season affinity, environmental factors
//! - `scoring`: Probability curves, bonuses, season adjustment, ranking
//! - `yield_estimate`: Profile / regressor / rule yield ranges
//! - `predictor`: Fallback orchestration and recommendations
//! - `model/`: Classifier and regressor traits, JSON tree ensembles, artifact loading
//!
//! Artifacts are probed newest generation first (v3, v2, v1); without any the
//! predictor runs on rules alone.

pub mod crops;
pub mod season;
pub mod features;
pub mod encoder;
pub mod suitability;
pub mod scoring;
pub mod profiles;
pub mod model;
pub mod yield_estimate;
pub mod explanation;
pub mod predictor;
pub mod external;
pub mod config;
pub mod error;

// API server module (feature-gated)
#[cfg(feature = "api")]
pub mod api_server;

// Re-export commonly used types
pub use crops::CropCategory;
pub use season::Season;
pub use features::FeatureInput;
pub use encoder::{CategoryLookup, EncoderTables, FeatureSchema};
pub use scoring::{ProbabilityCurve, EnvironmentalBonus, ScoringProfile, ScoringVariant};
pub use model::{Classifier, Regressor, ModelContext, ModelGeneration, TrainedArtifacts};
pub use yield_estimate::YieldRange;
pub use predictor::{CropPredictor, Recommendation, ModelStatus, MAX_RECOMMENDATIONS};
pub use external::{Coordinates, Geocoder, LocationService, WeatherReading, WeatherSource};
pub use config::AdvisorConfig;
pub use error::{ArtifactError, LookupError, ModelError};

#[cfg(feature = "api")]
pub use api_server::{AppState, create_router, prediction_cache_key};
