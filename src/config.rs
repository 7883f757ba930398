//! Runtime Configuration
//!
//! Read from environment variables by the binaries:
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `MODEL_DIR` | `models/trained` | Directory probed for trained artifacts |
//! | `PORT` | `3000` | HTTP port (api_server) |
//! | `SCORING_VARIANT` | `standard` | `standard` or `season_aware` |
//! | `TOP_N` | `5` | Recommendations per call (capped at 5) |

use std::path::PathBuf;

use crate::model::ModelContext;
use crate::predictor::{CropPredictor, MAX_RECOMMENDATIONS};
use crate::scoring::ScoringVariant;

pub const DEFAULT_MODEL_DIR: &str = "models/trained";
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, PartialEq)]
pub struct AdvisorConfig {
    pub model_dir: PathBuf,
    pub port: u16,
    pub scoring: ScoringVariant,
    pub top_n: usize,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
            port: DEFAULT_PORT,
            scoring: ScoringVariant::Standard,
            top_n: MAX_RECOMMENDATIONS,
        }
    }
}

impl AdvisorConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (unparseable values keep their defaults)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let scoring = match lookup("SCORING_VARIANT") {
            Some(value) => ScoringVariant::parse(&value).unwrap_or_else(|| {
                tracing::warn!("Unknown SCORING_VARIANT '{}', using standard", value);
                ScoringVariant::Standard
            }),
            None => defaults.scoring,
        };

        Self {
            model_dir: lookup("MODEL_DIR").map(PathBuf::from).unwrap_or(defaults.model_dir),
            port: lookup("PORT").and_then(|p| p.parse().ok()).unwrap_or(defaults.port),
            scoring,
            top_n: lookup("TOP_N")
                .and_then(|n| n.parse::<usize>().ok())
                .map(|n| n.clamp(1, MAX_RECOMMENDATIONS))
                .unwrap_or(defaults.top_n),
        }
    }

    /// Load the model context and build a predictor
    pub fn build_predictor(&self) -> CropPredictor {
        CropPredictor::new(ModelContext::load(&self.model_dir, self.scoring)).with_top_n(self.top_n)
    }

    pub fn log(&self) {
        tracing::info!("Configuration:");
        tracing::info!("  MODEL_DIR: {:?}", self.model_dir);
        tracing::info!("  PORT: {}", self.port);
        tracing::info!("  SCORING_VARIANT: {:?}", self.scoring);
        tracing::info!("  TOP_N: {}", self.top_n);
    }
}
