//! Error Types
//!
//! Library-level failures. None of these reach a prediction caller: model
//! errors trigger a single-call fallback to the rule-based path, artifact
//! errors disable a model generation, lookup errors resolve to defaults.

use std::path::PathBuf;
use thiserror::Error;

/// Failure while running a loaded model on one input
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("feature vector has {actual} values, model expects {expected}")]
    FeatureCount { expected: usize, actual: usize },

    #[error("scaler has {expected} columns, feature vector has {actual}")]
    ScalerShape { expected: usize, actual: usize },

    #[error("tree {tree} is malformed: {reason}")]
    MalformedTree { tree: usize, reason: String },

    #[error("model produced a non-finite output")]
    NonFinite,

    #[error("model produced no class probabilities")]
    NoClasses,
}

/// Failure while loading trained artifacts from disk
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported model type '{0}'")]
    UnsupportedModelType(String),

    #[error("{artifact} expects {actual} features but the {schema} schema has {expected}")]
    SchemaMismatch {
        artifact: &'static str,
        schema: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("encoder declares {classes} crop classes but the classifier has {model_classes}")]
    ClassCount { classes: usize, model_classes: usize },

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl ArtifactError {
    /// Attach the artifact path to a parse error raised from an in-memory document
    pub fn at(self, path: &std::path::Path) -> Self {
        match self {
            ArtifactError::Parse { source, .. } => ArtifactError::Parse { path: path.to_path_buf(), source },
            other => other,
        }
    }
}

/// Failure of an external weather or geocoding collaborator
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("lookup timed out")]
    Timeout,

    #[error("no result for '{0}'")]
    NotFound(String),

    #[error("lookup failed: {0}")]
    Failed(String),
}
