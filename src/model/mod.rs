//! Trained Models
//!
//! The classifier and regressor are black boxes behind two traits. The
//! concrete implementations evaluate tree ensembles exported to JSON.
//!
//! ## Architecture
//! - `forest.rs` - JSON tree-ensemble classifier and regressor
//! - `scaler.rs` - StandardScaler transform
//! - `artifacts.rs` - model generations, artifact discovery, `ModelContext`

pub mod forest;
pub mod scaler;
pub mod artifacts;

use std::fmt::Debug;

use crate::error::ModelError;

/// Class-probability model over a fixed feature vector
pub trait Classifier: Send + Sync + Debug {
    fn n_features(&self) -> usize;

    fn n_classes(&self) -> usize;

    /// One probability per class, in encoder class order
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, ModelError>;
}

/// Scalar model over a fixed feature vector
pub trait Regressor: Send + Sync + Debug {
    fn n_features(&self) -> usize;

    fn predict(&self, features: &[f64]) -> Result<f64, ModelError>;
}

// Re-export public API
pub use forest::{ForestClassifier, TreeRegressor};
pub use scaler::StandardScaler;
pub use artifacts::{ModelContext, ModelGeneration, RegressorInput, TrainedArtifacts};
