//! StandardScaler: (x - mean) / scale per column

use serde::Deserialize;
use std::path::Path;

use crate::error::{ArtifactError, ModelError};
use crate::model::forest::read_artifact;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let json = read_artifact(path)?;
        let scaler: StandardScaler = serde_json::from_str(&json)
            .map_err(|source| ArtifactError::Parse { path: path.to_path_buf(), source })?;

        if scaler.mean.len() != scaler.scale.len() {
            return Err(ModelError::ScalerShape { expected: scaler.mean.len(), actual: scaler.scale.len() }.into());
        }
        Ok(scaler)
    }

    /// Identity transform over `n` columns
    pub fn identity(n: usize) -> Self {
        Self { mean: vec![0.0; n], scale: vec![1.0; n] }
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, values: &[f64]) -> Result<Vec<f64>, ModelError> {
        if values.len() != self.mean.len() {
            return Err(ModelError::ScalerShape { expected: self.mean.len(), actual: values.len() });
        }

        Ok(values
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (mean, scale))| {
                // Constant training columns are exported with scale 0
                let scale = if *scale == 0.0 { 1.0 } else { *scale };
                (x - mean) / scale
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_transform() {
        let scaler = StandardScaler { mean: vec![10.0, 5.0, 1.0], scale: vec![2.0, 0.5, 0.0] };
        let scaled = scaler.transform(&[14.0, 4.0, 3.0]).unwrap();
        assert_relative_eq!(scaled[0], 2.0);
        assert_relative_eq!(scaled[1], -2.0);
        assert_relative_eq!(scaled[2], 2.0);
    }

    #[test]
    fn test_length_mismatch() {
        let scaler = StandardScaler::identity(16);
        let err = scaler.transform(&[0.0; 15]).unwrap_err();
        assert!(matches!(err, ModelError::ScalerShape { expected: 16, actual: 15 }));
    }
}
