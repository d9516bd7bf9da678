//! Regressor Implementations

use crate::InferenceError;
use feature_engine::{FeatureVector, FEATURE_DIMENSION};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Training-set mean of the 3pm relative humidity target
pub const TARGET_MEAN: f64 = 35.346554;

/// Training-set standard deviation of the target
pub const TARGET_STD: f64 = 22.523507;

/// Opaque pre-trained regressor: feature vector in, scalar out
pub trait Regressor: Send + Sync {
    /// Predict the target for one feature vector
    fn predict(&self, features: &FeatureVector) -> Result<f64, InferenceError>;

    /// Human-readable model name for logs
    fn name(&self) -> &str;
}

/// Constant predictor used when no trained model is configured
#[derive(Debug, Clone)]
pub struct BaselineRegressor {
    value: f64,
}

impl BaselineRegressor {
    /// Always predict the given value
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl Default for BaselineRegressor {
    fn default() -> Self {
        Self::new(TARGET_MEAN)
    }
}

impl Regressor for BaselineRegressor {
    fn predict(&self, _features: &FeatureVector) -> Result<f64, InferenceError> {
        Ok(self.value)
    }

    fn name(&self) -> &str {
        "baseline"
    }
}

/// Linear model over the normalized features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegressor {
    pub intercept: f64,
    /// One weight per feature, in model order
    pub coefficients: Vec<f64>,
}

impl LinearRegressor {
    /// Create a linear model, checking the coefficient count
    pub fn new(intercept: f64, coefficients: Vec<f64>) -> Result<Self, InferenceError> {
        if coefficients.len() != FEATURE_DIMENSION {
            return Err(InferenceError::ModelLoadError(format!(
                "expected {} coefficients, got {}",
                FEATURE_DIMENSION,
                coefficients.len()
            )));
        }
        Ok(Self {
            intercept,
            coefficients,
        })
    }

    /// Parse a model from JSON (`{"intercept": .., "coefficients": [..]}`)
    pub fn from_json(json: &str) -> Result<Self, InferenceError> {
        let model: LinearRegressor = serde_json::from_str(json)
            .map_err(|e| InferenceError::ModelLoadError(e.to_string()))?;
        Self::new(model.intercept, model.coefficients)
    }

    /// Load a model file
    pub fn load(path: &Path) -> Result<Self, InferenceError> {
        info!("Loading linear model from {}", path.display());
        let content = std::fs::read_to_string(path)
            .map_err(|e| InferenceError::ModelLoadError(format!("{}: {e}", path.display())))?;
        let model = Self::from_json(&content)?;
        info!("Model loaded successfully");
        Ok(model)
    }
}

impl Regressor for LinearRegressor {
    fn predict(&self, features: &FeatureVector) -> Result<f64, InferenceError> {
        let prediction = self.intercept
            + self
                .coefficients
                .iter()
                .zip(features.as_slice())
                .map(|(w, x)| w * x)
                .sum::<f64>();
        debug!("Linear prediction: {}", prediction);
        Ok(prediction)
    }

    fn name(&self) -> &str {
        "linear"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feature_engine::FeatureName;

    fn unit_vector(name: FeatureName) -> FeatureVector {
        let mut values = [0.0; FEATURE_DIMENSION];
        values[name.index()] = 1.0;
        FeatureVector { values }
    }

    #[test]
    fn test_baseline_predicts_target_mean() {
        let model = BaselineRegressor::default();
        let prediction = model.predict(&unit_vector(FeatureName::HasRain)).unwrap();
        assert_eq!(prediction, TARGET_MEAN);
        assert_eq!(model.name(), "baseline");
    }

    #[test]
    fn test_linear_prediction() {
        let mut coefficients = vec![0.0; FEATURE_DIMENSION];
        coefficients[FeatureName::RelativeHumidity.index()] = TARGET_STD;
        let model = LinearRegressor::new(TARGET_MEAN, coefficients).unwrap();

        let prediction = model
            .predict(&unit_vector(FeatureName::RelativeHumidity))
            .unwrap();
        assert!((prediction - (TARGET_MEAN + TARGET_STD)).abs() < 1e-12);

        let prediction = model.predict(&unit_vector(FeatureName::AirPressure)).unwrap();
        assert_eq!(prediction, TARGET_MEAN);
    }

    #[test]
    fn test_linear_rejects_wrong_dimension() {
        assert!(matches!(
            LinearRegressor::new(0.0, vec![1.0; 3]),
            Err(InferenceError::ModelLoadError(_))
        ));
        assert!(LinearRegressor::from_json(r#"{"intercept": 1.0, "coefficients": [1.0]}"#).is_err());
        assert!(LinearRegressor::from_json("not json").is_err());
    }

    #[test]
    fn test_linear_from_json() {
        let json = format!(
            r#"{{"intercept": 2.5, "coefficients": {:?}}}"#,
            vec![0.5; FEATURE_DIMENSION]
        );
        let model = LinearRegressor::from_json(&json).unwrap();
        assert_eq!(model.intercept, 2.5);
        let prediction = model.predict(&unit_vector(FeatureName::MaxWindX)).unwrap();
        assert!((prediction - 3.0).abs() < 1e-12);
    }
}
