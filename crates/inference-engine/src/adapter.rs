//! Predictor Adapter

use crate::engine::Regressor;
use crate::InferenceError;
use feature_engine::FeatureTransform;
use serde::Serialize;
use tracing::debug;
use weather_record::ChainedRecord;

/// Key holding the prediction in output records
pub const PREDICTION_FIELD: &str = "relative_humidity_pm_prediction";

/// Received record with the prediction attached; every original key is kept
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictedRecord {
    #[serde(flatten)]
    pub record: ChainedRecord,
    #[serde(rename = "relative_humidity_pm_prediction")]
    pub prediction: f64,
}

impl PredictedRecord {
    /// Encode as a newline-terminated JSON line
    pub fn to_json_line(&self) -> Result<String, InferenceError> {
        let mut line = serde_json::to_string(self).map_err(std::io::Error::other)?;
        line.push('\n');
        Ok(line)
    }
}

/// Runs the transform and model for one record at a time
pub struct PredictorAdapter {
    transform: FeatureTransform,
    model: Box<dyn Regressor>,
}

impl PredictorAdapter {
    /// Create an adapter around a transform and a model
    pub fn new(transform: FeatureTransform, model: Box<dyn Regressor>) -> Self {
        Self { transform, model }
    }

    /// Name of the wrapped model
    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Predict for one record; the record itself is copied, never altered
    pub fn predict(&self, record: &ChainedRecord) -> Result<PredictedRecord, InferenceError> {
        let features = self.transform.transform(&record.reading)?;
        let prediction = self.model.predict(&features)?;
        if !prediction.is_finite() {
            return Err(InferenceError::InvalidOutput(prediction));
        }
        debug!(
            "Predicted {} for record with last_hash {}",
            prediction, record.last_hash
        );

        Ok(PredictedRecord {
            record: *record,
            prediction,
        })
    }
}
