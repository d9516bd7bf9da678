//! Humidity Inference
//!
//! Strips chain stamps from received records, engineers features, runs the
//! regressor and reattaches the prediction to the untouched record.

mod adapter;
mod consumer;
mod engine;

pub use adapter::{PredictedRecord, PredictorAdapter, PREDICTION_FIELD};
pub use consumer::{ConsumerStats, StreamConsumer};
pub use engine::{BaselineRegressor, LinearRegressor, Regressor, TARGET_MEAN, TARGET_STD};

use feature_engine::FeatureError;
use thiserror::Error;
use weather_record::RecordError;

/// Errors during inference
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Model load failed: {0}")]
    ModelLoadError(String),
    #[error("Rejected wire record: {0}")]
    Record(#[from] RecordError),
    #[error("Feature engineering failed: {0}")]
    Feature(#[from] FeatureError),
    #[error("Model produced a non-finite prediction: {0}")]
    InvalidOutput(f64),
    #[error("Stream I/O error: {0}")]
    Io(#[from] std::io::Error),
}
