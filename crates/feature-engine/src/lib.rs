//! Feature Engineering Engine
//!
//! Derives the normalized, fixed-order feature vector consumed by the
//! relative humidity regressor from a single raw weather reading.

pub mod derivations;
mod error;
mod features;
mod tables;

pub use error::FeatureError;
pub use features::{
    DerivedFeatures, DomainPolicy, FeatureName, FeatureTransform, FeatureVector, ImputedReading,
    RainThresholds, TransformConfig, FEATURE_DIMENSION,
};
pub use tables::FeatureTables;
