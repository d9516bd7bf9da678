//! Feature Engineering Error Types

use thiserror::Error;

/// Errors raised while turning a reading into a feature vector
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    /// No mean entry for a field that needs imputation or normalization
    #[error("No mean available for field {field}")]
    MissingMean { field: String },

    /// No standard deviation entry for a field that needs normalization
    #[error("No standard deviation available for field {field}")]
    MissingStd { field: String },

    /// Logarithm, division or other arithmetic received an unusable input
    #[error("{field} value {value} is outside the domain: {reason}")]
    Domain {
        field: String,
        value: f64,
        reason: &'static str,
    },

    /// Statistics tables could not be loaded
    #[error("Invalid statistics tables: {0}")]
    InvalidTables(String),
}
