//! Normalization Statistics Tables
//!
//! Population mean and standard deviation per feature, fitted offline on the
//! training set. Loaded once and handed to the transform.

use crate::error::FeatureError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Reference fit: (feature, mean, standard deviation)
const REFERENCE_STATS: [(&str, f64, f64); 22] = [
    ("air_pressure", 918.883467, 3.184068),
    ("air_temperature", 18.296112, 6.208619),
    ("rain_accumulation", 0.213538, 1.597062),
    ("rain_duration", 294.111715, 1598.078108),
    ("relative_humidity", 34.242315, 25.472378),
    ("avg_wind_x", -0.411050, 4.998785),
    ("avg_wind_y", -0.065121, 5.088263),
    ("max_wind_x", -0.167812, 6.150300),
    ("max_wind_y", 0.180229, 6.542323),
    ("avg_direction_north_south", 0.239709, 0.581798),
    ("avg_direction_east_west", -0.354527, 0.692178),
    ("max_direction_north_south", 0.201641, 0.680224),
    ("max_direction_east_west", -0.378705, 0.594951),
    ("has_rain", 0.168950, 0.374879),
    ("rain_accumulation_small", 0.072146, 0.258848),
    ("rain_accumulation_big", 0.050228, 0.218516),
    ("rain_duration_small", 0.087671, 0.282945),
    ("rain_duration_big", 0.081279, 0.273387),
    ("water_vapour_pressure", 2227.068041, 830.528217),
    ("actual_water_vapour_pressure_transform", 6.314475, 0.595272),
    ("avg_wind_speed_transform", 1.410237, 0.763797),
    ("max_wind_speed_transform", 1.684621, 0.710755),
];

/// Mean and standard deviation lookup keyed by feature name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTables {
    pub mean: BTreeMap<String, f64>,
    pub std_dev: BTreeMap<String, f64>,
}

impl FeatureTables {
    /// Build tables from explicit maps
    pub fn new(mean: BTreeMap<String, f64>, std_dev: BTreeMap<String, f64>) -> Self {
        Self { mean, std_dev }
    }

    /// Tables from the reference fit
    pub fn reference() -> Self {
        let mean = REFERENCE_STATS
            .iter()
            .map(|(name, mean, _)| (name.to_string(), *mean))
            .collect();
        let std_dev = REFERENCE_STATS
            .iter()
            .map(|(name, _, std)| (name.to_string(), *std))
            .collect();
        Self { mean, std_dev }
    }

    /// Parse tables from JSON (`{"mean": {...}, "std_dev": {...}}`)
    pub fn from_json(json: &str) -> Result<Self, FeatureError> {
        serde_json::from_str(json).map_err(|e| FeatureError::InvalidTables(e.to_string()))
    }

    /// Load tables from a JSON file
    pub fn load(path: &Path) -> Result<Self, FeatureError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| FeatureError::InvalidTables(format!("{}: {e}", path.display())))?;
        let tables = Self::from_json(&content)?;
        info!(
            "Loaded statistics tables from {} ({} means, {} std devs)",
            path.display(),
            tables.mean.len(),
            tables.std_dev.len()
        );
        Ok(tables)
    }

    /// Mean of a field
    pub fn mean(&self, field: &str) -> Result<f64, FeatureError> {
        self.mean
            .get(field)
            .copied()
            .ok_or_else(|| FeatureError::MissingMean {
                field: field.to_string(),
            })
    }

    /// Standard deviation of a field
    pub fn std_dev(&self, field: &str) -> Result<f64, FeatureError> {
        self.std_dev
            .get(field)
            .copied()
            .ok_or_else(|| FeatureError::MissingStd {
                field: field.to_string(),
            })
    }
}

impl Default for FeatureTables {
    fn default() -> Self {
        Self::reference()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_tables_have_22_entries() {
        let tables = FeatureTables::reference();
        assert_eq!(tables.mean.len(), 22);
        assert_eq!(tables.std_dev.len(), 22);
        assert!(tables.std_dev.values().all(|s| *s > 0.0));
    }

    #[test]
    fn test_lookup_errors_name_the_field() {
        let tables = FeatureTables::reference();
        assert_eq!(tables.mean("air_pressure").unwrap(), 918.883467);
        assert_eq!(
            tables.mean("avg_wind_speed"),
            Err(FeatureError::MissingMean {
                field: "avg_wind_speed".to_string()
            })
        );
        assert_eq!(
            tables.std_dev("max_wind_direction"),
            Err(FeatureError::MissingStd {
                field: "max_wind_direction".to_string()
            })
        );
    }

    #[test]
    fn test_json_round_trip() {
        let tables = FeatureTables::reference();
        let json = serde_json::to_string(&tables).unwrap();
        assert_eq!(FeatureTables::from_json(&json).unwrap(), tables);
        assert!(matches!(
            FeatureTables::from_json("{\"mean\": {}}"),
            Err(FeatureError::InvalidTables(_))
        ));
    }
}
