//! Feature Vector Assembly
//!
//! Turns one raw reading into the 22-dimension normalized vector the humidity
//! regressor was trained on. Intermediates are plain locals; the caller's
//! reading is never modified.

use crate::derivations::{
    bucket, directional_components, indicator, water_vapour_pressure, x_component, y_component,
};
use crate::error::FeatureError;
use crate::tables::FeatureTables;
use serde::{Deserialize, Serialize};
use tracing::debug;
use weather_record::{RawReading, ReadingField};

/// Number of features in the vector
pub const FEATURE_DIMENSION: usize = 22;

/// Named model feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureName {
    MaxDirectionNorthSouth,
    RainDurationSmall,
    ActualWaterVapourPressureTransform,
    MaxDirectionEastWest,
    RainDurationBig,
    AvgDirectionNorthSouth,
    AirPressure,
    AvgWindY,
    AvgDirectionEastWest,
    RainDuration,
    HasRain,
    RainAccumulationSmall,
    WaterVapourPressure,
    AirTemperature,
    AvgWindX,
    MaxWindSpeedTransform,
    RainAccumulation,
    AvgWindSpeedTransform,
    RainAccumulationBig,
    MaxWindY,
    RelativeHumidity,
    MaxWindX,
}

impl FeatureName {
    /// Column order expected by the model; reordering silently corrupts
    /// predictions
    pub const MODEL_ORDER: [FeatureName; FEATURE_DIMENSION] = [
        FeatureName::MaxDirectionNorthSouth,
        FeatureName::RainDurationSmall,
        FeatureName::ActualWaterVapourPressureTransform,
        FeatureName::MaxDirectionEastWest,
        FeatureName::RainDurationBig,
        FeatureName::AvgDirectionNorthSouth,
        FeatureName::AirPressure,
        FeatureName::AvgWindY,
        FeatureName::AvgDirectionEastWest,
        FeatureName::RainDuration,
        FeatureName::HasRain,
        FeatureName::RainAccumulationSmall,
        FeatureName::WaterVapourPressure,
        FeatureName::AirTemperature,
        FeatureName::AvgWindX,
        FeatureName::MaxWindSpeedTransform,
        FeatureName::RainAccumulation,
        FeatureName::AvgWindSpeedTransform,
        FeatureName::RainAccumulationBig,
        FeatureName::MaxWindY,
        FeatureName::RelativeHumidity,
        FeatureName::MaxWindX,
    ];

    /// Name used in the statistics tables
    pub fn name(&self) -> &'static str {
        match self {
            FeatureName::MaxDirectionNorthSouth => "max_direction_north_south",
            FeatureName::RainDurationSmall => "rain_duration_small",
            FeatureName::ActualWaterVapourPressureTransform => {
                "actual_water_vapour_pressure_transform"
            }
            FeatureName::MaxDirectionEastWest => "max_direction_east_west",
            FeatureName::RainDurationBig => "rain_duration_big",
            FeatureName::AvgDirectionNorthSouth => "avg_direction_north_south",
            FeatureName::AirPressure => "air_pressure",
            FeatureName::AvgWindY => "avg_wind_y",
            FeatureName::AvgDirectionEastWest => "avg_direction_east_west",
            FeatureName::RainDuration => "rain_duration",
            FeatureName::HasRain => "has_rain",
            FeatureName::RainAccumulationSmall => "rain_accumulation_small",
            FeatureName::WaterVapourPressure => "water_vapour_pressure",
            FeatureName::AirTemperature => "air_temperature",
            FeatureName::AvgWindX => "avg_wind_x",
            FeatureName::MaxWindSpeedTransform => "max_wind_speed_transform",
            FeatureName::RainAccumulation => "rain_accumulation",
            FeatureName::AvgWindSpeedTransform => "avg_wind_speed_transform",
            FeatureName::RainAccumulationBig => "rain_accumulation_big",
            FeatureName::MaxWindY => "max_wind_y",
            FeatureName::RelativeHumidity => "relative_humidity",
            FeatureName::MaxWindX => "max_wind_x",
        }
    }

    /// Position in the model vector
    pub fn index(&self) -> usize {
        *self as usize
    }
}

/// Normalized feature vector in model order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub values: [f64; FEATURE_DIMENSION],
}

impl FeatureVector {
    /// Value of a named feature
    pub fn get(&self, name: FeatureName) -> f64 {
        self.values[name.index()]
    }

    /// Values as a slice, in model order
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Whether every value is a finite real number
    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }
}

/// Reading after administrative fields are dropped and gaps are imputed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImputedReading {
    pub air_pressure: f64,
    pub air_temperature: f64,
    pub avg_wind_direction: f64,
    pub avg_wind_speed: f64,
    pub max_wind_direction: f64,
    pub max_wind_speed: f64,
    pub rain_accumulation: f64,
    pub rain_duration: f64,
    pub relative_humidity: f64,
}

/// Engineered features before normalization
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedFeatures {
    pub values: [f64; FEATURE_DIMENSION],
}

impl DerivedFeatures {
    /// Value of a named feature
    pub fn get(&self, name: FeatureName) -> f64 {
        self.values[name.index()]
    }
}

/// Thresholds splitting rain measurements into small/big buckets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RainThresholds {
    /// Accumulation above this is "big"
    pub accumulation: f64,
    /// Duration (seconds) above this is "big"
    pub duration: f64,
}

impl Default for RainThresholds {
    fn default() -> Self {
        Self {
            accumulation: 0.3,
            duration: 150.0,
        }
    }
}

/// What to do when arithmetic leaves its domain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainPolicy {
    /// Reject the reading with [`FeatureError::Domain`]
    #[default]
    Strict,
    /// Keep the IEEE result (`-inf`, `NaN`) and carry on
    BestEffort,
}

/// Transform configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    pub rain: RainThresholds,
    pub domain_policy: DomainPolicy,
}

/// Reading to feature vector transform
#[derive(Debug, Clone)]
pub struct FeatureTransform {
    tables: FeatureTables,
    config: TransformConfig,
}

impl FeatureTransform {
    /// Create a transform with explicit tables and configuration
    pub fn new(tables: FeatureTables, config: TransformConfig) -> Self {
        Self { tables, config }
    }

    /// Transform using the reference statistics and default thresholds
    pub fn with_reference_tables() -> Self {
        Self::new(FeatureTables::reference(), TransformConfig::default())
    }

    /// Full transform: reading to normalized vector
    pub fn transform(&self, reading: &RawReading) -> Result<FeatureVector, FeatureError> {
        let derived = self.derive(reading)?;
        self.normalize(&derived)
    }

    /// Drop administrative fields and replace missing measurements with their
    /// table mean
    pub fn impute(&self, reading: &RawReading) -> Result<ImputedReading, FeatureError> {
        let reading = reading.without_administrative();
        let value = |field: ReadingField| -> Result<f64, FeatureError> {
            let value = match reading.get(field) {
                Some(v) => v,
                None => {
                    let mean = self.tables.mean(field.name())?;
                    debug!("Imputing {} with mean {}", field.name(), mean);
                    mean
                }
            };
            self.check(field.name(), value, "non-finite measurement")
        };

        Ok(ImputedReading {
            air_pressure: value(ReadingField::AirPressure)?,
            air_temperature: value(ReadingField::AirTemperature)?,
            avg_wind_direction: value(ReadingField::AvgWindDirection)?,
            avg_wind_speed: value(ReadingField::AvgWindSpeed)?,
            max_wind_direction: value(ReadingField::MaxWindDirection)?,
            max_wind_speed: value(ReadingField::MaxWindSpeed)?,
            rain_accumulation: value(ReadingField::RainAccumulation)?,
            rain_duration: value(ReadingField::RainDuration)?,
            relative_humidity: value(ReadingField::RelativeHumidity)?,
        })
    }

    /// Engineer all features, un-normalized
    pub fn derive(&self, reading: &RawReading) -> Result<DerivedFeatures, FeatureError> {
        let w = self.impute(reading)?;
        let thresholds = self.config.rain;

        let avg_wind_x = x_component(w.avg_wind_direction, w.avg_wind_speed);
        let avg_wind_y = y_component(w.avg_wind_direction, w.avg_wind_speed);
        let max_wind_x = x_component(w.max_wind_direction, w.max_wind_speed);
        let max_wind_y = y_component(w.max_wind_direction, w.max_wind_speed);

        let (avg_ns, avg_ew) = directional_components(w.avg_wind_direction);
        let (max_ns, max_ew) = directional_components(w.max_wind_direction);

        let has_rain = indicator(w.rain_duration);
        let (rain_acc_small, rain_acc_big) = bucket(w.rain_accumulation, thresholds.accumulation);
        let (rain_dur_small, rain_dur_big) = bucket(w.rain_duration, thresholds.duration);

        let wvp = water_vapour_pressure(Some(w.air_temperature)).unwrap_or(f64::NAN);
        let wvp = self.check("water_vapour_pressure", wvp, "non-finite vapour pressure")?;
        let actual_wvp = w.relative_humidity / 100.0 * wvp;
        let actual_wvp_transform = self.ln("actual_water_vapour_pressure", actual_wvp)?;

        let avg_speed_transform = self.ln("avg_wind_speed", w.avg_wind_speed)?;
        let max_speed_transform = self.ln("max_wind_speed", w.max_wind_speed)?;

        let mut values = [0.0; FEATURE_DIMENSION];
        for name in FeatureName::MODEL_ORDER {
            values[name.index()] = match name {
                FeatureName::MaxDirectionNorthSouth => max_ns,
                FeatureName::RainDurationSmall => rain_dur_small,
                FeatureName::ActualWaterVapourPressureTransform => actual_wvp_transform,
                FeatureName::MaxDirectionEastWest => max_ew,
                FeatureName::RainDurationBig => rain_dur_big,
                FeatureName::AvgDirectionNorthSouth => avg_ns,
                FeatureName::AirPressure => w.air_pressure,
                FeatureName::AvgWindY => avg_wind_y,
                FeatureName::AvgDirectionEastWest => avg_ew,
                FeatureName::RainDuration => w.rain_duration,
                FeatureName::HasRain => has_rain,
                FeatureName::RainAccumulationSmall => rain_acc_small,
                FeatureName::WaterVapourPressure => wvp,
                FeatureName::AirTemperature => w.air_temperature,
                FeatureName::AvgWindX => avg_wind_x,
                FeatureName::MaxWindSpeedTransform => max_speed_transform,
                FeatureName::RainAccumulation => w.rain_accumulation,
                FeatureName::AvgWindSpeedTransform => avg_speed_transform,
                FeatureName::RainAccumulationBig => rain_acc_big,
                FeatureName::MaxWindY => max_wind_y,
                FeatureName::RelativeHumidity => w.relative_humidity,
                FeatureName::MaxWindX => max_wind_x,
            };
        }

        Ok(DerivedFeatures { values })
    }

    /// Z-score every derived feature and lay them out in model order
    pub fn normalize(&self, derived: &DerivedFeatures) -> Result<FeatureVector, FeatureError> {
        let mut values = [0.0; FEATURE_DIMENSION];
        for name in FeatureName::MODEL_ORDER {
            let field = name.name();
            let mean = self.tables.mean(field)?;
            let std_dev = self.tables.std_dev(field)?;
            if std_dev == 0.0 && self.config.domain_policy == DomainPolicy::Strict {
                return Err(FeatureError::Domain {
                    field: field.to_string(),
                    value: std_dev,
                    reason: "zero standard deviation",
                });
            }
            values[name.index()] = (derived.get(name) - mean) / std_dev;
        }
        Ok(FeatureVector { values })
    }

    /// Natural log, rejecting non-positive input under the strict policy
    fn ln(&self, field: &str, value: f64) -> Result<f64, FeatureError> {
        if self.config.domain_policy == DomainPolicy::Strict && !(value > 0.0 && value.is_finite())
        {
            return Err(FeatureError::Domain {
                field: field.to_string(),
                value,
                reason: "logarithm of a non-positive value",
            });
        }
        Ok(value.ln())
    }

    fn check(&self, field: &str, value: f64, reason: &'static str) -> Result<f64, FeatureError> {
        if self.config.domain_policy == DomainPolicy::Strict && !value.is_finite() {
            return Err(FeatureError::Domain {
                field: field.to_string(),
                value,
                reason,
            });
        }
        Ok(value)
    }
}

impl Default for FeatureTransform {
    fn default() -> Self {
        Self::with_reference_tables()
    }
}
