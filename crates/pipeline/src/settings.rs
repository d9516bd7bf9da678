//! Layered Settings
//!
//! Built-in defaults, then an optional TOML file, then
//! `WEATHER_PIPELINE__SECTION__KEY` environment variables.

use chain_emitter::EmitterConfig;
use config::{Config, ConfigError, Environment, File};
use feature_engine::TransformConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "weather-pipeline";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "WEATHER_PIPELINE";

/// Log output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// `trace`, `debug`, `info`, `warn` or `error`
    pub level: String,
    /// One JSON object per event instead of plain text
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Feed side settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedSettings {
    /// CSV file with a header row
    pub csv_path: PathBuf,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from("data/weather.csv"),
        }
    }
}

/// Predict side settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictSettings {
    /// Emitter address to connect to
    pub connect_addr: String,
    /// JSON mean/std tables; reference statistics when unset
    pub tables_path: Option<PathBuf>,
    /// JSON linear model; baseline regressor when unset
    pub model_path: Option<PathBuf>,
    /// Destination for predicted records; stdout when unset
    pub output_path: Option<PathBuf>,
    pub transform: TransformConfig,
}

impl Default for PredictSettings {
    fn default() -> Self {
        Self {
            connect_addr: "127.0.0.1:9999".to_string(),
            tables_path: None,
            model_path: None,
            output_path: None,
            transform: TransformConfig::default(),
        }
    }
}

/// Complete pipeline settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub log: LogSettings,
    /// Prometheus scrape address; no exporter when unset
    pub metrics_addr: Option<String>,
    pub emitter: EmitterConfig,
    pub feed: FeedSettings,
    pub predict: PredictSettings,
}

impl Settings {
    /// Load settings from `path` (must exist) or from `weather-pipeline.toml`
    /// in the working directory if present
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, ENV_PREFIX)
    }

    fn load_with(path: Option<&Path>, env_prefix: &str) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(env_prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
