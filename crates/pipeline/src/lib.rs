//! Weather Pipeline
//!
//! Wiring shared by the `weather-pipeline` binary: settings, logging,
//! metrics exporter and predictor construction.

pub mod settings;

pub use settings::{FeedSettings, LogSettings, PredictSettings, Settings};

use anyhow::Context;
use feature_engine::{FeatureTables, FeatureTransform};
use inference_engine::{BaselineRegressor, LinearRegressor, PredictorAdapter, Regressor};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Initialize logging
pub fn init_logging(settings: &LogSettings) -> anyhow::Result<()> {
    let level: Level = settings
        .level
        .parse()
        .with_context(|| format!("invalid log level {:?}", settings.level))?;

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    let installed = if settings.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };

    installed.context("Failed to set tracing subscriber")
}

/// Install the Prometheus exporter when an address is configured
pub fn init_metrics(addr: Option<&str>) -> anyhow::Result<()> {
    let Some(addr) = addr else {
        return Ok(());
    };
    let addr: SocketAddr = addr
        .parse()
        .with_context(|| format!("invalid metrics address {addr:?}"))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;

    info!("Serving metrics on http://{}/metrics", addr);
    Ok(())
}

/// Build the transform and model described by the predict settings
pub fn build_adapter(settings: &PredictSettings) -> anyhow::Result<PredictorAdapter> {
    let tables = match &settings.tables_path {
        Some(path) => FeatureTables::load(path)?,
        None => FeatureTables::reference(),
    };
    let transform = FeatureTransform::new(tables, settings.transform);

    let model: Box<dyn Regressor> = match &settings.model_path {
        Some(path) => Box::new(LinearRegressor::load(path)?),
        None => {
            warn!("No model configured, predicting the training mean");
            Box::new(BaselineRegressor::default())
        }
    };

    Ok(PredictorAdapter::new(transform, model))
}
