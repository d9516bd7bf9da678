//! Weather Pipeline - Main Entry Point

use chain_emitter::{ChainEmitter, CsvReadingSource};
use clap::{Parser, Subcommand};
use feature_engine::DomainPolicy;
use inference_engine::StreamConsumer;
use pipeline::{build_adapter, init_logging, init_metrics, Settings};
use std::path::PathBuf;
use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "weather-pipeline")]
#[command(version)]
#[command(about = "Hash-chained weather feed and humidity predictor", long_about = None)]
struct Cli {
    /// Settings file (defaults to ./weather-pipeline.toml if present)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve readings from a CSV file as a hash-chained stream
    Feed {
        /// CSV file with a header row
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Address to listen on
        #[arg(long)]
        bind: Option<String>,

        /// Pause between records in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,
    },

    /// Consume a chained stream and print records with predictions
    Predict {
        /// Emitter address
        #[arg(long)]
        connect: Option<String>,

        /// JSON linear model
        #[arg(long)]
        model: Option<PathBuf>,

        /// JSON mean/std tables
        #[arg(long)]
        tables: Option<PathBuf>,

        /// Keep non-finite features instead of rejecting the record
        #[arg(long)]
        best_effort: bool,

        /// Write predicted records here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref())?;

    init_logging(&settings.log)?;
    init_metrics(settings.metrics_addr.as_deref())?;

    info!("=== Weather Pipeline v{} ===", env!("CARGO_PKG_VERSION"));

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, stopping");
                on_signal.cancel();
            }
            Err(e) => warn!("Could not listen for interrupts: {}", e),
        }
    });

    match cli.command {
        Commands::Feed {
            csv,
            bind,
            interval_ms,
        } => {
            if let Some(csv) = csv {
                settings.feed.csv_path = csv;
            }
            if let Some(bind) = bind {
                settings.emitter.bind_addr = bind;
            }
            if let Some(interval_ms) = interval_ms {
                settings.emitter.interval_ms = interval_ms;
            }
            run_feed(settings, cancel).await
        }
        Commands::Predict {
            connect,
            model,
            tables,
            best_effort,
            output,
        } => {
            if let Some(connect) = connect {
                settings.predict.connect_addr = connect;
            }
            if model.is_some() {
                settings.predict.model_path = model;
            }
            if tables.is_some() {
                settings.predict.tables_path = tables;
            }
            if best_effort {
                settings.predict.transform.domain_policy = DomainPolicy::BestEffort;
            }
            if output.is_some() {
                settings.predict.output_path = output;
            }
            run_predict(settings, cancel).await
        }
    }
}

async fn run_feed(settings: Settings, cancel: CancellationToken) -> anyhow::Result<()> {
    let mut source = CsvReadingSource::open(&settings.feed.csv_path)?;
    let mut emitter = ChainEmitter::new(settings.emitter, cancel);

    let report = emitter.serve(&mut source).await?;
    info!(
        "Feed finished: session={}, records={}, reason={:?}",
        report.session_id, report.records_sent, report.stop_reason
    );
    Ok(())
}

async fn run_predict(settings: Settings, cancel: CancellationToken) -> anyhow::Result<()> {
    let adapter = build_adapter(&settings.predict)?;
    let output: Box<dyn AsyncWrite + Unpin + Send> = match &settings.predict.output_path {
        Some(path) => Box::new(tokio::fs::File::create(path).await?),
        None => Box::new(tokio::io::stdout()),
    };

    let mut consumer = StreamConsumer::new(adapter, cancel);
    let stats = consumer
        .connect_and_run(&settings.predict.connect_addr, output)
        .await?;
    info!(
        "Predict finished: received={}, predicted={}, rejected={}, chain_breaks={}",
        stats.received, stats.predicted, stats.rejected, stats.chain_breaks
    );
    Ok(())
}
