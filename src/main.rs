use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};
use weather_forecaster::{
    config::Config,
    forecast::FEATURE_NAMES,
    ml::{ModelMetadata, ResourceCache},
    telemetry::init_tracing,
    ForecastRequest, Forecaster,
};

#[derive(Debug, Parser)]
#[command(name = "weather-forecaster", version, about = "Hourly weather forecasts from a trained sequence model")]
struct Cli {
    /// TOML configuration file
    #[arg(long, default_value = "config/default.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Forecast from a JSON request file holding `location` and `history`
    Forecast {
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Print metadata of the configured model and scalers
    ModelInfo,
}

#[derive(Debug, Serialize)]
struct ModelInfo<'a> {
    model: &'a ModelMetadata,
    horizon: usize,
    concurrent_inference: bool,
    encoder_features: &'a [&'a str],
    feature_scaler: &'static str,
    target_scaler: &'static str,
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(e).context("failed to read .env file");
        }
    }
    init_tracing();

    let cli = Cli::parse();
    let cfg = Config::load_from(&cli.config)?;
    info!(
        model_path = %cfg.models.model_path.display(),
        feature_scaler_path = %cfg.models.feature_scaler_path.display(),
        target_scaler_path = %cfg.models.target_scaler_path.display(),
        "configuration loaded"
    );

    let resources = Arc::new(ResourceCache::from_config(&cfg.models));
    resources.warm_up()?;

    match cli.command {
        Command::Forecast { input } => {
            let raw = std::fs::read_to_string(&input)
                .with_context(|| format!("failed to read request {}", input.display()))?;
            let request: ForecastRequest = serde_json::from_str(&raw)
                .with_context(|| format!("malformed request {}", input.display()))?;

            let forecaster = Arc::new(
                Forecaster::new(resources)
                    .with_serialized_inference(cfg.models.serialize_inference),
            );
            let result = forecaster
                .predict_async(request.location, request.history)
                .await
                .map_err(|e| {
                    warn!(kind = e.kind(), error = %e, "forecast failed");
                    e
                })?;

            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::ModelInfo => {
            let model = resources.model()?;
            let scalers = resources.scalers()?;
            let report = ModelInfo {
                model: model.metadata(),
                horizon: model.horizon(),
                concurrent_inference: model.supports_concurrent_inference(),
                encoder_features: &FEATURE_NAMES,
                feature_scaler: scalers.features().kind(),
                target_scaler: scalers.targets().kind(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
