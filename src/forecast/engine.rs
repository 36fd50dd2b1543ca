use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use chrono::Duration;
use ndarray::Array2;
use parking_lot::Mutex;
use strum::IntoEnumIterator;
use tracing::{debug, info, warn};
use validator::Validate;

use super::FeatureEncoder;
use crate::domain::{ForecastResult, LocationDescriptor, TargetChannel, WeatherRecord};
use crate::error::{ForecastError, Result};
use crate::ml::{tensor, ResourceCache, WINDOW_SIZE};

/// Runs the full pipeline: encode, scale, infer, unscale, reassemble.
///
/// Uses the most recent `WINDOW_SIZE` records of the history and rejects
/// shorter histories. Resources are borrowed from the shared cache per call.
pub struct Forecaster {
    resources: Arc<ResourceCache>,
    inference_lock: Mutex<()>,
    serialize_inference: bool,
}

impl Forecaster {
    pub fn new(resources: Arc<ResourceCache>) -> Self {
        Self {
            resources,
            inference_lock: Mutex::new(()),
            serialize_inference: false,
        }
    }

    /// Serialize model calls regardless of what the model reports.
    pub fn with_serialized_inference(mut self, serialize: bool) -> Self {
        self.serialize_inference = serialize;
        self
    }

    pub fn resources(&self) -> &Arc<ResourceCache> {
        &self.resources
    }

    pub fn predict(
        &self,
        location: &LocationDescriptor,
        history: &[WeatherRecord],
    ) -> Result<ForecastResult> {
        if history.len() < WINDOW_SIZE {
            return Err(ForecastError::InsufficientHistory {
                required: WINDOW_SIZE,
                actual: history.len(),
            });
        }
        location.check_finite()?;
        location.validate()?;
        let last = validate_history(history)?;

        let model = self.resources.model()?;
        let scalers = self.resources.scalers()?;
        let adapter = scalers.adapter();

        let features = FeatureEncoder::new(*location).encode(history);
        let scaled = adapter.scale_features(&features)?;
        let input = tensor::window_input(&scaled)
            .map_err(|e| ForecastError::MalformedInput(format!("{:#}", e)))?;

        // a panicking model surfaces as an error only in unwinding builds
        let infer = || catch_unwind(AssertUnwindSafe(|| model.infer(&input)));
        let raw = if self.serialize_inference || !model.supports_concurrent_inference() {
            let _guard = self.inference_lock.lock();
            infer()
        } else {
            infer()
        };
        let raw = raw
            .map_err(|_| ForecastError::InferenceFailed("model panicked".to_string()))?
            .map_err(|e| ForecastError::InferenceFailed(format!("{:#}", e)))?;

        let outputs = tensor::squeeze_output(raw, model.horizon())
            .map_err(|e| ForecastError::InferenceFailed(format!("{:#}", e)))?;
        let targets = adapter.unscale_targets(&outputs)?;
        if targets.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::InferenceFailed(
                "unscaled targets contain non-finite values".to_string(),
            ));
        }

        let records = assemble_records(last.datetime, &targets);
        info!(
            latitude = location.latitude,
            longitude = location.longitude,
            history = history.len(),
            horizon = records.len(),
            "forecast produced"
        );

        Ok(ForecastResult::new(*location, last.datetime, records))
    }

    /// Run `predict` on tokio's blocking pool.
    pub async fn predict_async(
        self: &Arc<Self>,
        location: LocationDescriptor,
        history: Vec<WeatherRecord>,
    ) -> Result<ForecastResult> {
        let forecaster = Arc::clone(self);
        tokio::task::spawn_blocking(move || forecaster.predict(&location, &history))
            .await
            .map_err(|e| ForecastError::InferenceFailed(format!("forecast task failed: {}", e)))?
    }
}

/// Check every record and the ordering; returns the last record.
fn validate_history(history: &[WeatherRecord]) -> Result<&WeatherRecord> {
    for record in history {
        record.check_finite()?;
    }

    for pair in history.windows(2) {
        let step = pair[1].datetime - pair[0].datetime;
        if step <= Duration::zero() {
            return Err(ForecastError::MalformedInput(format!(
                "history is not strictly increasing: {} followed by {}",
                pair[0].datetime, pair[1].datetime
            )));
        }
        if step != Duration::hours(1) {
            warn!(
                from = %pair[0].datetime,
                to = %pair[1].datetime,
                "history is not hourly-contiguous"
            );
        }
    }

    history
        .last()
        .ok_or_else(|| ForecastError::MalformedInput("history is empty".to_string()))
}

/// Map `[H, 6]` physical-unit rows to hourly records after `last`.
fn assemble_records(
    last: chrono::DateTime<chrono::FixedOffset>,
    targets: &Array2<f64>,
) -> Vec<WeatherRecord> {
    let records: Vec<WeatherRecord> = targets
        .rows()
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            let mut record = WeatherRecord {
                datetime: last + Duration::hours(i as i64 + 1),
                temperature: 0.0,
                humidity: 0.0,
                wind_speed: 0.0,
                pressure: 0.0,
                precipitation: 0.0,
                solar_radiation: 0.0,
            };
            for channel in TargetChannel::iter() {
                record.set_channel(channel, row[channel.column()]);
            }
            record
        })
        .collect();

    debug!(steps = records.len(), "assembled forecast records");
    records
}
