#![cfg(test)]
//! Load Testing Suite for the forecaster
//!
//! This test suite verifies that the pipeline holds up under concurrent use:
//! - Many concurrent forecast clients sharing one resource cache
//! - Models that must be serialized behind the inference lock
//! - Cold start under a burst of requests
//!
//! Key Performance Requirements:
//! - A burst of cold requests performs exactly one model and one scaler load
//! - Serialized inference never runs two model calls at once
//! - Forecast latency stays well under a second for the dense head

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{DateTime, FixedOffset, TimeZone};
use ndarray::{Array2, Array3};
use tokio::sync::RwLock;
use tokio::task::JoinSet;

use weather_forecaster::ml::{
    ArtifactLoader, DenseSequenceModel, FittedScaler, ModelMetadata, ScalerPair, SequenceModel,
    FEATURE_COUNT, TARGET_COUNT,
};
use weather_forecaster::{Forecaster, LocationDescriptor, ResourceCache, WeatherRecord};

/// Wraps a dense model, tracks how many inferences overlap
struct ExclusiveModel {
    inner: DenseSequenceModel,
    in_flight: AtomicUsize,
    max_in_flight: Arc<AtomicUsize>,
}

impl SequenceModel for ExclusiveModel {
    fn infer(&self, input: &Array3<f64>) -> Result<Array3<f64>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(2));
        let out = self.inner.infer(input);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        out
    }

    fn horizon(&self) -> usize {
        self.inner.horizon()
    }

    fn metadata(&self) -> &ModelMetadata {
        self.inner.metadata()
    }

    fn supports_concurrent_inference(&self) -> bool {
        false
    }
}

struct TestLoader {
    model_loads: Arc<AtomicUsize>,
    scaler_loads: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl ArtifactLoader for TestLoader {
    fn load_model(&self) -> Result<Arc<dyn SequenceModel>> {
        self.model_loads.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(50));
        Ok(Arc::new(ExclusiveModel {
            inner: DenseSequenceModel::constant(24, 0.0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: Arc::clone(&self.max_in_flight),
        }))
    }

    fn load_scalers(&self) -> Result<ScalerPair> {
        self.scaler_loads.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(50));
        let features = FittedScaler::fit_standard(&Array2::<f64>::zeros((4, FEATURE_COUNT)).view())?;
        let targets = FittedScaler::fit_standard(&Array2::<f64>::ones((4, TARGET_COUNT)).view())?;
        ScalerPair::new(features, targets)
    }
}

fn start() -> DateTime<FixedOffset> {
    FixedOffset::east_opt(0)
        .unwrap()
        .with_ymd_and_hms(2024, 7, 1, 0, 0, 0)
        .unwrap()
}

fn history(offset: i64) -> Vec<WeatherRecord> {
    (0..72)
        .map(|i| WeatherRecord {
            datetime: start() + chrono::Duration::hours(offset + i),
            temperature: 25.0 + (i % 24) as f64 * 0.3,
            humidity: 60.0,
            wind_speed: 3.0,
            pressure: 1008.0,
            precipitation: 0.1,
            solar_radiation: (i % 24) as f64 * 40.0,
        })
        .collect()
}

/// Test: Cold start under a burst of clients
///
/// 50 clients, 10 forecasts each, all starting before anything is cached.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore] // Ignore by default as this is a slow test
async fn test_cold_start_burst_and_serialized_inference() {
    let model_loads = Arc::new(AtomicUsize::new(0));
    let scaler_loads = Arc::new(AtomicUsize::new(0));
    let max_in_flight = Arc::new(AtomicUsize::new(0));

    let cache = Arc::new(ResourceCache::new(TestLoader {
        model_loads: Arc::clone(&model_loads),
        scaler_loads: Arc::clone(&scaler_loads),
        max_in_flight: Arc::clone(&max_in_flight),
    }));
    let forecaster = Arc::new(Forecaster::new(cache));
    let latencies = Arc::new(RwLock::new(Vec::new()));

    let mut clients = JoinSet::new();
    for i in 0..50 {
        let forecaster = Arc::clone(&forecaster);
        let latencies = Arc::clone(&latencies);
        clients.spawn(async move {
            for j in 0..10 {
                let started = Instant::now();
                let result = forecaster
                    .predict_async(LocationDescriptor::new(10.8, 106.7), history(i + j))
                    .await
                    .unwrap();
                latencies.write().await.push(started.elapsed());
                assert_eq!(result.horizon(), 24);
            }
        });
    }

    while let Some(joined) = clients.join_next().await {
        joined.unwrap();
    }

    assert_eq!(model_loads.load(Ordering::SeqCst), 1);
    assert_eq!(scaler_loads.load(Ordering::SeqCst), 1);
    assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);

    let measurements = latencies.read().await;
    assert_eq!(measurements.len(), 500);
    let avg: Duration = measurements.iter().sum::<Duration>() / measurements.len() as u32;
    println!("Forecast latency - Avg: {:?}", avg);
}

/// Test: Warm cache throughput
///
/// Verifies that once resources are cached, many clients can forecast
/// without additional loads and results are identical for identical input.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore] // Ignore by default as this is a slow test
async fn test_warm_cache_identical_results() {
    let model_loads = Arc::new(AtomicUsize::new(0));
    let cache = Arc::new(ResourceCache::new(TestLoader {
        model_loads: Arc::clone(&model_loads),
        scaler_loads: Arc::new(AtomicUsize::new(0)),
        max_in_flight: Arc::new(AtomicUsize::new(0)),
    }));
    cache.warm_up().unwrap();

    let forecaster = Arc::new(Forecaster::new(cache));
    let expected = forecaster
        .predict(&LocationDescriptor::new(48.1, 11.6), &history(0))
        .unwrap();

    let mut clients = JoinSet::new();
    for _ in 0..100 {
        let forecaster = Arc::clone(&forecaster);
        clients.spawn(async move {
            forecaster
                .predict_async(LocationDescriptor::new(48.1, 11.6), history(0))
                .await
        });
    }

    while let Some(joined) = clients.join_next().await {
        assert_eq!(joined.unwrap().unwrap(), expected);
    }
    assert_eq!(model_loads.load(Ordering::SeqCst), 1);
}
