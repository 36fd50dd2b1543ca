//! Process-wide model and scaler cache
//!
//! The trained model and the scaler pair are expensive to load, so each is
//! loaded at most once per process and then shared read-only through `Arc`.
//! Concurrent first callers are coalesced: one of them performs the load, the
//! rest block until it completes and observe the same result. A failed load
//! is handed to every caller that waited on it and is not memoized, so the
//! next call retries. A panicking loader is reported as a failed load only in
//! unwinding builds; the release profile aborts on panic.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use parking_lot::{Condvar, Mutex};
use tracing::{error, info};

use super::models::{DenseSequenceModel, SequenceModel};
use super::scaler::ScalerPair;
use crate::config::ModelsConfig;
use crate::error::ForecastError;

/// Source of the model and scaler artifacts
pub trait ArtifactLoader: Send + Sync {
    fn load_model(&self) -> Result<Arc<dyn SequenceModel>>;

    fn load_scalers(&self) -> Result<ScalerPair>;
}

/// Loads JSON artifacts from the configured paths
#[derive(Debug, Clone)]
pub struct FileArtifactLoader {
    model_path: PathBuf,
    feature_scaler_path: PathBuf,
    target_scaler_path: PathBuf,
}

impl FileArtifactLoader {
    pub fn new(
        model_path: impl Into<PathBuf>,
        feature_scaler_path: impl Into<PathBuf>,
        target_scaler_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            model_path: model_path.into(),
            feature_scaler_path: feature_scaler_path.into(),
            target_scaler_path: target_scaler_path.into(),
        }
    }

    pub fn from_config(cfg: &ModelsConfig) -> Self {
        Self::new(
            &cfg.model_path,
            &cfg.feature_scaler_path,
            &cfg.target_scaler_path,
        )
    }
}

impl ArtifactLoader for FileArtifactLoader {
    fn load_model(&self) -> Result<Arc<dyn SequenceModel>> {
        let model = DenseSequenceModel::from_file(&self.model_path)?;
        Ok(Arc::new(model))
    }

    fn load_scalers(&self) -> Result<ScalerPair> {
        ScalerPair::load(&self.feature_scaler_path, &self.target_scaler_path)
    }
}

struct FlightState<T: ?Sized> {
    value: Option<Arc<T>>,
    loading: bool,
    /// Incremented when a load starts
    attempt: u64,
    failure: Option<(u64, ForecastError)>,
}

/// Memoized slot with single-flight initialization
struct SingleFlight<T: ?Sized> {
    state: Mutex<FlightState<T>>,
    done: Condvar,
}

impl<T: ?Sized> SingleFlight<T> {
    fn new() -> Self {
        Self {
            state: Mutex::new(FlightState {
                value: None,
                loading: false,
                attempt: 0,
                failure: None,
            }),
            done: Condvar::new(),
        }
    }

    fn is_ready(&self) -> bool {
        self.state.lock().value.is_some()
    }

    fn get_or_load<F>(&self, load: F) -> Result<Arc<T>, ForecastError>
    where
        F: FnOnce() -> Result<Arc<T>, ForecastError>,
    {
        let mut state = self.state.lock();
        loop {
            if let Some(value) = &state.value {
                return Ok(Arc::clone(value));
            }
            if !state.loading {
                break;
            }

            let awaited = state.attempt;
            while state.loading && state.attempt == awaited {
                self.done.wait(&mut state);
            }
            if let Some((attempt, err)) = &state.failure {
                if *attempt == awaited {
                    return Err(err.clone());
                }
            }
        }

        state.loading = true;
        state.attempt += 1;
        let attempt = state.attempt;
        drop(state);

        // the lock is not held while loading so waiters can park on the condvar
        let result = catch_unwind(AssertUnwindSafe(load)).unwrap_or_else(|_| {
            Err(ForecastError::resource_unavailable(
                "artifact",
                "loader panicked",
            ))
        });

        let mut state = self.state.lock();
        state.loading = false;
        match &result {
            Ok(value) => {
                state.value = Some(Arc::clone(value));
                state.failure = None;
            }
            Err(err) => state.failure = Some((attempt, err.clone())),
        }
        self.done.notify_all();
        result
    }
}

/// Owns the model artifact and scaler pair for the lifetime of the process
pub struct ResourceCache {
    loader: Box<dyn ArtifactLoader>,
    model: SingleFlight<dyn SequenceModel>,
    scalers: SingleFlight<ScalerPair>,
}

impl ResourceCache {
    pub fn new(loader: impl ArtifactLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            model: SingleFlight::new(),
            scalers: SingleFlight::new(),
        }
    }

    pub fn from_config(cfg: &ModelsConfig) -> Self {
        Self::new(FileArtifactLoader::from_config(cfg))
    }

    /// Get the model, loading it on first use.
    pub fn model(&self) -> Result<Arc<dyn SequenceModel>, ForecastError> {
        self.model.get_or_load(|| {
            let started = Instant::now();
            info!("loading sequence model");
            match self.loader.load_model() {
                Ok(model) => {
                    info!(
                        model_id = %model.metadata().model_id,
                        horizon = model.horizon(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "sequence model loaded"
                    );
                    Ok(model)
                }
                Err(e) => {
                    error!(error = %format!("{:#}", e), "failed to load sequence model");
                    Err(ForecastError::resource_unavailable("model", format!("{:#}", e)))
                }
            }
        })
    }

    /// Get the feature/target scaler pair, loading it on first use.
    pub fn scalers(&self) -> Result<Arc<ScalerPair>, ForecastError> {
        self.scalers.get_or_load(|| {
            let started = Instant::now();
            info!("loading scalers");
            match self.loader.load_scalers() {
                Ok(pair) => {
                    info!(
                        features = pair.features().kind(),
                        targets = pair.targets().kind(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "scalers loaded"
                    );
                    Ok(Arc::new(pair))
                }
                Err(e) => {
                    error!(error = %format!("{:#}", e), "failed to load scalers");
                    Err(ForecastError::resource_unavailable("scalers", format!("{:#}", e)))
                }
            }
        })
    }

    /// Load both resources eagerly, e.g. during startup.
    pub fn warm_up(&self) -> Result<(), ForecastError> {
        self.model()?;
        self.scalers()?;
        Ok(())
    }

    pub fn model_loaded(&self) -> bool {
        self.model.is_ready()
    }

    pub fn scalers_loaded(&self) -> bool {
        self.scalers.is_ready()
    }
}
