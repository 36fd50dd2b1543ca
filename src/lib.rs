//! Hourly weather forecasting from a pre-trained sequence model.
//!
//! [`forecast::Forecaster`] turns a location and at least 48 hourly
//! observations into a multi-step forecast. The model and its scalers live in
//! a shared [`ml::ResourceCache`] and are loaded once per process.

pub mod config;
pub mod domain;
pub mod error;
pub mod forecast;
pub mod ml;
pub mod telemetry;

pub use domain::{ForecastRequest, ForecastResult, LocationDescriptor, TargetChannel, WeatherRecord};
pub use error::ForecastError;
pub use forecast::{FeatureEncoder, Forecaster};
pub use ml::ResourceCache;
