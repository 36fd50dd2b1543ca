//! Feature engineering for the sequence model
//!
//! Each historical record becomes one 19-wide row. The column order must match
//! the order the feature scaler and the model were trained with.
//!
//! Known anomaly: the two "lag-1" columns repeat the current hour's
//! temperature and precipitation, and the two "trend" columns are constant
//! zero. The trained model expects exactly this, so it is reproduced as-is.

use std::f64::consts::PI;

use chrono::{Datelike, Timelike};
use ndarray::Array2;

use crate::domain::{LocationDescriptor, WeatherRecord};
use crate::ml::FEATURE_COUNT;

/// Encoder column names, in order
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "latitude",
    "longitude",
    "hour",
    "day",
    "month",
    "season",
    "wind_speed",
    "humidity",
    "pressure",
    "precipitation",
    "temperature",
    "solar_radiation",
    "hour_sin",
    "hour_cos",
    "temperature_lag1",
    "precipitation_lag1",
    "temperature_trend",
    "precipitation_trend",
    "day_night",
];

/// Season index 1-4 as the model was trained with.
///
/// This is `((month % 12) + 3) / 3`: December-February give 1, March-May 2,
/// June-August 3, September-November 4.
pub fn season(month: u32) -> u32 {
    ((month % 12) + 3) / 3
}

/// 1 for hours 6 through 18 inclusive, otherwise 0
pub fn day_night(hour: u32) -> f64 {
    if (6..=18).contains(&hour) {
        1.0
    } else {
        0.0
    }
}

/// Converts a location and a history window into a `[T, 19]` feature matrix
#[derive(Debug, Clone, Copy)]
pub struct FeatureEncoder {
    location: LocationDescriptor,
}

impl FeatureEncoder {
    pub fn new(location: LocationDescriptor) -> Self {
        Self { location }
    }

    /// Encode one record into a feature row.
    pub fn encode_row(&self, record: &WeatherRecord) -> [f64; FEATURE_COUNT] {
        let hour = record.datetime.hour();
        let day = record.datetime.day();
        let month = record.datetime.month();
        let angle = 2.0 * PI * hour as f64 / 24.0;

        [
            self.location.latitude,
            self.location.longitude,
            hour as f64,
            day as f64,
            month as f64,
            season(month) as f64,
            record.wind_speed,
            record.humidity,
            record.pressure,
            record.precipitation,
            record.temperature,
            record.solar_radiation,
            angle.sin(),
            angle.cos(),
            record.temperature,
            record.precipitation,
            0.0,
            0.0,
            day_night(hour),
        ]
    }

    /// Encode the whole history, one row per record, in input order.
    pub fn encode(&self, history: &[WeatherRecord]) -> Array2<f64> {
        let mut matrix = Array2::<f64>::zeros((history.len(), FEATURE_COUNT));
        for (mut row, record) in matrix.rows_mut().into_iter().zip(history) {
            for (cell, value) in row.iter_mut().zip(self.encode_row(record)) {
                *cell = value;
            }
        }
        matrix
    }
}
