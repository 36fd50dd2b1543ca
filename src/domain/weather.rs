use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumCount, EnumIter};
use validator::Validate;

use crate::error::{ForecastError, Result};

/// Geographic location a forecast is requested for
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct LocationDescriptor {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

impl LocationDescriptor {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Reject NaN or infinite coordinates, which range validation lets through.
    pub fn check_finite(&self) -> Result<()> {
        if !self.latitude.is_finite() || !self.longitude.is_finite() {
            return Err(ForecastError::MalformedInput(format!(
                "location has non-numeric coordinates: ({}, {})",
                self.latitude, self.longitude
            )));
        }
        Ok(())
    }
}

/// One hourly weather observation or prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub datetime: DateTime<FixedOffset>,
    /// Air temperature at 2 m (°C)
    pub temperature: f64,
    /// Humidity at 2 m
    pub humidity: f64,
    /// Wind speed at 10 m (m/s)
    pub wind_speed: f64,
    /// Surface pressure
    pub pressure: f64,
    /// Corrected precipitation
    pub precipitation: f64,
    /// Clear-sky surface shortwave irradiance
    pub solar_radiation: f64,
}

impl WeatherRecord {
    /// Reject records carrying NaN or infinite measurements.
    pub fn check_finite(&self) -> Result<()> {
        let fields = [
            ("temperature", self.temperature),
            ("humidity", self.humidity),
            ("wind_speed", self.wind_speed),
            ("pressure", self.pressure),
            ("precipitation", self.precipitation),
            ("solar_radiation", self.solar_radiation),
        ];

        for (name, value) in fields {
            if !value.is_finite() {
                return Err(ForecastError::MalformedInput(format!(
                    "record at {} has non-numeric {}: {}",
                    self.datetime, name, value
                )));
            }
        }
        Ok(())
    }

    pub fn channel(&self, channel: TargetChannel) -> f64 {
        match channel {
            TargetChannel::SolarRadiation => self.solar_radiation,
            TargetChannel::Pressure => self.pressure,
            TargetChannel::Temperature => self.temperature,
            TargetChannel::Humidity => self.humidity,
            TargetChannel::WindSpeed => self.wind_speed,
            TargetChannel::Precipitation => self.precipitation,
        }
    }

    pub fn set_channel(&mut self, channel: TargetChannel, value: f64) {
        let field = match channel {
            TargetChannel::SolarRadiation => &mut self.solar_radiation,
            TargetChannel::Pressure => &mut self.pressure,
            TargetChannel::Temperature => &mut self.temperature,
            TargetChannel::Humidity => &mut self.humidity,
            TargetChannel::WindSpeed => &mut self.wind_speed,
            TargetChannel::Precipitation => &mut self.precipitation,
        };
        *field = value;
    }
}

/// Predicted weather variables, in the model's output column order.
///
/// The discriminant is the column index in the `[H, 6]` target matrix.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr, EnumIter, EnumCount,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TargetChannel {
    SolarRadiation = 0,
    Pressure = 1,
    Temperature = 2,
    Humidity = 3,
    WindSpeed = 4,
    Precipitation = 5,
}

impl TargetChannel {
    pub fn column(self) -> usize {
        self as usize
    }
}
