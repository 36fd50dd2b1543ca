use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::{LocationDescriptor, WeatherRecord};

/// Forecast request as read by the `forecast` command.
///
/// ```json
/// {
///   "location": { "latitude": 10.8, "longitude": 106.7 },
///   "history": [
///     {
///       "datetime": "2024-04-10T00:00:00+07:00",
///       "temperature": 30.0,
///       "humidity": 70.0,
///       "wind_speed": 2.0,
///       "pressure": 1010.0,
///       "precipitation": 0.0,
///       "solar_radiation": 500.0
///     }
///   ]
/// }
/// ```
///
/// Timestamps are RFC 3339 and must carry a UTC offset; hour, day and month
/// features are taken in that offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRequest {
    pub location: LocationDescriptor,
    pub history: Vec<WeatherRecord>,
}

/// Multi-step forecast produced from one history window.
///
/// Records are hourly and start one hour after the last observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub location: LocationDescriptor,
    pub issued_from: DateTime<FixedOffset>,
    pub records: Vec<WeatherRecord>,
}

impl ForecastResult {
    pub fn new(
        location: LocationDescriptor,
        issued_from: DateTime<FixedOffset>,
        records: Vec<WeatherRecord>,
    ) -> Self {
        Self {
            location,
            issued_from,
            records,
        }
    }

    /// Number of predicted hours
    pub fn horizon(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> &[WeatherRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<WeatherRecord> {
        self.records
    }
}
