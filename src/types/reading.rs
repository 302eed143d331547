use crate::types::sensor_type::SensorType;
use chrono::{DateTime, FixedOffset, NaiveDate, Timelike};

/// A single normalized observation.
///
/// The timestamp keeps the offset the API reported it in (`+08:00`), and
/// both [`Reading::date`] and [`Reading::hour`] are taken in that offset.
/// `value` is `None` when the station reported the timestamp without a
/// measurement; such readings still mark their hour as reported.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub station_id: String,
    pub sensor: SensorType,
    pub timestamp: DateTime<FixedOffset>,
    pub value: Option<f64>,
}

impl Reading {
    pub fn new(
        station_id: impl Into<String>,
        sensor: SensorType,
        timestamp: DateTime<FixedOffset>,
        value: f64,
    ) -> Self {
        Self::with_value(station_id, sensor, timestamp, Some(value))
    }

    pub fn with_value(
        station_id: impl Into<String>,
        sensor: SensorType,
        timestamp: DateTime<FixedOffset>,
        value: Option<f64>,
    ) -> Self {
        Self {
            station_id: station_id.into(),
            sensor,
            timestamp,
            value,
        }
    }

    /// Local calendar date of the observation.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    /// Local hour of day (0..=23).
    pub fn hour(&self) -> u32 {
        self.timestamp.hour()
    }
}
