use crate::types::sensor_type::{SensorType, SENSOR_COUNT};
use chrono::NaiveDateTime;

/// One supervised-learning sample.
///
/// `features` is a row-major tensor of shape
/// `[SENSOR_COUNT, stations, training_window]` stacked in
/// [`SensorType::ALL`] order. `target` holds, per station, the rainfall
/// summed over the forecast hours that follow the feature window.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingExample {
    start: NaiveDateTime,
    stations: usize,
    training_window: usize,
    features: Vec<f64>,
    target: Vec<f64>,
}

impl TrainingExample {
    pub(crate) fn new(
        start: NaiveDateTime,
        stations: usize,
        training_window: usize,
        features: Vec<f64>,
        target: Vec<f64>,
    ) -> Self {
        debug_assert_eq!(features.len(), SENSOR_COUNT * stations * training_window);
        debug_assert_eq!(target.len(), stations);
        Self {
            start,
            stations,
            training_window,
            features,
            target,
        }
    }

    /// Timestamp of the first feature hour.
    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    /// `(sensor types, stations, training_window)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        (SENSOR_COUNT, self.stations, self.training_window)
    }

    pub fn features(&self) -> &[f64] {
        &self.features
    }

    pub fn target(&self) -> &[f64] {
        &self.target
    }

    pub fn feature(&self, sensor: SensorType, station_idx: usize, hour: usize) -> Option<f64> {
        if station_idx >= self.stations || hour >= self.training_window {
            return None;
        }
        let offset = (sensor.index() * self.stations + station_idx) * self.training_window + hour;
        self.features.get(offset).copied()
    }

    /// The `stations × training_window` slab of one sensor type, one slice
    /// per station.
    pub fn sensor_rows(&self, sensor: SensorType) -> impl Iterator<Item = &[f64]> {
        let slab = self.stations * self.training_window;
        let start = sensor.index() * slab;
        self.features[start..start + slab].chunks(self.training_window.max(1))
    }

    pub fn into_parts(self) -> (Vec<f64>, Vec<f64>) {
        (self.features, self.target)
    }
}
