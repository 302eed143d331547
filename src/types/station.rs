//! Defines the weather station metadata reported alongside API readings.

use serde::{Deserialize, Serialize};

/// A fixed measurement site.
///
/// Only `id` takes part in matrix alignment; the remaining fields are
/// carried through from the API metadata when available.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Station {
    /// The station identifier used in readings (e.g. "S50").
    pub id: String,
    /// Hardware identifier of the sensor device, usually equal to `id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// Human readable station name (e.g. "Clementi Road").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

/// Geographical location of a station in decimal degrees.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Station {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            device_id: None,
            name: None,
            location: None,
        }
    }
}
