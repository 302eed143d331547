//! Response shape of the data.gov.sg `environment/*` endpoints.

use crate::types::reading::Reading;
use crate::types::sensor_type::SensorType;
use crate::types::station::Station;
use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct EnvironmentResponse {
    #[serde(default)]
    pub metadata: ResponseMetadata,
    #[serde(default)]
    pub items: Vec<ResponseItem>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ResponseMetadata {
    #[serde(default)]
    pub stations: Vec<Station>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseItem {
    pub timestamp: DateTime<FixedOffset>,
    #[serde(default)]
    pub readings: Vec<ResponseReading>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseReading {
    pub station_id: String,
    pub value: Option<f64>,
}

/// Stations and flattened readings of one sensor type for one date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorPayload {
    pub stations: Vec<Station>,
    pub readings: Vec<Reading>,
}

impl EnvironmentResponse {
    /// Flattens `items[].readings[]` into one [`Reading`] per reported entry.
    ///
    /// A response without station metadata carries no usable readings and
    /// yields an empty payload. Readings with a null value are kept with
    /// `value: None`.
    pub(crate) fn into_payload(self, sensor: SensorType) -> SensorPayload {
        if self.metadata.stations.is_empty() {
            return SensorPayload::default();
        }
        let readings = self
            .items
            .into_iter()
            .flat_map(|item| {
                let timestamp = item.timestamp;
                item.readings.into_iter().map(move |reading| {
                    Reading::with_value(reading.station_id, sensor, timestamp, reading.value)
                })
            })
            .collect();
        SensorPayload {
            stations: self.metadata.stations,
            readings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "metadata": {
            "stations": [
                {"id": "S50", "device_id": "S50", "name": "Clementi Road",
                 "location": {"latitude": 1.3337, "longitude": 103.7768}},
                {"id": "S107", "device_id": "S107", "name": "East Coast Parkway",
                 "location": {"latitude": 1.3135, "longitude": 103.9625}}
            ],
            "reading_type": "TB1 Rainfall 5 Minute Total F",
            "reading_unit": "mm"
        },
        "items": [
            {"timestamp": "2021-10-15T00:05:00+08:00",
             "readings": [{"station_id": "S50", "value": 0.2}, {"station_id": "S107", "value": 0}]},
            {"timestamp": "2021-10-15T00:10:00+08:00",
             "readings": [{"station_id": "S50", "value": null}, {"station_id": "S107", "value": 1.4}]}
        ],
        "api_info": {"status": "healthy"}
    }"#;

    #[test]
    fn test_flattens_items_into_readings_keeping_nulls() -> Result<(), Box<dyn std::error::Error>> {
        let response: EnvironmentResponse = serde_json::from_str(SAMPLE)?;
        let payload = response.into_payload(SensorType::Rainfall);

        assert_eq!(payload.stations.len(), 2);
        assert_eq!(payload.stations[0].name.as_deref(), Some("Clementi Road"));
        assert_eq!(payload.readings.len(), 4);

        let blank = &payload.readings[2];
        assert_eq!(blank.station_id, "S50");
        assert_eq!(blank.value, None);

        let last = &payload.readings[3];
        assert_eq!(last.station_id, "S107");
        assert_eq!(last.sensor, SensorType::Rainfall);
        assert_eq!(last.value, Some(1.4));
        assert_eq!(last.timestamp.to_rfc3339(), "2021-10-15T00:10:00+08:00");
        Ok(())
    }

    #[test]
    fn test_no_station_metadata_gives_empty_payload() -> Result<(), Box<dyn std::error::Error>> {
        let response: EnvironmentResponse = serde_json::from_str(
            r#"{"metadata": {"stations": []},
                "items": [{"timestamp": "2021-10-15T00:05:00+08:00",
                           "readings": [{"station_id": "S50", "value": 1.0}]}]}"#,
        )?;
        assert_eq!(response.into_payload(SensorType::WindSpeed), SensorPayload::default());

        let bare: EnvironmentResponse = serde_json::from_str("{}")?;
        assert!(bare.into_payload(SensorType::WindSpeed).readings.is_empty());
        Ok(())
    }
}
