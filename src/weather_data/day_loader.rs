//! Aggregates one day's flat readings into per-sensor station × hour pivots.

use crate::types::day_matrix::HourlyPivot;
use crate::types::reading::Reading;
use crate::types::sensor_type::{Aggregation, PerSensor, SensorType};
use crate::weather_data::day_store::DaySource;
use crate::weather_data::error::WeatherDataError;
use chrono::NaiveDate;
use log::debug;
use polars::prelude::*;
use std::collections::BTreeMap;

const COL_STATION_ID: &str = "station_id";
const COL_DATA_TYPE: &str = "data_type";
const COL_HOUR: &str = "hour";
const COL_VALUE: &str = "value";

/// Loads a date from a [`DaySource`] and aggregates it per sensor type.
///
/// Readings are grouped by (station, sensor type, hour of day). Rainfall
/// groups are summed with empty values counting as zero, every other sensor
/// type is averaged over its non-empty values. The result holds only the
/// stations and hours present in the raw data, including hours reported
/// without any value; gap filling and registry alignment happen afterwards
/// in [`crate::GapFiller`].
pub struct DayFrameLoader<S> {
    source: S,
}

impl<S: DaySource> DayFrameLoader<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Loads and aggregates `date`. Errors from the source are propagated
    /// untouched; a missing date is never turned into an empty day.
    pub fn load(&self, date: NaiveDate) -> Result<PerSensor<HourlyPivot>, WeatherDataError> {
        let readings = self.source.day_records(date)?;
        aggregate_day(date, &readings)
    }
}

/// Groups `readings` by station and hour of day for each sensor type.
///
/// Readings whose local date is not `date` are dropped.
pub fn aggregate_day(
    date: NaiveDate,
    readings: &[Reading],
) -> Result<PerSensor<HourlyPivot>, WeatherDataError> {
    let same_day: Vec<&Reading> = readings.iter().filter(|r| r.date() == date).collect();
    if same_day.len() < readings.len() {
        debug!(
            "Dropped {} readings outside {}",
            readings.len() - same_day.len(),
            date
        );
    }

    let df = df!(
        COL_STATION_ID => same_day.iter().map(|r| r.station_id.as_str()).collect::<Vec<_>>(),
        COL_DATA_TYPE => same_day.iter().map(|r| r.sensor.path_segment()).collect::<Vec<_>>(),
        COL_HOUR => same_day.iter().map(|r| r.hour() as i32).collect::<Vec<_>>(),
        COL_VALUE => same_day.iter().map(|r| r.value).collect::<Vec<_>>(),
    )
    .map_err(|e| WeatherDataError::MalformedInput {
        date,
        message: e.to_string(),
    })?;

    PerSensor::try_from_fn(|sensor| pivot_sensor(date, sensor, &df))
}

fn aggregate_expr(sensor: SensorType) -> Expr {
    match sensor.aggregation() {
        Aggregation::Sum => col(COL_VALUE).fill_null(lit(0.0)).sum(),
        Aggregation::Mean => col(COL_VALUE).mean(),
    }
}

fn pivot_sensor(
    date: NaiveDate,
    sensor: SensorType,
    df: &DataFrame,
) -> Result<HourlyPivot, WeatherDataError> {
    let polars_err = |e: PolarsError| WeatherDataError::Aggregation {
        date,
        sensor,
        source: e,
    };

    let grouped = df
        .clone()
        .lazy()
        .filter(col(COL_DATA_TYPE).eq(lit(sensor.path_segment())))
        .group_by([col(COL_STATION_ID), col(COL_HOUR)])
        .agg([aggregate_expr(sensor).alias(COL_VALUE)])
        .collect()
        .map_err(polars_err)?;

    let stations = grouped.column(COL_STATION_ID).map_err(polars_err)?.str().map_err(polars_err)?;
    let hours = grouped.column(COL_HOUR).map_err(polars_err)?.i32().map_err(polars_err)?;
    let values = grouped.column(COL_VALUE).map_err(polars_err)?.f64().map_err(polars_err)?;

    // A null aggregate (mean over only empty values) still marks its hour.
    let mut cells: BTreeMap<&str, Vec<(u32, Option<f64>)>> = BTreeMap::new();
    for row in 0..grouped.height() {
        if let (Some(station), Some(hour)) = (stations.get(row), hours.get(row)) {
            cells
                .entry(station)
                .or_default()
                .push((hour as u32, values.get(row)));
        }
    }

    let mut pivot = HourlyPivot::new(
        date,
        sensor,
        cells.keys().map(|s| s.to_string()).collect(),
    );
    for (station_idx, station_cells) in cells.values().enumerate() {
        for &(hour, value) in station_cells {
            pivot.set_cell(station_idx, hour, value);
        }
    }
    debug!(
        "{} on {}: {} stations, {} hour columns",
        sensor,
        date,
        pivot.stations().len(),
        pivot.column_count()
    );
    Ok(pivot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, FixedOffset};
    use std::collections::HashMap;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 10, 15).unwrap()
    }

    fn at(hour: u32, minute: u32) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(&format!("2021-10-15T{:02}:{:02}:00+08:00", hour, minute))
            .unwrap()
    }

    #[test]
    fn test_rainfall_sums_and_humidity_averages() -> Result<(), WeatherDataError> {
        let readings = vec![
            Reading::new("S50", SensorType::Rainfall, at(3, 5), 1.0),
            Reading::new("S50", SensorType::Rainfall, at(3, 35), 2.0),
            Reading::new("S50", SensorType::RelativeHumidity, at(3, 0), 40.0),
            Reading::new("S50", SensorType::RelativeHumidity, at(3, 59), 60.0),
        ];
        let pivots = aggregate_day(date(), &readings)?;

        assert_eq!(pivots[SensorType::Rainfall].value("S50", 3), Some(3.0));
        assert_eq!(pivots[SensorType::RelativeHumidity].value("S50", 3), Some(50.0));
        assert_eq!(pivots[SensorType::WindSpeed].column_count(), 0);
        Ok(())
    }

    #[test]
    fn test_hours_with_only_empty_values_are_kept() -> Result<(), WeatherDataError> {
        let readings = vec![
            Reading::with_value("S50", SensorType::Rainfall, at(5, 0), None),
            Reading::with_value("S50", SensorType::Rainfall, at(5, 30), None),
            Reading::with_value("S50", SensorType::Rainfall, at(6, 0), None),
            Reading::new("S50", SensorType::Rainfall, at(6, 30), 0.8),
            Reading::with_value("S50", SensorType::RelativeHumidity, at(5, 0), None),
            Reading::new("S50", SensorType::RelativeHumidity, at(6, 0), 70.0),
            Reading::with_value("S50", SensorType::RelativeHumidity, at(6, 30), None),
        ];
        let pivots = aggregate_day(date(), &readings)?;

        let rainfall = &pivots[SensorType::Rainfall];
        assert_eq!(rainfall.hours().collect::<Vec<_>>(), vec![5, 6]);
        assert_eq!(rainfall.value("S50", 5), Some(0.0));
        assert_eq!(rainfall.value("S50", 6), Some(0.8));

        let humidity = &pivots[SensorType::RelativeHumidity];
        assert_eq!(humidity.hours().collect::<Vec<_>>(), vec![5, 6]);
        assert_eq!(humidity.value("S50", 5), None);
        assert_eq!(humidity.value("S50", 6), Some(70.0));
        Ok(())
    }

    #[test]
    fn test_pivot_has_sorted_stations_and_union_of_hours() -> Result<(), WeatherDataError> {
        let readings = vec![
            Reading::new("S60", SensorType::AirTemperature, at(1, 0), 27.0),
            Reading::new("S24", SensorType::AirTemperature, at(4, 0), 29.0),
            Reading::new("S24", SensorType::AirTemperature, at(1, 0), 28.0),
        ];
        let pivots = aggregate_day(date(), &readings)?;
        let temperature = &pivots[SensorType::AirTemperature];

        assert_eq!(temperature.stations(), ["S24", "S60"]);
        assert_eq!(temperature.hours().collect::<Vec<_>>(), vec![1, 4]);
        assert_eq!(temperature.value("S60", 4), None);
        assert_eq!(temperature.value("S24", 4), Some(29.0));
        Ok(())
    }

    #[test]
    fn test_readings_from_other_dates_are_dropped() -> Result<(), WeatherDataError> {
        let next_day = DateTime::parse_from_rfc3339("2021-10-16T00:00:00+08:00").unwrap();
        let readings = vec![
            Reading::new("S50", SensorType::WindSpeed, at(23, 0), 5.0),
            Reading::new("S50", SensorType::WindSpeed, next_day, 9.0),
        ];
        let pivots = aggregate_day(date(), &readings)?;
        assert_eq!(pivots[SensorType::WindSpeed].hours().collect::<Vec<_>>(), vec![23]);
        Ok(())
    }

    #[test]
    fn test_empty_day_gives_empty_pivots() -> Result<(), WeatherDataError> {
        let pivots = aggregate_day(date(), &[])?;
        for (_, pivot) in pivots.iter() {
            assert_eq!(pivot.column_count(), 0);
            assert!(pivot.stations().is_empty());
        }
        Ok(())
    }

    #[test]
    fn test_loader_propagates_missing_day() {
        let loader = DayFrameLoader::new(HashMap::<NaiveDate, Vec<Reading>>::new());
        assert!(matches!(
            loader.load(date()),
            Err(WeatherDataError::FetchUnavailable { .. })
        ));
    }
}
