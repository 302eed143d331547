//! Per-date persistence of flat reading records.
//!
//! Each calendar date is one CSV file named `YYYY-MM-DD.csv` with the
//! columns `station_id,name,latitude,longitude,data_type,timestamp,value`.
//! The station metadata columns may be empty. The fetcher writes these
//! files; the day loader reads them back through the [`DaySource`] seam.

use crate::types::reading::Reading;
use crate::types::sensor_type::SensorType;
use crate::types::station::{Location, Station};
use crate::utils::date_range;
use crate::weather_data::error::WeatherDataError;
use chrono::{DateTime, FixedOffset, NaiveDate};
use log::{debug, info, warn};
use polars::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const COL_STATION_ID: &str = "station_id";
const COL_NAME: &str = "name";
const COL_LATITUDE: &str = "latitude";
const COL_LONGITUDE: &str = "longitude";
const COL_DATA_TYPE: &str = "data_type";
const COL_TIMESTAMP: &str = "timestamp";
const COL_VALUE: &str = "value";

/// Anything that can hand back the raw records of one calendar date.
///
/// A date that cannot be provided must be reported as an error
/// ([`WeatherDataError::FetchUnavailable`] when it simply is not there),
/// never as an empty record set.
pub trait DaySource {
    fn day_records(&self, date: NaiveDate) -> Result<Vec<Reading>, WeatherDataError>;
}

impl<T: DaySource + ?Sized> DaySource for &T {
    fn day_records(&self, date: NaiveDate) -> Result<Vec<Reading>, WeatherDataError> {
        (**self).day_records(date)
    }
}

impl<T: DaySource + ?Sized> DaySource for std::sync::Arc<T> {
    fn day_records(&self, date: NaiveDate) -> Result<Vec<Reading>, WeatherDataError> {
        (**self).day_records(date)
    }
}

/// In-memory source, mostly useful for tests and benchmarks.
impl DaySource for HashMap<NaiveDate, Vec<Reading>> {
    fn day_records(&self, date: NaiveDate) -> Result<Vec<Reading>, WeatherDataError> {
        self.get(&date)
            .cloned()
            .ok_or(WeatherDataError::FetchUnavailable { date })
    }
}

/// Everything fetched for one date: the readings of all sensor types plus
/// the station metadata the API reported alongside them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DayRecords {
    pub stations: Vec<Station>,
    pub readings: Vec<Reading>,
}

/// Folder of per-date CSV files.
#[derive(Debug, Clone)]
pub struct DayStore {
    data_dir: PathBuf,
}

impl DayStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn day_path(&self, date: NaiveDate) -> PathBuf {
        self.data_dir
            .join(format!("{}.csv", date.format("%Y-%m-%d")))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.day_path(date).is_file()
    }

    /// Dates in `start..=end` that have no file yet.
    pub fn missing_dates(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        date_range(start, end)
            .filter(|date| !self.contains(*date))
            .collect()
    }

    /// Writes the readings of `date` without station metadata.
    pub fn write_day(
        &self,
        date: NaiveDate,
        readings: &[Reading],
    ) -> Result<PathBuf, WeatherDataError> {
        self.write_records(date, readings, &[])
    }

    /// Writes the records of `date`, replacing any existing file.
    ///
    /// Each reading row carries the name and location of its station, looked
    /// up by `id` or `device_id` in `stations`; unknown stations get empty
    /// metadata. The frame is written to a temporary file in the data folder
    /// first and then moved into place, so readers never observe a partial
    /// day.
    pub fn write_records(
        &self,
        date: NaiveDate,
        readings: &[Reading],
        stations: &[Station],
    ) -> Result<PathBuf, WeatherDataError> {
        fs::create_dir_all(&self.data_dir)
            .map_err(|e| WeatherDataError::DataDirCreation(self.data_dir.clone(), e))?;
        let path = self.day_path(date);

        let mut by_id: HashMap<&str, &Station> = HashMap::new();
        for station in stations {
            if let Some(device_id) = station.device_id.as_deref() {
                by_id.entry(device_id).or_insert(station);
            }
            by_id.insert(station.id.as_str(), station);
        }
        let meta: Vec<Option<&Station>> = readings
            .iter()
            .map(|r| by_id.get(r.station_id.as_str()).copied())
            .collect();
        let location = |m: &Option<&Station>| m.and_then(|s| s.location);

        let mut df = df!(
            COL_STATION_ID => readings.iter().map(|r| r.station_id.as_str()).collect::<Vec<_>>(),
            COL_NAME => meta.iter().map(|m| m.and_then(|s| s.name.as_deref())).collect::<Vec<_>>(),
            COL_LATITUDE => meta.iter().map(|m| location(m).map(|l| l.latitude)).collect::<Vec<_>>(),
            COL_LONGITUDE => meta.iter().map(|m| location(m).map(|l| l.longitude)).collect::<Vec<_>>(),
            COL_DATA_TYPE => readings.iter().map(|r| r.sensor.path_segment()).collect::<Vec<_>>(),
            COL_TIMESTAMP => readings.iter().map(|r| r.timestamp.to_rfc3339()).collect::<Vec<_>>(),
            COL_VALUE => readings.iter().map(|r| r.value).collect::<Vec<_>>(),
        )
        .map_err(|e| WeatherDataError::DayFileWritePolars(path.clone(), e))?;

        let mut temp_file = NamedTempFile::new_in(&self.data_dir)
            .map_err(|e| WeatherDataError::DayFileWriteIo(path.clone(), e))?;
        CsvWriter::new(temp_file.as_file_mut())
            .include_header(true)
            .finish(&mut df)
            .map_err(|e| WeatherDataError::DayFileWritePolars(path.clone(), e))?;
        temp_file
            .flush()
            .map_err(|e| WeatherDataError::DayFileWriteIo(path.clone(), e))?;
        temp_file
            .persist(&path)
            .map_err(|e| WeatherDataError::DayFileWriteIo(path.clone(), e.error))?;

        info!("Wrote {} records to {}", readings.len(), path.display());
        Ok(path)
    }

    /// Reads the records of `date`.
    ///
    /// # Errors
    ///
    /// * [`WeatherDataError::FetchUnavailable`] if no file exists for the date.
    /// * [`WeatherDataError::CsvReadPolars`] if the file cannot be parsed as CSV.
    /// * [`WeatherDataError::MissingColumn`] / [`WeatherDataError::MalformedInput`]
    ///   if required fields are absent or unparsable.
    pub fn read_day(&self, date: NaiveDate) -> Result<Vec<Reading>, WeatherDataError> {
        let df = self.read_frame(date)?;
        let readings = records_from_frame(date, &df)?;
        debug!(
            "Read {} records for {} from {}",
            readings.len(),
            date,
            self.day_path(date).display()
        );
        Ok(readings)
    }

    /// Distinct stations of `date` in order of first appearance, with the
    /// name and location persisted next to their readings. Files without
    /// metadata columns yield stations with only an id.
    pub fn read_stations(&self, date: NaiveDate) -> Result<Vec<Station>, WeatherDataError> {
        let df = self.read_frame(date)?;
        stations_from_frame(date, &df)
    }

    fn read_frame(&self, date: NaiveDate) -> Result<DataFrame, WeatherDataError> {
        let path = self.day_path(date);
        if !path.is_file() {
            warn!("No day file for {} at {}", date, path.display());
            return Err(WeatherDataError::FetchUnavailable { date });
        }

        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(None)
            .try_into_reader_with_file_path(Some(path))
            .map_err(|e| WeatherDataError::CsvReadPolars { date, source: e })?
            .finish()
            .map_err(|e| WeatherDataError::CsvReadPolars { date, source: e })
    }
}

impl DaySource for DayStore {
    fn day_records(&self, date: NaiveDate) -> Result<Vec<Reading>, WeatherDataError> {
        self.read_day(date)
    }
}

/// Retrieves a column by name and casts it to `dtype`.
fn get_column(df: &DataFrame, date: NaiveDate, name: &str, dtype: &DataType) -> Result<Column, WeatherDataError> {
    df.column(name)
        .map_err(|_| WeatherDataError::MissingColumn {
            date,
            column: name.to_string(),
        })?
        .cast(dtype)
        .map_err(|e| WeatherDataError::MalformedInput {
            date,
            message: format!("column '{}' cannot be read as {}: {}", name, dtype, e),
        })
}

/// Like [`get_column`], but `None` when the file has no such column.
fn get_optional_column(
    df: &DataFrame,
    date: NaiveDate,
    name: &str,
    dtype: &DataType,
) -> Result<Option<Column>, WeatherDataError> {
    if df.get_column_index(name).is_none() {
        return Ok(None);
    }
    get_column(df, date, name, dtype).map(Some)
}

/// Accepts RFC 3339 as written by [`DayStore::write_day`] as well as the
/// space-separated form (`2021-10-15 00:00:00+08:00`).
fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%:z"))
        .ok()
}

fn records_from_frame(date: NaiveDate, df: &DataFrame) -> Result<Vec<Reading>, WeatherDataError> {
    let station_col = get_column(df, date, COL_STATION_ID, &DataType::String)?;
    let type_col = get_column(df, date, COL_DATA_TYPE, &DataType::String)?;
    let time_col = get_column(df, date, COL_TIMESTAMP, &DataType::String)?;
    let value_col = get_column(df, date, COL_VALUE, &DataType::Float64)?;

    let malformed = |message: String| WeatherDataError::MalformedInput { date, message };
    let station_ids = station_col.str().map_err(|e| malformed(e.to_string()))?;
    let data_types = type_col.str().map_err(|e| malformed(e.to_string()))?;
    let timestamps = time_col.str().map_err(|e| malformed(e.to_string()))?;
    let values = value_col.f64().map_err(|e| malformed(e.to_string()))?;

    let mut readings = Vec::with_capacity(df.height());
    let mut unknown_types = 0usize;

    for row in 0..df.height() {
        let station_id = station_ids
            .get(row)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| malformed(format!("row {} has no station_id", row)))?;
        let data_type = data_types
            .get(row)
            .ok_or_else(|| malformed(format!("row {} has no data_type", row)))?;
        let raw_timestamp = timestamps
            .get(row)
            .ok_or_else(|| malformed(format!("row {} has no timestamp", row)))?;

        let Ok(sensor) = data_type.parse::<SensorType>() else {
            unknown_types += 1;
            continue;
        };
        let timestamp = parse_timestamp(raw_timestamp).ok_or_else(|| {
            malformed(format!("row {} has unparsable timestamp '{}'", row, raw_timestamp))
        })?;

        readings.push(Reading::with_value(
            station_id.trim(),
            sensor,
            timestamp,
            values.get(row),
        ));
    }

    if unknown_types > 0 {
        warn!(
            "Skipped {} records with unknown data_type for {}",
            unknown_types, date
        );
    }
    Ok(readings)
}

fn stations_from_frame(date: NaiveDate, df: &DataFrame) -> Result<Vec<Station>, WeatherDataError> {
    let malformed = |message: String| WeatherDataError::MalformedInput { date, message };
    let station_col = get_column(df, date, COL_STATION_ID, &DataType::String)?;
    let name_col = get_optional_column(df, date, COL_NAME, &DataType::String)?;
    let lat_col = get_optional_column(df, date, COL_LATITUDE, &DataType::Float64)?;
    let lon_col = get_optional_column(df, date, COL_LONGITUDE, &DataType::Float64)?;

    let station_ids = station_col.str().map_err(|e| malformed(e.to_string()))?;
    let names = name_col
        .as_ref()
        .map(|c| c.str())
        .transpose()
        .map_err(|e| malformed(e.to_string()))?;
    let latitudes = lat_col
        .as_ref()
        .map(|c| c.f64())
        .transpose()
        .map_err(|e| malformed(e.to_string()))?;
    let longitudes = lon_col
        .as_ref()
        .map(|c| c.f64())
        .transpose()
        .map_err(|e| malformed(e.to_string()))?;

    let mut seen = HashMap::new();
    let mut stations: Vec<Station> = Vec::new();
    for row in 0..df.height() {
        let Some(id) = station_ids.get(row).map(str::trim).filter(|s| !s.is_empty()) else {
            continue;
        };
        let position = *seen.entry(id.to_string()).or_insert_with(|| {
            stations.push(Station::new(id));
            stations.len() - 1
        });
        let station = &mut stations[position];

        if station.name.is_none() {
            station.name = names.and_then(|n| n.get(row)).map(str::to_string);
        }
        if station.location.is_none() {
            let latitude = latitudes.and_then(|c| c.get(row));
            let longitude = longitudes.and_then(|c| c.get(row));
            if let (Some(latitude), Some(longitude)) = (latitude, longitude) {
                station.location = Some(Location {
                    latitude,
                    longitude,
                });
            }
        }
    }
    Ok(stations)
}
