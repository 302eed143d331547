//! Station × hour matrices for a single calendar date.
//!
//! [`HourlyPivot`] is the sparse shape produced straight from aggregation:
//! only the stations and hours that had readings are present. [`DayMatrix`]
//! is the dense, gap-filled shape aligned to the station registry that the
//! window assembler consumes.

use crate::stations::registry::StationRegistry;
use crate::types::sensor_type::SensorType;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::BTreeMap;

pub const HOURS_PER_DAY: usize = 24;

/// Start of `hour` on `date`.
pub(crate) fn hour_timestamp(date: NaiveDate, hour: usize) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN) + Duration::hours(hour as i64)
}

/// Aggregated readings for one date and sensor type, pivoted to
/// station rows × hour-of-day columns.
///
/// Columns exist only for hours where at least one station reported; a cell
/// is `None` when its station had no reading in an hour another station did.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyPivot {
    pub(crate) date: NaiveDate,
    pub(crate) sensor: SensorType,
    pub(crate) stations: Vec<String>,
    pub(crate) columns: BTreeMap<u32, Vec<Option<f64>>>,
}

impl HourlyPivot {
    /// An empty pivot with the given station rows and no hour columns.
    pub fn new(date: NaiveDate, sensor: SensorType, stations: Vec<String>) -> Self {
        Self {
            date,
            sensor,
            stations,
            columns: BTreeMap::new(),
        }
    }

    /// Sets one cell, creating the hour column (all `None`) on first use.
    /// Hours outside 0..24 are ignored.
    pub fn set(&mut self, station_idx: usize, hour: u32, value: f64) {
        self.set_cell(station_idx, hour, Some(value));
    }

    /// Like [`HourlyPivot::set`], but a `None` value only marks the hour as
    /// reported: the column is created and the cell stays empty.
    pub fn set_cell(&mut self, station_idx: usize, hour: u32, value: Option<f64>) {
        if hour as usize >= HOURS_PER_DAY || station_idx >= self.stations.len() {
            return;
        }
        let height = self.stations.len();
        let column = self
            .columns
            .entry(hour)
            .or_insert_with(|| vec![None; height]);
        if value.is_some() {
            column[station_idx] = value;
        }
    }

    /// Builds a fully populated pivot from a dense matrix.
    pub fn from_day_matrix(matrix: &DayMatrix, registry: &StationRegistry) -> Self {
        let mut pivot = Self::new(matrix.date, matrix.sensor, registry.ids().to_vec());
        for (station_idx, row) in matrix.rows.iter().enumerate() {
            for (hour, value) in row.iter().enumerate() {
                pivot.set(station_idx, hour as u32, *value);
            }
        }
        pivot
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn sensor(&self) -> SensorType {
        self.sensor
    }

    pub fn stations(&self) -> &[String] {
        &self.stations
    }

    /// Present hour columns in ascending order.
    pub fn hours(&self) -> impl Iterator<Item = u32> + '_ {
        self.columns.keys().copied()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn value(&self, station: &str, hour: u32) -> Option<f64> {
        let idx = self.stations.iter().position(|s| s == station)?;
        self.columns.get(&hour).and_then(|column| column[idx])
    }
}

/// Dense station × 24-hour matrix for one date and sensor type.
///
/// Rows follow the registry order, one per registered station. Columns are
/// the hours 0..23 of `date` in ascending order.
#[derive(Debug, Clone, PartialEq)]
pub struct DayMatrix {
    date: NaiveDate,
    sensor: SensorType,
    rows: Vec<[f64; HOURS_PER_DAY]>,
}

impl DayMatrix {
    pub(crate) fn new(date: NaiveDate, sensor: SensorType, rows: Vec<[f64; HOURS_PER_DAY]>) -> Self {
        Self { date, sensor, rows }
    }

    /// All-zero matrix with `stations` rows.
    pub fn zeros(date: NaiveDate, sensor: SensorType, stations: usize) -> Self {
        Self::new(date, sensor, vec![[0.0; HOURS_PER_DAY]; stations])
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn sensor(&self) -> SensorType {
        self.sensor
    }

    pub fn station_count(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[[f64; HOURS_PER_DAY]] {
        &self.rows
    }

    pub fn row(&self, station_idx: usize) -> Option<&[f64; HOURS_PER_DAY]> {
        self.rows.get(station_idx)
    }

    pub fn value(&self, station_idx: usize, hour: usize) -> Option<f64> {
        self.rows.get(station_idx)?.get(hour).copied()
    }

    /// Values of every station at `hour`, in registry order.
    pub fn column(&self, hour: usize) -> Vec<f64> {
        self.rows.iter().map(|row| row[hour]).collect()
    }

    /// Timestamps of the 24 columns.
    pub fn timestamps(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        (0..HOURS_PER_DAY).map(move |hour| hour_timestamp(self.date, hour))
    }
}
