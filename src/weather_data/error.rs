use crate::types::sensor_type::SensorType;
use chrono::NaiveDate;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

/// Rejections of a window configuration. Raised before any data is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("Training window must be at least one hour")]
    ZeroTrainingWindow,

    #[error("Forecast horizon must be at least one hour")]
    ZeroForecast,

    #[error("End date {end} is before start date {start}")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },

    #[error("Window of {window_size} hours does not fit in {available_hours} hours between {start} and {end}")]
    WindowExceedsRange {
        window_size: usize,
        available_hours: usize,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("Could not resolve '{0}' to a calendar date")]
    InvalidDate(String),
}

#[derive(Debug, Error)]
pub enum WeatherDataError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("No raw records available for {date}")]
    FetchUnavailable { date: NaiveDate },

    #[error("Malformed raw records for {date}: {message}")]
    MalformedInput { date: NaiveDate, message: String },

    #[error("Parsing error reading day file for {date}")]
    CsvReadPolars {
        date: NaiveDate,
        #[source]
        source: PolarsError,
    },

    #[error("I/O error writing day file '{0}'")]
    DayFileWriteIo(PathBuf, #[source] std::io::Error),

    #[error("Encoding error writing day file '{0}'")]
    DayFileWritePolars(PathBuf, #[source] PolarsError),

    #[error("Failed to create data directory '{0}'")]
    DataDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed aggregating {sensor} readings for {date}")]
    Aggregation {
        date: NaiveDate,
        sensor: SensorType,
        #[source]
        source: PolarsError,
    },

    #[error("Missing required column '{column}' in records for {date}")]
    MissingColumn { date: NaiveDate, column: String },
}

impl WeatherDataError {
    /// The date the error refers to, when it refers to one.
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            WeatherDataError::FetchUnavailable { date }
            | WeatherDataError::MalformedInput { date, .. }
            | WeatherDataError::CsvReadPolars { date, .. }
            | WeatherDataError::Aggregation { date, .. }
            | WeatherDataError::MissingColumn { date, .. } => Some(*date),
            _ => None,
        }
    }
}

/// Failures of the remote collection step.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP status {status} for {url}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to decode response from {url}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{sensor} unavailable for {date} after {attempts} attempts")]
    FetchUnavailable {
        date: NaiveDate,
        sensor: SensorType,
        attempts: usize,
        #[source]
        source: Box<FetchError>,
    },

    #[error("Incomplete day {date}: failed sensor types {sensors:?}")]
    DayIncomplete {
        date: NaiveDate,
        sensors: Vec<SensorType>,
        #[source]
        source: Box<FetchError>,
    },

    #[error(transparent)]
    Store(#[from] WeatherDataError),

    #[error("Background task failed")]
    TaskJoin(#[from] tokio::task::JoinError),
}
