use crate::stations::error::StationRegistryError;
use crate::weather_data::error::{ConfigurationError, FetchError, WeatherDataError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WeatherWindowsError {
    #[error(transparent)]
    WeatherData(#[from] WeatherDataError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    StationRegistry(#[from] StationRegistryError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("Failed to create data directory '{0}'")]
    DataDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to determine data directory")]
    DataDirResolution(#[source] std::io::Error),
}
