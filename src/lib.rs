mod error;
mod stations;
mod types;
mod utils;
mod weather_data;
mod weather_windows;

pub use error::WeatherWindowsError;
pub use weather_windows::*;

pub use stations::error::StationRegistryError;
pub use stations::registry::StationRegistry;

pub use types::any_date::AnyDate;
pub use types::day_matrix::{DayMatrix, HourlyPivot, HOURS_PER_DAY};
pub use types::reading::Reading;
pub use types::sensor_type::{Aggregation, PerSensor, SensorType, UnknownSensorType, SENSOR_COUNT};
pub use types::station::{Location, Station};
pub use types::training_example::TrainingExample;

pub use utils::{date_range, days_in_range};

pub use weather_data::api::SensorPayload;
pub use weather_data::day_loader::{aggregate_day, DayFrameLoader};
pub use weather_data::day_store::{DayRecords, DaySource, DayStore};
pub use weather_data::error::{ConfigurationError, FetchError, WeatherDataError};
pub use weather_data::fetcher::{
    CollectReport, DataGovFetcher, DEFAULT_BASE_URL, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_ROUNDS,
    DEFAULT_RETRY_PAUSE,
};
pub use weather_data::gap_filler::{fill_missing_hours, GapFiller};
pub use weather_data::window::{TrainingExamples, WindowAssembler, WindowConfig};
