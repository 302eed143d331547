//! Main entry point: a data folder of downloaded days plus the station
//! registry that every training example is aligned to.

use crate::error::WeatherWindowsError;
use crate::stations::registry::StationRegistry;
use crate::utils::{date_range, ensure_data_dir_exists, get_data_dir};
use crate::weather_data::day_store::DayStore;
use crate::weather_data::error::ConfigurationError;
use crate::weather_data::fetcher::{CollectReport, DataGovFetcher, DEFAULT_MAX_ROUNDS};
use crate::weather_data::window::{WindowAssembler, WindowConfig};
use bon::bon;
use chrono::NaiveDate;
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

/// Client tying together the on-disk [`DayStore`], the remote
/// [`DataGovFetcher`] and a shared [`StationRegistry`].
///
/// Create one with [`WeatherData::new`] to use the default data folder
/// (`~/.cache/weather_windows` on Linux) or with
/// [`WeatherData::with_data_folder`] to choose the location.
///
/// # Examples
///
/// ```rust,no_run
/// # use weather_windows::{StationRegistry, WeatherData, WeatherWindowsError};
/// # use chrono::NaiveDate;
/// # #[tokio::main]
/// # async fn main() -> Result<(), WeatherWindowsError> {
/// let registry = StationRegistry::new(["S50", "S107", "S43"])?;
/// let client = WeatherData::new(registry).await?;
///
/// let start = NaiveDate::from_ymd_opt(2021, 10, 15).unwrap();
/// let end = NaiveDate::from_ymd_opt(2021, 10, 18).unwrap();
/// let report = client.download().start_date(start).end_date(end).call().await?;
/// println!("{} days written, {} failed", report.written.len(), report.failed.len());
///
/// let assembler = client
///     .training_data()
///     .start_date(start)
///     .end_date(end)
///     .training_window(25)
///     .forecast(24)
///     .call()?;
/// for example in assembler.examples() {
///     let example = example?;
///     println!("{} -> {:?}", example.start(), example.target());
/// }
/// # Ok(())
/// # }
/// ```
pub struct WeatherData {
    store: DayStore,
    registry: Arc<StationRegistry>,
    fetcher: DataGovFetcher,
}

#[bon]
impl WeatherData {
    /// Creates a client storing day files in `data_folder`, which is created
    /// if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`WeatherWindowsError::DataDirCreation`] if the folder cannot
    /// be created.
    pub async fn with_data_folder(
        data_folder: PathBuf,
        registry: StationRegistry,
    ) -> Result<Self, WeatherWindowsError> {
        ensure_data_dir_exists(&data_folder)
            .await
            .map_err(|e| WeatherWindowsError::DataDirCreation(data_folder.clone(), e))?;
        Ok(Self {
            store: DayStore::new(&data_folder),
            registry: Arc::new(registry),
            fetcher: DataGovFetcher::new(),
        })
    }

    /// Creates a client using the default data folder.
    ///
    /// # Errors
    ///
    /// Returns [`WeatherWindowsError::DataDirResolution`] if no cache
    /// directory is known for this platform, or
    /// [`WeatherWindowsError::DataDirCreation`] if it cannot be created.
    pub async fn new(registry: StationRegistry) -> Result<Self, WeatherWindowsError> {
        let data_folder = get_data_dir().map_err(WeatherWindowsError::DataDirResolution)?;
        Self::with_data_folder(data_folder, registry).await
    }

    /// Replaces the fetcher used by [`WeatherData::download`].
    pub fn with_fetcher(mut self, fetcher: DataGovFetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn store(&self) -> &DayStore {
        &self.store
    }

    pub fn registry(&self) -> &StationRegistry {
        &self.registry
    }

    /// Builds a [`WindowAssembler`] over the downloaded days.
    ///
    /// This method uses a builder pattern.
    ///
    /// * `.start_date(NaiveDate)` / `.end_date(NaiveDate)`: **Required.** Inclusive date range.
    /// * `.training_window(usize)`: **Required.** Hours of features per example.
    /// * `.forecast(usize)`: **Required.** Hours of rainfall summed into the target.
    ///
    /// Days are only read once the returned assembler is iterated; a date
    /// with no file then surfaces as
    /// [`crate::WeatherDataError::FetchUnavailable`].
    ///
    /// # Errors
    ///
    /// Returns [`WeatherWindowsError::Configuration`] if the window does not
    /// fit the date range.
    #[builder]
    pub fn training_data(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        training_window: usize,
        forecast: usize,
    ) -> Result<WindowAssembler<DayStore>, WeatherWindowsError> {
        let config = WindowConfig::builder()
            .start_date(start_date)
            .end_date(end_date)
            .training_window(training_window)
            .forecast(forecast)
            .build()?;
        Ok(WindowAssembler::new(
            config,
            self.registry.clone(),
            self.store.clone(),
        ))
    }

    /// Downloads every date in the inclusive range into the data folder.
    ///
    /// This method uses a builder pattern.
    ///
    /// * `.start_date(NaiveDate)` / `.end_date(NaiveDate)`: **Required.** Inclusive date range.
    /// * `.max_rounds(usize)`: Optional. Retry rounds over failed dates. Defaults to `3`.
    /// * `.overwrite(bool)`: Optional. Re-download dates already on disk. Defaults to `false`.
    ///
    /// # Errors
    ///
    /// Returns [`WeatherWindowsError::Configuration`] for a reversed range and
    /// [`WeatherWindowsError::Fetch`] if a completed day cannot be written.
    /// Dates that could not be downloaded are reported in
    /// [`CollectReport::failed`], not as an error.
    #[builder]
    pub async fn download(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        max_rounds: Option<usize>,
        overwrite: Option<bool>,
    ) -> Result<CollectReport, WeatherWindowsError> {
        if end_date < start_date {
            return Err(ConfigurationError::EndBeforeStart {
                start: start_date,
                end: end_date,
            }
            .into());
        }
        let dates: Vec<NaiveDate> = if overwrite.unwrap_or(false) {
            date_range(start_date, end_date).collect()
        } else {
            self.store.missing_dates(start_date, end_date)
        };
        if dates.is_empty() {
            info!(
                "All dates from {} to {} already downloaded",
                start_date, end_date
            );
            return Ok(CollectReport::default());
        }

        let report = self
            .fetcher
            .collect(
                &dates,
                &self.store,
                max_rounds.unwrap_or(DEFAULT_MAX_ROUNDS),
            )
            .await?;
        Ok(report)
    }
}
