//! Sliding-window assembly of training examples across a date range.
//!
//! Days are loaded lazily: the assembler only appends the next day when the
//! buffered hours no longer cover a full window, and drops one hour from the
//! left after every emitted example. At most `window_size + 23` columns per
//! sensor type are held in memory regardless of the range length.

use crate::stations::registry::StationRegistry;
use crate::types::any_date::AnyDate;
use crate::types::day_matrix::{hour_timestamp, DayMatrix, HOURS_PER_DAY};
use crate::types::sensor_type::{PerSensor, SensorType, SENSOR_COUNT};
use crate::types::training_example::TrainingExample;
use crate::utils::{date_range, days_in_range};
use crate::weather_data::day_loader::DayFrameLoader;
use crate::weather_data::day_store::DaySource;
use crate::weather_data::error::{ConfigurationError, WeatherDataError};
use crate::weather_data::gap_filler::GapFiller;
use bon::bon;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use log::{debug, info};
use std::collections::VecDeque;
use std::sync::Arc;

/// A validated windowing configuration.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use weather_windows::WindowConfig;
///
/// let config = WindowConfig::builder()
///     .start_date(NaiveDate::from_ymd_opt(2021, 10, 15).unwrap())
///     .end_date(NaiveDate::from_ymd_opt(2021, 10, 18).unwrap())
///     .training_window(25)
///     .forecast(24)
///     .build()
///     .unwrap();
/// assert_eq!(config.window_size(), 49);
/// assert_eq!(config.example_count(), 4 * 24 - 49 + 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig {
    start_date: NaiveDate,
    end_date: NaiveDate,
    training_window: usize,
    forecast: usize,
}

#[bon]
impl WindowConfig {
    /// Validates and builds a configuration.
    ///
    /// # Errors
    ///
    /// * [`ConfigurationError::ZeroTrainingWindow`] / [`ConfigurationError::ZeroForecast`]
    ///   for empty windows.
    /// * [`ConfigurationError::EndBeforeStart`] if `end_date < start_date`.
    /// * [`ConfigurationError::WindowExceedsRange`] if a single window needs
    ///   more hours than the inclusive date range has.
    #[builder]
    pub fn new(
        start_date: NaiveDate,
        end_date: NaiveDate,
        training_window: usize,
        forecast: usize,
    ) -> Result<Self, ConfigurationError> {
        if training_window == 0 {
            return Err(ConfigurationError::ZeroTrainingWindow);
        }
        if forecast == 0 {
            return Err(ConfigurationError::ZeroForecast);
        }
        if end_date < start_date {
            return Err(ConfigurationError::EndBeforeStart {
                start: start_date,
                end: end_date,
            });
        }
        let available_hours = days_in_range(start_date, end_date) * HOURS_PER_DAY;
        let window_size = training_window + forecast;
        if window_size > available_hours {
            return Err(ConfigurationError::WindowExceedsRange {
                window_size,
                available_hours,
                start: start_date,
                end: end_date,
            });
        }
        Ok(Self {
            start_date,
            end_date,
            training_window,
            forecast,
        })
    }

    /// Like the builder, but resolves the dates from anything implementing
    /// [`AnyDate`], such as `"2021-10-15"`.
    pub fn from_dates(
        start_date: impl AnyDate + ToString + Clone,
        end_date: impl AnyDate + ToString + Clone,
        training_window: usize,
        forecast: usize,
    ) -> Result<Self, ConfigurationError> {
        let start = start_date
            .clone()
            .get_date()
            .ok_or_else(|| ConfigurationError::InvalidDate(start_date.to_string()))?;
        let end = end_date
            .clone()
            .get_date()
            .ok_or_else(|| ConfigurationError::InvalidDate(end_date.to_string()))?;
        Self::builder()
            .start_date(start)
            .end_date(end)
            .training_window(training_window)
            .forecast(forecast)
            .build()
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn training_window(&self) -> usize {
        self.training_window
    }

    pub fn forecast(&self) -> usize {
        self.forecast
    }

    /// `training_window + forecast`.
    pub fn window_size(&self) -> usize {
        self.training_window + self.forecast
    }

    pub fn day_count(&self) -> usize {
        days_in_range(self.start_date, self.end_date)
    }

    /// Number of examples a full pass emits: `24·days − window_size + 1`.
    pub fn example_count(&self) -> usize {
        self.day_count() * HOURS_PER_DAY + 1 - self.window_size()
    }
}

/// Produces training examples for a fixed configuration.
///
/// The assembler itself holds no cursor: every call to
/// [`WindowAssembler::examples`] starts an independent pass from the first
/// day, so the same configuration always yields the same sequence.
pub struct WindowAssembler<S> {
    config: WindowConfig,
    registry: Arc<StationRegistry>,
    loader: DayFrameLoader<S>,
}

impl<S: DaySource> WindowAssembler<S> {
    pub fn new(config: WindowConfig, registry: Arc<StationRegistry>, source: S) -> Self {
        Self {
            config,
            registry,
            loader: DayFrameLoader::new(source),
        }
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    pub fn registry(&self) -> &StationRegistry {
        &self.registry
    }

    /// Starts a new lazy pass over the configured date range.
    ///
    /// Each item is either a [`TrainingExample`] or the error that stopped
    /// the pass (for example [`WeatherDataError::FetchUnavailable`] naming
    /// the first date that could not be loaded); no items follow an error.
    pub fn examples(&self) -> TrainingExamples<'_, S> {
        info!(
            "Windowing {} to {} ({} + {} hours, {} stations)",
            self.config.start_date,
            self.config.end_date,
            self.config.training_window,
            self.config.forecast,
            self.registry.len()
        );
        TrainingExamples {
            assembler: self,
            pending_days: date_range(self.config.start_date, self.config.end_date)
                .collect::<Vec<_>>()
                .into_iter(),
            buffer: WindowBuffer::new(self.registry.len()),
            remaining: self.config.example_count(),
            finished: false,
        }
    }

    /// Loads, aggregates and gap-fills one date for every sensor type.
    pub fn load_day(&self, date: NaiveDate) -> Result<PerSensor<DayMatrix>, WeatherDataError> {
        let filler = GapFiller::new(&self.registry);
        Ok(self.loader.load(date)?.map(|pivot| filler.fill(pivot)))
    }
}

/// Per-sensor column buffer. Every column holds one value per registered
/// station; all sensor types always hold the same number of columns.
struct WindowBuffer {
    stations: usize,
    start: Option<NaiveDateTime>,
    columns: PerSensor<VecDeque<Vec<f64>>>,
}

impl WindowBuffer {
    fn new(stations: usize) -> Self {
        Self {
            stations,
            start: None,
            columns: PerSensor::from_fn(|_| VecDeque::new()),
        }
    }

    fn len(&self) -> usize {
        self.columns[SensorType::TARGET].len()
    }

    /// Appends a day's 24 columns on the right of each sensor's own buffer.
    fn push_day(&mut self, day: PerSensor<DayMatrix>) {
        for matrix in day.into_inner() {
            if self.start.is_none() {
                self.start = Some(hour_timestamp(matrix.date(), 0));
            }
            let buffer = &mut self.columns[matrix.sensor()];
            for hour in 0..HOURS_PER_DAY {
                buffer.push_back(matrix.column(hour));
            }
        }
    }

    /// Example for the leftmost window. Caller guarantees
    /// `len() >= training_window + forecast`.
    fn window(&self, training_window: usize, forecast: usize) -> Option<TrainingExample> {
        let start = self.start?;
        let mut features = Vec::with_capacity(SENSOR_COUNT * self.stations * training_window);
        for (_, columns) in self.columns.iter() {
            for station in 0..self.stations {
                features.extend(columns.iter().take(training_window).map(|col| col[station]));
            }
        }

        let target_columns = &self.columns[SensorType::TARGET];
        let target = (0..self.stations)
            .map(|station| {
                target_columns
                    .iter()
                    .skip(training_window)
                    .take(forecast)
                    .map(|col| col[station])
                    .sum()
            })
            .collect();

        Some(TrainingExample::new(
            start,
            self.stations,
            training_window,
            features,
            target,
        ))
    }

    /// Drops the leftmost hour of every sensor type.
    fn advance(&mut self) {
        for sensor in SensorType::ALL {
            self.columns[sensor].pop_front();
        }
        self.start = self.start.map(|start| start + Duration::hours(1));
    }
}

/// Lazy iterator returned by [`WindowAssembler::examples`].
pub struct TrainingExamples<'a, S> {
    assembler: &'a WindowAssembler<S>,
    pending_days: std::vec::IntoIter<NaiveDate>,
    buffer: WindowBuffer,
    remaining: usize,
    finished: bool,
}

impl<S: DaySource> Iterator for TrainingExamples<'_, S> {
    type Item = Result<TrainingExample, WeatherDataError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let config = self.assembler.config;
        let window_size = config.window_size();

        while self.buffer.len() < window_size {
            let Some(date) = self.pending_days.next() else {
                self.finished = true;
                return None;
            };
            match self.assembler.load_day(date) {
                Ok(day) => {
                    debug!("Appending {} to window buffer", date);
                    self.buffer.push_day(day);
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }

        let example = self
            .buffer
            .window(config.training_window, config.forecast);
        self.buffer.advance();
        self.remaining = self.remaining.saturating_sub(1);
        match example {
            Some(example) => Some(Ok(example)),
            None => {
                self.finished = true;
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.finished {
            (0, Some(0))
        } else {
            (0, Some(self.remaining))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::reading::Reading;
    use crate::weather_data::day_store::DayStore;
    use chrono::{DateTime, FixedOffset, Timelike};
    use std::collections::HashMap;

    const STATIONS: [&str; 3] = ["S50", "S107", "S43"];

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 10, day).unwrap()
    }

    fn registry() -> Arc<StationRegistry> {
        Arc::new(StationRegistry::new(STATIONS).unwrap())
    }

    fn at(date: NaiveDate, hour: u32) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(&format!("{}T{:02}:10:00+08:00", date.format("%Y-%m-%d"), hour))
            .unwrap()
    }

    /// Distinct, predictable value per (sensor, station, absolute hour).
    fn synthetic_value(sensor: SensorType, station: usize, absolute_hour: usize) -> f64 {
        (sensor.index() * 100_000 + station * 10_000 + absolute_hour) as f64
    }

    /// Complete readings for every station, sensor and hour of `days`
    /// consecutive days starting at the 15th.
    fn full_source(days: u32) -> HashMap<NaiveDate, Vec<Reading>> {
        let mut source = HashMap::new();
        for offset in 0..days {
            let date = d(15 + offset);
            let mut readings = Vec::new();
            for sensor in SensorType::ALL {
                for (station_idx, station) in STATIONS.iter().enumerate() {
                    for hour in 0..24u32 {
                        let absolute = offset as usize * 24 + hour as usize;
                        readings.push(Reading::new(
                            *station,
                            sensor,
                            at(date, hour),
                            synthetic_value(sensor, station_idx, absolute),
                        ));
                    }
                }
            }
            source.insert(date, readings);
        }
        source
    }

    fn config(days: u32, training_window: usize, forecast: usize) -> WindowConfig {
        WindowConfig::builder()
            .start_date(d(15))
            .end_date(d(15 + days - 1))
            .training_window(training_window)
            .forecast(forecast)
            .build()
            .unwrap()
    }

    #[test]
    fn test_rejects_zero_windows_and_reversed_range() {
        let build = |start: NaiveDate, end: NaiveDate, tw: usize, fc: usize| {
            WindowConfig::builder()
                .start_date(start)
                .end_date(end)
                .training_window(tw)
                .forecast(fc)
                .build()
        };
        assert_eq!(build(d(15), d(18), 0, 24), Err(ConfigurationError::ZeroTrainingWindow));
        assert_eq!(build(d(15), d(18), 25, 0), Err(ConfigurationError::ZeroForecast));
        assert_eq!(
            build(d(18), d(15), 25, 24),
            Err(ConfigurationError::EndBeforeStart { start: d(18), end: d(15) })
        );
        assert!(matches!(
            build(d(15), d(16), 25, 24),
            Err(ConfigurationError::WindowExceedsRange { window_size: 49, available_hours: 48, .. })
        ));
        assert!(build(d(15), d(16), 24, 24).is_ok());
    }

    #[test]
    fn test_from_dates_parses_strings() {
        let config = WindowConfig::from_dates("2021-10-15", "2021-10-18", 25, 24).unwrap();
        assert_eq!(config.start_date(), d(15));
        assert_eq!(config.end_date(), d(18));
        assert_eq!(
            WindowConfig::from_dates("2021-10-15", "soon", 25, 24),
            Err(ConfigurationError::InvalidDate("soon".to_string()))
        );
    }

    #[test]
    fn test_window_count_matches_range() -> Result<(), WeatherDataError> {
        for (days, tw, fc) in [(1, 12, 12), (1, 1, 1), (2, 25, 1), (3, 25, 24), (4, 5, 3)] {
            let config = config(days, tw, fc);
            let assembler = WindowAssembler::new(config, registry(), full_source(days));
            let examples = assembler.examples().collect::<Result<Vec<_>, _>>()?;
            let expected = 24 * days as usize - (tw + fc) + 1;
            assert_eq!(examples.len(), expected, "days={} tw={} fc={}", days, tw, fc);
            assert_eq!(config.example_count(), expected);
        }
        Ok(())
    }

    #[test]
    fn test_features_and_target_slices() -> Result<(), WeatherDataError> {
        let (tw, fc) = (25, 24);
        let assembler = WindowAssembler::new(config(3, tw, fc), registry(), full_source(3));

        for (i, example) in assembler.examples().enumerate() {
            let example = example?;
            assert_eq!(example.shape(), (SENSOR_COUNT, STATIONS.len(), tw));
            assert_eq!(example.start(), d(15).and_hms_opt(0, 0, 0).unwrap() + Duration::hours(i as i64));

            for sensor in SensorType::ALL {
                for station in 0..STATIONS.len() {
                    assert_eq!(example.feature(sensor, station, 0), Some(synthetic_value(sensor, station, i)));
                    assert_eq!(
                        example.feature(sensor, station, tw - 1),
                        Some(synthetic_value(sensor, station, i + tw - 1))
                    );
                }
            }
            for station in 0..STATIONS.len() {
                let expected: f64 = (i + tw..i + tw + fc)
                    .map(|hour| synthetic_value(SensorType::Rainfall, station, hour))
                    .sum();
                assert_eq!(example.target()[station], expected);
            }
        }
        Ok(())
    }

    #[test]
    fn test_each_sensor_keeps_its_own_history_across_days() -> Result<(), WeatherDataError> {
        // Window straddles the day boundary, so humidity columns from the
        // second day must follow humidity (not rainfall) from the first.
        let assembler = WindowAssembler::new(config(2, 30, 2), registry(), full_source(2));
        let first = assembler.examples().next().unwrap()?;
        for hour in 0..30 {
            assert_eq!(
                first.feature(SensorType::RelativeHumidity, 1, hour),
                Some(synthetic_value(SensorType::RelativeHumidity, 1, hour))
            );
        }
        Ok(())
    }

    #[test]
    fn test_examples_restart_from_scratch() -> Result<(), WeatherDataError> {
        let assembler = WindowAssembler::new(config(2, 6, 6), registry(), full_source(2));
        let mut partial = assembler.examples();
        partial.next();
        partial.next();

        let first_pass = assembler.examples().collect::<Result<Vec<_>, _>>()?;
        let second_pass = assembler.examples().collect::<Result<Vec<_>, _>>()?;
        assert_eq!(first_pass, second_pass);
        assert_eq!(first_pass.len(), 37);
        Ok(())
    }

    #[test]
    fn test_sparse_day_is_gap_filled_before_windowing() -> Result<(), WeatherDataError> {
        let mut source = HashMap::new();
        // Only S50 rainfall at hours 2 and 5; everything else missing.
        source.insert(
            d(15),
            vec![
                Reading::new("S50", SensorType::Rainfall, at(d(15), 2), 1.0),
                Reading::new("S50", SensorType::Rainfall, at(d(15), 2).with_minute(40).unwrap(), 0.5),
                Reading::new("S50", SensorType::Rainfall, at(d(15), 5), 4.0),
            ],
        );
        let assembler = WindowAssembler::new(config(1, 4, 2), registry(), source);
        let first = assembler.examples().next().unwrap()?;

        // Hours 0..=4 hold 1.5 (hour 0 copies hour 2), hours 5 and 6 hold 4.0.
        let rainfall: Vec<_> = first.sensor_rows(SensorType::Rainfall).next().unwrap().to_vec();
        assert_eq!(rainfall, vec![1.5, 1.5, 1.5, 1.5]);
        assert_eq!(first.target()[0], 1.5 + 4.0);
        assert_eq!(first.target()[1], 0.0);
        assert!(first.sensor_rows(SensorType::WindSpeed).flatten().all(|v| *v == 0.0));
        Ok(())
    }

    #[test]
    fn test_hour_with_only_empty_values_becomes_zero() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let store = DayStore::new(dir.path());
        let mut csv = String::from("station_id,name,latitude,longitude,data_type,timestamp,value\n");
        for hour in 0..24 {
            let rainfall = if hour == 5 { String::new() } else { "2.0".to_string() };
            csv.push_str(&format!(
                "S50,Clementi Road,1.3337,103.7768,environment/rainfall,2021-10-15T{:02}:00:00+08:00,{}\n",
                hour, rainfall
            ));
            csv.push_str(&format!(
                "S50,Clementi Road,1.3337,103.7768,environment/air-temperature,2021-10-15T{:02}:00:00+08:00,{}\n",
                hour,
                if hour == 5 { "" } else { "27.5" }
            ));
        }
        std::fs::write(store.day_path(d(15)), csv)?;

        let assembler = WindowAssembler::new(config(1, 23, 1), registry(), &store);
        let first = assembler.examples().next().unwrap()?;

        assert_eq!(first.feature(SensorType::Rainfall, 0, 4), Some(2.0));
        assert_eq!(first.feature(SensorType::Rainfall, 0, 5), Some(0.0));
        assert_eq!(first.feature(SensorType::Rainfall, 0, 6), Some(2.0));
        assert_eq!(first.feature(SensorType::AirTemperature, 0, 4), Some(27.5));
        assert_eq!(first.feature(SensorType::AirTemperature, 0, 5), Some(0.0));
        Ok(())
    }

    #[test]
    fn test_missing_day_stops_the_pass_with_its_date() {
        let mut source = full_source(3);
        source.remove(&d(16));
        let assembler = WindowAssembler::new(config(3, 12, 12), registry(), source);

        let items: Vec<_> = assembler.examples().collect();
        // Day one alone yields one full window before day two is needed.
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        match &items[1] {
            Err(e @ WeatherDataError::FetchUnavailable { .. }) => assert_eq!(e.date(), Some(d(16))),
            other => panic!("expected FetchUnavailable, got {:?}", other),
        }
    }

    #[test]
    fn test_buffer_stays_bounded() -> Result<(), WeatherDataError> {
        let config = config(5, 3, 2);
        let assembler = WindowAssembler::new(config, registry(), full_source(5));
        let mut examples = assembler.examples();
        while let Some(example) = examples.next() {
            example?;
            assert!(examples.buffer.len() < config.window_size() + HOURS_PER_DAY);
        }
        Ok(())
    }
}
