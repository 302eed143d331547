//! Async download of one day of readings from the data.gov.sg environment API.

use crate::types::sensor_type::SensorType;
use crate::weather_data::api::{EnvironmentResponse, SensorPayload};
use crate::weather_data::day_store::{DayRecords, DayStore};
use crate::weather_data::error::FetchError;
use chrono::NaiveDate;
use futures_util::future::join_all;
use log::{info, warn};
use reqwest::Client;
use std::collections::HashSet;
use std::time::Duration;
use tokio::task;

pub const DEFAULT_BASE_URL: &str = "https://api.data.gov.sg/v1";
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;
pub const DEFAULT_RETRY_PAUSE: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_ROUNDS: usize = 3;

/// Outcome of [`DataGovFetcher::collect`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectReport {
    /// Dates whose complete records were written to the store.
    pub written: Vec<NaiveDate>,
    /// Dates still incomplete after the last round.
    pub failed: Vec<NaiveDate>,
}

impl CollectReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Downloads raw readings from the data.gov.sg environment API.
#[derive(Debug, Clone)]
pub struct DataGovFetcher {
    client: Client,
    base_url: String,
    max_attempts: usize,
    retry_pause: Duration,
}

impl Default for DataGovFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl DataGovFetcher {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_pause: DEFAULT_RETRY_PAUSE,
        }
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Attempts per sensor request. Values below one are treated as one.
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_retry_pause(mut self, retry_pause: Duration) -> Self {
        self.retry_pause = retry_pause;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn sensor_url(&self, sensor: SensorType, date: NaiveDate) -> String {
        format!(
            "{}/{}?date={}",
            self.base_url.trim_end_matches('/'),
            sensor.path_segment(),
            date.format("%Y-%m-%d")
        )
    }

    /// A single request without retries.
    async fn request(&self, sensor: SensorType, url: &str) -> Result<SensorPayload, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::NetworkRequest(url.to_string(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                return Err(if let Some(status) = e.status() {
                    FetchError::HttpStatus {
                        url: url.to_string(),
                        status,
                        source: e,
                    }
                } else {
                    FetchError::NetworkRequest(url.to_string(), e)
                });
            }
        };

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::NetworkRequest(url.to_string(), e))?;
        let parsed: EnvironmentResponse =
            serde_json::from_slice(&body).map_err(|e| FetchError::Decode {
                url: url.to_string(),
                source: e,
            })?;
        Ok(parsed.into_payload(sensor))
    }

    /// Fetches one sensor type for one date, retrying failed requests up to
    /// the configured number of attempts with a pause in between.
    pub async fn fetch_sensor(
        &self,
        sensor: SensorType,
        date: NaiveDate,
    ) -> Result<SensorPayload, FetchError> {
        let url = self.sensor_url(sensor, date);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.request(sensor, &url).await {
                Ok(payload) => {
                    info!(
                        "Fetched {} readings from {} stations for {} on {}",
                        payload.readings.len(),
                        payload.stations.len(),
                        sensor,
                        date
                    );
                    return Ok(payload);
                }
                Err(e) if attempt >= self.max_attempts => {
                    warn!("Giving up on {} after {} attempts: {}", url, attempt, e);
                    return Err(FetchError::FetchUnavailable {
                        date,
                        sensor,
                        attempts: attempt,
                        source: Box::new(e),
                    });
                }
                Err(e) => {
                    warn!(
                        "Attempt {}/{} for {} failed: {}",
                        attempt, self.max_attempts, url, e
                    );
                    tokio::time::sleep(self.retry_pause).await;
                }
            }
        }
    }

    /// Fetches every sensor type for `date` concurrently.
    ///
    /// The day fails as a whole if any sensor type fails; the error lists all
    /// failing sensor types and carries the first failure as its source.
    /// Station metadata is merged across sensor types, first report wins.
    pub async fn fetch_day(&self, date: NaiveDate) -> Result<DayRecords, FetchError> {
        let results = join_all(
            SensorType::ALL
                .into_iter()
                .map(|sensor| self.fetch_sensor(sensor, date)),
        )
        .await;

        let mut records = DayRecords::default();
        let mut known_stations = HashSet::new();
        let mut failed = Vec::new();
        let mut first_error = None;
        for (sensor, result) in SensorType::ALL.into_iter().zip(results) {
            match result {
                Ok(payload) => {
                    records.readings.extend(payload.readings);
                    for station in payload.stations {
                        if known_stations.insert(station.id.clone()) {
                            records.stations.push(station);
                        }
                    }
                }
                Err(e) => {
                    failed.push(sensor);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            None => Ok(records),
            Some(source) => Err(FetchError::DayIncomplete {
                date,
                sensors: failed,
                source: Box::new(source),
            }),
        }
    }

    /// Downloads `dates` into `store`, retrying incomplete dates for up to
    /// `max_rounds` rounds.
    ///
    /// Only complete days are written. Dates that still fail after the last
    /// round are listed in [`CollectReport::failed`]; a store write failure
    /// aborts the collection.
    pub async fn collect(
        &self,
        dates: &[NaiveDate],
        store: &DayStore,
        max_rounds: usize,
    ) -> Result<CollectReport, FetchError> {
        let max_rounds = max_rounds.max(1);
        let mut report = CollectReport::default();
        let mut pending = dates.to_vec();

        for round in 1..=max_rounds {
            if pending.is_empty() {
                break;
            }
            info!(
                "Collection round {}/{}: {} dates pending",
                round,
                max_rounds,
                pending.len()
            );

            let mut failed = Vec::new();
            for date in pending {
                match self.fetch_day(date).await {
                    Ok(records) => {
                        let store = store.clone();
                        task::spawn_blocking(move || {
                            store.write_records(date, &records.readings, &records.stations)
                        })
                        .await??;
                        report.written.push(date);
                    }
                    Err(e) => {
                        warn!("Round {}: {}", round, e);
                        failed.push(date);
                    }
                }
            }
            pending = failed;
        }

        if !pending.is_empty() {
            warn!(
                "{} dates still incomplete after {} rounds: {:?}",
                pending.len(),
                max_rounds,
                pending
            );
        }
        report.failed = pending;
        Ok(report)
    }
}
