//! HTTP client for the remote sensor service.
//!
//! A reading fetch issues two POSTs concurrently: the history query
//! (`ListSensorValues`) and the installation status query (`InstalledCheck`).
//! Both are normalized through the shared [`SampleClock`] and reconciled by
//! timestamp in [`crate::reconcile`].

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use crate::reconcile::{latest_sample, reconcile};
use crate::{
    ApartmentId, Config, FetchError, InstalledCheck, ListSensorValue, SampleClock, SensorReading,
};

// ---

/// Source of the latest reading for an apartment.
///
/// The app driver runs fetches on spawned tasks, so the returned future must
/// be `Send`.
pub trait SensorApi: Send + Sync + 'static {
    fn fetch_latest_reading(
        &self,
        apartment: &ApartmentId,
    ) -> impl Future<Output = Result<SensorReading, FetchError>> + Send;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryQuery<'a> {
    guid: &'a str,
    days_ago: u32,
}

#[derive(Serialize)]
struct StatusQuery<'a> {
    guid: &'a str,
}

/// [`SensorApi`] backed by the eGain installation service.
#[derive(Debug, Clone)]
pub struct EgainClient {
    // ---
    http: reqwest::Client,
    base_url: String,
    history_days: u32,
    clock: SampleClock,
}

impl EgainClient {
    // ---
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        history_days: u32,
        clock: SampleClock,
    ) -> Result<Self> {
        // ---
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            history_days,
            clock,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        // ---
        Self::new(
            config.api_url.clone(),
            config.api_timeout,
            config.history_days,
            SampleClock::new(config.timezone, config.timestamp_correction),
        )
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), name)
    }

    /// POST `body` as JSON and decode the response.
    ///
    /// Transport failures and non-2xx statuses are `Network`; an undecodable
    /// body is `Data`.
    async fn post_json<B, T>(&self, name: &str, body: &B) -> Result<T, FetchError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        // ---
        let url = self.endpoint(name);
        debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| FetchError::Network(format!("POST {url}: {e}")))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Network(format!("POST {url}: reading body: {e}")))?;

        serde_json::from_slice(&bytes)
            .map_err(|e| FetchError::Data(format!("POST {url}: malformed body: {e}")))
    }

    /// Raw history samples for the configured number of days.
    pub async fn list_sensor_values(
        &self,
        apartment: &ApartmentId,
    ) -> Result<Vec<ListSensorValue>, FetchError> {
        // ---
        let query = HistoryQuery {
            guid: apartment.as_str(),
            days_ago: self.history_days,
        };
        self.post_json("ListSensorValues", &query).await
    }

    /// Raw installation status, including the embedded current reading.
    pub async fn installed_check(
        &self,
        apartment: &ApartmentId,
    ) -> Result<InstalledCheck, FetchError> {
        // ---
        let query = StatusQuery {
            guid: apartment.as_str(),
        };
        self.post_json("InstalledCheck", &query).await
    }

    /// Normalize history samples, skipping any with an unusable date.
    fn history_readings(&self, samples: &[ListSensorValue]) -> Vec<SensorReading> {
        // ---
        samples
            .iter()
            .enumerate()
            .filter_map(|(i, sample)| match sample.to_reading(&self.clock) {
                Ok(reading) => Some(reading),
                Err(e) => {
                    warn!("Skipping history sample {}: {}", i, e);
                    None
                }
            })
            .collect()
    }

    fn status_reading(&self, status: &InstalledCheck) -> Option<SensorReading> {
        // ---
        let info = status.sensor_info.as_ref()?;
        match info.to_reading(&self.clock) {
            Ok(reading) => Some(reading),
            Err(e) => {
                warn!("Skipping status reading: {}", e);
                None
            }
        }
    }
}

/// Combine both call results. A `Network` failure on either side wins over a
/// `Data` failure on the other, regardless of which finished first.
fn prefer_network_error<H, S>(
    results: (Result<H, FetchError>, Result<S, FetchError>),
) -> Result<(H, S), FetchError> {
    // ---
    match results {
        (Ok(history), Ok(status)) => Ok((history, status)),
        (Err(e @ FetchError::Network(_)), _) | (_, Err(e @ FetchError::Network(_))) => Err(e),
        (Err(e), _) | (_, Err(e)) => Err(e),
    }
}

impl SensorApi for EgainClient {
    async fn fetch_latest_reading(
        &self,
        apartment: &ApartmentId,
    ) -> Result<SensorReading, FetchError> {
        // ---
        info!("Fetching latest reading for apartment {}", apartment);

        let (samples, status) = prefer_network_error(tokio::join!(
            self.list_sensor_values(apartment),
            self.installed_check(apartment)
        ))?;

        debug!(
            "Apartment {}: {} history samples, installed={}, device={:?}",
            apartment,
            samples.len(),
            status.installed,
            status.device_id
        );

        let history = latest_sample(self.history_readings(&samples));
        let current = self.status_reading(&status);

        let reading = reconcile(history, current).ok_or_else(|| {
            FetchError::Data(format!("no readings available for apartment {apartment}"))
        })?;

        info!(
            "Apartment {}: {:.1}°C {:.0}% at {}",
            apartment, reading.temperature, reading.humidity, reading.timestamp
        );
        Ok(reading)
    }
}
