use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::trace;

use crate::error::FetchError;

/// Upper bound for a single meter request unless configured otherwise
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Bounded-time HTTP client for a meter endpoint
#[derive(Clone)]
pub struct MeterClient {
    client: reqwest::Client,
    request_timeout: Duration,
}

impl Default for MeterClient {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

impl MeterClient {
    pub fn new(request_timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            request_timeout,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Performs one GET against `url` and decodes the body as a [`MeterReading`].
    ///
    /// The whole exchange (connect, headers, body, decode) must finish within the
    /// request timeout. When it does not, the in-flight request future is dropped and
    /// whatever it would have produced is discarded.
    pub async fn fetch(&self, url: &str) -> Result<MeterReading, FetchError> {
        trace!("performing http get: {url}");
        match tokio::time::timeout(self.request_timeout, self.get(url)).await {
            Ok(result) => result,
            Err(_elapsed) => Err(FetchError::Timeout(self.request_timeout)),
        }
    }

    async fn get(&self, url: &str) -> Result<MeterReading, FetchError> {
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Payload served by both meters. Fields a meter does not report stay at their default.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeterReading {
    #[serde(rename = "Time", default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(rename = "Runtime", default)]
    pub runtime: f64,
    #[serde(rename = "Measurand", default)]
    pub measurand: Measurand,
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Measurand {
    /// Cumulative energy (to grid, for the grid meter)
    #[serde(rename = "e")]
    pub energy: f64,
    #[serde(rename = "e_grid")]
    pub energy_from_grid: f64,
    /// Instantaneous power
    #[serde(rename = "p")]
    pub power: f64,
}
