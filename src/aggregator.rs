use chrono::Utc;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, trace, warn};

use crate::config::Config;
use crate::error::{FetchError, RefreshError};
use crate::meter_client::MeterClient;
use crate::snapshot::{SharedSnapshot, Snapshot};
use crate::source_reader::{Source, SourceReader, SourceValues};

/// What a cycle publishes for the fields of a meter that failed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PartialFailurePolicy {
    /// Failed meter's fields publish as zero
    #[default]
    PublishDefaults,
    /// Failed meter's fields keep the values of the last publish
    RetainPrevious,
}

impl FromStr for PartialFailurePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "publish-defaults" => Ok(Self::PublishDefaults),
            "retain-previous" => Ok(Self::RetainPrevious),
            other => anyhow::bail!(
                "unknown partial failure policy `{other}` (expected `publish-defaults` or `retain-previous`)"
            ),
        }
    }
}

/// Fetches both meters concurrently and publishes one merged snapshot per cycle
pub struct Aggregator {
    inverter: Arc<SourceReader>,
    grid: Arc<SourceReader>,
    policy: PartialFailurePolicy,
    snapshot: SharedSnapshot,
    // Source values behind the current snapshot, seeds the next cycle under RetainPrevious
    published_values: Mutex<SourceValues>,
    // Held for a whole cycle so overlapping refresh calls run one after another
    cycle: tokio::sync::Mutex<()>,
}

impl Aggregator {
    pub fn new(
        inverter_meter_url: impl Into<String>,
        power_meter_url: impl Into<String>,
        client: MeterClient,
    ) -> Self {
        Self {
            inverter: Arc::new(SourceReader::new(
                Source::Inverter,
                inverter_meter_url,
                client.clone(),
            )),
            grid: Arc::new(SourceReader::new(Source::Grid, power_meter_url, client)),
            policy: PartialFailurePolicy::default(),
            snapshot: SharedSnapshot::new(),
            published_values: Mutex::new(SourceValues::default()),
            cycle: tokio::sync::Mutex::new(()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.inverter_meter_url.clone(),
            config.power_meter_url.clone(),
            MeterClient::new(config.request_timeout),
        )
        .with_policy(config.partial_failure_policy)
    }

    pub fn with_policy(mut self, policy: PartialFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> PartialFailurePolicy {
        self.policy
    }

    /// Handle for consumers polling the published snapshot
    pub fn snapshot(&self) -> SharedSnapshot {
        self.snapshot.clone()
    }

    pub fn read(&self) -> Snapshot {
        self.snapshot.read()
    }

    /// Runs one cycle: fetch both meters, merge, publish.
    ///
    /// Returns the published snapshot when both meters answered. When exactly one
    /// failed the snapshot is still published and [`RefreshError::Partial`] is returned.
    /// When both failed nothing is published and [`RefreshError::Total`] is returned.
    pub async fn refresh(&self) -> Result<Snapshot, RefreshError> {
        let _cycle = self.cycle.lock().await;
        let start = Instant::now();

        let scratch = Arc::new(Mutex::new(self.initial_values()));
        let inverter = Self::dispatch(&self.inverter, &scratch, start);
        let grid = Self::dispatch(&self.grid, &scratch, start);
        let (inverter, grid) = tokio::join!(inverter, grid);
        debug!("runtime to request data: {}s", start.elapsed().as_secs_f64());

        // Both reader tasks have finished, nothing else writes the scratch now
        let values = *scratch.lock().unwrap_or_else(PoisonError::into_inner);
        self.publish(values, settled(inverter), settled(grid))
    }

    fn publish(
        &self,
        values: SourceValues,
        inverter: Result<(), FetchError>,
        grid: Result<(), FetchError>,
    ) -> Result<Snapshot, RefreshError> {
        let failure = match (inverter, grid) {
            (Err(inverter), Err(grid)) => {
                warn!("both meters failed, keeping previous snapshot");
                return Err(RefreshError::Total { inverter, grid });
            }
            (Err(error), Ok(())) => Some(RefreshError::Partial {
                meter: Source::Inverter,
                error,
            }),
            (Ok(()), Err(error)) => Some(RefreshError::Partial {
                meter: Source::Grid,
                error,
            }),
            (Ok(()), Ok(())) => None,
        };

        let snapshot = Snapshot::merge(&values, Utc::now());
        self.snapshot.write(snapshot);
        *self
            .published_values
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = values;

        match failure {
            Some(e) => Err(e),
            None => Ok(snapshot),
        }
    }

    fn initial_values(&self) -> SourceValues {
        match self.policy {
            PartialFailurePolicy::PublishDefaults => SourceValues::default(),
            PartialFailurePolicy::RetainPrevious => *self
                .published_values
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        }
    }

    fn dispatch(
        reader: &Arc<SourceReader>,
        scratch: &Arc<Mutex<SourceValues>>,
        start: Instant,
    ) -> JoinHandle<Result<(), FetchError>> {
        let reader = Arc::clone(reader);
        let scratch = Arc::clone(scratch);
        tokio::spawn(async move {
            let result = reader.read_into(&scratch).await;
            trace!(
                "runtime to request {} meter data: {}s",
                reader.source(),
                start.elapsed().as_secs_f64()
            );
            result
        })
    }
}

/// A reader task that panicked or was aborted counts as a failed fetch
fn settled(joined: Result<Result<(), FetchError>, JoinError>) -> Result<(), FetchError> {
    joined.map_err(FetchError::from).and_then(|r| r)
}
