use std::fmt;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::meter_client::{MeterClient, MeterReading};

/// One of the two metering endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Inverter,
    Grid,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Inverter => f.write_str("inverter"),
            Source::Grid => f.write_str("grid"),
        }
    }
}

/// Per-cycle scratch values, written by both readers before a publish.
///
/// The inverter reader owns `inverter_power`. The grid reader owns the other three.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SourceValues {
    pub inverter_power: f64,
    pub power_from_grid: f64,
    pub energy_to_grid: f64,
    pub energy_from_grid: f64,
}

impl SourceValues {
    fn apply(&mut self, source: Source, reading: &MeterReading) {
        let m = &reading.measurand;
        match source {
            Source::Inverter => self.inverter_power = m.power,
            Source::Grid => {
                self.power_from_grid = m.power;
                self.energy_to_grid = m.energy;
                self.energy_from_grid = m.energy_from_grid;
            }
        }
    }
}

/// Fetches one meter and copies its fields into the cycle scratch
pub struct SourceReader {
    source: Source,
    url: String,
    client: MeterClient,
}

impl SourceReader {
    pub fn new(source: Source, url: impl Into<String>, client: MeterClient) -> Self {
        Self {
            source,
            url: url.into(),
            client,
        }
    }

    pub fn source(&self) -> Source {
        self.source
    }

    /// On failure the scratch is left untouched and the error is returned.
    pub async fn read_into(&self, scratch: &Mutex<SourceValues>) -> Result<(), FetchError> {
        let reading = match self.client.fetch(&self.url).await {
            Ok(reading) => reading,
            Err(e) => {
                warn!("{} meter read from {} failed: {e}", self.source, self.url);
                return Err(e);
            }
        };
        debug!(
            "{} meter reading: {:?} (meter runtime {}s)",
            self.source, reading.measurand, reading.runtime
        );

        scratch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .apply(self.source, &reading);
        Ok(())
    }
}
