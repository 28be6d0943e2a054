use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::source_reader::SourceValues;

/// Direction of net power flow relative to the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    Import,
    Export,
}

impl State {
    /// Drawing from the grid is an import. Zero counts as export.
    pub fn classify(power_from_grid: f64) -> Self {
        if power_from_grid > 0.0 {
            State::Import
        } else {
            State::Export
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Import => f.write_str("import"),
            State::Export => f.write_str("export"),
        }
    }
}

/// Merged power-usage state from one refresh cycle.
///
/// `timestamp` and `state` are `None` until the first publish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub timestamp: Option<DateTime<Utc>>,
    pub state: Option<State>,
    pub power: f64,
    pub power_from_grid: f64,
    pub energy_to_grid: f64,
    pub energy_from_grid: f64,
}

impl Snapshot {
    /// Builds the published form of a cycle's merged source values.
    pub fn merge(values: &SourceValues, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp: Some(timestamp),
            state: Some(State::classify(values.power_from_grid)),
            power: values.power_from_grid + values.inverter_power,
            power_from_grid: values.power_from_grid,
            energy_to_grid: values.energy_to_grid,
            energy_from_grid: values.energy_from_grid,
        }
    }
}

/// Lock-guarded handle to the current snapshot.
///
/// Clones share the same snapshot. Every read and write takes the lock once and moves
/// the whole value, so a reader never sees fields from two different cycles.
#[derive(Clone, Default)]
pub struct SharedSnapshot {
    inner: Arc<Mutex<Snapshot>>,
}

impl SharedSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consistent copy of all fields
    pub fn read(&self) -> Snapshot {
        // A panicking writer cannot leave a half-written value behind
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self, snapshot: Snapshot) {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }
}
