//! Power Usage Library
//!
//! This library samples an inverter meter and a grid meter concurrently, merges their
//! readings into one consistent power-usage snapshot and classifies it as import or export.

pub mod aggregator;
pub mod config;
pub mod error;
pub mod meter_client;
pub mod poller;
pub mod snapshot;
pub mod source_reader;

// Re-export commonly used types for easier access
pub use aggregator::{Aggregator, PartialFailurePolicy};
pub use config::Config;
pub use error::{FetchError, RefreshError};
pub use meter_client::{MeterClient, MeterReading};
pub use poller::Poller;
pub use snapshot::{SharedSnapshot, Snapshot, State};
pub use source_reader::Source;
