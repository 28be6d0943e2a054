use anyhow::{bail, Context};
use std::env;
use std::time::Duration;

use crate::aggregator::PartialFailurePolicy;
use crate::meter_client::DEFAULT_REQUEST_TIMEOUT;

pub const DEFAULT_DATA_COLLECTION_INTERVAL: Duration = Duration::from_secs(10);

/// Startup settings, read once from the environment
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub inverter_meter_url: String,
    pub power_meter_url: String,
    pub data_collection_interval: Duration,
    pub request_timeout: Duration,
    pub partial_failure_policy: PartialFailurePolicy,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| -> anyhow::Result<String> {
            match lookup(key) {
                Some(url) if !url.trim().is_empty() => Ok(url.trim().to_string()),
                _ => bail!("Required to set meter endpoint ({key} env var)"),
            }
        };

        let config = Self {
            inverter_meter_url: required("INVERTER_METER_URL")?,
            power_meter_url: required("POWER_METER_URL")?,
            data_collection_interval: parse_seconds(
                "DATA_COLLECTION_INTERVAL",
                lookup("DATA_COLLECTION_INTERVAL"),
                DEFAULT_DATA_COLLECTION_INTERVAL,
            )?,
            request_timeout: parse_seconds(
                "HTTP_REQUEST_TIMEOUT",
                lookup("HTTP_REQUEST_TIMEOUT"),
                DEFAULT_REQUEST_TIMEOUT,
            )?,
            partial_failure_policy: match lookup("PARTIAL_FAILURE_POLICY") {
                Some(policy) if !policy.trim().is_empty() => policy
                    .parse::<PartialFailurePolicy>()
                    .context("Invalid PARTIAL_FAILURE_POLICY")?,
                _ => PartialFailurePolicy::default(),
            },
        };
        Ok(config)
    }
}

/// Parses a positive number of seconds, falling back to `default` when unset
fn parse_seconds(key: &str, val: Option<String>, default: Duration) -> anyhow::Result<Duration> {
    let val = match val {
        Some(v) if !v.trim().is_empty() => v,
        _ => return Ok(default),
    };
    let secs: f64 = val
        .trim()
        .parse()
        .with_context(|| format!("Invalid {key} value `{val}`"))?;
    if !secs.is_finite() || secs <= 0.0 {
        bail!("{key} must be a positive number of seconds, got `{val}`");
    }
    Duration::try_from_secs_f64(secs)
        .with_context(|| format!("{key} value `{val}` is out of range"))
}
