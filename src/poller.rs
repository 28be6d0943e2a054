use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::aggregator::Aggregator;
use crate::error::RefreshError;

/// Periodically refreshes the aggregator on its own task
pub struct Poller {
    aggregator: Arc<Aggregator>,
    period: Duration,
}

impl Poller {
    pub fn new(aggregator: Arc<Aggregator>, period: Duration) -> Self {
        Self { aggregator, period }
    }

    /// Spawns the polling loop. It runs until the handle is aborted.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        info!("Starting power usage poller, interval {:?}", self.period);

        let mut ticker = interval(self.period);
        // A slow cycle pushes the schedule back instead of bunching cycles up
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            match self.aggregator.refresh().await {
                Ok(snapshot) => info!(
                    "Power usage: {} {}W, from grid {}W, to grid {}Wh, from grid {}Wh",
                    snapshot.state.map(|s| s.to_string()).unwrap_or_default(),
                    snapshot.power,
                    snapshot.power_from_grid,
                    snapshot.energy_to_grid,
                    snapshot.energy_from_grid
                ),
                Err(e @ RefreshError::Partial { .. }) => {
                    let snapshot = self.aggregator.read();
                    warn!("{e}");
                    info!(
                        "Power usage (partial): {}W, from grid {}W",
                        snapshot.power, snapshot.power_from_grid
                    );
                }
                Err(e @ RefreshError::Total { .. }) => error!("{e}"),
            }
        }
    }
}
