use crate::sync::{Aggregator, AlertMonitor};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::trace;

/// `tokio::time::interval` panics on a zero period.
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// The periods of the two poll loops.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Periods {
    /// How often the dashboard data is refreshed while no alert is being handled.
    pub refresh: Duration,
    /// How often the alert flag is checked.
    pub alert: Duration,
}

impl Default for Periods {
    fn default() -> Self {
        Self {
            refresh: Duration::from_secs(1),
            alert: Duration::from_secs(5),
        }
    }
}

/// Owns the two poll loops. Both fire once right away and then on their own period. Dropping the
/// scheduler aborts both loops; refreshes that are already in flight run to completion and are
/// discarded by the liveness check.
pub struct PollScheduler {
    refresh_loop: JoinHandle<()>,
    alert_loop: JoinHandle<()>,
}

impl PollScheduler {
    /// Starts both loops. Must be called from within a tokio runtime.
    pub fn start(aggregator: Arc<Aggregator>, monitor: Arc<AlertMonitor>, periods: Periods) -> Self {
        let refresh_loop = {
            let monitor = monitor.clone();
            let mut ticker = ticker(periods.refresh);
            tokio::spawn(async move {
                loop {
                    ticker.tick().await;
                    if !monitor.is_idle() {
                        trace!("Alert is {}, skipping refresh tick", monitor.state());
                        continue;
                    }
                    // A slow refresh must not hold up the next tick
                    let aggregator = aggregator.clone();
                    tokio::spawn(async move {
                        aggregator.refresh().await;
                    });
                }
            })
        };

        let alert_loop = {
            let mut ticker = ticker(periods.alert);
            tokio::spawn(async move {
                loop {
                    ticker.tick().await;
                    let outcome = monitor.check().await;
                    trace!("Alert check: {outcome:?}");
                }
            })
        };

        Self {
            refresh_loop,
            alert_loop,
        }
    }

    /// Stops both loops. The `Drop` impl aborts them.
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.refresh_loop.abort();
        self.alert_loop.abort();
    }
}

fn ticker(period: Duration) -> Interval {
    let mut ticker = interval(period.max(MIN_PERIOD));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}
