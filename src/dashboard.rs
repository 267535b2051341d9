//! One mounted dashboard view: the aggregator, the alert monitor and the poll scheduler that drives
//! them, all sharing one liveness flag.

use crate::api::FinanceApi;
use crate::model::Snapshot;
use crate::session::Session;
use crate::sync::{
    Aggregator, AlertMonitor, AlertPrompt, AlertState, Liveness, Periods, PollScheduler,
};
use crate::Result;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Mounting starts polling right away. Unmounting, or dropping the `Dashboard`, stops both poll
/// loops and makes any result still in flight be discarded.
pub struct Dashboard {
    liveness: Liveness,
    aggregator: Arc<Aggregator>,
    monitor: Arc<AlertMonitor>,
    scheduler: Option<PollScheduler>,
}

impl Dashboard {
    /// Mounts the dashboard for the signed-in user. Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// - Returns an error if nobody is signed in.
    pub fn mount(
        session: &Session,
        api: Arc<dyn FinanceApi>,
        prompt: Arc<dyn AlertPrompt>,
        periods: Periods,
    ) -> Result<Self> {
        let username = session.require()?.clone();
        let liveness = Liveness::new();
        let aggregator = Arc::new(Aggregator::new(
            api.clone(),
            username.clone(),
            liveness.clone(),
        ));
        let monitor = Arc::new(AlertMonitor::new(
            api,
            prompt,
            aggregator.clone(),
            liveness.clone(),
        ));
        let scheduler = PollScheduler::start(aggregator.clone(), monitor.clone(), periods);
        debug!("Dashboard mounted for {username}");
        Ok(Self {
            liveness,
            aggregator,
            monitor,
            scheduler: Some(scheduler),
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.aggregator.subscribe()
    }

    pub fn latest(&self) -> Arc<Snapshot> {
        self.aggregator.latest()
    }

    pub fn alert_state(&self) -> AlertState {
        self.monitor.state()
    }

    pub fn is_mounted(&self) -> bool {
        self.liveness.is_alive()
    }

    /// Stops polling and abandons an alert the user has not finished answering.
    pub fn unmount(&mut self) {
        self.liveness.end();
        if let Some(scheduler) = self.scheduler.take() {
            scheduler.stop();
            self.monitor.cancel();
            debug!("Dashboard unmounted");
        }
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.unmount();
    }
}
