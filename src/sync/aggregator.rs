use crate::api::FinanceApi;
use crate::error::StaleResult;
use crate::model::{CategoryId, CumulativeSeries, Snapshot, TopSpenders, Username};
use crate::sync::{lock, Liveness};
use futures::future::join_all;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, trace, warn};

/// What became of one `Aggregator::refresh` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refresh {
    /// The snapshot was published to subscribers.
    Published(Arc<Snapshot>),
    /// A later refresh had already been published, so this result was dropped.
    Stale(StaleResult),
    /// The view was unmounted while the requests were in flight.
    Unmounted,
}

/// Merges the transaction list, the four category series and the top-spender summary into one
/// `Snapshot` and publishes it on a `watch` channel.
///
/// Overlapping refreshes are allowed. Each refresh takes a sequence number when it is issued and a
/// result is only published if no later-issued refresh has been published before it.
pub struct Aggregator {
    api: Arc<dyn FinanceApi>,
    username: Username,
    liveness: Liveness,
    issued: AtomicU64,
    published: Mutex<u64>,
    tx: watch::Sender<Arc<Snapshot>>,
}

impl Aggregator {
    pub fn new(api: Arc<dyn FinanceApi>, username: Username, liveness: Liveness) -> Self {
        let (tx, _) = watch::channel(Arc::new(Snapshot::empty()));
        Self {
            api,
            username,
            liveness,
            issued: AtomicU64::new(0),
            published: Mutex::new(0),
            tx,
        }
    }

    /// Subscribes to published snapshots. The receiver starts out with the latest one.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.tx.subscribe()
    }

    /// The most recently published snapshot, or `Snapshot::empty()` before the first one.
    pub fn latest(&self) -> Arc<Snapshot> {
        self.tx.borrow().clone()
    }

    /// The number of refreshes issued so far.
    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }

    /// Fetches everything concurrently and publishes the result. Failed fetches degrade to empty
    /// values and are logged; this never fails.
    pub async fn refresh(&self) -> Refresh {
        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        trace!(seq, "refresh issued");

        let series = join_all(CategoryId::ALL.map(|category| async move {
            (category, self.api.cumulative_spending(category).await)
        }));
        let (transactions, series, top_spenders) = tokio::join!(
            self.api.transactions(),
            series,
            self.api.top_spenders(&self.username),
        );

        let transactions = transactions.unwrap_or_else(|e| {
            warn!(seq, "Unable to fetch transactions: {e}");
            Vec::new()
        });
        let series: Vec<(CategoryId, CumulativeSeries)> = series
            .into_iter()
            .map(|(category, result)| {
                let series = result.unwrap_or_else(|e| {
                    warn!(seq, %category, "Unable to fetch the spending series: {e}");
                    CumulativeSeries::default()
                });
                (category, series)
            })
            .collect();
        let top_spenders = top_spenders.unwrap_or_else(|e| {
            warn!(seq, "Unable to fetch top spenders: {e}");
            TopSpenders::default()
        });

        if !self.liveness.is_alive() {
            debug!(seq, "View unmounted, dropping refresh result");
            return Refresh::Unmounted;
        }

        let mut published = lock(&self.published);
        if seq < *published {
            let stale = StaleResult {
                issued: seq,
                published: *published,
            };
            debug!("{stale}");
            return Refresh::Stale(stale);
        }
        *published = seq;
        let snapshot = Arc::new(Snapshot::new(seq, transactions, series, top_spenders));
        self.tx.send_replace(snapshot.clone());
        trace!(seq, "snapshot published");
        Refresh::Published(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Endpoint, TestFinance};
    use crate::error::ApiError;
    use crate::model::Amount;
    use chrono::NaiveDate;

    fn setup() -> (Arc<TestFinance>, Aggregator, Liveness) {
        let finance = Arc::new(TestFinance::default());
        let liveness = Liveness::new();
        let aggregator = Aggregator::new(
            finance.clone(),
            Username::new("user_good").unwrap(),
            liveness.clone(),
        );
        (finance, aggregator, liveness)
    }

    #[tokio::test]
    async fn refresh_publishes_full_snapshot() {
        let (finance, aggregator, _liveness) = setup();
        let mut rx = aggregator.subscribe();

        let Refresh::Published(snapshot) = aggregator.refresh().await else {
            panic!("expected the snapshot to be published");
        };
        assert_eq!(snapshot.seq(), 1);
        assert_eq!(snapshot.transactions().len(), 15);
        assert!(!snapshot.series(CategoryId::Entertainment).is_empty());
        assert_eq!(snapshot.top_spenders().top_category, "Food and Drink");
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().seq(), 1);

        for category in CategoryId::ALL {
            assert_eq!(finance.calls(Endpoint::Series(category)), 1);
        }
        assert_eq!(finance.calls(Endpoint::Transactions), 1);
        assert_eq!(finance.calls(Endpoint::TopSpenders), 1);
    }

    #[tokio::test]
    async fn failed_slice_degrades_to_empty() {
        let (finance, aggregator, _liveness) = setup();
        finance.fail(
            Endpoint::Series(CategoryId::Travel),
            ApiError::service(500, "boom"),
        );
        finance.fail(Endpoint::TopSpenders, ApiError::Network("reset".to_string()));

        let Refresh::Published(snapshot) = aggregator.refresh().await else {
            panic!("a partial snapshot is still published");
        };
        assert_eq!(snapshot.categories().collect::<Vec<_>>(), CategoryId::ALL);
        assert!(snapshot.series(CategoryId::Travel).is_empty());
        assert!(!snapshot.series(CategoryId::Food).is_empty());
        assert_eq!(snapshot.transactions().len(), 15);
        assert_eq!(snapshot.top_spenders(), &TopSpenders::default());
    }

    #[tokio::test]
    async fn failed_transactions_keep_series() {
        let (finance, aggregator, _liveness) = setup();
        finance.fail(Endpoint::Transactions, ApiError::Network("down".to_string()));

        let Refresh::Published(snapshot) = aggregator.refresh().await else {
            panic!("a partial snapshot is still published");
        };
        assert!(snapshot.transactions().is_empty());
        assert_eq!(snapshot.categories().count(), 4);
        assert!(!snapshot.series(CategoryId::All).is_empty());
    }

    #[tokio::test]
    async fn earlier_refresh_finishing_last_is_discarded() {
        let (finance, aggregator, _liveness) = setup();
        let aggregator = Arc::new(aggregator);

        // Refresh #1 sees the seed data but is held back
        let gate = finance.hold(Endpoint::Transactions);
        let first = {
            let aggregator = aggregator.clone();
            tokio::spawn(async move { aggregator.refresh().await })
        };
        tokio::task::yield_now().await;

        // Refresh #2 sees newer data and finishes first
        finance.clear_transactions();
        let date = NaiveDate::from_ymd_opt(2025, 10, 22).unwrap();
        finance.push_transaction(date, 12, "Food and Drink", "Philz Coffee");
        let second = aggregator.refresh().await;
        assert!(matches!(second, Refresh::Published(ref s) if s.seq() == 2));

        gate.open();
        let first = first.await.unwrap();
        assert_eq!(
            first,
            Refresh::Stale(StaleResult {
                issued: 1,
                published: 2
            })
        );

        let latest = aggregator.latest();
        assert_eq!(latest.seq(), 2);
        assert_eq!(latest.transactions().len(), 1);
        assert_eq!(latest.transactions()[0].amount(), Amount::from(12));
    }

    #[tokio::test]
    async fn unmounted_result_is_dropped() {
        let (finance, aggregator, liveness) = setup();
        let aggregator = Arc::new(aggregator);
        let gate = finance.hold(Endpoint::Transactions);
        let task = {
            let aggregator = aggregator.clone();
            tokio::spawn(async move { aggregator.refresh().await })
        };
        tokio::task::yield_now().await;

        liveness.end();
        gate.open();
        assert_eq!(task.await.unwrap(), Refresh::Unmounted);
        assert_eq!(aggregator.latest().seq(), 0);
    }
}
