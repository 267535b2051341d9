use crate::model::{Amount, CategoryId, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cumulative spend per day. Keys are `YYYY-MM-DD` labels, so iteration order is chronological.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CumulativeSeries(BTreeMap<String, Amount>);

impl CumulativeSeries {
    pub fn new(points: impl IntoIterator<Item = (String, Amount)>) -> Self {
        Self(points.into_iter().collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn points(&self) -> impl Iterator<Item = (&str, Amount)> {
        self.0.iter().map(|(day, amount)| (day.as_str(), *amount))
    }

    /// The running total on the last day of the window, or zero for an empty series.
    pub fn latest(&self) -> Amount {
        self.0.values().next_back().copied().unwrap_or_default()
    }
}

/// The two categories with the most transactions.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct TopSpenders {
    #[serde(rename = "top_spender", default)]
    pub top_category: String,
    #[serde(rename = "top2_spender", default)]
    pub top2_category: String,
    #[serde(rename = "top_spender_count", default)]
    pub top_count: u32,
    #[serde(rename = "top2_spender_count", default)]
    pub top2_count: u32,
}

/// One immutable, internally consistent aggregation of dashboard data. A newer `Snapshot`
/// replaces an older one wholesale.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct Snapshot {
    seq: u64,
    transactions: Vec<Transaction>,
    series: BTreeMap<CategoryId, CumulativeSeries>,
    top_spenders: TopSpenders,
}

impl Snapshot {
    /// Builds a snapshot. Categories missing from `series` are filled in with an empty series so
    /// that every `CategoryId` is always present.
    pub fn new(
        seq: u64,
        transactions: Vec<Transaction>,
        series: impl IntoIterator<Item = (CategoryId, CumulativeSeries)>,
        top_spenders: TopSpenders,
    ) -> Self {
        let mut series: BTreeMap<CategoryId, CumulativeSeries> = series.into_iter().collect();
        for category in CategoryId::ALL {
            series.entry(category).or_default();
        }
        Self {
            seq,
            transactions,
            series,
            top_spenders,
        }
    }

    /// The placeholder shown before the first refresh completes.
    pub fn empty() -> Self {
        Self::new(0, Vec::new(), [], TopSpenders::default())
    }

    /// The sequence number of the refresh that produced this snapshot, `0` for `empty()`.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn recent_transactions(&self, n: usize) -> &[Transaction] {
        &self.transactions[..self.transactions.len().min(n)]
    }

    pub fn series(&self, category: CategoryId) -> &CumulativeSeries {
        // Every key is inserted by `new`
        static EMPTY: CumulativeSeries = CumulativeSeries(BTreeMap::new());
        self.series.get(&category).unwrap_or(&EMPTY)
    }

    pub fn categories(&self) -> impl Iterator<Item = CategoryId> + '_ {
        self.series.keys().copied()
    }

    pub fn top_spenders(&self) -> &TopSpenders {
        &self.top_spenders
    }
}
