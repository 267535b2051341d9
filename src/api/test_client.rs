//! Implements the `FinanceApi` trait using in-memory data for testing purposes.
//!
//! Note: this is compiled even in the "production" version of this app so that we can run the whole
//! app, top-to-bottom, without a finance service (see `Mode::Test`).
//!
//! Besides answering requests, `TestFinance` lets a test inject failures per endpoint, hold a
//! response until a `Gate` is opened, and count the calls each endpoint received.

use crate::api::{ApiResult, Endpoint, FinanceApi, GoalRequest, ResolveAction};
use crate::error::ApiError;
use crate::model::{
    Amount, BalanceState, CategoryId, CumulativeSeries, Goal, TopSpenders, Transaction, Username,
};
use crate::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::io::Cursor;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// The threshold above which a new transaction raises the high-value alert.
const ALERT_THRESHOLD: i64 = 100;

/// An implementation of the `FinanceApi` trait that does not use the network. It holds all data in
/// memory and, by default, is seeded with one user and a month of transactions.
pub struct TestFinance {
    state: Mutex<State>,
}

/// Holds back one response from a `TestFinance` until it is opened (or dropped).
#[derive(Debug)]
pub struct Gate(oneshot::Sender<()>);

impl Gate {
    /// Lets the held response complete.
    pub fn open(self) {
        let _ = self.0.send(());
    }
}

#[derive(Debug, Default)]
struct State {
    rows: Vec<Row>,
    alert: bool,
    users: BTreeMap<String, UserData>,
    faults: HashMap<Endpoint, ApiError>,
    holds: HashMap<Endpoint, VecDeque<oneshot::Receiver<()>>>,
    calls: HashMap<Endpoint, usize>,
    resolutions: Vec<ResolveAction>,
}

/// A transaction as the service stores it, including the category label that `/transactions`
/// does not expose.
#[derive(Debug, Clone, Deserialize)]
struct Row {
    date: NaiveDate,
    amount: Amount,
    category: String,
    #[serde(default)]
    merchant_name: String,
}

#[derive(Debug, Clone, Default)]
struct UserData {
    balances: BalanceState,
    goal: Option<Goal>,
    spending_goals: BTreeMap<CategoryId, Amount>,
    predicted: BTreeMap<CategoryId, Amount>,
}

impl TestFinance {
    /// Creates a `TestFinance` with no transactions and no users.
    pub fn empty() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    /// Raises the high-value alert as if the service had just ingested a large charge.
    pub fn raise_alert(&self) {
        self.lock().alert = true;
    }

    pub fn alert_raised(&self) -> bool {
        self.lock().alert
    }

    /// Adds a transaction. A charge over $100 raises the alert, the way the service does when it
    /// ingests one.
    pub fn push_transaction(
        &self,
        date: NaiveDate,
        amount: impl Into<Amount>,
        category: &str,
        merchant_name: &str,
    ) {
        let amount = amount.into();
        let mut state = self.lock();
        if amount > Amount::from(ALERT_THRESHOLD) {
            debug!("High value transaction of {amount} raises the alert");
            state.alert = true;
        }
        state.rows.push(Row {
            date,
            amount,
            category: category.to_string(),
            merchant_name: merchant_name.to_string(),
        });
    }

    pub fn clear_transactions(&self) {
        self.lock().rows.clear();
    }

    /// Adds a user with the given balances and no goals.
    pub fn add_user(&self, username: &Username, balances: BalanceState) {
        self.lock().users.insert(
            username.to_string(),
            UserData {
                balances,
                ..UserData::default()
            },
        );
    }

    /// The balances stored for `username`, or `None` for an unknown user.
    pub fn balances(&self, username: &Username) -> Option<BalanceState> {
        self.lock().users.get(username.as_str()).map(|u| u.balances)
    }

    /// Makes every call to `endpoint` fail with `error` until `heal` is called.
    pub fn fail(&self, endpoint: Endpoint, error: ApiError) {
        self.lock().faults.insert(endpoint, error);
    }

    pub fn heal(&self, endpoint: Endpoint) {
        self.lock().faults.remove(&endpoint);
    }

    /// Holds the response to the next call to `endpoint` until the returned `Gate` is opened. The
    /// response itself is computed when the call is made.
    pub fn hold(&self, endpoint: Endpoint) -> Gate {
        let (tx, rx) = oneshot::channel();
        self.lock().holds.entry(endpoint).or_default().push_back(rx);
        Gate(tx)
    }

    /// The number of calls `endpoint` has received.
    pub fn calls(&self, endpoint: Endpoint) -> usize {
        self.lock().calls.get(&endpoint).copied().unwrap_or_default()
    }

    /// Every successful `resolve_alert` action, in order.
    pub fn resolutions(&self) -> Vec<ResolveAction> {
        self.lock().resolutions.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Counts the call, computes the response with `f` (or the injected fault), then waits for a
    /// hold on `endpoint` if there is one.
    async fn respond<T>(
        &self,
        endpoint: Endpoint,
        f: impl FnOnce(&mut State) -> ApiResult<T>,
    ) -> ApiResult<T> {
        let (result, hold) = {
            let mut state = self.lock();
            *state.calls.entry(endpoint).or_default() += 1;
            let hold = state
                .holds
                .get_mut(&endpoint)
                .and_then(VecDeque::pop_front);
            let result = match state.faults.get(&endpoint) {
                Some(fault) => Err(fault.clone()),
                None => f(&mut *state),
            };
            (result, hold)
        };
        if let Some(hold) = hold {
            // A dropped gate releases the response too
            let _ = hold.await;
        }
        result
    }
}

impl State {
    fn user(&self, username: &Username) -> ApiResult<&UserData> {
        self.users.get(username.as_str()).ok_or_else(user_not_found)
    }

    fn user_mut(&mut self, username: &Username) -> ApiResult<&mut UserData> {
        self.users
            .get_mut(username.as_str())
            .ok_or_else(user_not_found)
    }

    /// Rows in `category`, oldest first.
    fn rows_in(&self, category: CategoryId) -> Vec<&Row> {
        let mut rows: Vec<&Row> = self
            .rows
            .iter()
            .filter(|row| category == CategoryId::All || category_of(&row.category) == Some(category))
            .collect();
        rows.sort_by_key(|row| row.date);
        rows
    }

    fn spent(&self, category: CategoryId) -> Amount {
        self.rows_in(category)
            .into_iter()
            .fold(Amount::ZERO, |sum, row| sum + row.amount)
    }
}

fn user_not_found() -> ApiError {
    ApiError::service(404, r#"{"detail":"User not found"}"#)
}

/// Maps the service's category labels onto the dashboard categories.
fn category_of(label: &str) -> Option<CategoryId> {
    match label {
        "Food and Drink" => Some(CategoryId::Food),
        "Travel" => Some(CategoryId::Travel),
        "Entertainment" => Some(CategoryId::Entertainment),
        _ => None,
    }
}

#[async_trait::async_trait]
impl FinanceApi for TestFinance {
    async fn transactions(&self) -> ApiResult<Vec<Transaction>> {
        self.respond(Endpoint::Transactions, |state| {
            let mut rows = state.rows_in(CategoryId::All);
            rows.reverse();
            Ok(rows
                .into_iter()
                .map(|row| Transaction::new(row.date, row.amount, row.merchant_name.clone()))
                .collect())
        })
        .await
    }

    async fn cumulative_spending(&self, category: CategoryId) -> ApiResult<CumulativeSeries> {
        self.respond(Endpoint::Series(category), |state| {
            let mut running = Amount::ZERO;
            let mut points = BTreeMap::new();
            for row in state.rows_in(category) {
                running = running + row.amount;
                points.insert(row.date.format("%Y-%m-%d").to_string(), running);
            }
            Ok(CumulativeSeries::new(points))
        })
        .await
    }

    async fn top_spenders(&self, username: &Username) -> ApiResult<TopSpenders> {
        self.respond(Endpoint::TopSpenders, |state| {
            state.user(username)?;
            let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
            for row in state.rows.iter().filter(|row| !row.category.is_empty()) {
                *counts.entry(row.category.as_str()).or_default() += 1;
            }
            let mut ranked: Vec<(&str, u32)> = counts.into_iter().collect();
            ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
            Ok(match ranked.as_slice() {
                [(top, top_count), (top2, top2_count), ..] => TopSpenders {
                    top_category: top.to_string(),
                    top2_category: top2.to_string(),
                    top_count: *top_count,
                    top2_count: *top2_count,
                },
                // The service answers with a message only
                _ => TopSpenders::default(),
            })
        })
        .await
    }

    async fn alert_status(&self) -> ApiResult<bool> {
        self.respond(Endpoint::AlertStatus, |state| Ok(state.alert))
            .await
    }

    async fn resolve_alert(&self, action: ResolveAction) -> ApiResult<()> {
        self.respond(Endpoint::AlertResolve, |state| {
            state.alert = false;
            state.resolutions.push(action);
            Ok(())
        })
        .await
    }

    async fn bank_balance(&self, username: &Username) -> ApiResult<Amount> {
        self.respond(Endpoint::BankBalance, |state| {
            Ok(state.user(username)?.balances.checking)
        })
        .await
    }

    async fn savings_balance(&self, username: &Username) -> ApiResult<Amount> {
        self.respond(Endpoint::SavingsBalance, |state| {
            Ok(state.user(username)?.balances.savings)
        })
        .await
    }

    async fn set_savings_balance(
        &self,
        username: &Username,
        balance: Amount,
    ) -> ApiResult<Option<Amount>> {
        self.respond(Endpoint::SetSavingsBalance, |state| {
            let user = state.user_mut(username)?;
            user.balances.savings = balance;
            Ok(Some(balance))
        })
        .await
    }

    async fn goal(&self, username: &Username) -> ApiResult<Option<Goal>> {
        self.respond(Endpoint::Goal, |state| Ok(state.user(username)?.goal))
            .await
    }

    async fn set_goal(&self, request: &GoalRequest) -> ApiResult<()> {
        self.respond(Endpoint::SetGoal, |state| {
            let user = state.user_mut(&request.username)?;
            user.goal = Some(Goal {
                amount: Amount::new(Decimal::from(request.amount)),
                time_months: request.time_months,
            });
            Ok(())
        })
        .await
    }

    async fn spending_goal(&self, username: &Username, category: CategoryId) -> ApiResult<Amount> {
        self.respond(Endpoint::SpendingGoal(category), |state| {
            let user = state.user(username)?;
            Ok(user
                .spending_goals
                .get(&category)
                .copied()
                .unwrap_or_default())
        })
        .await
    }

    async fn spending(&self, username: &Username, category: CategoryId) -> ApiResult<Amount> {
        self.respond(Endpoint::Spending(category), |state| {
            state.user(username)?;
            Ok(state.spent(category))
        })
        .await
    }

    async fn predicted(&self, username: &Username, category: CategoryId) -> ApiResult<Amount> {
        self.respond(Endpoint::Predicted(category), |state| {
            let user = state.user(username)?;
            Ok(match category {
                CategoryId::All => user
                    .predicted
                    .values()
                    .fold(Amount::ZERO, |sum, amount| sum + *amount),
                other => user.predicted.get(&other).copied().unwrap_or_default(),
            })
        })
        .await
    }
}

impl Default for TestFinance {
    /// Loads seed data from this module.
    fn default() -> Self {
        let rows = match load_csv(TRANSACTION_DATA) {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Unable to load the seed transactions: {e:#}");
                Vec::new()
            }
        };
        let user = UserData {
            balances: BalanceState::new(1500, 500),
            goal: None,
            spending_goals: [
                (CategoryId::Food, Amount::from(300)),
                (CategoryId::Travel, Amount::from(500)),
                (CategoryId::Entertainment, Amount::from(150)),
            ]
            .into_iter()
            .collect(),
            predicted: [
                (CategoryId::Food, Amount::new(Decimal::new(28050, 2))),
                (CategoryId::Travel, Amount::from(410)),
                (CategoryId::Entertainment, Amount::new(Decimal::new(12025, 2))),
            ]
            .into_iter()
            .collect(),
        };
        let mut users = BTreeMap::new();
        users.insert(SEED_USER.to_string(), user);
        Self {
            state: Mutex::new(State {
                rows,
                users,
                ..State::default()
            }),
        }
    }
}

/// The user that the seed data belongs to.
pub(crate) const SEED_USER: &str = "user_good";

/// Loads rows from a CSV-formatted string with a header line.
fn load_csv(csv_data: &str) -> Result<Vec<Row>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(Cursor::new(csv_data.as_bytes()));
    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let row: Row = result?;
        rows.push(row);
    }
    Ok(rows)
}

/// Seed transaction data. Positive amounts are charges, negative amounts are refunds.
const TRANSACTION_DATA: &str = r##"date,amount,category,merchant_name
2025-10-20,87.43,Food and Drink,Whole Foods Market
2025-10-19,6.75,Food and Drink,Starbucks
2025-10-18,64.00,Entertainment,AMC Theatres
2025-10-17,-25.00,Shops,Target
2025-10-16,48.90,Travel,Uber
2025-10-14,14.85,Food and Drink,Chipotle Mexican Grill
2025-10-13,18.40,Travel,Caltrain
2025-10-12,95.00,Travel,United Airlines
2025-10-11,15.99,Entertainment,Netflix
2025-10-09,42.30,Food and Drink,Olive Garden
2025-10-07,23.10,Travel,Lyft
2025-10-05,11.99,Entertainment,Spotify
2025-10-03,63.21,Food and Drink,Trader Joe's
2025-10-02,30.00,Shops,
2025-10-01,9.75,Food and Drink,In-N-Out Burger
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn user() -> Username {
        Username::new(SEED_USER).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, d).unwrap()
    }

    #[tokio::test]
    async fn seed_transactions_newest_first() {
        let finance = TestFinance::default();
        let transactions = finance.transactions().await.unwrap();
        assert_eq!(transactions.len(), 15);
        assert_eq!(transactions[0].date(), day(20));
        assert_eq!(transactions[14].date(), day(1));
        assert_eq!(transactions[13].merchant_name(), "");
    }

    #[tokio::test]
    async fn series_are_running_totals() {
        let finance = TestFinance::default();
        let food = finance
            .cumulative_spending(CategoryId::Food)
            .await
            .unwrap();
        let points: Vec<(&str, Amount)> = food.points().collect();
        assert_eq!(points[0], ("2025-10-01", Amount::from_str("9.75").unwrap()));
        assert_eq!(points[1], ("2025-10-03", Amount::from_str("72.96").unwrap()));
        assert_eq!(food.latest(), Amount::from_str("224.29").unwrap());

        let all = finance.cumulative_spending(CategoryId::All).await.unwrap();
        assert_eq!(all.len(), 15);
    }

    #[tokio::test]
    async fn top_spenders_ranked_by_count() {
        let finance = TestFinance::default();
        let top = finance.top_spenders(&user()).await.unwrap();
        assert_eq!(top.top_category, "Food and Drink");
        assert_eq!(top.top_count, 6);
        assert_eq!(top.top2_category, "Travel");
        assert_eq!(top.top2_count, 4);
    }

    #[tokio::test]
    async fn unknown_user_is_404() {
        let finance = TestFinance::default();
        let stranger = Username::new("stranger").unwrap();
        let err = finance.bank_balance(&stranger).await.unwrap_err();
        assert!(matches!(err, ApiError::Service { status: 404, .. }));
    }

    #[tokio::test]
    async fn large_charge_raises_alert_and_resolve_clears_it() {
        let finance = TestFinance::default();
        assert!(!finance.alert_status().await.unwrap());

        finance.push_transaction(day(21), 40, "Food and Drink", "Safeway");
        assert!(!finance.alert_status().await.unwrap());
        finance.push_transaction(day(21), 250, "Travel", "Delta");
        assert!(finance.alert_status().await.unwrap());

        finance.resolve_alert(ResolveAction::Verify).await.unwrap();
        assert!(!finance.alert_raised());
        assert_eq!(finance.resolutions(), vec![ResolveAction::Verify]);
    }

    #[tokio::test]
    async fn faults_and_calls() {
        let finance = TestFinance::default();
        finance.fail(Endpoint::AlertStatus, ApiError::Network("down".to_string()));
        assert!(finance.alert_status().await.is_err());
        finance.heal(Endpoint::AlertStatus);
        assert!(finance.alert_status().await.is_ok());
        assert_eq!(finance.calls(Endpoint::AlertStatus), 2);
        assert_eq!(finance.calls(Endpoint::Transactions), 0);
    }

    #[tokio::test]
    async fn held_response_waits_for_gate() {
        let finance = std::sync::Arc::new(TestFinance::default());
        let gate = finance.hold(Endpoint::Transactions);
        let task = {
            let finance = finance.clone();
            tokio::spawn(async move { finance.transactions().await })
        };
        tokio::task::yield_now().await;
        assert!(!task.is_finished());
        // Computed at issue time, so this does not show up in the held response
        finance.clear_transactions();
        gate.open();
        let transactions = task.await.unwrap().unwrap();
        assert_eq!(transactions.len(), 15);
        assert!(finance.transactions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn goal_persists() {
        let finance = TestFinance::default();
        assert_eq!(finance.goal(&user()).await.unwrap(), None);
        let request = GoalRequest {
            username: user(),
            amount: 500,
            time_months: 6,
        };
        finance.set_goal(&request).await.unwrap();
        assert_eq!(
            finance.goal(&user()).await.unwrap(),
            Some(Goal {
                amount: Amount::from(500),
                time_months: 6
            })
        );
    }

    #[tokio::test]
    async fn predictions_for_all_sum_categories() {
        let finance = TestFinance::default();
        let all = finance.predicted(&user(), CategoryId::All).await.unwrap();
        assert_eq!(all, Amount::from_str("810.75").unwrap());
    }
}
