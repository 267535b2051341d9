//! The request layer between the dashboard and the remote finance service.
//!
//! `FinanceApi` has one method per endpoint. Each method is a single request and response: there
//! is no retry, no backoff and no caching, so a failure goes straight back to the caller as an
//! `ApiError`.

mod http;
mod test_client;

use crate::error::ApiError;
use crate::model::{Amount, CategoryId, CumulativeSeries, Goal, TopSpenders, Transaction, Username};
use crate::{Config, Result};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub use test_client::{Gate, TestFinance};

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// The typed surface of the remote finance service.
#[async_trait::async_trait]
pub trait FinanceApi: Send + Sync {
    /// `GET /transactions`, most recent first.
    async fn transactions(&self) -> ApiResult<Vec<Transaction>>;

    /// `GET /graph_data[_{category}]`: cumulative spend per day in the current window.
    async fn cumulative_spending(&self, category: CategoryId) -> ApiResult<CumulativeSeries>;

    /// `POST /top_spenders?username=`
    async fn top_spenders(&self, username: &Username) -> ApiResult<TopSpenders>;

    /// `GET /alert_status`: whether a high-value transaction is waiting for the user.
    async fn alert_status(&self) -> ApiResult<bool>;

    /// `POST /alert_resolve`
    async fn resolve_alert(&self, action: ResolveAction) -> ApiResult<()>;

    /// `GET /bank_balance?username=`: the checking balance.
    async fn bank_balance(&self, username: &Username) -> ApiResult<Amount>;

    /// `GET /savings_balance?username=`
    async fn savings_balance(&self, username: &Username) -> ApiResult<Amount>;

    /// `POST /set_savings_balance?username=&balance=`. Returns the balance the service reports
    /// having stored, when it reports one.
    async fn set_savings_balance(
        &self,
        username: &Username,
        balance: Amount,
    ) -> ApiResult<Option<Amount>>;

    /// `GET /get_goal?username=`. `None` when the user has not set a goal.
    async fn goal(&self, username: &Username) -> ApiResult<Option<Goal>>;

    /// `POST /set_goal`
    async fn set_goal(&self, request: &GoalRequest) -> ApiResult<()>;

    /// `GET /get_{category}_spending_goal?username=`
    async fn spending_goal(&self, username: &Username, category: CategoryId) -> ApiResult<Amount>;

    /// `GET /get_{category}_spending?username=`
    async fn spending(&self, username: &Username, category: CategoryId) -> ApiResult<Amount>;

    /// `GET /get_{category}_predicted?username=`
    async fn predicted(&self, username: &Username, category: CategoryId) -> ApiResult<Amount>;
}

/// The two ways a user can answer a high-value transaction alert.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ResolveAction {
    /// The user recognizes the transaction.
    #[serde(rename = "yes")]
    Verify,
    /// The user reports the transaction as fraud.
    #[serde(rename = "report")]
    Report,
}

serde_plain::derive_display_from_serialize!(ResolveAction);
serde_plain::derive_fromstr_from_deserialize!(ResolveAction);

/// The body of `POST /set_goal`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct GoalRequest {
    pub username: Username,
    pub amount: u64,
    pub time_months: u32,
}

/// Names each endpoint of the finance service. Used to build request paths and to label logs.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Endpoint {
    Transactions,
    Series(CategoryId),
    TopSpenders,
    AlertStatus,
    AlertResolve,
    BankBalance,
    SavingsBalance,
    SetSavingsBalance,
    Goal,
    SetGoal,
    SpendingGoal(CategoryId),
    Spending(CategoryId),
    Predicted(CategoryId),
}

impl Endpoint {
    /// The path relative to the service base URL.
    pub fn path(&self) -> String {
        match self {
            Endpoint::Transactions => "transactions".to_string(),
            Endpoint::Series(category) => category.series_path(),
            Endpoint::TopSpenders => "top_spenders".to_string(),
            Endpoint::AlertStatus => "alert_status".to_string(),
            Endpoint::AlertResolve => "alert_resolve".to_string(),
            Endpoint::BankBalance => "bank_balance".to_string(),
            Endpoint::SavingsBalance => "savings_balance".to_string(),
            Endpoint::SetSavingsBalance => "set_savings_balance".to_string(),
            Endpoint::Goal => "get_goal".to_string(),
            Endpoint::SetGoal => "set_goal".to_string(),
            Endpoint::SpendingGoal(category) => format!("get_{category}_spending_goal"),
            Endpoint::Spending(category) => format!("get_{category}_spending"),
            Endpoint::Predicted(category) => format!("get_{category}_predicted"),
        }
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "/{}", self.path())
    }
}

/// Decides whether the app talks to a real finance service or to the in-memory `TestFinance`.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub enum Mode {
    #[default]
    Http,
    Test,
}

impl Mode {
    /// When `FINWATCH_IN_TEST_MODE` is set and non-empty the mode is `Mode::Test`, otherwise it is
    /// `Mode::Http`.
    pub fn from_env() -> Self {
        match std::env::var("FINWATCH_IN_TEST_MODE") {
            Ok(value) if !value.is_empty() => Mode::Test,
            _ => Mode::Http,
        }
    }
}

/// Creates the `FinanceApi` implementation selected by `mode`.
pub fn finance(config: &Config, mode: Mode) -> Result<Arc<dyn FinanceApi>> {
    Ok(match mode {
        Mode::Http => Arc::new(http::HttpFinance::new(config.base_url())?),
        Mode::Test => Arc::new(TestFinance::default()),
    })
}
