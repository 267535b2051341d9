//! Implements the `FinanceApi` trait with `reqwest` against the finance service's JSON endpoints.

use crate::api::{ApiResult, Endpoint, FinanceApi, GoalRequest, ResolveAction};
use crate::error::ApiError;
use crate::model::{Amount, CategoryId, CumulativeSeries, Goal, TopSpenders, Transaction, Username};
use crate::Result;
use anyhow::Context;
use reqwest::{Method, RequestBuilder};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::trace;
use url::Url;

pub(super) struct HttpFinance {
    base_url: Url,
    http: reqwest::Client,
}

impl HttpFinance {
    pub(super) fn new(base_url: &str) -> Result<Self> {
        // Without a trailing slash `Url::join` would replace the last path segment
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).with_context(|| format!("Invalid base_url '{base_url}'"))?;
        Ok(Self {
            base_url,
            http: reqwest::Client::new(),
        })
    }

    fn request(&self, method: Method, endpoint: Endpoint) -> ApiResult<RequestBuilder> {
        let url = self
            .base_url
            .join(&endpoint.path())
            .map_err(|e| ApiError::network(format!("invalid url for {endpoint}: {e}")))?;
        Ok(self.http.request(method, url))
    }

    async fn get<T>(&self, endpoint: Endpoint, query: &[(&str, String)]) -> ApiResult<T>
    where
        T: DeserializeOwned,
    {
        let req = self.request(Method::GET, endpoint)?.query(query);
        send(endpoint, req).await
    }

    async fn post<T, B>(
        &self,
        endpoint: Endpoint,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut req = self.request(Method::POST, endpoint)?.query(query);
        if let Some(body) = body {
            req = req.json(body);
        }
        send(endpoint, req).await
    }
}

/// Sends `req` and decodes a successful JSON body into `T`.
async fn send<T>(endpoint: Endpoint, req: RequestBuilder) -> ApiResult<T>
where
    T: DeserializeOwned,
{
    trace!("sending request to {endpoint}");
    let res = req.send().await.map_err(ApiError::network)?;
    let status = res.status();
    let text = res.text().await.map_err(ApiError::network)?;
    if !status.is_success() {
        return Err(ApiError::service(status.as_u16(), text));
    }
    serde_json::from_str(&text).map_err(|e| {
        ApiError::service(
            status.as_u16(),
            format!("invalid response body from {endpoint}: {e}"),
        )
    })
}

fn user(username: &Username) -> [(&'static str, String); 1] {
    [("username", username.to_string())]
}

#[async_trait::async_trait]
impl FinanceApi for HttpFinance {
    async fn transactions(&self) -> ApiResult<Vec<Transaction>> {
        let body: TransactionsBody = self.get(Endpoint::Transactions, &[]).await?;
        Ok(body.transactions)
    }

    async fn cumulative_spending(&self, category: CategoryId) -> ApiResult<CumulativeSeries> {
        let body: SeriesBody = self.get(Endpoint::Series(category), &[]).await?;
        Ok(body.cumulative_spending)
    }

    async fn top_spenders(&self, username: &Username) -> ApiResult<TopSpenders> {
        self.post(Endpoint::TopSpenders, &user(username), None::<&()>)
            .await
    }

    async fn alert_status(&self) -> ApiResult<bool> {
        let body: AlertStatusBody = self.get(Endpoint::AlertStatus, &[]).await?;
        Ok(body.isalert)
    }

    async fn resolve_alert(&self, action: ResolveAction) -> ApiResult<()> {
        let body = ResolveBody { action };
        let _: IgnoredAny = self.post(Endpoint::AlertResolve, &[], Some(&body)).await?;
        Ok(())
    }

    async fn bank_balance(&self, username: &Username) -> ApiResult<Amount> {
        let body: BankBalanceBody = self.get(Endpoint::BankBalance, &user(username)).await?;
        Ok(body.bank_balance.unwrap_or_default())
    }

    async fn savings_balance(&self, username: &Username) -> ApiResult<Amount> {
        let body: SavingsBalanceBody = self.get(Endpoint::SavingsBalance, &user(username)).await?;
        Ok(body.savings_balance.unwrap_or_default())
    }

    async fn set_savings_balance(
        &self,
        username: &Username,
        balance: Amount,
    ) -> ApiResult<Option<Amount>> {
        let query = [
            ("username", username.to_string()),
            ("balance", balance.value().to_string()),
        ];
        let body: SavingsBalanceBody = self
            .post(Endpoint::SetSavingsBalance, &query, None::<&()>)
            .await?;
        Ok(body.savings_balance)
    }

    async fn goal(&self, username: &Username) -> ApiResult<Option<Goal>> {
        let body: GoalBody = self.get(Endpoint::Goal, &user(username)).await?;
        Ok(match (body.amount, body.time_months) {
            (Some(amount), Some(time_months)) => Some(Goal {
                amount,
                time_months,
            }),
            _ => None,
        })
    }

    async fn set_goal(&self, request: &GoalRequest) -> ApiResult<()> {
        let _: IgnoredAny = self.post(Endpoint::SetGoal, &[], Some(request)).await?;
        Ok(())
    }

    async fn spending_goal(&self, username: &Username, category: CategoryId) -> ApiResult<Amount> {
        let endpoint = Endpoint::SpendingGoal(category);
        let body = self.get(endpoint, &user(username)).await?;
        keyed_amount(endpoint, body, &format!("{category}_spending_goal"))
    }

    async fn spending(&self, username: &Username, category: CategoryId) -> ApiResult<Amount> {
        let endpoint = Endpoint::Spending(category);
        let body = self.get(endpoint, &user(username)).await?;
        keyed_amount(endpoint, body, &format!("{category}_spending"))
    }

    async fn predicted(&self, username: &Username, category: CategoryId) -> ApiResult<Amount> {
        let value: Option<Amount> = self
            .get(Endpoint::Predicted(category), &user(username))
            .await?;
        Ok(value.unwrap_or_default())
    }
}

/// Pulls a nullable number out of a `{"food_spending": 12.5}` style body. A missing or null value
/// reads as zero.
fn keyed_amount(
    endpoint: Endpoint,
    body: serde_json::Map<String, serde_json::Value>,
    key: &str,
) -> ApiResult<Amount> {
    match body.get(key) {
        None | Some(serde_json::Value::Null) => Ok(Amount::ZERO),
        Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
            ApiError::service(200, format!("invalid '{key}' in response from {endpoint}: {e}"))
        }),
    }
}

#[derive(Deserialize)]
struct TransactionsBody {
    #[serde(default)]
    transactions: Vec<Transaction>,
}

#[derive(Deserialize)]
struct SeriesBody {
    #[serde(default)]
    cumulative_spending: CumulativeSeries,
}

#[derive(Deserialize)]
struct AlertStatusBody {
    #[serde(default, deserialize_with = "alert_flag")]
    isalert: bool,
}

#[derive(Serialize)]
struct ResolveBody {
    action: ResolveAction,
}

#[derive(Deserialize)]
struct BankBalanceBody {
    #[serde(default)]
    bank_balance: Option<Amount>,
}

#[derive(Deserialize)]
struct SavingsBalanceBody {
    #[serde(default)]
    savings_balance: Option<Amount>,
}

#[derive(Deserialize)]
struct GoalBody {
    #[serde(default)]
    amount: Option<Amount>,
    #[serde(default)]
    time_months: Option<u32>,
}

/// The service reports the flag as a boolean or as `0`/`1`, and as `null` for a fresh user.
fn alert_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(b)) => b,
        Some(Flag::Int(n)) => n != 0,
        None => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::MockServer;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn username() -> Username {
        Username::new("user_good").unwrap()
    }

    #[tokio::test]
    async fn transactions_decode() {
        let server = MockServer::start(|_, path| match path {
            "/transactions" => (
                200,
                r#"{"message": "ok", "transactions": [
                    {"date": "2025-10-20", "amount": 87.43, "category": null, "merchant_name": "Whole Foods"},
                    {"date": "2025-10-19", "amount": -25.0, "category": null, "merchant_name": null}
                ], "total_count": 2}"#
                    .to_string(),
            ),
            _ => (404, r#"{"detail": "Not Found"}"#.to_string()),
        })
        .await;
        let api = HttpFinance::new(&server.url()).unwrap();

        let transactions = api.transactions().await.unwrap();
        assert_eq!(transactions.len(), 2);
        assert_eq!(transactions[0].merchant_name(), "Whole Foods");
        assert!(transactions[1].amount().is_negative());
    }

    #[tokio::test]
    async fn message_only_bodies_are_empty() {
        let server = MockServer::start(|_, _| {
            (200, r#"{"message": "No transactions found"}"#.to_string())
        })
        .await;
        let api = HttpFinance::new(&server.url()).unwrap();

        assert!(api.transactions().await.unwrap().is_empty());
        assert!(api
            .cumulative_spending(CategoryId::Food)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            api.top_spenders(&username()).await.unwrap(),
            TopSpenders::default()
        );
        assert_eq!(api.goal(&username()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn series_path_per_category() {
        let server = MockServer::start(|_, path| match path {
            "/graph_data_travel" => (
                200,
                r#"{"cumulative_spending": {"2025-10-01": 120.0, "2025-10-04": 310.5}}"#
                    .to_string(),
            ),
            _ => (200, "{}".to_string()),
        })
        .await;
        let api = HttpFinance::new(&server.url()).unwrap();

        let series = api.cumulative_spending(CategoryId::Travel).await.unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.latest().value(), Decimal::from_str("310.5").unwrap());
        assert!(api
            .cumulative_spending(CategoryId::All)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(server.requests()[0].path, "/graph_data_travel");
        assert_eq!(server.requests()[1].path, "/graph_data");
    }

    #[tokio::test]
    async fn alert_flag_forms() {
        for (body, expected) in [
            (r#"{"isalert": true}"#, true),
            (r#"{"isalert": 1}"#, true),
            (r#"{"isalert": 0}"#, false),
            (r#"{"isalert": null}"#, false),
            (r#"{"message": "User not found"}"#, false),
        ] {
            let server = MockServer::start(move |_, _| (200, body.to_string())).await;
            let api = HttpFinance::new(&server.url()).unwrap();
            assert_eq!(api.alert_status().await.unwrap(), expected, "{body}");
        }
    }

    #[tokio::test]
    async fn resolve_posts_action() {
        let server = MockServer::start(|_, _| {
            (
                200,
                r#"{"message": "Alert resolved successfully", "status": "reported"}"#.to_string(),
            )
        })
        .await;
        let api = HttpFinance::new(&server.url()).unwrap();

        api.resolve_alert(ResolveAction::Report).await.unwrap();
        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].path, "/alert_resolve");
        let body: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
        assert_eq!(body, serde_json::json!({"action": "report"}));
    }

    #[tokio::test]
    async fn service_error_carries_body() {
        let server =
            MockServer::start(|_, _| (500, r#"{"detail": "database is locked"}"#.to_string()))
                .await;
        let api = HttpFinance::new(&server.url()).unwrap();

        let err = api.resolve_alert(ResolveAction::Verify).await.unwrap_err();
        assert_eq!(
            err,
            ApiError::Service {
                status: 500,
                body: r#"{"detail": "database is locked"}"#.to_string()
            }
        );
    }

    #[tokio::test]
    async fn undecodable_body_is_service_error() {
        let server = MockServer::start(|_, _| (200, "<html>oops</html>".to_string())).await;
        let api = HttpFinance::new(&server.url()).unwrap();

        let err = api.alert_status().await.unwrap_err();
        assert!(matches!(err, ApiError::Service { status: 200, .. }));
    }

    #[tokio::test]
    async fn connection_refused_is_network_error() {
        // Bind and drop a listener to find a port with nothing behind it
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let api = HttpFinance::new(&format!("http://127.0.0.1:{port}")).unwrap();

        let err = api.transactions().await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
    }

    #[tokio::test]
    async fn balances_and_write_query() {
        let server = MockServer::start(|_, path| match path {
            "/bank_balance" => (200, r#"{"bank_balance": 1500.0}"#.to_string()),
            "/savings_balance" => (200, r#"{"savings_balance": null}"#.to_string()),
            "/set_savings_balance" => (
                200,
                r#"{"message": "Savings balance updated", "savings_balance": 700.0}"#.to_string(),
            ),
            _ => (404, String::new()),
        })
        .await;
        let api = HttpFinance::new(&server.url()).unwrap();
        let user = username();

        assert_eq!(api.bank_balance(&user).await.unwrap(), Amount::from(1500));
        assert_eq!(api.savings_balance(&user).await.unwrap(), Amount::ZERO);
        let stored = api
            .set_savings_balance(&user, Amount::from(700))
            .await
            .unwrap();
        assert_eq!(stored, Some(Amount::from(700)));

        let write = &server.requests()[2];
        assert_eq!(write.method, "POST");
        assert_eq!(write.query, "username=user_good&balance=700");
    }

    #[tokio::test]
    async fn goal_roundtrip_body() {
        let server = MockServer::start(|_, path| match path {
            "/get_goal" => (
                200,
                r#"{"message": "Goal retrieved successfully", "amount": 500.0, "time_months": 6, "saving_goal": 83.33}"#
                    .to_string(),
            ),
            _ => (200, r#"{"message": "Goal set successfully"}"#.to_string()),
        })
        .await;
        let api = HttpFinance::new(&server.url()).unwrap();
        let request = GoalRequest {
            username: username(),
            amount: 500,
            time_months: 6,
        };

        api.set_goal(&request).await.unwrap();
        let goal = api.goal(&username()).await.unwrap().unwrap();
        assert_eq!(goal.amount, Amount::from(500));
        assert_eq!(goal.time_months, 6);

        let body: serde_json::Value = serde_json::from_str(&server.requests()[0].body).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"username": "user_good", "amount": 500, "time_months": 6})
        );
    }

    #[tokio::test]
    async fn category_readouts() {
        let server = MockServer::start(|_, path| match path {
            "/get_food_spending_goal" => (200, r#"{"food_spending_goal": 300.0}"#.to_string()),
            "/get_food_spending" => (200, r#"{"food_spending": null}"#.to_string()),
            "/get_all_predicted" => (200, "795.5".to_string()),
            "/get_travel_predicted" => (200, "null".to_string()),
            _ => (404, String::new()),
        })
        .await;
        let api = HttpFinance::new(&server.url()).unwrap();
        let user = username();

        assert_eq!(
            api.spending_goal(&user, CategoryId::Food).await.unwrap(),
            Amount::from(300)
        );
        assert_eq!(
            api.spending(&user, CategoryId::Food).await.unwrap(),
            Amount::ZERO
        );
        assert_eq!(
            api.predicted(&user, CategoryId::All).await.unwrap().value(),
            Decimal::from_str("795.5").unwrap()
        );
        assert_eq!(
            api.predicted(&user, CategoryId::Travel).await.unwrap(),
            Amount::ZERO
        );
        assert!(matches!(
            api.spending(&user, CategoryId::Travel).await,
            Err(ApiError::Service { status: 404, .. })
        ));
    }

    #[test]
    fn base_url_keeps_path_prefix() {
        let api = HttpFinance::new("http://localhost:8000/api").unwrap();
        let req = api
            .request(Method::GET, Endpoint::Transactions)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(req.url().as_str(), "http://localhost:8000/api/transactions");
    }
}
