//! The saving goal and per-category budget progress.

use crate::api::{FinanceApi, GoalRequest};
use crate::model::{Amount, CategoryId, CategoryProgress, Goal, Username};
use crate::Result;
use anyhow::{ensure, Context};
use futures::future::join_all;
use rust_decimal::prelude::ToPrimitive;
use std::sync::Arc;
use tracing::{info, warn};

pub struct Goals {
    api: Arc<dyn FinanceApi>,
    username: Username,
}

impl Goals {
    pub fn new(api: Arc<dyn FinanceApi>, username: Username) -> Self {
        Self { api, username }
    }

    /// The user's saving goal, or `None` if they have not set one.
    pub async fn goal(&self) -> Result<Option<Goal>> {
        Ok(self
            .api
            .goal(&self.username)
            .await
            .context("Unable to read the saving goal")?)
    }

    /// Sets the saving goal to `amount` over `time_months` months.
    ///
    /// # Errors
    /// - If `amount` is not a positive whole number of dollars or `time_months` is zero.
    /// - If the service rejects the goal, e.g. because the user is unknown.
    pub async fn set_goal(&self, amount: Amount, time_months: u32) -> Result<Goal> {
        ensure!(
            amount.is_positive(),
            "The goal amount must be greater than zero, got {amount}"
        );
        ensure!(
            amount.value().fract().is_zero(),
            "The goal amount must be a whole number of dollars, got {amount}"
        );
        ensure!(time_months > 0, "The goal needs at least one month");
        let whole = amount
            .value()
            .to_u64()
            .with_context(|| format!("The goal amount {amount} is too large"))?;

        let request = GoalRequest {
            username: self.username.clone(),
            amount: whole,
            time_months,
        };
        self.api
            .set_goal(&request)
            .await
            .context("Unable to save the saving goal")?;
        let goal = Goal {
            amount,
            time_months,
        };
        info!(
            "Saving goal set to {amount} over {time_months} months ({} per month)",
            goal.monthly()
        );
        Ok(goal)
    }

    /// Reads goal, actual spending and predicted spending for every budgeted category. All reads
    /// run concurrently; a failed read counts as zero.
    pub async fn progress(&self) -> Vec<CategoryProgress> {
        join_all(CategoryId::BUDGETED.map(|category| self.category_progress(category))).await
    }

    async fn category_progress(&self, category: CategoryId) -> CategoryProgress {
        let (goal, spent, predicted) = tokio::join!(
            self.api.spending_goal(&self.username, category),
            self.api.spending(&self.username, category),
            self.api.predicted(&self.username, category),
        );
        let or_zero = |what: &str, result: crate::api::ApiResult<Amount>| {
            result.unwrap_or_else(|e| {
                warn!(%category, "Unable to read the {what}: {e}");
                Amount::ZERO
            })
        };
        CategoryProgress {
            category,
            goal: or_zero("spending goal", goal),
            spent: or_zero("actual spending", spent),
            predicted: or_zero("predicted spending", predicted),
        }
    }

    /// The prediction for all categories together.
    pub async fn predicted_total(&self) -> Amount {
        self.api
            .predicted(&self.username, CategoryId::All)
            .await
            .unwrap_or_else(|e| {
                warn!("Unable to read the predicted total: {e}");
                Amount::ZERO
            })
    }
}
