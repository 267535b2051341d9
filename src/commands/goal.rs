use crate::api::{self, Mode};
use crate::commands::Out;
use crate::goals::Goals;
use crate::model::{Amount, CategoryProgress, Goal};
use crate::{Config, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

/// Shows the saving goal, if one is set.
pub async fn goal_show(config: Config, mode: Mode) -> Result<Out<Option<Goal>>> {
    let goals = Goals::new(api::finance(&config, mode)?, config.username().clone());
    let goal = goals.goal().await?;
    let message = match &goal {
        Some(goal) => format!(
            "Saving {} over {} months, {} per month",
            goal.amount,
            goal.time_months,
            goal.monthly()
        ),
        None => "No saving goal is set".to_string(),
    };
    Ok(Out::new(message, goal))
}

/// Sets the saving goal.
pub async fn goal_set(
    config: Config,
    mode: Mode,
    amount: Amount,
    time_months: u32,
) -> Result<Out<Goal>> {
    let goals = Goals::new(api::finance(&config, mode)?, config.username().clone());
    let goal = goals.set_goal(amount, time_months).await?;
    Ok(Out::new(
        format!(
            "Saving goal set: {} over {} months",
            goal.amount, goal.time_months
        ),
        goal,
    ))
}

/// The output of `finwatch progress`.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressReport {
    pub categories: Vec<CategoryProgress>,
    pub predicted_total: Amount,
}

/// Shows spending against the goal and the prediction for each budgeted category.
pub async fn progress(config: Config, mode: Mode) -> Result<Out<ProgressReport>> {
    let goals = Goals::new(api::finance(&config, mode)?, config.username().clone());
    let (categories, predicted_total) = tokio::join!(goals.progress(), goals.predicted_total());
    for progress in &categories {
        let percent = (progress.fraction() * Decimal::ONE_HUNDRED).round();
        info!(
            "{}: {} of {} ({percent}%), predicted {}",
            progress.category.title(),
            progress.spent,
            progress.goal,
            progress.predicted
        );
    }
    Ok(Out::new(
        format!("Predicted spending this month: {predicted_total}"),
        ProgressReport {
            categories,
            predicted_total,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn goal_show_when_unset() {
        let env = TestEnv::new().await;
        let out = goal_show(env.config(), Mode::Test).await.unwrap();
        assert_eq!(out.message(), "No saving goal is set");
        assert_eq!(out.structure(), Some(&None));
    }

    #[tokio::test]
    async fn goal_set_reports_goal() {
        let env = TestEnv::new().await;
        let out = goal_set(env.config(), Mode::Test, Amount::from(500), 6)
            .await
            .unwrap();
        assert_eq!(out.message(), "Saving goal set: $500.00 over 6 months");
    }

    #[tokio::test]
    async fn progress_lists_budgeted_categories() {
        let env = TestEnv::new().await;
        let out = progress(env.config(), Mode::Test).await.unwrap();
        let report = out.structure().unwrap();
        assert_eq!(report.categories.len(), 3);
        assert_eq!(out.message(), "Predicted spending this month: $810.75");
    }
}
