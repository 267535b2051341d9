use crate::api::{self, Mode};
use crate::commands::Out;
use crate::model::{Amount, BalanceState};
use crate::sync::BalanceMutator;
use crate::{Config, Result};
use tracing::info;

/// The balances the payments view shows before the service has answered.
fn initial_balances() -> BalanceState {
    BalanceState::new(1500, 500)
}

/// Reads the checking and savings balances from the service.
pub async fn balance(config: Config, mode: Mode) -> Result<Out<BalanceState>> {
    let api = api::finance(&config, mode)?;
    let balances = BalanceMutator::new(api, config.username().clone(), initial_balances());
    let state = balances.load().await;
    Ok(Out::new(
        format!(
            "Checking: {}, Savings: {}, Total: {}",
            state.checking,
            state.savings,
            state.total()
        ),
        state,
    ))
}

/// Moves `amount` from checking into savings.
pub async fn save(config: Config, mode: Mode, amount: Amount) -> Result<Out<BalanceState>> {
    let api = api::finance(&config, mode)?;
    let balances = BalanceMutator::new(api, config.username().clone(), initial_balances());
    let before = balances.load().await;
    info!("Checking: {}, Savings: {}", before.checking, before.savings);
    let after = balances.schedule_savings(amount).await?;
    Ok(Out::new(
        format!(
            "Moved {amount} into savings. Checking: {}, Savings: {}",
            after.checking, after.savings
        ),
        after,
    ))
}
