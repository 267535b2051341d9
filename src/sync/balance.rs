use crate::api::FinanceApi;
use crate::error::InvalidAmount;
use crate::model::{Amount, BalanceState, Username};
use crate::sync::lock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Owns the payments view's `BalanceState`. Moving money into savings is applied locally before the
/// service is told about it, and the service's answer is folded back in when it arrives.
///
/// Transfers may overlap. Each savings write takes a sequence number when it is issued, and only the
/// answer to the latest-issued write is folded back in.
pub struct BalanceMutator {
    api: Arc<dyn FinanceApi>,
    username: Username,
    state: Mutex<BalanceState>,
    writes: AtomicU64,
}

impl BalanceMutator {
    pub fn new(api: Arc<dyn FinanceApi>, username: Username, initial: BalanceState) -> Self {
        Self {
            api,
            username,
            state: Mutex::new(initial),
            writes: AtomicU64::new(0),
        }
    }

    /// The current local balances.
    pub fn balances(&self) -> BalanceState {
        *lock(&self.state)
    }

    /// Reads both balances from the service. A failed read keeps the local value for that balance.
    pub async fn load(&self) -> BalanceState {
        let (checking, savings) = tokio::join!(
            self.api.bank_balance(&self.username),
            self.api.savings_balance(&self.username),
        );
        let mut state = lock(&self.state);
        match checking {
            Ok(checking) => state.checking = checking,
            Err(e) => warn!("Unable to read the checking balance, keeping {}: {e}", state.checking),
        }
        match savings {
            Ok(savings) => state.savings = savings,
            Err(e) => warn!("Unable to read the savings balance, keeping {}: {e}", state.savings),
        }
        debug!("Loaded balances {state:?}");
        *state
    }

    /// Moves `amount` from checking into savings.
    ///
    /// The local balances change immediately. The new savings balance is then written to the
    /// service; when the service reports the balance it stored, that value replaces the local one
    /// unless a later transfer has been scheduled since. A failed write is logged and the local
    /// change is kept.
    ///
    /// # Errors
    /// - `InvalidAmount` if `amount` is not positive or is more than the checking balance. Nothing
    ///   changes in that case.
    pub async fn schedule_savings(&self, amount: Amount) -> Result<BalanceState, InvalidAmount> {
        let (seq, target) = {
            let mut state = lock(&self.state);
            if !amount.is_positive() || amount > state.checking {
                return Err(InvalidAmount {
                    amount: amount.value(),
                    checking: state.checking.value(),
                });
            }
            state.checking = state.checking - amount;
            state.savings = state.savings + amount;
            let seq = self.writes.fetch_add(1, Ordering::SeqCst) + 1;
            (seq, state.savings)
        };
        info!(seq, "Scheduled {amount} into savings");

        match self.api.set_savings_balance(&self.username, target).await {
            Ok(Some(stored)) => {
                let mut state = lock(&self.state);
                let latest = self.writes.load(Ordering::SeqCst);
                if seq < latest {
                    debug!(seq, latest, "Ignoring stored savings of {stored} from an earlier write");
                    return Ok(*state);
                }
                if stored != state.savings {
                    debug!("Service stored savings of {stored}, local value was {}", state.savings);
                }
                state.savings = stored;
            }
            Ok(None) => debug!("Savings write acknowledged without a balance"),
            // TODO: roll the local change back once the service reports whether the write applied
            Err(e) => warn!("Unable to save the savings balance of {target}: {e}"),
        }
        Ok(self.balances())
    }
}
