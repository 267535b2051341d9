use crate::model::{Amount, CategoryId};
use anyhow::ensure;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// The plain username the service uses to identify a user. Never empty.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    pub fn new(s: impl AsRef<str>) -> crate::Result<Self> {
        let trimmed = s.as_ref().trim();
        ensure!(!trimmed.is_empty(), "A username cannot be empty");
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Username {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Username {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Username::new(s)
    }
}

impl TryFrom<String> for Username {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Username::new(value)
    }
}

impl From<Username> for String {
    fn from(value: Username) -> Self {
        value.0
    }
}

/// A saving goal: put `amount` aside over `time_months` months.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub amount: Amount,
    pub time_months: u32,
}

impl Goal {
    /// How much needs to be saved each month to reach the goal on time.
    pub fn monthly(&self) -> Amount {
        if self.time_months == 0 {
            return self.amount;
        }
        Amount::new((self.amount.value() / Decimal::from(self.time_months)).round_dp(2))
    }
}

/// The checking and savings balances shown in the payments view.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct BalanceState {
    pub checking: Amount,
    pub savings: Amount,
}

impl BalanceState {
    pub fn new(checking: impl Into<Amount>, savings: impl Into<Amount>) -> Self {
        Self {
            checking: checking.into(),
            savings: savings.into(),
        }
    }

    pub fn total(&self) -> Amount {
        self.checking + self.savings
    }
}

/// How one category's spending compares to its goal and to the predicted spend.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct CategoryProgress {
    pub category: CategoryId,
    pub goal: Amount,
    pub spent: Amount,
    pub predicted: Amount,
}

impl CategoryProgress {
    /// `spent / goal` capped at `1`, or `0` when no positive goal is set.
    pub fn fraction(&self) -> Decimal {
        if !self.goal.is_positive() {
            return Decimal::ZERO;
        }
        (self.spent.value() / self.goal.value()).min(Decimal::ONE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_rejects_empty() {
        assert!(Username::new("").is_err());
        assert!(Username::new("   ").is_err());
        assert_eq!(Username::new(" user_good ").unwrap().as_str(), "user_good");
    }

    #[test]
    fn username_deserialize_rejects_empty() {
        assert!(serde_json::from_str::<Username>("\"\"").is_err());
        let u: Username = serde_json::from_str("\"user_good\"").unwrap();
        assert_eq!(u.to_string(), "user_good");
    }

    #[test]
    fn goal_monthly() {
        let goal = Goal {
            amount: Amount::from(500),
            time_months: 6,
        };
        assert_eq!(goal.monthly().to_string(), "$83.33");
    }

    #[test]
    fn progress_fraction() {
        let mut progress = CategoryProgress {
            category: CategoryId::Food,
            goal: Amount::from(200),
            spent: Amount::from(50),
            predicted: Amount::ZERO,
        };
        assert_eq!(progress.fraction(), Decimal::new(25, 2));

        progress.spent = Amount::from(500);
        assert_eq!(progress.fraction(), Decimal::ONE);

        progress.goal = Amount::ZERO;
        assert_eq!(progress.fraction(), Decimal::ZERO);
    }
}
