use crate::model::Amount;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Which way the money moved. The service uses negative amounts for money coming back to the
/// user and positive amounts for charges.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Credit,
    Charge,
}

serde_plain::derive_display_from_serialize!(Direction);

/// A single row from the `/transactions` endpoint.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    date: NaiveDate,
    amount: Amount,
    #[serde(default, deserialize_with = "null_as_empty")]
    merchant_name: String,
}

impl Transaction {
    pub fn new(date: NaiveDate, amount: impl Into<Amount>, merchant_name: impl Into<String>) -> Self {
        Self {
            date,
            amount: amount.into(),
            merchant_name: merchant_name.into(),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn merchant_name(&self) -> &str {
        &self.merchant_name
    }

    pub fn direction(&self) -> Direction {
        if self.amount.is_negative() {
            Direction::Credit
        } else {
            Direction::Charge
        }
    }
}

/// Plaid leaves `merchant_name` null for some rows.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
