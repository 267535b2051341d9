//! Types that represent the dashboard data model, such as `Transaction` and `Snapshot`.
mod amount;
mod category;
mod snapshot;
mod transaction;
mod user;

pub use amount::{Amount, AmountError};
pub use category::CategoryId;
pub use snapshot::{CumulativeSeries, Snapshot, TopSpenders};
pub use transaction::{Direction, Transaction};
pub use user::{BalanceState, CategoryProgress, Goal, Username};
