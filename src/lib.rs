//! finwatch keeps a personal-finance dashboard in sync with a remote finance service.
//!
//! A mounted [`Dashboard`] polls the service on two independent timers. One merges the
//! transaction list, the per-category spending series and the top-spender summary into a
//! [`model::Snapshot`]; the other watches for a high-value transaction alert and walks the user
//! through verifying it or reporting it as fraud. Savings transfers are applied to the local
//! balances first and written to the service afterwards.

pub mod api;
pub mod args;
pub mod commands;
mod config;
pub mod dashboard;
mod error;
pub mod goals;
pub mod model;
pub mod session;
pub mod sync;
mod utils;


pub use api::Mode;
pub use config::Config;
pub use dashboard::Dashboard;
pub use error::{ApiError, Error, InvalidAmount, Result, StaleResult};
pub use session::Session;
