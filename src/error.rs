use rust_decimal::Decimal;

pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// The ways a single call to the finance service can fail. Calls are never retried, so one of
/// these is handed straight back to whoever made the call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// No response reached the client.
    #[error("network error: {0}")]
    Network(String),

    /// The service answered with a non-success status, or with a body we could not decode.
    #[error("service error ({status}): {body}")]
    Service { status: u16, body: String },
}

impl ApiError {
    pub(crate) fn network(e: impl std::fmt::Display) -> Self {
        ApiError::Network(e.to_string())
    }

    pub(crate) fn service(status: u16, body: impl Into<String>) -> Self {
        ApiError::Service {
            status,
            body: body.into(),
        }
    }
}

/// Returned when a savings amount is not greater than zero or exceeds the checking balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Invalid savings amount {amount}: it must be greater than zero and at most {checking}")]
pub struct InvalidAmount {
    pub amount: Decimal,
    pub checking: Decimal,
}

/// A refresh result that arrived after a newer refresh had already been published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("discarded result of refresh #{issued}, refresh #{published} is already published")]
pub struct StaleResult {
    pub issued: u64,
    pub published: u64,
}
