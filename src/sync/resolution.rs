use crate::api::{FinanceApi, ResolveAction};
use crate::error::ApiError;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// The confirmation shown to the user once the service has accepted their answer.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct Resolution {
    pub action: ResolveAction,
    pub title: &'static str,
    pub message: &'static str,
}

impl Resolution {
    pub fn for_action(action: ResolveAction) -> Self {
        match action {
            ResolveAction::Verify => Self {
                action,
                title: "Transaction Verified",
                message: "Thank you for verifying this transaction.",
            },
            ResolveAction::Report => Self {
                action,
                title: "Fraud Reported",
                message: "This transaction has been reported as fraudulent.",
            },
        }
    }
}

/// The service did not accept the user's answer. The alert stays raised on the service and is
/// detected again by the next status check.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Failed to process your response. Please try again.")]
pub struct ResolveFailure {
    pub action: ResolveAction,
    #[source]
    pub source: ApiError,
}

/// Turns the user's decision into exactly one `POST /alert_resolve`. Nothing is retried.
pub struct ResolutionCoordinator {
    api: Arc<dyn FinanceApi>,
}

impl ResolutionCoordinator {
    pub fn new(api: Arc<dyn FinanceApi>) -> Self {
        Self { api }
    }

    pub async fn resolve(&self, action: ResolveAction) -> Result<Resolution, ResolveFailure> {
        match self.api.resolve_alert(action).await {
            Ok(()) => {
                info!("Alert resolved with action '{action}'");
                Ok(Resolution::for_action(action))
            }
            Err(source) => {
                warn!("Unable to resolve the alert with action '{action}': {source}");
                Err(ResolveFailure { action, source })
            }
        }
    }
}
