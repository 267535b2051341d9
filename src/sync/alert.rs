//! Detects a pending high-value transaction alert and drives the user through resolving it.
//!
//! The alert lifecycle is `Idle -> Pending -> Resolving -> Idle`. Only `AlertMonitor::check` can
//! leave `Idle`, and it only does so when the service reports the flag while nothing is already in
//! flight, so the user never sees a second prompt for the alert they are answering.

use crate::api::{FinanceApi, ResolveAction};
use crate::sync::{lock, Aggregator, Liveness, Resolution, ResolutionCoordinator, ResolveFailure};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};

#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertState {
    #[default]
    Idle,
    /// The prompt is up and waiting for the user.
    Pending,
    /// The user's answer is being sent to the service.
    Resolving,
}

serde_plain::derive_display_from_serialize!(AlertState);

/// The content of the blocking prompt.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct Alert {
    pub title: &'static str,
    pub message: &'static str,
}

impl Alert {
    /// The answers offered by the prompt, with their labels. There is no way to dismiss it.
    pub fn options(&self) -> [(ResolveAction, &'static str); 2] {
        [
            (ResolveAction::Verify, "Verify"),
            (ResolveAction::Report, "Report Fraud"),
        ]
    }
}

pub const HIGH_VALUE_ALERT: Alert = Alert {
    title: "High Value Transaction Detected",
    message: "A transaction over $100 has been detected. Please verify this transaction.",
};

/// What the user is told once their answer has been handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Confirmed(Resolution),
    Failed(ResolveFailure),
}

/// The surface that shows the alert to the user and collects their answer.
#[async_trait::async_trait]
pub trait AlertPrompt: Send + Sync {
    /// Shows `alert` and waits until the user picks one of `alert.options()`.
    async fn decide(&self, alert: &Alert) -> ResolveAction;

    /// Tells the user how their answer was handled.
    async fn notify(&self, notice: &Notice);
}

/// The result of one `AlertMonitor::check`.
#[derive(Debug)]
pub enum CheckOutcome {
    /// The service reports no alert.
    Clear,
    /// A new alert was detected. The handle belongs to the task that prompts the user and resolves
    /// the alert.
    Raised(JoinHandle<()>),
    /// An alert is already being handled; nothing changed.
    AlreadyActive(AlertState),
    /// The status could not be read. Nothing changed; the next check tries again.
    Unavailable,
    /// The view was unmounted.
    Unmounted,
}

pub struct AlertMonitor {
    api: Arc<dyn FinanceApi>,
    prompt: Arc<dyn AlertPrompt>,
    coordinator: ResolutionCoordinator,
    aggregator: Arc<Aggregator>,
    liveness: Liveness,
    state: Mutex<AlertState>,
    flow: Mutex<Option<AbortHandle>>,
}

impl AlertMonitor {
    pub fn new(
        api: Arc<dyn FinanceApi>,
        prompt: Arc<dyn AlertPrompt>,
        aggregator: Arc<Aggregator>,
        liveness: Liveness,
    ) -> Self {
        Self {
            coordinator: ResolutionCoordinator::new(api.clone()),
            api,
            prompt,
            aggregator,
            liveness,
            state: Mutex::new(AlertState::Idle),
            flow: Mutex::new(None),
        }
    }

    pub fn state(&self) -> AlertState {
        *lock(&self.state)
    }

    pub fn is_idle(&self) -> bool {
        self.state() == AlertState::Idle
    }

    /// Reads the alert flag. When it is raised and no alert is being handled, moves to `Pending`
    /// and spawns the task that prompts the user. In any other state this only reads.
    pub async fn check(self: &Arc<Self>) -> CheckOutcome {
        let raised = match self.api.alert_status().await {
            Ok(raised) => raised,
            Err(e) => {
                warn!("Unable to read the alert status: {e}");
                return CheckOutcome::Unavailable;
            }
        };
        if !self.liveness.is_alive() {
            return CheckOutcome::Unmounted;
        }

        let mut state = lock(&self.state);
        match (*state, raised) {
            (AlertState::Idle, false) => CheckOutcome::Clear,
            (AlertState::Idle, true) => {
                *state = AlertState::Pending;
                drop(state);
                info!("{}", HIGH_VALUE_ALERT.title);
                let flow = tokio::spawn(self.clone().handle_alert());
                *lock(&self.flow) = Some(flow.abort_handle());
                CheckOutcome::Raised(flow)
            }
            (current, _) => {
                debug!("Alert is already {current}, not prompting again");
                CheckOutcome::AlreadyActive(current)
            }
        }
    }

    /// Aborts the prompt and resolution task of the alert being handled, if any.
    pub fn cancel(&self) {
        if let Some(flow) = lock(&self.flow).take() {
            flow.abort();
        }
    }

    fn set_state(&self, state: AlertState) {
        *lock(&self.state) = state;
    }

    async fn handle_alert(self: Arc<Self>) {
        let action = self.prompt.decide(&HIGH_VALUE_ALERT).await;
        if !self.liveness.is_alive() {
            debug!("View unmounted, dropping the answer {action}");
            return;
        }
        self.set_state(AlertState::Resolving);
        let result = self.coordinator.resolve(action).await;
        if !self.liveness.is_alive() {
            debug!("View unmounted, not reporting the {action} resolution");
            return;
        }

        // Idle only once the user has seen the outcome, so a failure notice is never
        // followed by a second prompt while it is still showing
        match result {
            Ok(resolution) => {
                self.prompt.notify(&Notice::Confirmed(resolution)).await;
                self.set_state(AlertState::Idle);
                // One refresh outside the regular cadence so the resolved transaction shows up
                let outcome = self.aggregator.refresh().await;
                debug!("Refresh after resolving the alert: {outcome:?}");
            }
            Err(failure) => {
                self.prompt.notify(&Notice::Failed(failure)).await;
                self.set_state(AlertState::Idle);
            }
        }
    }
}
