use crate::api::{self, FinanceApi, Mode, ResolveAction};
use crate::commands::Out;
use crate::dashboard::Dashboard;
use crate::model::{CategoryId, Direction, Snapshot};
use crate::session::Session;
use crate::sync::{Alert, AlertPrompt, Notice};
use crate::{Config, Result};
use anyhow::Context;
use serde::Serialize;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// The output of `finwatch watch`.
#[derive(Debug, Clone, Serialize)]
pub struct WatchSummary {
    /// How many snapshots were received.
    pub updates: usize,
    /// The sequence number of the last one.
    pub last_seq: u64,
}

/// Mounts the dashboard and logs every snapshot until interrupted with Ctrl-C, or until `updates`
/// snapshots have been received.
pub async fn watch(
    config: Config,
    mode: Mode,
    prompt: Arc<dyn AlertPrompt>,
    updates: Option<usize>,
) -> Result<Out<WatchSummary>> {
    let api = api::finance(&config, mode)?;
    watch_with(&config, api, prompt, updates).await
}

pub(crate) async fn watch_with(
    config: &Config,
    api: Arc<dyn FinanceApi>,
    prompt: Arc<dyn AlertPrompt>,
    updates: Option<usize>,
) -> Result<Out<WatchSummary>> {
    let mut session = Session::signed_out();
    session.sign_in(config.username().clone());
    let mut dashboard = Dashboard::mount(&session, api, prompt, config.periods())?;
    let mut rx = dashboard.subscribe();

    let mut summary = WatchSummary {
        updates: 0,
        last_seq: 0,
    };
    let mut shown: Vec<String> = Vec::new();
    loop {
        tokio::select! {
            changed = rx.changed() => {
                changed.context("The dashboard stopped publishing")?;
                let snapshot = rx.borrow_and_update().clone();
                summary.updates += 1;
                summary.last_seq = snapshot.seq();
                let lines = render(&snapshot, config.recent_transactions());
                if lines == shown {
                    debug!(seq = snapshot.seq(), "Dashboard unchanged");
                } else {
                    for line in &lines {
                        info!("{line}");
                    }
                    shown = lines;
                }
                if updates.is_some_and(|n| summary.updates >= n) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    dashboard.unmount();
    session.sign_out();
    Ok(Out::new(
        format!("Received {} dashboard updates", summary.updates),
        summary,
    ))
}

/// Renders `snapshot` as text lines: the category totals, the top spenders and the `recent` most
/// recent transactions.
pub fn render(snapshot: &Snapshot, recent: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for category in CategoryId::ALL {
        lines.push(format!(
            "{}: {}",
            category.title(),
            snapshot.series(category).latest()
        ));
    }

    let top = snapshot.top_spenders();
    if !top.top_category.is_empty() {
        lines.push(format!(
            "Top categories: {} ({}), {} ({})",
            top.top_category, top.top_count, top.top2_category, top.top2_count
        ));
    }

    if snapshot.transactions().is_empty() {
        lines.push("No recent transactions".to_string());
    }
    for tx in snapshot.recent_transactions(recent) {
        let direction = match tx.direction() {
            Direction::Credit => "credit",
            Direction::Charge => "charge",
        };
        let merchant = if tx.merchant_name().is_empty() {
            "Unknown merchant"
        } else {
            tx.merchant_name()
        };
        lines.push(format!(
            "{}  {merchant}  {} ({direction})",
            tx.date(),
            tx.amount()
        ));
    }
    lines
}

/// Asks the user about alerts on the terminal.
pub struct TerminalPrompt {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl TerminalPrompt {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }
}

impl Default for TerminalPrompt {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl AlertPrompt for TerminalPrompt {
    async fn decide(&self, alert: &Alert) -> ResolveAction {
        let options = alert.options();
        let mut lines = self.lines.lock().await;
        loop {
            warn!("{}", alert.title);
            warn!("{}", alert.message);
            for (i, (_, label)) in options.iter().enumerate() {
                warn!("  {}) {label}", i + 1);
            }
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let answer = line.trim();
                    let picked = options.iter().enumerate().find(|(i, (_, label))| {
                        answer == (i + 1).to_string() || answer.eq_ignore_ascii_case(label)
                    });
                    match picked {
                        Some((_, (action, _))) => return *action,
                        None => warn!("Please answer 1 or 2"),
                    }
                }
                Ok(None) => {
                    // The prompt cannot be dismissed, so without input the alert stays pending
                    error!("Standard input is closed, the alert cannot be answered");
                    std::future::pending::<()>().await;
                }
                Err(e) => {
                    error!("Unable to read the answer: {e}");
                    std::future::pending::<()>().await;
                }
            }
        }
    }

    async fn notify(&self, notice: &Notice) {
        match notice {
            Notice::Confirmed(resolution) => {
                info!("{}: {}", resolution.title, resolution.message)
            }
            Notice::Failed(failure) => error!("{failure}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Endpoint, TestFinance};
    use crate::model::{Amount, TopSpenders, Transaction};
    use crate::test::{ScriptedPrompt, TestEnv};
    use chrono::NaiveDate;

    #[test]
    fn render_marks_credits_and_limits_list() {
        let day = |d| NaiveDate::from_ymd_opt(2025, 10, d).unwrap();
        let transactions = (1..=12)
            .rev()
            .map(|d| Transaction::new(day(d), Amount::from(i64::from(d)), "Shop"))
            .chain([Transaction::new(day(1), -25, "")])
            .collect();
        let top = TopSpenders {
            top_category: "Travel".to_string(),
            top2_category: "Food and Drink".to_string(),
            top_count: 4,
            top2_count: 3,
        };
        let snapshot = Snapshot::new(3, transactions, [], top);

        let lines = render(&snapshot, 10);
        assert_eq!(lines[0], "Total Spending: $0.00");
        assert_eq!(lines[4], "Top categories: Travel (4), Food and Drink (3)");
        assert_eq!(lines[5], "2025-10-12  Shop  $12.00 (charge)");
        assert_eq!(lines.len(), 4 + 1 + 10);

        let lines = render(&snapshot, 20);
        assert_eq!(lines.last().unwrap(), "2025-10-01  Unknown merchant  -$25.00 (credit)");
    }

    #[test]
    fn render_empty() {
        let lines = render(&Snapshot::empty(), 10);
        assert_eq!(lines.last().unwrap(), "No recent transactions");
    }

    #[tokio::test]
    async fn watch_stops_after_updates() {
        let env = TestEnv::new().await;
        let finance = Arc::new(TestFinance::default());
        let prompt = Arc::new(ScriptedPrompt::new(&[]));
        let out = watch_with(&env.config(), finance.clone(), prompt, Some(2))
            .await
            .unwrap();
        let summary = out.structure().unwrap();
        assert_eq!(summary.updates, 2);
        assert!(summary.last_seq >= 2);
        assert!(finance.calls(Endpoint::Transactions) >= 2);
    }

    #[tokio::test]
    async fn watch_resolves_alert() {
        let env = TestEnv::new().await;
        let finance = Arc::new(TestFinance::default());
        finance.raise_alert();
        let prompt = Arc::new(ScriptedPrompt::new(&[ResolveAction::Report]));
        watch_with(&env.config(), finance.clone(), prompt.clone(), Some(3))
            .await
            .unwrap();
        assert_eq!(prompt.prompts(), 1);
        assert_eq!(finance.resolutions(), vec![ResolveAction::Report]);
    }
}
