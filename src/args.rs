//! These structs provide the CLI interface for the finwatch CLI.

use crate::model::{Amount, Username};
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// finwatch: A terminal dashboard for your spending, savings and fraud alerts.
///
/// finwatch polls a personal-finance service for your recent transactions and spending by
/// category. When the service flags a high-value transaction, finwatch stops and asks you to
/// verify it or report it as fraud.
///
/// Set FINWATCH_IN_TEST_MODE=1 to run against built-in sample data instead of a real service.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory and the configuration file.
    ///
    /// This is the first command you should run. Pass the address of the finance service as
    /// --base-url and your username as --username. The data directory defaults to $HOME/finwatch;
    /// use --finwatch-home to put it somewhere else.
    Init(InitArgs),
    /// Show the dashboard and keep it up to date until interrupted.
    Watch(WatchArgs),
    /// Show your checking and savings balances.
    Balance,
    /// Move money from checking into savings.
    Save(SaveArgs),
    /// Show or set your saving goal.
    Goal(GoalArgs),
    /// Show spending against goals and predictions for each category.
    Progress,
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where finwatch configuration is held. Defaults to ~/finwatch
    #[arg(long, env = "FINWATCH_HOME", default_value_t = default_finwatch_home())]
    finwatch_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, finwatch_home: PathBuf) -> Self {
        Self {
            log_level,
            finwatch_home: finwatch_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn finwatch_home(&self) -> &DisplayPath {
        &self.finwatch_home
    }
}

/// (Not shown): Args for the `finwatch init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The address of the finance service, e.g. http://localhost:8000
    #[arg(long)]
    base_url: String,

    /// Your username on the finance service.
    #[arg(long)]
    username: Username,
}

impl InitArgs {
    pub fn new(base_url: impl Into<String>, username: Username) -> Self {
        Self {
            base_url: base_url.into(),
            username,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn username(&self) -> &Username {
        &self.username
    }
}

/// (Not shown): Args for the `finwatch watch` command.
#[derive(Debug, Parser, Clone)]
pub struct WatchArgs {
    /// Stop after this many dashboard updates instead of running until interrupted.
    #[arg(long)]
    updates: Option<usize>,
}

impl WatchArgs {
    pub fn new(updates: Option<usize>) -> Self {
        Self { updates }
    }

    pub fn updates(&self) -> Option<usize> {
        self.updates
    }
}

/// (Not shown): Args for the `finwatch save` command.
#[derive(Debug, Parser, Clone)]
pub struct SaveArgs {
    /// The amount to move into savings, e.g. 200 or $1,200.00
    #[arg(default_value = "200")]
    amount: Amount,
}

impl SaveArgs {
    pub fn new(amount: Amount) -> Self {
        Self { amount }
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }
}

/// (Not shown): Args for the `finwatch goal` command.
#[derive(Debug, Parser, Clone)]
pub struct GoalArgs {
    #[command(subcommand)]
    action: GoalSubcommand,
}

impl GoalArgs {
    pub fn new(action: GoalSubcommand) -> Self {
        Self { action }
    }

    pub fn action(&self) -> &GoalSubcommand {
        &self.action
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum GoalSubcommand {
    /// Show your saving goal.
    Show,
    /// Set your saving goal.
    Set(SetGoalArgs),
}

/// (Not shown): Args for the `finwatch goal set` command.
#[derive(Debug, Parser, Clone)]
pub struct SetGoalArgs {
    /// The total to save, in whole dollars.
    #[arg(long)]
    amount: Amount,

    /// The number of months to save it over.
    #[arg(long)]
    months: u32,
}

impl SetGoalArgs {
    pub fn new(amount: Amount, months: u32) -> Self {
        Self { amount, months }
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn months(&self) -> u32 {
        self.months
    }
}

fn default_finwatch_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("finwatch"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --finwatch-home or FINWATCH_HOME instead of relying on the \
                default finwatch home directory. If you continue using the program right now, you \
                may have problems!",
            );
            PathBuf::from("finwatch")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl DisplayPath {
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}
