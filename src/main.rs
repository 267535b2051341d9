use clap::Parser;
use finwatch::args::{Args, Command, GoalSubcommand};
use finwatch::commands::{self, TerminalPrompt};
use finwatch::{Config, Mode, Result};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, error};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn main_inner(args: Args) -> Result<()> {
    let home = args.common().finwatch_home().path();

    // This allows for running the program without a finance service. When FINWATCH_IN_TEST_MODE
    // is set and non-zero in length, then the mode will be Mode::Test, otherwise it will be
    // Mode::Http.
    let mode = Mode::from_env();

    // Route to appropriate command handler
    let _: () = match args.command() {
        Command::Init(init_args) => {
            commands::init(home, init_args.base_url(), init_args.username())
                .await?
                .print()
        }

        Command::Watch(watch_args) => {
            let config = Config::load(home).await?;
            let prompt = Arc::new(TerminalPrompt::new());
            commands::watch(config, mode, prompt, watch_args.updates())
                .await?
                .print()
        }

        Command::Balance => commands::balance(Config::load(home).await?, mode)
            .await?
            .print(),

        Command::Save(save_args) => {
            commands::save(Config::load(home).await?, mode, save_args.amount())
                .await?
                .print()
        }

        Command::Goal(goal_args) => {
            let config = Config::load(home).await?;
            match goal_args.action() {
                GoalSubcommand::Show => commands::goal_show(config, mode).await?.print(),
                GoalSubcommand::Set(set_args) => {
                    commands::goal_set(config, mode, set_args.amount(), set_args.months())
                        .await?
                        .print()
                }
            }
        }

        Command::Progress => commands::progress(Config::load(home).await?, mode)
            .await?
            .print(),
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_CRATE_NAME"),
                level,
                env!("CARGO_PKG_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
