//! NLevel Trader
//!
//! Tracks trading progress across 40 levels: every trade moves the balance,
//! the balance decides the level, and the level decides lot size and the
//! largest loss tolerated before a reset.

mod commands;
mod dashboard;
mod metrics;
mod models;
mod progression;
mod replay;

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::commands::{SessionCommand, TradeKind, HELP};
use crate::metrics::MetricsCalculator;
use crate::models::TradeEvent;
use crate::progression::{LevelModel, ProgressionConfig, SessionSnapshot, SharedSession};

/// NLevel trading progress tracker CLI.
#[derive(Parser)]
#[command(name = "nlevel")]
#[command(about = "Level up your trading account one trade at a time", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short, long, default_value = "info", env = "NLEVEL_LOG_LEVEL")]
    log_level: String,

    #[command(flatten)]
    rules: RuleOverrides,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides for the progression rules. Unset values keep the defaults.
#[derive(Args)]
struct RuleOverrides {
    /// Starting balance, and the balance a reset returns to
    #[arg(long, global = true, env = "NLEVEL_BASE_BALANCE")]
    base_balance: Option<Decimal>,

    /// Growth between level starting balances (1.30 = +30%)
    #[arg(long, global = true, env = "NLEVEL_GROWTH_RATE")]
    growth_rate: Option<Decimal>,

    /// Fraction of a level's starting balance one trade may lose
    #[arg(long, global = true, env = "NLEVEL_MAX_LOSS_PCT")]
    max_loss_pct: Option<Decimal>,

    /// Lot size at level 1
    #[arg(long, global = true, env = "NLEVEL_BASE_LOT_SIZE")]
    base_lot_size: Option<Decimal>,

    /// Lot size added per level
    #[arg(long, global = true, env = "NLEVEL_LOT_STEP")]
    lot_step: Option<Decimal>,

    /// Highest reachable level
    #[arg(long, global = true, env = "NLEVEL_MAX_LEVEL")]
    max_level: Option<u32>,
}

impl RuleOverrides {
    fn into_config(self) -> Result<ProgressionConfig> {
        let defaults = ProgressionConfig::default();
        let config = ProgressionConfig {
            base_balance: self.base_balance.unwrap_or(defaults.base_balance),
            growth_rate: self.growth_rate.unwrap_or(defaults.growth_rate),
            max_loss_pct: self.max_loss_pct.unwrap_or(defaults.max_loss_pct),
            base_lot_size: self.base_lot_size.unwrap_or(defaults.base_lot_size),
            lot_step: self.lot_step.unwrap_or(defaults.lot_step),
            max_level: self.max_level.unwrap_or(defaults.max_level),
        };
        config.validate().context("invalid progression rules")?;
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show the requirements of each level
    Levels {
        /// First level to show
        #[arg(long, default_value = "1")]
        from: u32,

        /// Last level to show (defaults to the max level)
        #[arg(long)]
        to: Option<u32>,
    },

    /// Start an interactive session and enter trades as they close
    Play {
        /// Pair used when a trade line does not name one
        #[arg(long, default_value = "XAU/USD")]
        pair: String,

        /// Platform used when a trade line does not name one
        #[arg(long, default_value = "MetaTrader 4")]
        platform: String,
    },

    /// Replay a JSON file of trades through a fresh session
    Replay {
        /// Path to a JSON array of trades
        file: PathBuf,

        /// Print the resulting ledger as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the active progression rules
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging; stdout is reserved for command output
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .context("invalid log level")?;

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = cli.rules.into_config()?;

    match cli.command {
        Commands::Levels { from, to } => {
            let model = LevelModel::new(config);
            let to = to.unwrap_or(model.max_level());
            println!("{}", dashboard::level_table(&model, from, to));
        }

        Commands::Play { pair, platform } => {
            run_session(config, pair, platform).await?;
        }

        Commands::Replay { file, json } => {
            let trades = replay::load_trades(&file)?;
            info!(file = %file.display(), trades = trades.len(), "Replaying trades");

            let report = replay::run(config, &trades);
            let engine = &report.engine;

            if json {
                let out = serde_json::to_string_pretty(engine.ledger())
                    .context("failed to serialize ledger")?;
                println!("{}", out);
                return Ok(());
            }

            println!("\n{}", dashboard::history(engine.ledger()));
            if !report.rejected.is_empty() {
                println!(
                    "\n{} trade(s) rejected (entry {:?}): enter either a profit or a loss",
                    report.rejected.len(),
                    report.rejected
                );
            }
            println!("\n{}", dashboard::dashboard(&SessionSnapshot::from(engine)));
            println!("{}", report.metrics());
        }

        Commands::Config => {
            println!("\n=== Progression Configuration ===\n");
            println!("  Base Balance:     ${:.2}", config.base_balance);
            println!("  Growth Rate:      {}", config.growth_rate);
            println!("  Max Loss:         {}%", config.max_loss_pct * Decimal::ONE_HUNDRED);
            println!("  Base Lot Size:    {}", config.base_lot_size);
            println!("  Lot Step:         {}", config.lot_step);
            println!("  Max Level:        {}", config.max_level);
            println!("  Reset Floor:      ${:.2}", config.catastrophic_floor());
            println!("\n{}", dashboard::rules(&config));
        }
    }

    Ok(())
}

/// Interactive session: one trade per line until EOF, `quit`, or Ctrl+C.
async fn run_session(config: ProgressionConfig, default_pair: String, default_platform: String) -> Result<()> {
    let session = SharedSession::new(config);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("\n{}", dashboard::rules(&session.config().await));
    println!("\n{}", HELP);
    println!("\n{}", dashboard::dashboard(&session.snapshot().await));

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("\n\nStopping session...");
                break;
            }
            line = lines.next_line() => line.context("failed to read from stdin")?,
        };
        let Some(line) = line else {
            break;
        };

        let command = match SessionCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        match command {
            SessionCommand::Trade {
                kind,
                amount,
                pair,
                platform,
            } => {
                let pair = pair.unwrap_or_else(|| default_pair.clone());
                let platform = platform.unwrap_or_else(|| default_platform.clone());
                let event = match kind {
                    TradeKind::Profit => TradeEvent::with_profit(Utc::now(), pair, platform, amount),
                    TradeKind::Loss => TradeEvent::with_loss(Utc::now(), pair, platform, amount),
                };
                let event = match event {
                    Ok(event) => event,
                    Err(e) => {
                        println!("Error: {}", e);
                        continue;
                    }
                };

                match session.apply_trade(&event).await {
                    Ok(outcome) => {
                        if let Some(banner) = dashboard::banner(&outcome) {
                            println!("\n{}", banner);
                        }
                        println!("{}", dashboard::dashboard(&session.snapshot().await));
                    }
                    Err(e) => println!("Error: {}", e),
                }
            }
            SessionCommand::Status => {
                println!("{}", dashboard::dashboard(&session.snapshot().await));
            }
            SessionCommand::History => {
                println!("{}", dashboard::history(&session.snapshot().await.ledger));
            }
            SessionCommand::Stats => {
                let config = session.config().await;
                let snapshot = session.snapshot().await;
                println!("{}", MetricsCalculator::calculate(config.base_balance, &snapshot.ledger));
            }
            SessionCommand::Rules => {
                println!("{}", dashboard::rules(&session.config().await));
            }
            SessionCommand::Help => println!("{}", HELP),
            SessionCommand::Quit => break,
        }
    }

    let config = session.config().await;
    let snapshot = session.snapshot().await;
    if !snapshot.ledger.is_empty() {
        println!("{}", MetricsCalculator::calculate(config.base_balance, &snapshot.ledger));
    }
    info!(trades = snapshot.ledger.len(), balance = %snapshot.balance, "Session ended");

    Ok(())
}
