//! velock-cli: command-line driver for the velock voting-escrow ledger.
//!
//! Replays JSON scenarios against an in-memory ledger and prints the
//! voting-power curve of hypothetical locks.

mod scenario;
mod settings;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use velock_core::constants::TOKEN;
use velock_core::DecayFunction;
use velock_ledger::LedgerConfig;

use crate::scenario::Scenario;
use crate::settings::Settings;

#[derive(Parser, Debug)]
#[command(name = "velock-cli")]
#[command(version, about = "Voting-escrow ledger driver")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log output format ("text" or "json")
    #[arg(long, global = true)]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a JSON scenario against a fresh ledger
    Replay(ReplayArgs),
    /// Print the voting power of a hypothetical lock at each epoch end
    Curve(CurveArgs),
}

#[derive(Args, Debug)]
struct ReplayArgs {
    /// Scenario file
    scenario: PathBuf,

    /// Write the final ledger state as JSON to this path
    #[arg(long)]
    dump_state: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct CurveArgs {
    /// Locked principal in whole tokens
    #[arg(short, long)]
    principal: u64,

    /// Lock length in epochs
    #[arg(short, long)]
    epochs: u64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    let level = cli
        .log_level
        .clone()
        .or_else(|| settings.log_level.clone())
        .unwrap_or_else(|| "info".to_string());
    let format = cli
        .log_format
        .clone()
        .or_else(|| settings.log_format.clone())
        .unwrap_or_else(|| "text".to_string());
    init_logging(&level, &format);

    match cli.command {
        Commands::Replay(args) => replay(args, settings.ledger),
        Commands::Curve(args) => curve(args, settings.ledger),
    }
}

fn replay(args: ReplayArgs, config: LedgerConfig) -> Result<()> {
    let scenario = Scenario::from_file(&args.scenario)?;
    info!(
        scenario = %args.scenario.display(),
        steps = scenario.steps.len(),
        "cli: replaying scenario"
    );
    let report = scenario.replay(config)?;

    for (at, action, outcome) in &report.outcomes {
        println!("{at:>12}  {action:<28} {outcome}");
    }
    println!();
    println!(
        "{} steps, {} failed, {} locked, {} locks",
        report.outcomes.len(),
        report.failures(),
        report.ledger.total_locked(),
        report.ledger.state().locks().len()
    );

    if let Some(path) = &args.dump_state {
        let json = serde_json::to_string_pretty(report.ledger.state())
            .context("failed to serialize ledger state")?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("state written to {}", path.display());
    }
    Ok(())
}

fn curve(args: CurveArgs, config: LedgerConfig) -> Result<()> {
    let max_epochs = config.max_lock_epochs();
    if args.epochs == 0 || args.epochs > max_epochs {
        bail!("epochs must be between 1 and {max_epochs}");
    }
    for (epoch, value) in curve_points(u128::from(args.principal) * TOKEN, args.epochs, &config) {
        println!(
            "epoch {epoch:>3}  {:>24.6}",
            value as f64 / TOKEN as f64
        );
    }
    Ok(())
}

/// Voting power of a lock created at time zero, read at the end of each of
/// its epochs.
fn curve_points(principal: u128, epochs: u64, config: &LedgerConfig) -> Vec<(u64, u128)> {
    let clock = config.clock();
    let expiry = clock.epoch_start_of(epochs);
    let decay = DecayFunction::for_lock(principal, expiry, config.max_lock_duration);
    (0..epochs)
        .map(|epoch| (epoch, decay.evaluate(clock.epoch_end_of(epoch))))
        .collect()
}

fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
