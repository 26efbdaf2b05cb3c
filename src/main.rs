mod config;
mod repeater;
mod store;

use clap::Parser;
use repeater::{RepeatError, RepeatOutcome, RepeatParams, RepeatPlan};
use std::path::PathBuf;
use std::process::ExitCode;
use store::DiskStore;
use tracing_subscriber::EnvFilter;

const EXIT_IO: u8 = 1;
const EXIT_EMPTY_FILE: u8 = 3;
const EXIT_SIZE_BOUND: u8 = 4;

/// Append the first line of FILE to itself REPETITION times, as long as the
/// file stays within MAXSIZE bytes. If a repetition would exceed MAXSIZE the
/// file is truncated to zero bytes and the command fails.
#[derive(Parser, Debug)]
#[command(name = "bounded-repeat", version, about)]
pub struct Cli {
    /// File whose first line is repeated
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Number of append attempts
    #[arg(value_name = "REPETITION")]
    repetitions: u64,

    /// Maximum size of the resulting file in bytes
    #[arg(value_name = "MAXSIZE")]
    max_size: u64,

    /// Config file path
    #[arg(short, long, default_value = "repeat.toml")]
    config: PathBuf,

    /// Report what would happen without touching the file
    #[arg(long)]
    dry_run: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Suppress the summary line, only warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn params(&self) -> RepeatParams {
        RepeatParams {
            path: self.file.clone(),
            repetitions: self.repetitions,
            max_size: self.max_size,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let (cfg, config_error) = match config::load_config(&cli.config) {
        Ok(cfg) => (cfg, None),
        Err(e) => (config::RepeatConfig::default(), Some(e)),
    };

    let quiet = cli.quiet || cfg.output.quiet;
    init_tracing(cli.verbose, quiet, &cfg.logging.filter);
    if let Some(e) = config_error {
        tracing::warn!("{e}; using defaults");
    }

    execute(&cli, quiet)
}

fn execute(cli: &Cli, quiet: bool) -> ExitCode {
    tracing::debug!(?cli, "parsed CLI arguments");
    let params = cli.params();

    if cli.dry_run {
        return match repeater::plan(&DiskStore, &params) {
            Ok(plan) => {
                println!("{}", describe_plan(&params, &plan));
                match plan {
                    RepeatPlan::Fits { .. } => ExitCode::SUCCESS,
                    RepeatPlan::Overflows { .. } => ExitCode::from(EXIT_SIZE_BOUND),
                }
            }
            Err(e) => fail(&e),
        };
    }

    match repeater::run(&mut DiskStore, &params) {
        Ok(outcome) => {
            tracing::info!(
                path = %params.path.display(),
                appended = outcome.appended,
                final_size = outcome.final_size,
                "repeat finished"
            );
            if !quiet {
                println!("{}", summarize(&params, &outcome));
            }
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

/// `RUST_LOG` wins; otherwise `-v`, then quiet (flag or config), then the
/// config filter.
fn init_tracing(verbose: bool, quiet: bool, config_filter: &str) {
    let fallback = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        config_filter
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .init();
}

fn fail(error: &RepeatError) -> ExitCode {
    eprintln!("error: {error}");
    ExitCode::from(exit_code(error))
}

fn exit_code(error: &RepeatError) -> u8 {
    match error {
        RepeatError::Io { .. } => EXIT_IO,
        RepeatError::EmptyFile { .. } => EXIT_EMPTY_FILE,
        RepeatError::SizeBoundExceeded { .. } => EXIT_SIZE_BOUND,
    }
}

fn summarize(params: &RepeatParams, outcome: &RepeatOutcome) -> String {
    format!(
        "{}: appended {} x {} bytes, {} -> {} bytes (max {})",
        params.path.display(),
        outcome.appended,
        outcome.unit_size,
        outcome.initial_size,
        outcome.final_size,
        params.max_size
    )
}

fn describe_plan(params: &RepeatParams, plan: &RepeatPlan) -> String {
    match plan {
        RepeatPlan::Fits {
            unit_size,
            final_size,
        } => format!(
            "dry run: {} would grow to {final_size} bytes ({} x {unit_size} bytes, max {})",
            params.path.display(),
            params.repetitions,
            params.max_size
        ),
        RepeatPlan::Overflows {
            unit_size,
            step,
            current_size,
        } => format!(
            "dry run: repetition {step} would grow {} from {current_size} to {} bytes \
             (max {}); the file would be truncated",
            params.path.display(),
            current_size.saturating_add(*unit_size),
            params.max_size
        ),
    }
}
