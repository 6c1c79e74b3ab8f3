//! Terminal front end: admits files, prompts for passwords and shows progress.

mod prompt;
mod progress;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use log::{debug, info};
use tracing_subscriber::EnvFilter;

use pdfunlock::config::{default_config_path, load_config};
use pdfunlock::{
    discover_pdfs, Admission, BatchError, BatchProcessor, BatchSummary, Config, NoPrompt,
    PasswordPrompt,
};

use crate::progress::BatchProgress;
use crate::prompt::TerminalPrompt;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
/// Writes unlocked copies of password-protected PDF files.
struct Cli {
    /// PDF files or directories containing PDF files
    #[arg(value_name = "PATH", required = true)]
    inputs: Vec<PathBuf>,

    /// Directory receiving the unlocked copies
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    output: Option<PathBuf>,

    /// Replace existing output files
    #[arg(long = "overwrite", action = ArgAction::SetTrue)]
    overwrite: bool,

    /// Number of worker threads
    #[arg(short = 't', long = "threads")]
    threads: Option<usize>,

    /// Configuration file (JSON)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Where failed files are recorded
    #[arg(long = "error-log", value_name = "FILE")]
    error_log: Option<PathBuf>,

    /// Never ask for passwords; encrypted files that need one are skipped
    #[arg(long = "no-prompt", action = ArgAction::SetTrue)]
    no_prompt: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    init_logging(cli.verbose)?;

    let config = effective_config(&cli)?;
    let mut processor = BatchProcessor::new(&config).context("Failed to start workers")?;

    let mut prompt: Box<dyn PasswordPrompt> = if cli.no_prompt {
        Box::new(NoPrompt)
    } else {
        Box::new(TerminalPrompt::stdin())
    };

    let mut rejected = 0usize;
    for path in discover_pdfs(&cli.inputs) {
        match processor.admit_file(&path, prompt.as_mut()) {
            Ok(Admission::Admitted) => {}
            Ok(Admission::AlreadyQueued) => debug!("{} given more than once", path.display()),
            Err(e) => {
                eprintln!("{}", e);
                rejected += 1;
            }
        }
    }
    println!("{} PDF files ready", processor.pending_count());

    let mut rx = processor.subscribe();
    match processor.start_batch(cli.output.as_deref(), cli.overwrite || config.overwrite) {
        Ok(count) => info!("Dispatched {} files", count),
        Err(BatchError::NothingToDo) => {
            println!("No files to process");
            return Ok(exit_code(rejected > 0));
        }
        Err(e) => return Err(e.into()),
    }

    let display = BatchProgress::new(processor.records());
    let summary = loop {
        let summary = processor.wait_timeout(Duration::from_millis(100));
        display.drain(&mut rx);
        if let Some(summary) = summary {
            break summary;
        }
        if !processor.is_running() {
            break processor.last_summary().cloned().unwrap_or_default();
        }
    };
    display.finish(processor.records());

    print_summary(&summary, &processor);
    Ok(exit_code(rejected > 0 || summary.has_errors()))
}

/// Config file values, then command-line overrides.
fn effective_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => match default_config_path().filter(|p| p.is_file()) {
            Some(path) => {
                debug!("Using config {}", path.display());
                load_config(&path)
                    .with_context(|| format!("Failed to load config from {}", path.display()))?
            }
            None => Config::default(),
        },
    };

    if let Some(threads) = cli.threads {
        anyhow::ensure!(threads > 0, "--threads must be at least 1");
        config.worker_count = threads;
    }
    if let Some(error_log) = &cli.error_log {
        config.error_log_path = Some(error_log.clone());
    }
    Ok(config)
}

fn init_logging(verbose: u8) -> Result<()> {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_log::LogTracer::init().context("Failed to bridge log records")?;
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install log subscriber")?;
    Ok(())
}

fn print_summary(summary: &BatchSummary, processor: &BatchProcessor) {
    println!("{}", summary.headline());
    if !summary.has_errors() {
        return;
    }

    if summary.placeholders > 0 {
        println!(
            "{} failed, {} of them received a placeholder:",
            summary.error, summary.placeholders
        );
    } else {
        println!("{} failed:", summary.error);
    }
    for error in &summary.errors {
        println!("  {}: {}", error.path.display(), error.message);
    }
    println!(
        "Failures are recorded in {}",
        processor.error_log().path().display()
    );
}

fn exit_code(failed: bool) -> ExitCode {
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
