//! Generate/verify/refine loop around an external bounded model checker.
//!
//! Candidate C programs are produced by a generator backend, handed to the
//! configured verifier, and refined from verifier feedback until one passes
//! or the iteration budget runs out. Each iteration appends one durable row
//! to the metrics CSV.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};

use harness::core::types::{Outcome, TerminationReason};
use harness::exit_codes;
use harness::io::config::{DEFAULT_CONFIG_FILE, HarnessConfig, load_config, write_config};
use harness::io::generator::CannedGenerator;
use harness::io::verifier::{BmcVerifier, Verifier};
use harness::logging;
use harness::looping::{RunSummary, run_loop};

#[derive(Parser)]
#[command(
    name = "harness",
    version,
    about = "Iterative verification loop around an external bounded model checker"
)]
struct Cli {
    /// Path to the harness config file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default config file if missing.
    Init {
        /// Overwrite an existing config file.
        #[arg(short, long)]
        force: bool,
    },
    /// Run the loop until a candidate verifies or the budget runs out.
    Run {
        /// Override the configured iteration budget.
        #[arg(long)]
        max_iterations: Option<u32>,
        /// Print the run summary as JSON instead of status lines.
        #[arg(long)]
        json: bool,
    },
    /// Verify a single existing source file with the configured flag set.
    Check {
        /// C source file to hand to the verifier.
        file: PathBuf,
    },
}

fn main() {
    logging::init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Init { force } => cmd_init(&cli.config, force),
        Command::Run {
            max_iterations,
            json,
        } => cmd_run(&cli.config, max_iterations, json),
        Command::Check { file } => cmd_check(&cli.config, &file),
    }
}

fn cmd_init(config_path: &Path, force: bool) -> Result<i32> {
    if config_path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }
    write_config(config_path, &HarnessConfig::default())?;
    println!("init: wrote {}", config_path.display());
    Ok(exit_codes::OK)
}

fn cmd_run(config_path: &Path, max_iterations: Option<u32>, json: bool) -> Result<i32> {
    let mut config = load_config(config_path)?;
    if let Some(limit) = max_iterations {
        config.max_iterations = limit;
    }
    let generator = CannedGenerator::from_config(&config.generator);
    let verifier = BmcVerifier::new(&config.verifier);

    let summary = run_loop(&config, &generator, &verifier, |iteration| {
        if !json {
            println!(
                "iter {}: outcome={} duration_s={:.4}",
                iteration.index,
                iteration.outcome,
                iteration.elapsed.as_secs_f64()
            );
        }
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(match summary.reason {
        TerminationReason::VerifiedOk => exit_codes::OK,
        TerminationReason::ExhaustedBudget => exit_codes::UNVERIFIED,
        TerminationReason::Aborted => exit_codes::ABORTED,
    })
}

fn print_summary(summary: &RunSummary) {
    match summary.reason {
        TerminationReason::VerifiedOk => {
            println!(
                "run: verified at iteration {} ({} iterations, {:.2}s verifying)",
                summary.verified_at.unwrap_or_default(),
                summary.iterations_run,
                summary.total_verify_secs
            );
            if let Some(digest) = &summary.candidate_sha256 {
                println!("run: candidate sha256 {digest}");
            }
        }
        TerminationReason::ExhaustedBudget => {
            println!(
                "run: no candidate verified within {} iterations ({:.2}s verifying)",
                summary.iterations_run, summary.total_verify_secs
            );
        }
        TerminationReason::Aborted => {
            println!(
                "run: aborted after {} iterations: {}",
                summary.iterations_run,
                summary.abort_cause.as_deref().unwrap_or("unknown cause")
            );
        }
    }
    println!("run: metrics {}", summary.metrics_path);
}

fn cmd_check(config_path: &Path, file: &Path) -> Result<i32> {
    let config = load_config(config_path)?;
    let verifier = BmcVerifier::new(&config.verifier);
    let verdict = verifier.verify(file)?;

    if verdict.outcome == Outcome::ToolNotFound {
        eprintln!(
            "verifier binary '{}' not found on the execution path",
            config.verifier.binary
        );
        return Ok(exit_codes::ABORTED);
    }

    println!(
        "check: file={} outcome={} duration_s={:.4}",
        file.display(),
        verdict.outcome,
        verdict.elapsed.as_secs_f64()
    );
    Ok(match verdict.outcome {
        Outcome::Success => exit_codes::OK,
        Outcome::Failure | Outcome::Timeout => exit_codes::UNVERIFIED,
        Outcome::ToolNotFound => exit_codes::ABORTED,
    })
}
