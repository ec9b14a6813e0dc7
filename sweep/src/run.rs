//! Sweep driver: one verifier invocation per requested size.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use tracing::{debug, info, instrument};

use harness::core::types::Outcome;
use harness::io::config::load_config;
use harness::io::verifier::{BmcVerifier, Verifier};

use crate::results::{SweepLog, SweepRecord, SweepResult};

pub struct SweepOptions {
    pub source: PathBuf,
    pub sizes: Vec<u32>,
    pub define_name: String,
    pub out: PathBuf,
    pub config: PathBuf,
}

/// Verify the source once per size and log one CSV row each.
///
/// `Fail` and `Timeout` verdicts keep the sweep going; only a missing
/// verifier binary aborts it. Rows already appended survive the abort.
#[instrument(skip_all, fields(source = %options.source.display(), sizes = options.sizes.len()))]
pub fn run_sweep(options: &SweepOptions) -> Result<()> {
    if !options.source.exists() {
        bail!("source file {} does not exist", options.source.display());
    }
    if options.sizes.is_empty() {
        bail!("at least one size is required");
    }

    let config = load_config(&options.config).context("load config")?;
    let mut log = SweepLog::create(&options.out).context("create sweep log")?;

    info!(sizes = ?options.sizes, define_name = %options.define_name, "starting sweep");
    let mut passed = 0u32;
    for &size in &options.sizes {
        let mut verifier_config = config.verifier.clone();
        verifier_config
            .defines
            .push(format!("{}={}", options.define_name, size));
        let verifier = BmcVerifier::new(&verifier_config);

        let verdict = verifier
            .verify(&options.source)
            .with_context(|| format!("verify size {size}"))?;
        let result = match verdict.outcome {
            Outcome::Success => SweepResult::Pass,
            Outcome::Failure => SweepResult::Fail,
            Outcome::Timeout => SweepResult::Timeout,
            Outcome::ToolNotFound => bail!(
                "verifier binary '{}' not found on the execution path",
                verifier_config.binary
            ),
        };
        if result == SweepResult::Pass {
            passed += 1;
        }

        println!(
            "size {}: {} in {:.2}s",
            size,
            result,
            verdict.elapsed.as_secs_f64()
        );
        debug!(size, result = %result, "size verified");
        log.append(&SweepRecord {
            size,
            duration: verdict.elapsed,
            result,
        })?;
    }
    log.close()?;

    println!(
        "sweep: {}/{} sizes passed, results {}",
        passed,
        options.sizes.len(),
        options.out.display()
    );
    Ok(())
}
