//! Orchestration for a single generate, write, verify, record cycle.

use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, instrument};

use crate::core::feedback::feedback_for;
use crate::core::types::{IterationRecord, Outcome};
use crate::io::config::HarnessConfig;
use crate::io::generator::{GenRequest, GenerationError, Generator};
use crate::io::metrics::MetricsSink;
use crate::io::prompt::{PromptInputs, render_prompt};
use crate::io::verifier::Verifier;

/// Typed abort: the external verifier binary is missing.
///
/// Raised after the adapter classifies an invocation as
/// [`Outcome::ToolNotFound`]. No metrics row is written for the iteration;
/// rows from earlier iterations stay intact.
#[derive(Debug)]
pub struct ToolMissingError {
    pub binary: String,
}

impl fmt::Display for ToolMissingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "verifier binary '{}' not found on the execution path",
            self.binary
        )
    }
}

impl std::error::Error for ToolMissingError {}

/// Result of one completed iteration.
#[derive(Debug, Clone)]
pub struct IterationOutcome {
    /// Zero-based iteration index.
    pub index: u32,
    /// Prompt handed to the generator.
    pub prompt: String,
    /// Candidate text the generator produced.
    pub response: String,
    pub outcome: Outcome,
    pub elapsed: Duration,
    pub candidate_bytes: usize,
    /// Feedback prepared for the next iteration's prompt.
    pub feedback: Option<String>,
}

/// Execute one iteration of the verification loop.
///
/// Renders the prompt, generates a candidate, writes it to the configured
/// path, verifies it, and appends the metrics row. The row is durable before
/// this function returns.
#[instrument(skip_all, fields(index))]
pub fn run_iteration<G: Generator, V: Verifier>(
    config: &HarnessConfig,
    generator: &G,
    verifier: &V,
    sink: &mut MetricsSink,
    index: u32,
    feedback: Option<&str>,
) -> Result<IterationOutcome> {
    let prompt = render_prompt(&PromptInputs {
        task: &config.task,
        iteration: index,
        feedback,
    })?;
    let request = GenRequest {
        iteration: index,
        prompt: prompt.clone(),
        feedback: feedback.map(str::to_string),
    };

    let response = match generator.generate(&request) {
        Ok(response) => response,
        Err(err) => return Err(into_generation_error(index, err)),
    };
    if response.trim().is_empty() {
        return Err(anyhow::Error::new(GenerationError {
            iteration: index,
            message: "backend returned an empty candidate".to_string(),
        }));
    }

    write_candidate(&config.candidate_path, &response)?;
    debug!(
        path = %config.candidate_path.display(),
        bytes = response.len(),
        "candidate written"
    );

    let verdict = verifier.verify(&config.candidate_path)?;
    if verdict.outcome == Outcome::ToolNotFound {
        return Err(anyhow::Error::new(ToolMissingError {
            binary: config.verifier.binary.clone(),
        }));
    }

    let record = IterationRecord {
        index,
        outcome: verdict.outcome,
        duration: verdict.elapsed,
        candidate_bytes: response.len(),
    };
    sink.append(&record)?;

    info!(
        index,
        outcome = %verdict.outcome,
        elapsed_secs = verdict.elapsed.as_secs_f64(),
        "iteration finished"
    );
    let next_feedback = feedback_for(verdict.outcome, &verdict.raw_output);
    Ok(IterationOutcome {
        index,
        prompt,
        response,
        outcome: verdict.outcome,
        elapsed: verdict.elapsed,
        candidate_bytes: record.candidate_bytes,
        feedback: next_feedback,
    })
}

/// Preserve typed generation errors; wrap anything else the backend raised.
fn into_generation_error(index: u32, err: anyhow::Error) -> anyhow::Error {
    if err.downcast_ref::<GenerationError>().is_some() {
        return err;
    }
    anyhow::Error::new(GenerationError {
        iteration: index,
        message: format!("{err:#}"),
    })
}

fn write_candidate(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create candidate dir {}", parent.display()))?;
    }
    fs::write(path, text).with_context(|| format!("write candidate {}", path.display()))
}
