//! Shared deterministic types for harness core logic.
//!
//! These types define stable contracts between core components. They should not
//! depend on external state or I/O and must remain deterministic across runs.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Classified result of one verifier invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The verifier ran to completion and emitted its success marker.
    Success,
    /// The verifier ran to completion without emitting the success marker.
    Failure,
    /// The verifier exceeded its wall-clock budget and was killed.
    Timeout,
    /// The verifier binary could not be spawned because it does not exist
    /// on the execution path.
    ToolNotFound,
}

impl Outcome {
    /// Canonical text used in metrics rows and status lines.
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Success => "Success",
            Outcome::Failure => "Failure",
            Outcome::Timeout => "Timeout",
            Outcome::ToolNotFound => "ToolNotFound",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of one verifier invocation, before the loop decides what to do
/// with it.
#[derive(Debug, Clone)]
pub struct Verdict {
    pub outcome: Outcome,
    /// Stdout captured from the tool, possibly truncated at the configured
    /// output limit. Unstructured text; never parsed beyond marker and
    /// counterexample scanning.
    pub raw_output: String,
    /// Wall-clock time for the invocation. Clamped to the configured timeout
    /// when the outcome is [`Outcome::Timeout`].
    pub elapsed: Duration,
}

/// One row of the metrics log.
///
/// `outcome` is never [`Outcome::ToolNotFound`]: a missing tool aborts the
/// run before any row for that iteration is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationRecord {
    /// Zero-based iteration index.
    pub index: u32,
    pub outcome: Outcome,
    pub duration: Duration,
    /// Size in bytes of the candidate source handed to the verifier.
    pub candidate_bytes: usize,
}

/// One generate/verify exchange retained in loop memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub prompt: String,
    pub response: String,
    pub outcome: Outcome,
    /// Feedback snippet extracted from the verifier output, carried into the
    /// next iteration's prompt. `None` when the verdict produced nothing
    /// worth feeding back.
    pub counterexample: Option<String>,
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// A candidate passed verification.
    VerifiedOk,
    /// The iteration budget ran out without a verified candidate.
    ExhaustedBudget,
    /// A fatal condition stopped the loop early (missing verifier binary or
    /// a generation backend failure).
    Aborted,
}

impl TerminationReason {
    pub fn as_str(self) -> &'static str {
        match self {
            TerminationReason::VerifiedOk => "verified_ok",
            TerminationReason::ExhaustedBudget => "exhausted_budget",
            TerminationReason::Aborted => "aborted",
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
