//! Multi-iteration driver for `harness run`.

use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, instrument, warn};

use crate::core::types::{Exchange, Outcome, TerminationReason};
use crate::io::config::HarnessConfig;
use crate::io::generator::{GenerationError, Generator};
use crate::io::metrics::MetricsSink;
use crate::io::verifier::Verifier;
use crate::iteration::{IterationOutcome, ToolMissingError, run_iteration};

/// Orchestrator working memory. Lives only for the duration of one run; the
/// metrics file is the run's only durable record.
#[derive(Debug, Default)]
pub struct RunState {
    /// Zero-based index of the iteration currently executing.
    pub current_iteration: u32,
    /// Every exchange so far, oldest first.
    pub history: Vec<Exchange>,
    pub terminated: bool,
    pub reason: Option<TerminationReason>,
}

impl RunState {
    fn terminate(&mut self, reason: TerminationReason) {
        self.terminated = true;
        self.reason = Some(reason);
    }

    fn last_counterexample(&self) -> Option<&str> {
        self.history
            .last()
            .and_then(|exchange| exchange.counterexample.as_deref())
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub reason: TerminationReason,
    /// Number of iterations that ran to a recorded verdict.
    pub iterations_run: u32,
    /// Index of the verified iteration, when the run verified.
    pub verified_at: Option<u32>,
    /// Verifier wall-clock summed over all iterations.
    pub total_verify_secs: f64,
    pub started_at: String,
    pub finished_at: String,
    pub metrics_path: String,
    /// Hex digest of the verified candidate, when the run verified.
    pub candidate_sha256: Option<String>,
    /// Human-readable cause, set only for aborted runs.
    pub abort_cause: Option<String>,
}

/// Run the generate/verify/refine loop until a candidate verifies, the
/// budget runs out, or a fatal condition stops it.
///
/// `on_iteration` observes every recorded iteration in order; product status
/// lines belong there, not in this function. Fatal loop conditions (missing
/// verifier binary, generation backend failure) terminate the run as
/// [`TerminationReason::Aborted`] and are reported in the summary rather
/// than as `Err`; `Err` is reserved for harness-level failures such as an
/// unwritable metrics path.
#[instrument(skip_all, fields(max_iterations = config.max_iterations))]
pub fn run_loop<G: Generator, V: Verifier, F: FnMut(&IterationOutcome)>(
    config: &HarnessConfig,
    generator: &G,
    verifier: &V,
    mut on_iteration: F,
) -> Result<RunSummary> {
    let started_at = Utc::now();
    let mut sink = MetricsSink::create(&config.metrics_path)?;
    let mut state = RunState::default();
    let mut total_verify = Duration::ZERO;
    let mut verified_at = None;
    let mut candidate_sha256 = None;
    let mut abort_cause = None;

    if config.max_iterations == 0 {
        warn!("max_iterations is 0, exhausting budget immediately");
        state.terminate(TerminationReason::ExhaustedBudget);
    }

    while !state.terminated {
        let index = state.current_iteration;
        let feedback = state.last_counterexample().map(str::to_string);
        match run_iteration(
            config,
            generator,
            verifier,
            &mut sink,
            index,
            feedback.as_deref(),
        ) {
            Ok(outcome) => {
                total_verify += outcome.elapsed;
                state.history.push(Exchange {
                    prompt: outcome.prompt.clone(),
                    response: outcome.response.clone(),
                    outcome: outcome.outcome,
                    counterexample: outcome.feedback.clone(),
                });
                on_iteration(&outcome);

                if outcome.outcome == Outcome::Success {
                    verified_at = Some(index);
                    candidate_sha256 = Some(sha256_hex(outcome.response.as_bytes()));
                    state.terminate(TerminationReason::VerifiedOk);
                } else if index + 1 >= config.max_iterations {
                    state.terminate(TerminationReason::ExhaustedBudget);
                } else {
                    state.current_iteration += 1;
                }
            }
            Err(err) => {
                if is_fatal_loop_condition(&err) {
                    warn!(cause = %err, "run aborted");
                    abort_cause = Some(format!("{err:#}"));
                    state.terminate(TerminationReason::Aborted);
                } else {
                    return Err(err);
                }
            }
        }
    }

    sink.close()?;
    let finished_at = Utc::now();
    let reason = state
        .reason
        .expect("terminated loop must carry a reason");
    let iterations_run = state.history.len() as u32;

    info!(%reason, iterations_run, "run finished");
    Ok(RunSummary {
        reason,
        iterations_run,
        verified_at,
        total_verify_secs: total_verify.as_secs_f64(),
        started_at: started_at.to_rfc3339(),
        finished_at: finished_at.to_rfc3339(),
        metrics_path: config.metrics_path.display().to_string(),
        candidate_sha256,
        abort_cause,
    })
}

/// Fatal loop conditions end the run as `Aborted`; anything else propagates.
fn is_fatal_loop_condition(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ToolMissingError>().is_some()
        || err.downcast_ref::<GenerationError>().is_some()
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        ScriptedGen, ScriptedGenerator, ScriptedVerifier, TestWorkspace, verdict,
    };
    use std::fs;

    const CANDIDATE: &str = "int main(void) { return 0; }\n";

    #[test]
    fn verified_run_stops_at_first_success() {
        let workspace = TestWorkspace::new().expect("workspace");
        let config = workspace.config();
        let generator = ScriptedGenerator::new(vec![ScriptedGen::Respond(CANDIDATE.to_string())]);
        let verifier = ScriptedVerifier::new(vec![verdict(
            Outcome::Success,
            250,
            "VERIFICATION SUCCESSFUL",
        )]);

        let mut seen = Vec::new();
        let summary = run_loop(&config, &generator, &verifier, |iteration| {
            seen.push(iteration.index);
        })
        .expect("run");

        assert_eq!(summary.reason, TerminationReason::VerifiedOk);
        assert_eq!(summary.iterations_run, 1);
        assert_eq!(summary.verified_at, Some(0));
        assert_eq!(summary.candidate_sha256.as_ref().map(String::len), Some(64));
        assert_eq!(summary.abort_cause, None);
        assert_eq!(seen, vec![0]);

        let contents = fs::read_to_string(&config.metrics_path).expect("read metrics");
        assert_eq!(contents.lines().count(), 2, "header plus one row");
    }

    #[test]
    fn zero_budget_exhausts_immediately() {
        let workspace = TestWorkspace::new().expect("workspace");
        let mut config = workspace.config();
        config.max_iterations = 0;
        let generator = ScriptedGenerator::new(Vec::new());
        let verifier = ScriptedVerifier::new(Vec::new());

        let summary = run_loop(&config, &generator, &verifier, |_| {}).expect("run");

        assert_eq!(summary.reason, TerminationReason::ExhaustedBudget);
        assert_eq!(summary.iterations_run, 0);
        assert_eq!(summary.verified_at, None);

        let contents = fs::read_to_string(&config.metrics_path).expect("read metrics");
        assert_eq!(contents.lines().count(), 1, "header only");
    }

    #[test]
    fn abort_reports_cause_in_summary() {
        let workspace = TestWorkspace::new().expect("workspace");
        let config = workspace.config();
        let generator =
            ScriptedGenerator::new(vec![ScriptedGen::Fail("backend down".to_string())]);
        let verifier = ScriptedVerifier::new(Vec::new());

        let summary = run_loop(&config, &generator, &verifier, |_| {}).expect("run");

        assert_eq!(summary.reason, TerminationReason::Aborted);
        assert_eq!(summary.iterations_run, 0);
        assert!(
            summary
                .abort_cause
                .is_some_and(|cause| cause.contains("backend down"))
        );
    }

    #[test]
    fn counterexample_flows_into_the_next_request() {
        let workspace = TestWorkspace::new().expect("workspace");
        let config = workspace.config();
        let generator = ScriptedGenerator::new(vec![
            ScriptedGen::Respond(CANDIDATE.to_string()),
            ScriptedGen::Respond(CANDIDATE.to_string()),
        ]);
        let verifier = ScriptedVerifier::new(vec![
            verdict(
                Outcome::Failure,
                100,
                "[Counterexample]\nState 1: overflow\nVERIFICATION FAILED",
            ),
            verdict(Outcome::Success, 100, "VERIFICATION SUCCESSFUL"),
        ]);

        let summary = run_loop(&config, &generator, &verifier, |_| {}).expect("run");
        assert_eq!(summary.reason, TerminationReason::VerifiedOk);
        assert_eq!(summary.verified_at, Some(1));

        let requests = generator.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].feedback, None);
        assert!(
            requests[1]
                .feedback
                .as_deref()
                .is_some_and(|f| f.starts_with("[Counterexample]"))
        );
    }

    #[test]
    fn summary_serializes_with_snake_case_reason() {
        let workspace = TestWorkspace::new().expect("workspace");
        let config = workspace.config();
        let generator = ScriptedGenerator::new(vec![ScriptedGen::Respond(CANDIDATE.to_string())]);
        let verifier = ScriptedVerifier::new(vec![verdict(
            Outcome::Success,
            10,
            "VERIFICATION SUCCESSFUL",
        )]);

        let summary = run_loop(&config, &generator, &verifier, |_| {}).expect("run");
        let json = serde_json::to_string(&summary).expect("serialize");
        assert!(json.contains("\"reason\":\"verified_ok\""));
        assert!(json.contains("\"iterations_run\":1"));
    }
}
