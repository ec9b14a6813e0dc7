//! Verifier abstraction over the external bounded model checker.
//!
//! The [`Verifier`] trait decouples loop orchestration from the actual tool
//! (ESBMC by default). Tests use scripted verifiers that return predetermined
//! verdicts without spawning processes.

use std::path::Path;
use std::process::Command;
use std::time::Instant;

use anyhow::{Result, anyhow};
use tracing::{debug, instrument, warn};

use crate::core::classifier::classify;
use crate::core::types::{Outcome, Verdict};
use crate::io::config::VerifierConfig;
use crate::io::process::run_command_with_timeout;

/// Abstraction over verification backends.
pub trait Verifier {
    /// Verify one candidate source file and classify the result.
    ///
    /// Returns `Err` only for harness-level failures (filesystem, process
    /// plumbing). Tool-level conditions, including a missing binary, are
    /// reported through [`Verdict::outcome`].
    fn verify(&self, candidate: &Path) -> Result<Verdict>;
}

/// Verifier that spawns the configured bounded model checker binary.
pub struct BmcVerifier {
    config: VerifierConfig,
}

impl BmcVerifier {
    pub fn new(config: &VerifierConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

impl Verifier for BmcVerifier {
    #[instrument(skip_all, fields(candidate = %candidate.display()))]
    fn verify(&self, candidate: &Path) -> Result<Verdict> {
        if !candidate.exists() {
            return Err(anyhow!("missing candidate {}", candidate.display()));
        }

        let mut cmd = Command::new(&self.config.binary);
        cmd.args(render_args(&self.config, candidate));

        let started = Instant::now();
        let output = match run_command_with_timeout(
            cmd,
            self.config.timeout(),
            self.config.output_limit_bytes,
        ) {
            Ok(output) => output,
            Err(err) => {
                if spawn_failed_missing_binary(&err) {
                    warn!(binary = %self.config.binary, "verifier binary not found");
                    return Ok(Verdict {
                        outcome: Outcome::ToolNotFound,
                        raw_output: String::new(),
                        elapsed: started.elapsed(),
                    });
                }
                return Err(err);
            }
        };

        // Timed-out invocations are billed exactly the budget; the kill adds
        // scheduling noise we do not want in the metrics.
        let elapsed = if output.timed_out {
            self.config.timeout()
        } else {
            started.elapsed()
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.stderr.is_empty() {
            debug!(stderr_bytes = output.stderr.len(), "verifier wrote to stderr");
        }

        let outcome = classify(output.timed_out, &stdout);
        debug!(%outcome, elapsed_secs = elapsed.as_secs_f64(), "verifier finished");
        Ok(Verdict {
            outcome,
            raw_output: stdout,
            elapsed,
        })
    }
}

/// Render the deterministic argument list for one invocation.
///
/// The candidate file always comes first; flags follow in a fixed order so
/// that logs and tests are stable across runs.
pub fn render_args(config: &VerifierConfig, candidate: &Path) -> Vec<String> {
    let mut args = vec![candidate.display().to_string()];
    if config.overflow_check {
        args.push("--overflow-check".to_string());
    }
    if config.memory_leak_check {
        args.push("--memory-leak-check".to_string());
    }
    if !config.pointer_check {
        args.push("--no-pointer-check".to_string());
    }
    if config.floatbv {
        args.push("--floatbv".to_string());
    }
    if config.multi_property {
        args.push("--multi-property".to_string());
    }
    if let Some(bound) = config.unwind {
        args.push("--unwind".to_string());
        args.push(bound.to_string());
    }
    if config.no_unwinding_assertions {
        args.push("--no-unwinding-assertions".to_string());
    }
    if config.smtlib {
        args.push("--smtlib".to_string());
    }
    for define in &config.defines {
        args.push(format!("-D{define}"));
    }
    args
}

fn spawn_failed_missing_binary(err: &anyhow::Error) -> bool {
    err.root_cause()
        .downcast_ref::<std::io::Error>()
        .is_some_and(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;

    fn defaults() -> VerifierConfig {
        VerifierConfig::default()
    }

    #[test]
    fn render_args_with_defaults() {
        let args = render_args(&defaults(), Path::new("generated_code.c"));
        assert_eq!(
            args,
            vec![
                "generated_code.c",
                "--overflow-check",
                "--memory-leak-check",
                "--no-pointer-check",
                "--smtlib",
            ]
        );
    }

    #[test]
    fn render_args_with_unwind_and_defines() {
        let mut config = defaults();
        config.overflow_check = false;
        config.memory_leak_check = false;
        config.pointer_check = true;
        config.smtlib = false;
        config.floatbv = true;
        config.unwind = Some(11);
        config.no_unwinding_assertions = true;
        config.defines = vec!["DIM_LIMIT=4".to_string()];
        let args = render_args(&config, Path::new("chaos.c"));
        assert_eq!(
            args,
            vec![
                "chaos.c",
                "--floatbv",
                "--unwind",
                "11",
                "--no-unwinding-assertions",
                "-DDIM_LIMIT=4",
            ]
        );
    }

    #[test]
    fn missing_binary_classifies_as_tool_not_found() {
        let temp = tempfile::tempdir().expect("tempdir");
        let candidate = temp.path().join("candidate.c");
        fs::write(&candidate, "int main(void) { return 0; }\n").expect("write candidate");

        let mut config = defaults();
        config.binary = "definitely-not-a-real-verifier-binary".to_string();
        let verdict = BmcVerifier::new(&config)
            .verify(&candidate)
            .expect("verify");
        assert_eq!(verdict.outcome, Outcome::ToolNotFound);
        assert!(verdict.raw_output.is_empty());
    }

    #[test]
    fn missing_candidate_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = defaults();
        let err = BmcVerifier::new(&config)
            .verify(&temp.path().join("nope.c"))
            .unwrap_err();
        assert!(err.to_string().contains("missing candidate"));
    }

    #[cfg(unix)]
    fn write_stub(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write stub");
        let mut perms = fs::metadata(&path).expect("stat stub").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).expect("chmod stub");
        path
    }

    #[cfg(unix)]
    #[test]
    fn marker_output_classifies_as_success() {
        let temp = tempfile::tempdir().expect("tempdir");
        let candidate = temp.path().join("candidate.c");
        fs::write(&candidate, "int main(void) { return 0; }\n").expect("write candidate");
        let stub = write_stub(temp.path(), "fake-bmc", "echo VERIFICATION SUCCESSFUL");

        let mut config = defaults();
        config.binary = stub.display().to_string();
        let verdict = BmcVerifier::new(&config)
            .verify(&candidate)
            .expect("verify");
        assert_eq!(verdict.outcome, Outcome::Success);
        assert!(verdict.raw_output.contains("VERIFICATION SUCCESSFUL"));
    }

    #[cfg(unix)]
    #[test]
    fn non_marker_output_classifies_as_failure() {
        let temp = tempfile::tempdir().expect("tempdir");
        let candidate = temp.path().join("candidate.c");
        fs::write(&candidate, "int main(void) { return 0; }\n").expect("write candidate");
        let stub = write_stub(temp.path(), "fake-bmc", "echo VERIFICATION FAILED; exit 1");

        let mut config = defaults();
        config.binary = stub.display().to_string();
        let verdict = BmcVerifier::new(&config)
            .verify(&candidate)
            .expect("verify");
        assert_eq!(verdict.outcome, Outcome::Failure);
    }

    #[cfg(unix)]
    #[test]
    fn slow_tool_classifies_as_timeout_with_clamped_elapsed() {
        let temp = tempfile::tempdir().expect("tempdir");
        let candidate = temp.path().join("candidate.c");
        fs::write(&candidate, "int main(void) { return 0; }\n").expect("write candidate");
        // exec replaces the shell so the timeout kill reaps the sleep too.
        let stub = write_stub(
            temp.path(),
            "fake-bmc",
            "echo VERIFICATION SUCCESSFUL; exec sleep 5",
        );

        let mut config = defaults();
        config.binary = stub.display().to_string();
        config.timeout_secs = 1;
        let verdict = BmcVerifier::new(&config)
            .verify(&candidate)
            .expect("verify");
        assert_eq!(verdict.outcome, Outcome::Timeout);
        assert_eq!(verdict.elapsed, Duration::from_secs(1));
    }
}
