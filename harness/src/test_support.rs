//! Test-only scripted backends and workspace fixtures.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tempfile::TempDir;

use crate::core::types::{Outcome, Verdict};
use crate::io::config::{GeneratorConfig, HarnessConfig};
use crate::io::generator::{GenRequest, Generator};
use crate::io::verifier::Verifier;

/// Temp directory with a config whose paths all live inside it.
pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Default config rooted in the workspace, with zero generator latency
    /// so tests run fast.
    pub fn config(&self) -> HarnessConfig {
        HarnessConfig {
            candidate_path: self.root().join("generated_code.c"),
            metrics_path: self.root().join("results").join("agent_stats.csv"),
            generator: GeneratorConfig {
                latency_min_ms: 0,
                latency_max_ms: 0,
            },
            ..HarnessConfig::default()
        }
    }
}

/// Build a verdict for scripted verifiers.
pub fn verdict(outcome: Outcome, millis: u64, raw_output: &str) -> Verdict {
    Verdict {
        outcome,
        raw_output: raw_output.to_string(),
        elapsed: Duration::from_millis(millis),
    }
}

/// One scripted generation step.
pub enum ScriptedGen {
    /// Return this candidate text.
    Respond(String),
    /// Fail with this backend message.
    Fail(String),
}

/// Generator that replays a script and records every request it receives.
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<ScriptedGen>>,
    requests: Mutex<Vec<GenRequest>>,
}

impl ScriptedGenerator {
    pub fn new(script: Vec<ScriptedGen>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every request seen so far, in order.
    pub fn requests(&self) -> Vec<GenRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    /// Error if scripted steps remain unconsumed.
    pub fn assert_drained(&self) -> Result<()> {
        let remaining = self.script.lock().expect("script lock").len();
        if remaining > 0 {
            return Err(anyhow!("{remaining} scripted generator steps left"));
        }
        Ok(())
    }
}

impl Generator for ScriptedGenerator {
    fn generate(&self, request: &GenRequest) -> Result<String> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());
        let next = self
            .script
            .lock()
            .expect("script lock")
            .pop_front()
            .expect("scripted generator ran out of steps");
        match next {
            ScriptedGen::Respond(text) => Ok(text),
            ScriptedGen::Fail(message) => Err(anyhow!(message)),
        }
    }
}

/// Verifier that replays scripted verdicts without spawning processes.
pub struct ScriptedVerifier {
    script: Mutex<VecDeque<Verdict>>,
}

impl ScriptedVerifier {
    pub fn new(script: Vec<Verdict>) -> Self {
        Self {
            script: Mutex::new(script.into()),
        }
    }

    /// Error if scripted verdicts remain unconsumed.
    pub fn assert_drained(&self) -> Result<()> {
        let remaining = self.script.lock().expect("script lock").len();
        if remaining > 0 {
            return Err(anyhow!("{remaining} scripted verdicts left"));
        }
        Ok(())
    }
}

impl Verifier for ScriptedVerifier {
    fn verify(&self, _candidate: &Path) -> Result<Verdict> {
        Ok(self
            .script
            .lock()
            .expect("script lock")
            .pop_front()
            .expect("scripted verifier ran out of verdicts"))
    }
}
