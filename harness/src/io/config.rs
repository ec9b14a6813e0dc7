//! Harness configuration stored in `harness.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "harness.toml";

/// Harness configuration (TOML).
///
/// This file is intended to be edited by humans and must remain stable and
/// automatable. Missing fields default to sensible values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HarnessConfig {
    /// Maximum number of loop iterations. Zero is allowed and exhausts the
    /// budget immediately, leaving a header-only metrics file.
    pub max_iterations: u32,

    /// Task description rendered into every generation prompt.
    pub task: String,

    /// Where each candidate program is written before verification.
    pub candidate_path: PathBuf,

    /// Where the per-iteration metrics CSV is written.
    pub metrics_path: PathBuf,

    pub verifier: VerifierConfig,
    pub generator: GeneratorConfig,
}

/// External verifier invocation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct VerifierConfig {
    /// Verifier binary, resolved via `PATH` unless given as a path.
    pub binary: String,

    /// Wall-clock budget per invocation in seconds.
    pub timeout_secs: u64,

    /// Truncate captured stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,

    pub overflow_check: bool,
    pub memory_leak_check: bool,
    /// When false the verifier is passed `--no-pointer-check`.
    pub pointer_check: bool,
    pub floatbv: bool,
    pub multi_property: bool,
    pub smtlib: bool,

    /// Loop unwinding bound (`--unwind N`) when set.
    pub unwind: Option<u32>,
    pub no_unwinding_assertions: bool,

    /// Preprocessor definitions passed as `-DNAME=VALUE`, entries given as
    /// `NAME=VALUE` (or bare `NAME`).
    pub defines: Vec<String>,
}

/// Candidate generation backend settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Lower bound of the simulated backend latency.
    pub latency_min_ms: u64,
    /// Upper bound of the simulated backend latency. Zero disables the
    /// latency simulation entirely.
    pub latency_max_ms: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            task: "Fix the code so it passes verification.".to_string(),
            candidate_path: PathBuf::from("generated_code.c"),
            metrics_path: PathBuf::from("results/agent_stats.csv"),
            verifier: VerifierConfig::default(),
            generator: GeneratorConfig::default(),
        }
    }
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            binary: "esbmc".to_string(),
            timeout_secs: 120,
            output_limit_bytes: 100_000,
            overflow_check: true,
            memory_leak_check: true,
            pointer_check: false,
            floatbv: false,
            multi_property: false,
            smtlib: true,
            unwind: None,
            no_unwinding_assertions: false,
            defines: Vec::new(),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            latency_min_ms: 500,
            latency_max_ms: 2000,
        }
    }
}

impl HarnessConfig {
    pub fn validate(&self) -> Result<()> {
        if self.task.trim().is_empty() {
            return Err(anyhow!("task must not be empty"));
        }
        if self.candidate_path.as_os_str().is_empty() {
            return Err(anyhow!("candidate_path must not be empty"));
        }
        if self.metrics_path.as_os_str().is_empty() {
            return Err(anyhow!("metrics_path must not be empty"));
        }
        self.verifier.validate()?;
        self.generator.validate()?;
        Ok(())
    }
}

impl VerifierConfig {
    pub fn validate(&self) -> Result<()> {
        if self.binary.trim().is_empty() {
            return Err(anyhow!("verifier.binary must not be empty"));
        }
        if self.timeout_secs == 0 {
            return Err(anyhow!("verifier.timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("verifier.output_limit_bytes must be > 0"));
        }
        if self.defines.iter().any(|d| d.trim().is_empty()) {
            return Err(anyhow!("verifier.defines entries must not be empty"));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.latency_min_ms > self.latency_max_ms {
            return Err(anyhow!(
                "generator.latency_min_ms must be <= generator.latency_max_ms"
            ));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `HarnessConfig::default()`.
pub fn load_config(path: &Path) -> Result<HarnessConfig> {
    if !path.exists() {
        let cfg = HarnessConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: HarnessConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &HarnessConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
