//! Generator abstraction for candidate programs.
//!
//! The [`Generator`] trait decouples loop orchestration from the text source.
//! The built-in backend replays canned candidates so the whole loop can be
//! exercised end to end without a live model behind it. Tests use scripted
//! generators from the test support module.

use std::fmt;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use rand::Rng;
use tracing::debug;

use crate::io::config::GeneratorConfig;

const UNCHECKED_COPY: &str = include_str!("candidates/unchecked_copy.c");
const BOUNDED_COPY: &str = include_str!("candidates/bounded_copy.c");

/// Parameters for one generation call.
#[derive(Debug, Clone)]
pub struct GenRequest {
    /// Zero-based loop iteration this candidate is generated for.
    pub iteration: u32,
    /// Fully rendered prompt text.
    pub prompt: String,
    /// Verifier feedback from the previous iteration, if any.
    pub feedback: Option<String>,
}

/// Abstraction over candidate text backends.
pub trait Generator {
    /// Produce one complete candidate program for the request.
    fn generate(&self, request: &GenRequest) -> Result<String>;
}

/// Typed failure of the generation backend.
///
/// Fatal for the run: the loop aborts without recording the iteration.
#[derive(Debug)]
pub struct GenerationError {
    pub iteration: u32,
    pub message: String,
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "candidate generation failed at iteration {}: {}",
            self.iteration, self.message
        )
    }
}

impl std::error::Error for GenerationError {}

/// Generator that replays a fixed sequence of canned candidates.
///
/// Iterations past the end of the sequence repeat the final entry, behaving
/// like a backend that has converged on its best answer. An optional latency
/// range simulates remote backend timing.
pub struct CannedGenerator {
    responses: Vec<String>,
    latency_ms: (u64, u64),
}

impl CannedGenerator {
    /// Built-in fix sequence: a buffer overflow, then its bounded repair.
    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self {
            responses: vec![UNCHECKED_COPY.to_string(), BOUNDED_COPY.to_string()],
            latency_ms: (config.latency_min_ms, config.latency_max_ms),
        }
    }

    /// Replay the given responses without simulated latency.
    pub fn fixed(responses: Vec<String>) -> Self {
        Self {
            responses,
            latency_ms: (0, 0),
        }
    }

    fn simulate_latency(&self) {
        let (min, max) = self.latency_ms;
        if max == 0 {
            return;
        }
        let wait_ms = rand::thread_rng().gen_range(min..=max);
        debug!(wait_ms, "simulating backend latency");
        thread::sleep(Duration::from_millis(wait_ms));
    }
}

impl Generator for CannedGenerator {
    fn generate(&self, request: &GenRequest) -> Result<String> {
        if self.responses.is_empty() {
            return Err(anyhow::Error::new(GenerationError {
                iteration: request.iteration,
                message: "no canned responses configured".to_string(),
            }));
        }
        self.simulate_latency();
        let index = (request.iteration as usize).min(self.responses.len() - 1);
        debug!(
            iteration = request.iteration,
            index, "replaying canned candidate"
        );
        Ok(self.responses[index].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(iteration: u32) -> GenRequest {
        GenRequest {
            iteration,
            prompt: "prompt".to_string(),
            feedback: None,
        }
    }

    #[test]
    fn canned_responses_index_by_iteration() {
        let generator =
            CannedGenerator::fixed(vec!["first".to_string(), "second".to_string()]);
        assert_eq!(generator.generate(&request(0)).expect("gen"), "first");
        assert_eq!(generator.generate(&request(1)).expect("gen"), "second");
    }

    #[test]
    fn iterations_past_the_end_repeat_the_last_response() {
        let generator =
            CannedGenerator::fixed(vec!["first".to_string(), "second".to_string()]);
        assert_eq!(generator.generate(&request(2)).expect("gen"), "second");
        assert_eq!(generator.generate(&request(9)).expect("gen"), "second");
    }

    #[test]
    fn empty_response_set_is_a_generation_error() {
        let generator = CannedGenerator::fixed(Vec::new());
        let err = generator.generate(&request(0)).unwrap_err();
        let gen_err = err
            .downcast_ref::<GenerationError>()
            .expect("typed generation error");
        assert_eq!(gen_err.iteration, 0);
    }

    #[test]
    fn builtin_sequence_has_bug_then_fix() {
        let config = GeneratorConfig {
            latency_min_ms: 0,
            latency_max_ms: 0,
        };
        let generator = CannedGenerator::from_config(&config);
        let first = generator.generate(&request(0)).expect("gen");
        let second = generator.generate(&request(1)).expect("gen");
        assert!(first.contains("strcpy"));
        assert!(second.contains("strncpy"));
    }
}
