//! Counterexample extraction from raw verifier output.
//!
//! Failed verdicts are folded into the next prompt so the generator can react
//! to what the tool actually reported. The extraction is deterministic and
//! purely textual: the verifier output is never parsed beyond locating the
//! counterexample section.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::types::Outcome;

/// Trailing lines kept when the output has no counterexample section.
pub const DEFAULT_TAIL_LINES: usize = 20;

static COUNTEREXAMPLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\[Counterexample\]").unwrap());

/// Extract the snippet to feed back after a failed verification.
///
/// Prefers everything from the tool's `[Counterexample]` header onward, which
/// carries the violated property and the trace. Falls back to the last
/// `tail_lines` lines when no header is present (parse errors, crashes).
pub fn counterexample_snippet(raw_output: &str, tail_lines: usize) -> String {
    if let Some(found) = COUNTEREXAMPLE_RE.find(raw_output) {
        return raw_output[found.start()..].trim().to_string();
    }

    let lines: Vec<&str> = raw_output.lines().collect();
    let start = lines.len().saturating_sub(tail_lines);
    lines[start..].join("\n").trim().to_string()
}

/// Build the feedback carried into the next iteration, if any.
///
/// Only non-success verdicts produce feedback, and only when there is
/// something concrete to say.
pub fn feedback_for(outcome: Outcome, raw_output: &str) -> Option<String> {
    match outcome {
        Outcome::Failure => {
            let snippet = counterexample_snippet(raw_output, DEFAULT_TAIL_LINES);
            (!snippet.is_empty()).then_some(snippet)
        }
        Outcome::Timeout => {
            Some("verification did not complete within the time budget".to_string())
        }
        Outcome::Success | Outcome::ToolNotFound => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_starts_at_counterexample_header() {
        let out = "Parsing bad.c\nSymex completed\n[Counterexample]\n\nState 1:\n  field[10] overflow\nVERIFICATION FAILED\n";
        let snippet = counterexample_snippet(out, DEFAULT_TAIL_LINES);
        assert!(snippet.starts_with("[Counterexample]"));
        assert!(snippet.contains("field[10] overflow"));
        assert!(!snippet.contains("Parsing bad.c"));
    }

    #[test]
    fn snippet_falls_back_to_tail_lines() {
        let lines: Vec<String> = (0..30).map(|i| format!("line {i}")).collect();
        let out = lines.join("\n");
        let snippet = counterexample_snippet(&out, 20);
        assert!(snippet.starts_with("line 10"));
        assert!(snippet.ends_with("line 29"));
    }

    #[test]
    fn snippet_of_empty_output_is_empty() {
        assert_eq!(counterexample_snippet("", DEFAULT_TAIL_LINES), "");
    }

    #[test]
    fn failure_without_output_yields_no_feedback() {
        assert_eq!(feedback_for(Outcome::Failure, ""), None);
    }

    #[test]
    fn failure_with_output_yields_snippet() {
        let feedback =
            feedback_for(Outcome::Failure, "assertion line 4 violated\nVERIFICATION FAILED");
        assert_eq!(
            feedback.as_deref(),
            Some("assertion line 4 violated\nVERIFICATION FAILED")
        );
    }

    #[test]
    fn timeout_yields_fixed_note() {
        let feedback = feedback_for(Outcome::Timeout, "");
        assert!(feedback.is_some_and(|f| f.contains("time budget")));
    }

    #[test]
    fn success_yields_no_feedback() {
        assert_eq!(feedback_for(Outcome::Success, "VERIFICATION SUCCESSFUL"), None);
    }
}
