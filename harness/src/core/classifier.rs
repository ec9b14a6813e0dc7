//! Deterministic classification of verifier output.

use crate::core::types::Outcome;

/// Marker the verifier prints on a fully successful run.
///
/// Matching is an exact, case-sensitive substring scan. Downstream consumers
/// key on the verdicts this string produces, so it must not change without a
/// coordinated migration of recorded metrics.
pub const SUCCESS_MARKER: &str = "VERIFICATION SUCCESSFUL";

/// Classify one invocation's captured stdout.
///
/// - `Timeout` if the invocation was killed at the deadline, regardless of
///   any output produced before the kill.
/// - `Success` if the success marker appears anywhere in `stdout`.
/// - `Failure` otherwise. There is no "unknown" outcome: truncated, garbled,
///   or empty output classifies as `Failure`.
pub fn classify(timed_out: bool, stdout: &str) -> Outcome {
    if timed_out {
        Outcome::Timeout
    } else if stdout.contains(SUCCESS_MARKER) {
        Outcome::Success
    } else {
        Outcome::Failure
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_marker_anywhere_is_success() {
        let stdout = "Parsing file.c\nSymex completed\nVERIFICATION SUCCESSFUL\n";
        assert_eq!(classify(false, stdout), Outcome::Success);
    }

    #[test]
    fn classify_missing_marker_is_failure() {
        let stdout = "Counterexample found\nVERIFICATION FAILED\n";
        assert_eq!(classify(false, stdout), Outcome::Failure);
    }

    #[test]
    fn classify_empty_output_is_failure() {
        assert_eq!(classify(false, ""), Outcome::Failure);
    }

    #[test]
    fn classify_is_case_sensitive() {
        assert_eq!(classify(false, "verification successful"), Outcome::Failure);
    }

    #[test]
    fn classify_timeout_wins_over_marker() {
        assert_eq!(classify(true, "VERIFICATION SUCCESSFUL"), Outcome::Timeout);
    }
}
