//! Stable exit codes for harness CLI commands.

/// Command succeeded; for `run` and `check`, a candidate verified.
pub const OK: i32 = 0;
/// Command failed due to invalid config, unwritable paths, or other errors.
pub const INVALID: i32 = 1;
/// `harness run` exhausted its budget, or `harness check` did not verify.
pub const UNVERIFIED: i32 = 2;
/// The run aborted: verifier binary missing or generation backend failure.
pub const ABORTED: i32 = 3;
