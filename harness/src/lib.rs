//! Iterative program-verification harness around an external bounded model
//! checker.
//!
//! This crate implements a generate/verify/refine loop: a generator produces
//! candidate C programs, an external verifier (ESBMC by default) checks each
//! one, and failed verdicts are fed back into the next generation request
//! until a candidate verifies or the iteration budget runs out. The
//! architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (verdict classification,
//!   counterexample extraction). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (process execution, candidate and
//!   metrics files, configuration). Isolated to enable scripted backends in
//!   tests.
//!
//! Orchestration modules ([`iteration`], [`looping`]) coordinate core logic
//! with I/O to implement CLI commands.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod iteration;
pub mod logging;
pub mod looping;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
