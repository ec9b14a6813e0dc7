//! I/O helpers for harness commands.

pub mod config;
pub mod generator;
pub mod metrics;
pub mod process;
pub mod prompt;
pub mod verifier;
