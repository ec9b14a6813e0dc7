//! Scalability sweep over a single kernel source.
//!
//! Verifies one C file at a series of preprocessor-defined problem sizes
//! and records `Size,Time(s),Result` rows, one per size. Timeouts at large
//! sizes are expected output, not errors.

mod results;
mod run;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use harness::io::config::DEFAULT_CONFIG_FILE;
use harness::logging;

use crate::run::{SweepOptions, run_sweep};

#[derive(Parser)]
#[command(
    name = "sweep",
    version,
    about = "Verify one kernel source across a range of problem sizes"
)]
struct Cli {
    /// C source file to verify at each size.
    #[arg(long)]
    source: PathBuf,

    /// Problem sizes to verify, in order.
    #[arg(long, value_delimiter = ',', default_values_t = [2, 3, 4, 5, 6])]
    sizes: Vec<u32>,

    /// Preprocessor macro that receives the size.
    #[arg(long, default_value = "DIM_LIMIT")]
    define_name: String,

    /// Output CSV path.
    #[arg(long, default_value = "results/scaling.csv")]
    out: PathBuf,

    /// Path to the harness config file.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
}

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();
    run_sweep(&SweepOptions {
        source: cli.source,
        sizes: cli.sizes,
        define_name: cli.define_name,
        out: cli.out,
        config: cli.config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_defaults() {
        let cli = Cli::parse_from(["sweep", "--source", "kernel.c"]);
        assert_eq!(cli.source, PathBuf::from("kernel.c"));
        assert_eq!(cli.sizes, vec![2, 3, 4, 5, 6]);
        assert_eq!(cli.define_name, "DIM_LIMIT");
        assert_eq!(cli.out, PathBuf::from("results/scaling.csv"));
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_FILE));
    }

    #[test]
    fn parse_comma_separated_sizes() {
        let cli = Cli::parse_from(["sweep", "--source", "kernel.c", "--sizes", "2,4,8"]);
        assert_eq!(cli.sizes, vec![2, 4, 8]);
    }

    #[test]
    fn parse_repeated_sizes_flag() {
        let cli = Cli::parse_from([
            "sweep", "--source", "kernel.c", "--sizes", "2", "--sizes", "3",
        ]);
        assert_eq!(cli.sizes, vec![2, 3]);
    }

    #[test]
    fn parse_define_name_override() {
        let cli = Cli::parse_from([
            "sweep",
            "--source",
            "kernel.c",
            "--define-name",
            "MAX_N",
            "--out",
            "bench.csv",
        ]);
        assert_eq!(cli.define_name, "MAX_N");
        assert_eq!(cli.out, PathBuf::from("bench.csv"));
    }
}
