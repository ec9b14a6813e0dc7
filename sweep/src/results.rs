//! Scaling sweep CSV log.
//!
//! Same shape as the harness metrics sink: fixed header on create, one row
//! per verified size, flushed after every append so an interrupted sweep
//! keeps the completed rows.

use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

/// Fixed CSV header for sweep output.
pub const SWEEP_HEADER: &str = "Size,Time(s),Result";

/// Per-size verdict as recorded in the CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepResult {
    Pass,
    Fail,
    Timeout,
}

impl SweepResult {
    pub fn as_str(self) -> &'static str {
        match self {
            SweepResult::Pass => "Pass",
            SweepResult::Fail => "Fail",
            SweepResult::Timeout => "Timeout",
        }
    }
}

impl fmt::Display for SweepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the sweep CSV.
#[derive(Debug, Clone)]
pub struct SweepRecord {
    pub size: u32,
    pub duration: Duration,
    pub result: SweepResult,
}

/// Append-only CSV writer for sweep results.
pub struct SweepLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl SweepLog {
    /// Create (truncating) the log file and write the header row.
    ///
    /// Missing parent directories are created.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{SWEEP_HEADER}").context("write sweep header")?;
        writer.flush().context("flush sweep header")?;
        Ok(Self {
            path: path.to_path_buf(),
            writer,
        })
    }

    /// Append one row and flush it to the file.
    pub fn append(&mut self, record: &SweepRecord) -> Result<()> {
        writeln!(self.writer, "{}", render_row(record))
            .with_context(|| format!("append to {}", self.path.display()))?;
        self.writer
            .flush()
            .with_context(|| format!("flush {}", self.path.display()))?;
        Ok(())
    }

    pub fn close(mut self) -> Result<()> {
        self.writer
            .flush()
            .with_context(|| format!("flush {}", self.path.display()))?;
        Ok(())
    }
}

fn render_row(record: &SweepRecord) -> String {
    format!(
        "{},{:.4},{}",
        record.size,
        record.duration.as_secs_f64(),
        record.result
    )
}
