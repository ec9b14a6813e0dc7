//! Durable per-iteration metrics for the verification loop.
//!
//! One CSV row per completed iteration. Every append is flushed and synced
//! before the loop moves on, so an interrupted run keeps all rows written so
//! far. The metrics file is the run's only durable record.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::types::IterationRecord;

/// Column header written as the first line of every metrics file.
pub const METRICS_HEADER: &str = "Iteration,Outcome,Duration(s),CodeSize(bytes)";

/// Open CSV sink for iteration records.
///
/// Creating a sink truncates any previous file at the same path: each run
/// owns its metrics file completely.
pub struct MetricsSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl MetricsSink {
    /// Create the metrics file (and missing parent directories) and write
    /// the header line.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("create metrics dir {}", parent.display()))?;
        }
        let file =
            File::create(path).with_context(|| format!("create metrics file {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{METRICS_HEADER}")
            .with_context(|| format!("write metrics header {}", path.display()))?;
        writer
            .flush()
            .with_context(|| format!("flush metrics header {}", path.display()))?;
        debug!(path = %path.display(), "metrics sink created");
        Ok(Self {
            path: path.to_path_buf(),
            writer,
        })
    }

    /// Append one record, then flush and sync so the row survives an abrupt
    /// process exit.
    pub fn append(&mut self, record: &IterationRecord) -> Result<()> {
        writeln!(self.writer, "{}", render_row(record))
            .with_context(|| format!("append metrics row {}", self.path.display()))?;
        self.writer
            .flush()
            .with_context(|| format!("flush metrics {}", self.path.display()))?;
        self.writer
            .get_ref()
            .sync_data()
            .with_context(|| format!("sync metrics {}", self.path.display()))?;
        debug!(index = record.index, outcome = %record.outcome, "metrics row appended");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush remaining state and close the file.
    pub fn close(mut self) -> Result<()> {
        self.writer
            .flush()
            .with_context(|| format!("flush metrics {}", self.path.display()))?;
        self.writer
            .get_ref()
            .sync_data()
            .with_context(|| format!("sync metrics {}", self.path.display()))?;
        Ok(())
    }
}

/// Render one CSV row. Durations always carry four decimal places so rows
/// stay aligned and diffable across runs.
pub fn render_row(record: &IterationRecord) -> String {
    format!(
        "{},{},{:.4},{}",
        record.index,
        record.outcome,
        record.duration.as_secs_f64(),
        record.candidate_bytes
    )
}
