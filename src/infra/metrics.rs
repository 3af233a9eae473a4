// ============================================================
// Layer 6 — Scalar Log Writer
// ============================================================
// Records one scalar per step into a timestamped run folder:
//
//   logs/fit/20261014-093012/
//     scalars.csv   ← wall_time,tag,step,value
//     config.json   ← the run configuration
//
// Two series are written:
//   - "Training Loss"   keyed by global step across epochs
//   - "Evaluation Loss" keyed by batch index
//
// Example CSV output:
//   wall_time,tag,step,value
//   1791970212.412,Training Loss,0,5.978123
//   1791970213.087,Training Loss,1,5.871004
//
// Reference: Rust Book §9 (Error Handling)
//            Rust Book §12 (I/O and File Handling)

use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::domain::traits::ScalarSink;

/// One recorded scalar
#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarEvent {
    pub tag:   String,
    pub step:  usize,
    pub value: f64,
}

/// Build `root/<YYYYmmdd-HHMMSS>` from the local clock.
pub fn timestamped_dir(root: impl AsRef<Path>) -> PathBuf {
    root.as_ref()
        .join(chrono::Local::now().format("%Y%m%d-%H%M%S").to_string())
}

/// Writes scalar events as CSV rows inside a run directory.
pub struct ScalarWriter {
    dir: PathBuf,
    out: BufWriter<File>,
}

impl ScalarWriter {
    /// Create the run directory and the CSV file with its header.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create log directory '{}'", dir.display()))?;

        let path = dir.join("scalars.csv");
        let file = File::create(&path)
            .with_context(|| format!("Cannot create '{}'", path.display()))?;
        let mut out = BufWriter::new(file);
        writeln!(out, "wall_time,tag,step,value")?;

        tracing::info!("Writing scalar logs to '{}'", dir.display());
        Ok(Self { dir, out })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write a serialisable snapshot next to the scalars.
    pub fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        fs::write(&path, serde_json::to_string_pretty(value)?)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;
        Ok(())
    }

    /// Flush buffered rows to disk.
    pub fn close(mut self) -> Result<()> {
        self.out.flush().context("Cannot flush scalar log")
    }
}

impl ScalarSink for ScalarWriter {
    fn add_scalar(&mut self, tag: &str, value: f64, step: usize) -> Result<()> {
        let wall_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();
        writeln!(self.out, "{:.3},{},{},{:.6}", wall_time, tag, step, value)?;
        Ok(())
    }
}

/// Keeps every event in memory.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<ScalarEvent>,
}

#[cfg(test)]
impl RecordingSink {
    pub fn series(&self, tag: &str) -> Vec<ScalarEvent> {
        self.events.iter().filter(|e| e.tag == tag).cloned().collect()
    }
}

#[cfg(test)]
impl ScalarSink for RecordingSink {
    fn add_scalar(&mut self, tag: &str, value: f64, step: usize) -> Result<()> {
        self.events.push(ScalarEvent { tag: tag.to_string(), step, value });
        Ok(())
    }
}

/// `total / count`, or NaN when there was nothing to average.
pub fn mean_or_nan(total: f64, count: usize) -> f64 {
    if count > 0 { total / count as f64 } else { f64::NAN }
}

/// "M minutes S.SS seconds"
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    let minutes = (secs / 60.0).floor();
    format!("{} minutes {:.2} seconds", minutes as u64, secs - minutes * 60.0)
}
