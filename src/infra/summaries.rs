// ============================================================
// Layer 6 — Summary Writer
// ============================================================
// Records named scalar metrics (losses, mostly) to a CSV file
// so learning curves can be plotted after a run.
//
// Each summary is registered once under a key and has a mode:
//
//   epoch — written at the end of train() every
//           epoch_summaries_interval epochs
//   step  — written at the end of train_step() every
//           step_summaries_interval mini-batches
//
// update() only stores the latest value. write(mode, step)
// appends one row per summary of that mode and resets their
// values to 0.0, so a value that is not updated again before
// the next write shows up as 0.
//
// Output file: <summaries_root>/<run>/summaries.csv
//
// Example CSV output:
//   mode,step,tag,value
//   epoch,0,"(vae) epoch training loss",3.512044
//   epoch,0,"(vae) epoch validation loss",3.498113
//
// Run directories are allocated the same way as checkpoint
// directories but independently of them.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    collections::BTreeMap,
    fmt,
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    str::FromStr,
};

use crate::infra::checkpoint::create_run_dir;

/// File name of the summary CSV inside a run directory
pub const SUMMARY_FILE: &str = "summaries.csv";

// ─── SummaryMode ──────────────────────────────────────────────────────────────
/// When a summary is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryMode {
    Epoch,
    Step,
}

impl SummaryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryMode::Epoch => "epoch",
            SummaryMode::Step  => "step",
        }
    }
}

impl fmt::Display for SummaryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummaryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "epoch" => Ok(SummaryMode::Epoch),
            "step"  => Ok(SummaryMode::Step),
            other   => Err(format!("invalid summary mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
struct SummaryEntry {
    tag:   String,
    value: f64,
    mode:  SummaryMode,
}

// ─── SummaryWriter ────────────────────────────────────────────────────────────
pub struct SummaryWriter {
    dir:     PathBuf,
    run:     usize,
    out:     BufWriter<File>,
    entries: BTreeMap<String, SummaryEntry>,
}

impl SummaryWriter {
    /// Allocate a run directory under `root` and open its CSV.
    pub fn create(root: &Path) -> Result<Self> {
        let (run, dir) = create_run_dir(root)?;
        let path = dir.join(SUMMARY_FILE);
        let file = File::create(&path)
            .with_context(|| format!("Cannot create summary file '{}'", path.display()))?;

        let mut out = BufWriter::new(file);
        writeln!(out, "mode,step,tag,value")?;
        tracing::debug!("Created summary CSV: '{}'", path.display());

        Ok(Self { dir, run, out, entries: BTreeMap::new() })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn run(&self) -> usize {
        self.run
    }

    /// Register a summary. The key defaults to the tag.
    /// Registering an existing key replaces it.
    pub fn add(&mut self, tag: &str, key: Option<&str>, mode: SummaryMode) {
        let key = key.unwrap_or(tag).to_string();
        self.entries.insert(key, SummaryEntry { tag: tag.to_string(), value: 0.0, mode });
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Current value of a registered summary
    pub fn value(&self, key: &str) -> Option<f64> {
        self.entries.get(key).map(|e| e.value)
    }

    /// Store the latest value for `key`.
    /// Returns false when no summary has that key.
    pub fn update(&mut self, key: &str, value: f64) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.value = value;
                true
            }
            None => false,
        }
    }

    /// Append every summary of `mode` tagged with `step`, then
    /// reset their values. Returns the number of rows written.
    pub fn write(&mut self, mode: SummaryMode, step: u64) -> Result<usize> {
        let mut rows = 0;
        for entry in self.entries.values_mut().filter(|e| e.mode == mode) {
            writeln!(self.out, "{},{},{},{}", mode, step, quote(&entry.tag), entry.value)?;
            entry.value = 0.0;
            rows += 1;
        }
        self.out.flush()?;
        Ok(rows)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush().context("Failed to flush summary file")
    }
}

/// CSV-quote a field, doubling embedded quotes.
fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("epoch".parse::<SummaryMode>(), Ok(SummaryMode::Epoch));
        assert_eq!("step".parse::<SummaryMode>(),  Ok(SummaryMode::Step));
        assert!("batch".parse::<SummaryMode>().is_err());
    }

    #[test]
    fn test_write_only_matching_mode_and_reset() {
        let tmp = tempfile::tempdir().unwrap();
        let mut writer = SummaryWriter::create(tmp.path()).unwrap();
        writer.add("(m) epoch loss", Some("epoch_loss"), SummaryMode::Epoch);
        writer.add("(m) step loss", Some("step_loss"), SummaryMode::Step);

        assert!(writer.update("epoch_loss", 1.5));
        assert!(writer.update("step_loss", 2.5));
        assert!(!writer.update("unknown", 1.0));

        assert_eq!(writer.write(SummaryMode::Epoch, 3).unwrap(), 1);
        assert_eq!(writer.value("epoch_loss"), Some(0.0));
        assert_eq!(writer.value("step_loss"), Some(2.5));

        let text = fs::read_to_string(writer.dir().join(SUMMARY_FILE)).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["mode,step,tag,value", "epoch,3,\"(m) epoch loss\",1.5"]);
    }

    #[test]
    fn test_key_defaults_to_tag() {
        let tmp = tempfile::tempdir().unwrap();
        let mut writer = SummaryWriter::create(tmp.path()).unwrap();
        writer.add("accuracy", None, SummaryMode::Epoch);
        assert!(writer.contains("accuracy"));
    }

    #[test]
    fn test_runs_get_separate_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let a = SummaryWriter::create(tmp.path()).unwrap();
        let b = SummaryWriter::create(tmp.path()).unwrap();
        assert_eq!((a.run(), b.run()), (0, 1));
    }
}
