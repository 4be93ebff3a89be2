// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Every model instance that has a checkpoints_root gets its
// own numbered run directory, so two runs never overwrite
// each other's snapshots:
//
//   checkpoints/
//     0/                    ← first run
//     1/                    ← second run
//       model-10.mpk        ← parameters after 10 epochs
//       model-20.mpk
//       latest_epoch.json   ← epoch of the newest snapshot
//       config.json         ← config the model was built from
//
// Run index = max(numeric directory names) + 1, or 0 when
// there are none. Gaps are not filled: with runs 0 and 4 on
// disk the next run is 5.
//
// config.json is written on the first save only. It is what
// Model::from_checkpoint reads to rebuild the same network
// before loading a snapshot into it.
//
// Snapshots use burn's NamedMpkFileRecorder at full precision.
// At most `max_to_keep` snapshots are kept; the oldest one is
// deleted when a new save goes over the limit.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{
    collections::VecDeque,
    fs,
    path::{Path, PathBuf},
};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkFileRecorder},
};

use crate::domain::traits::Settings;

/// File name of the config snapshot inside a run directory
pub const CONFIG_FILE: &str = "config.json";

/// File name of the newest-snapshot pointer
pub const LATEST_FILE: &str = "latest_epoch.json";

/// Extension the recorder appends to snapshot paths
const SNAPSHOT_EXTENSION: &str = "mpk";

/// The recorder used for all snapshots
pub fn recorder() -> NamedMpkFileRecorder<FullPrecisionSettings> {
    NamedMpkFileRecorder::<FullPrecisionSettings>::new()
}

// ─── Run directories ──────────────────────────────────────────────────────────
/// Index the next run under `root` should use.
///
/// Entries whose names are not plain numbers are ignored.
pub fn next_run_index(root: &Path) -> Result<usize> {
    if !root.exists() {
        return Ok(0);
    }

    let mut max_seen: Option<usize> = None;
    for entry in fs::read_dir(root)
        .with_context(|| format!("Cannot list run directories in '{}'", root.display()))?
    {
        let entry = entry?;
        if let Some(index) = entry.file_name().to_str().and_then(|n| n.parse::<usize>().ok()) {
            max_seen = Some(max_seen.map_or(index, |m| m.max(index)));
        }
    }
    Ok(max_seen.map_or(0, |m| m + 1))
}

/// Allocate and create `<root>/<next index>/`.
pub fn create_run_dir(root: &Path) -> Result<(usize, PathBuf)> {
    let index = next_run_index(root)?;
    let dir   = root.join(index.to_string());
    fs::create_dir_all(&dir)
        .with_context(|| format!("Cannot create run directory '{}'", dir.display()))?;
    Ok((index, dir))
}

// ─── Module snapshots ─────────────────────────────────────────────────────────
/// Write a module's parameters to `path` (extension added by the recorder).
pub fn save_module<B: Backend, M: Module<B>>(module: M, path: &Path) -> Result<()> {
    module
        .save_file(path.to_path_buf(), &recorder())
        .map_err(|e| anyhow::anyhow!("Failed to save snapshot to '{}': {e}", path.display()))
}

/// Load parameters from `path` into `module`.
///
/// The module must have the same architecture as the one
/// that was saved, or loading fails.
pub fn load_module<B: Backend, M: Module<B>>(
    module: M,
    path:   &Path,
    device: &B::Device,
) -> Result<M> {
    module
        .load_file(path.to_path_buf(), &recorder(), device)
        .map_err(|e| anyhow::anyhow!("Cannot load snapshot '{}': {e}", path.display()))
}

// ─── CheckpointManager ────────────────────────────────────────────────────────
/// Snapshot bookkeeping for one run directory.
pub struct CheckpointManager {
    dir:         PathBuf,
    run:         usize,
    max_to_keep: usize,
    /// Epochs of the snapshots on disk, oldest first
    saved:       VecDeque<u64>,
}

impl CheckpointManager {
    /// Allocate a fresh run directory under `root`.
    pub fn create(root: &Path, max_to_keep: usize) -> Result<Self> {
        let (run, dir) = create_run_dir(root)?;
        tracing::debug!("Checkpoint directory: '{}'", dir.display());
        Ok(Self { dir, run, max_to_keep, saved: VecDeque::new() })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn run(&self) -> usize {
        self.run
    }

    /// Path (without extension) of the snapshot for `epoch`
    pub fn snapshot_path(&self, epoch: u64) -> PathBuf {
        self.dir.join(format!("model-{epoch}"))
    }

    /// Epochs of the snapshots currently kept, oldest first
    pub fn saved_epochs(&self) -> Vec<u64> {
        self.saved.iter().copied().collect()
    }

    /// Register a snapshot that was just written: prune old
    /// ones and move the latest pointer.
    pub fn record_snapshot(&mut self, epoch: u64) -> Result<()> {
        if !self.saved.contains(&epoch) {
            self.saved.push_back(epoch);
        }

        while self.saved.len() > self.max_to_keep.max(1) {
            if let Some(old) = self.saved.pop_front() {
                let file = self.snapshot_path(old).with_extension(SNAPSHOT_EXTENSION);
                match fs::remove_file(&file) {
                    Ok(()) => tracing::debug!("Removed old snapshot '{}'", file.display()),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => {
                        return Err(e).with_context(|| {
                            format!("Cannot remove old snapshot '{}'", file.display())
                        })
                    }
                }
            }
        }

        let latest = self.dir.join(LATEST_FILE);
        fs::write(&latest, serde_json::to_string(&epoch)?)
            .with_context(|| format!("Failed to write '{}'", latest.display()))?;
        Ok(())
    }

    /// Write config.json unless this run already has one.
    /// Returns true when the file was written by this call.
    pub fn save_config_once<C: Settings>(&self, config: &C) -> bool {
        let path = self.dir.join(CONFIG_FILE);
        if path.is_file() {
            return false;
        }
        config.save(&path);
        path.is_file()
    }
}

/// Snapshot path named by `latest_epoch.json` in a run directory.
pub fn latest_snapshot(run_dir: &Path) -> Result<PathBuf> {
    let pointer = run_dir.join(LATEST_FILE);
    let text = fs::read_to_string(&pointer).with_context(|| {
        format!("Cannot find '{}'. Has this run saved a checkpoint?", pointer.display())
    })?;
    let epoch: u64 = serde_json::from_str(text.trim())
        .with_context(|| format!("Invalid epoch in '{}'", pointer.display()))?;
    Ok(run_dir.join(format!("model-{epoch}")))
}
