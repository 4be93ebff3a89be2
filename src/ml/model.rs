// ============================================================
// Layer 5 — Model Harness
// ============================================================
// Model<B, M> wraps a TrainableModel and owns everything that
// is the same for every model:
//
//   counters     — epoch (global_step) and mini-batch
//                  (batch_step); both start at 0 and only ever
//                  go up, by exactly one per train() and per
//                  train_step() respectively
//   logger       — scoped ModelLogger
//   summaries    — optional SummaryWriter (summaries_root)
//   checkpoints  — optional CheckpointManager (checkpoints_root)
//   data streams — optional, when the model's load_data hook
//                  returns data
//
// Lifecycle:
//
//   Model::new(config)            ─► Ready
//   Model::from_checkpoint(path)  ─► Ready
//                                 └► Err (logged at error level)
//
//   Ready: train() / train_step() / infer() / save() /
//          restore(), any number of times, then close().
//
// The training loop lives in trainer.rs and inference in
// inferencer.rs; both are further impl blocks on Model.
//
// Reference: Rust Book §17 (Encapsulation)
//            Burn Book §5 (Training)

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use burn::tensor::backend::AutodiffBackend;
use rand::rngs::StdRng;
use thiserror::Error;

use crate::data::stream::{make_rng, DataStreams};
use crate::domain::traits::Settings;
use crate::infra::{
    checkpoint::{latest_snapshot, CheckpointManager, CONFIG_FILE},
    logger::ModelLogger,
    summaries::{SummaryMode, SummaryWriter},
};
use crate::ml::hooks::TrainableModel;

// ─── ModelError ───────────────────────────────────────────────────────────────
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("training data must be given when the model does not stream its own data")]
    MissingTrainingData,

    #[error("an epoch over {samples} training samples contains no full mini-batch")]
    EmptyEpoch { samples: usize },

    #[error("inference over {inputs} inputs produced no full mini-batch")]
    EmptyInference { inputs: usize },

    #[error("mini-batch size must be positive, got 0")]
    ZeroBatchSize,
}

/// What a model is constructed from.
pub enum ModelSource<C> {
    Config(C),
    /// A run's config.json, or the run directory holding it
    Checkpoint(PathBuf),
}

// ─── Model ────────────────────────────────────────────────────────────────────
pub struct Model<B: AutodiffBackend, M: TrainableModel<B>> {
    pub(crate) config:      M::Config,
    pub(crate) inner:       M,
    pub(crate) device:      B::Device,
    pub(crate) streams:     Option<DataStreams<B>>,
    pub(crate) global_step: u64,
    pub(crate) batch_step:  u64,
    pub(crate) logger:      ModelLogger,
    pub(crate) summaries:   Option<SummaryWriter>,
    pub(crate) checkpoints: Option<CheckpointManager>,
    pub(crate) rng:         StdRng,
}

impl<B: AutodiffBackend, M: TrainableModel<B>> Model<B, M> {
    pub fn open(source: ModelSource<M::Config>, device: &B::Device) -> Result<Self> {
        match source {
            ModelSource::Config(config)   => Self::new(config, device),
            ModelSource::Checkpoint(path) => Self::from_checkpoint(path, device),
        }
    }

    /// Build a fresh model: data streams, network, logger,
    /// summary writer and checkpoint directory.
    pub fn new(config: M::Config, device: &B::Device) -> Result<Self> {
        let base   = config.model().clone();
        let logger = ModelLogger::from_config(&base)?;

        let streams = match M::load_data(&config, device)? {
            Some(data) => Some(DataStreams::new(data, &base)?),
            None       => None,
        };

        let inner = M::build(&config, device)?;

        let summaries = base
            .summaries_root
            .as_deref()
            .map(SummaryWriter::create)
            .transpose()?;
        let checkpoints = base
            .checkpoints_root
            .as_deref()
            .map(|root| CheckpointManager::create(root, base.saver_max_to_keep))
            .transpose()?;

        let mut model = Self {
            config,
            inner,
            device: device.clone(),
            streams,
            global_step: 0,
            batch_step: 0,
            logger,
            summaries,
            checkpoints,
            rng: make_rng(base.seed),
        };
        model.init_summaries();

        let mode = if model.streams.is_some() { "streaming" } else { "array" };
        model.logger.debug(&format!("Model '{}' ready ({mode} mode)", base.scope_name));
        Ok(model)
    }

    /// Rebuild a model from the config.json of an earlier run.
    ///
    /// Only the config is read here. Call [`Model::restore`] or
    /// [`Model::restore_latest`] to load parameters.
    pub fn from_checkpoint(path: impl AsRef<Path>, device: &B::Device) -> Result<Self> {
        let path = path.as_ref();
        let config_path = if path.is_dir() { path.join(CONFIG_FILE) } else { path.to_path_buf() };

        let built = <M::Config as Settings>::try_load(&config_path)
            .map_err(anyhow::Error::from)
            .and_then(|config| Self::new(config, device));

        built.map_err(|e| {
            let mut logger = ModelLogger::error_only();
            logger.error(&format!(
                "Failed to initialize from config file ({})",
                config_path.display()
            ));
            e.context(format!("Cannot build model from '{}'", config_path.display()))
        })
    }

    // ─── Accessors ────────────────────────────────────────────────────────────
    pub fn config(&self) -> &M::Config {
        &self.config
    }

    pub fn inner(&self) -> &M {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut M {
        &mut self.inner
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    /// Completed train() calls
    pub fn epoch(&self) -> u64 {
        self.global_step
    }

    /// Completed train_step() calls
    pub fn batch_step(&self) -> u64 {
        self.batch_step
    }

    pub fn is_streaming(&self) -> bool {
        self.streams.is_some()
    }

    /// Run directory snapshots are written to
    pub fn checkpoint_dir(&self) -> Option<&Path> {
        self.checkpoints.as_ref().map(|c| c.dir())
    }

    /// Run directory summaries are written to
    pub fn summaries_dir(&self) -> Option<&Path> {
        self.summaries.as_ref().map(|s| s.dir())
    }

    pub fn logger_mut(&mut self) -> &mut ModelLogger {
        &mut self.logger
    }

    pub(crate) fn increment_global_step(&mut self) -> u64 {
        self.global_step += 1;
        self.global_step
    }

    pub(crate) fn increment_batch_step(&mut self) -> u64 {
        self.batch_step += 1;
        self.batch_step
    }

    // ─── Summaries ────────────────────────────────────────────────────────────
    fn init_summaries(&mut self) {
        if self.summaries.is_none() {
            return;
        }
        let scope = self.config.model().scope_name.clone();
        self.add_summary(&format!("({scope}) epoch training loss"),   Some("epoch_train_loss"), "epoch");
        self.add_summary(&format!("({scope}) epoch validation loss"), Some("epoch_valid_loss"), "epoch");
        self.add_summary(&format!("({scope}) step training loss"),    Some("step_train_loss"),  "step");
        self.add_summary(&format!("({scope}) step validation loss"),  Some("step_valid_loss"),  "step");
    }

    /// Register a scalar summary. `mode` is "epoch" or "step";
    /// anything else is logged and ignored.
    pub fn add_summary(&mut self, tag: &str, key: Option<&str>, mode: &str) {
        let mode = match mode.parse::<SummaryMode>() {
            Ok(mode) => mode,
            Err(_) => {
                self.logger.warn(&format!("Invalid summary mode {mode}, ignoring."));
                return;
            }
        };
        if let Some(writer) = self.summaries.as_mut() {
            writer.add(tag, key, mode);
        }
    }

    pub fn update_summary(&mut self, key: &str, value: f64) {
        if let Some(writer) = self.summaries.as_mut() {
            if !writer.update(key, value) {
                self.logger.warn(&format!("Invalid summary key \"{key}\", skipping."));
            }
        }
    }

    /// Write and reset every summary of `mode`, tagged with the
    /// epoch or mini-batch counter.
    pub fn write_summary(&mut self, mode: &str) {
        let mode = match mode.parse::<SummaryMode>() {
            Ok(mode) => mode,
            Err(_) => {
                self.logger.warn(&format!("Invalid summary mode {mode}, ignoring."));
                return;
            }
        };
        let step = match mode {
            SummaryMode::Epoch => self.global_step,
            SummaryMode::Step  => self.batch_step,
        };
        if let Some(writer) = self.summaries.as_mut() {
            if let Err(e) = writer.write(mode, step) {
                self.logger.warn(&format!("Cannot write {mode} summaries: {e}"));
            }
        }
    }

    // ─── Checkpoints ──────────────────────────────────────────────────────────
    /// Snapshot the model under the current epoch count. The
    /// first save of a run also writes config.json.
    pub fn save(&mut self) -> Result<()> {
        let Some(checkpoints) = self.checkpoints.as_mut() else {
            self.logger.warn(
                "'checkpoints_root' was set to None in the model configuration - saving not possible.",
            );
            return Ok(());
        };

        let epoch = self.global_step;
        let path  = checkpoints.snapshot_path(epoch);
        self.inner.save_variables(&path)?;
        checkpoints.record_snapshot(epoch)?;

        if checkpoints.save_config_once(&self.config) {
            self.logger.debug(&format!("Wrote {} to '{}'", CONFIG_FILE, checkpoints.dir().display()));
        }
        self.logger.debug(&format!("Saved snapshot '{}'", path.display()));
        Ok(())
    }

    /// Load parameters from an explicit snapshot path.
    pub fn restore(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.logger.debug(&format!("restoring from {}", path.display()));
        self.inner
            .restore_variables(path, &self.device)
            .with_context(|| format!("Cannot restore model from '{}'", path.display()))
    }

    /// Load the newest snapshot of the run in `run_dir`.
    pub fn restore_latest(&mut self, run_dir: impl AsRef<Path>) -> Result<()> {
        let path = latest_snapshot(run_dir.as_ref())?;
        self.restore(path)
    }

    /// Flush the log file and summary file.
    ///
    /// Both are buffered and flushed on drop as well; close()
    /// is the way to see flush errors.
    pub fn close(&mut self) -> Result<()> {
        if let Some(writer) = self.summaries.as_mut() {
            writer.flush()?;
        }
        self.logger.flush()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::ModelConfig;
    use crate::infra::summaries::SUMMARY_FILE;
    use crate::ml::testing::{MockConfig, MockModel, TestAutodiffBackend};
    use std::fs;

    type Harness = Model<TestAutodiffBackend, MockModel<TestAutodiffBackend>>;

    fn config_in(root: &Path) -> MockConfig {
        MockConfig {
            model: ModelConfig {
                summaries_root:   Some(root.join("summaries")),
                checkpoints_root: Some(root.join("checkpoints")),
                log_level:        crate::domain::config::LogLevel::Info,
                seed:             Some(5),
                ..ModelConfig::default()
            },
            ..MockConfig::default()
        }
    }

    #[test]
    fn test_new_model_starts_at_zero() {
        let device = Default::default();
        let model  = Harness::new(MockConfig::default(), &device).unwrap();
        assert_eq!(model.epoch(), 0);
        assert_eq!(model.batch_step(), 0);
        assert!(!model.is_streaming());
        assert!(model.checkpoint_dir().is_none());
    }

    #[test]
    fn test_run_directories_are_allocated_per_instance() {
        let tmp    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let a = Harness::new(config_in(tmp.path()), &device).unwrap();
        let b = Harness::new(config_in(tmp.path()), &device).unwrap();
        assert!(a.checkpoint_dir().unwrap().ends_with("0"));
        assert!(b.checkpoint_dir().unwrap().ends_with("1"));
        assert!(b.summaries_dir().unwrap().ends_with("1"));
    }

    #[test]
    fn test_save_without_root_is_a_no_op() {
        let device = Default::default();
        let mut model = Harness::new(MockConfig::default(), &device).unwrap();
        model.save().unwrap();
    }

    #[test]
    fn test_save_writes_config_once_and_restore_latest() {
        let tmp    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let mut model = Harness::new(config_in(tmp.path()), &device).unwrap();

        model.save().unwrap();
        let run_dir     = model.checkpoint_dir().unwrap().to_path_buf();
        let config_path = run_dir.join(CONFIG_FILE);
        let first_write = fs::read_to_string(&config_path).unwrap();

        model.config.label = "changed".to_string();
        model.save().unwrap();
        assert_eq!(fs::read_to_string(&config_path).unwrap(), first_write);

        model.restore_latest(&run_dir).unwrap();
    }

    #[test]
    fn test_from_checkpoint_rebuilds_config() {
        let tmp    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let mut config = config_in(tmp.path());
        config.label = "saved".to_string();

        let mut model = Harness::new(config, &device).unwrap();
        model.save().unwrap();
        let run_dir = model.checkpoint_dir().unwrap().to_path_buf();

        let rebuilt = Harness::open(ModelSource::Checkpoint(run_dir), &device).unwrap();
        assert_eq!(rebuilt.config().label, "saved");
        assert_eq!(rebuilt.epoch(), 0);
    }

    #[test]
    fn test_from_checkpoint_missing_config_fails() {
        let tmp    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let res    = Harness::from_checkpoint(tmp.path().join("nope").join(CONFIG_FILE), &device);
        assert!(res.is_err());
    }

    #[test]
    fn test_invalid_summary_mode_and_key_are_ignored() {
        let tmp    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let mut model = Harness::new(config_in(tmp.path()), &device).unwrap();

        model.add_summary("x", None, "sometimes");
        model.update_summary("no_such_key", 1.0);
        model.write_summary("sometimes");

        model.update_summary("epoch_train_loss", 0.25);
        model.write_summary("epoch");
        model.close().unwrap();

        let csv = fs::read_to_string(model.summaries_dir().unwrap().join(SUMMARY_FILE)).unwrap();
        assert!(csv.contains("epoch,0,\"(model) epoch training loss\",0.25"));
        assert!(!csv.contains("\"x\""));
    }
}
